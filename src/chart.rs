//! Statistics payloads → ECharts option objects.
//!
//! The shell hands the produced options to the chart library untouched, so
//! the JSON here follows the ECharts option schema.

use serde_json::{json, Value};

use crate::models::{StatsBucket, TOTAL_KEY};

const AXIS_LABEL_COLOR: &str = "#666";
const SPLIT_LINE_COLOR: &str = "#eee";
const LINE_COLOR: &str = "#667eea";

/// What a chart card shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    /// Every count is zero: hide the chart, show the empty-state message.
    Empty,
    Ready(Value),
}

impl ChartView {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChartView::Empty)
    }

    pub fn option(&self) -> Option<&Value> {
        match self {
            ChartView::Empty => None,
            ChartView::Ready(option) => Some(option),
        }
    }

    /// The option serialised for a `data-chart` attribute.
    pub fn option_json(&self) -> String {
        self.option().map(Value::to_string).unwrap_or_default()
    }
}

/// At least one bucket has a positive count.
pub fn has_any_data(buckets: &[StatsBucket]) -> bool {
    buckets.iter().any(StatsBucket::has_clicks)
}

/// Per-category totals across all buckets, largest first. The reserved
/// total key is skipped; ties keep first-seen order.
pub fn category_totals(buckets: &[StatsBucket]) -> Vec<(String, i64)> {
    let mut totals: Vec<(String, i64)> = Vec::new();
    for bucket in buckets {
        for (category, count) in &bucket.stats {
            if category == TOTAL_KEY {
                continue;
            }
            match totals.iter_mut().find(|(name, _)| name == category) {
                Some((_, total)) => *total += count,
                None => totals.push((category.clone(), *count)),
            }
        }
    }
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
}

/// Short ranges (today, last 24 hours) have few labels; longer ones rotate.
fn label_rotation(days: &str) -> u32 {
    if matches!(days, "0" | "1") {
        0
    } else {
        70
    }
}

fn category_axis(buckets: &[StatsBucket], days: &str) -> Value {
    json!({
        "type": "category",
        "boundaryGap": false,
        "data": buckets.iter().map(|b| b.range.as_str()).collect::<Vec<_>>(),
        "axisLabel": {
            "interval": 0,
            "rotate": label_rotation(days),
            "fontSize": 12,
            "color": AXIS_LABEL_COLOR
        }
    })
}

/// Clicks per time bucket as a smoothed area line.
pub fn date_chart(buckets: &[StatsBucket], days: &str) -> ChartView {
    if !has_any_data(buckets) {
        return ChartView::Empty;
    }

    let counts: Vec<i64> = buckets.iter().map(StatsBucket::total).collect();
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let y_max = match max_count {
        n if n <= 0 => 10,
        n => (n + 9) / 10 * 10,
    };

    ChartView::Ready(json!({
        "tooltip": { "trigger": "axis" },
        "grid": { "top": 20 },
        "xAxis": category_axis(buckets, days),
        "yAxis": {
            "type": "value",
            "min": 0,
            "interval": 10,
            "max": y_max,
            "axisLabel": { "fontSize": 12, "color": AXIS_LABEL_COLOR },
            "splitLine": { "lineStyle": { "color": SPLIT_LINE_COLOR } }
        },
        "series": [{
            "name": "Clicks",
            "type": "line",
            "data": counts,
            "smooth": true,
            "areaStyle": {},
            "lineStyle": { "width": 2 },
            "itemStyle": { "color": LINE_COLOR }
        }]
    }))
}

/// One stacked bar series per referrer, most significant first.
pub fn referrer_chart(buckets: &[StatsBucket], days: &str) -> ChartView {
    if !has_any_data(buckets) {
        return ChartView::Empty;
    }

    let referrers: Vec<String> = category_totals(buckets)
        .into_iter()
        .map(|(name, _)| name)
        .collect();

    let series: Vec<Value> = referrers
        .iter()
        .map(|referrer| {
            let data: Vec<i64> = buckets
                .iter()
                .map(|b| b.stats.get(referrer).copied().unwrap_or(0))
                .collect();
            json!({
                "name": referrer,
                "type": "bar",
                "stack": "total",
                "barWidth": "40%",
                "emphasis": { "focus": "series" },
                "data": data
            })
        })
        .collect();

    ChartView::Ready(json!({
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "shadow" } },
        "legend": legend(Some(&referrers)),
        "grid": { "top": 80, "left": "2%", "right": "3%", "bottom": "5%", "containLabel": true },
        "barCategoryGap": "35%",
        "xAxis": category_axis(buckets, days),
        "yAxis": {
            "type": "value",
            "min": 0,
            "axisLabel": { "fontSize": 12, "color": AXIS_LABEL_COLOR },
            "splitLine": { "lineStyle": { "color": SPLIT_LINE_COLOR } }
        },
        "series": series
    }))
}

/// Device share over the whole window as a doughnut.
pub fn device_chart(buckets: &[StatsBucket]) -> ChartView {
    if !has_any_data(buckets) {
        return ChartView::Empty;
    }

    let data: Vec<Value> = category_totals(buckets)
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    ChartView::Ready(json!({
        "tooltip": { "trigger": "item" },
        "legend": legend(None),
        "series": [{
            "name": "Devices",
            "type": "pie",
            "radius": ["40%", "70%"],
            "avoidLabelOverlap": false,
            "itemStyle": { "borderRadius": 10, "borderColor": "#fff", "borderWidth": 2 },
            "data": data
        }]
    }))
}

fn legend(names: Option<&[String]>) -> Value {
    let mut legend = json!({
        "top": "0.3%",
        "left": "center",
        "orient": "horizontal",
        "itemGap": 10,
        "width": "100%",
        "padding": 0,
        "textStyle": { "fontSize": 12 }
    });
    if let (Some(names), Some(map)) = (names, legend.as_object_mut()) {
        map.insert("data".into(), json!(names));
    }
    legend
}
