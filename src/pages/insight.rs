use askama::Template;
use async_trait::async_trait;
use serde::Deserialize;

use super::{Context, Handled, Page, PageAction};
use crate::{
    chart::{self, ChartView},
    models::Metric,
    router::{Location, RouteMatch},
};

pub const DEFAULT_DAYS: &str = "7";

/// The time-range filter, in display order.
const RANGES: [(&str, &str); 6] = [
    ("0", "Today"),
    ("1", "Last 24 hours"),
    ("7", "Last 7 days"),
    ("30", "Last 30 days"),
    ("90", "Last 90 days"),
    ("365", "Last 1 year"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum InsightAction {
    SelectRange { days: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Loading,
    Ready {
        date: ChartView,
        referrer: ChartView,
        device: ChartView,
    },
    Failed(String),
}

struct RangeOption {
    days: &'static str,
    label: &'static str,
    active: bool,
}

struct ChartCard {
    id: &'static str,
    heading: &'static str,
    option_json: String,
    empty: bool,
}

#[derive(Template)]
#[template(path = "insight.html")]
struct InsightTemplate<'a> {
    ranges: Vec<RangeOption>,
    loading: bool,
    error: Option<&'a str>,
    cards: Vec<ChartCard>,
}

/// `/insight/:shortUrlCode`
#[derive(Debug)]
pub struct InsightPage {
    short_url_code: Option<String>,
    days: String,
    location: Location,
    status: Status,
}

impl InsightPage {
    pub fn from_match(matched: &RouteMatch) -> Self {
        Self {
            short_url_code: matched
                .param("shortUrlCode")
                .filter(|code| !code.is_empty())
                .map(str::to_owned),
            days: normalize_days(matched.query("days")),
            location: matched.location.clone(),
            status: Status::Loading,
        }
    }

    pub fn days(&self) -> &str {
        &self.days
    }

    async fn load(&mut self, ctx: &mut Context<'_>) {
        let Some(code) = self.short_url_code.as_deref() else {
            self.status = Status::Failed(
                "Couldn't find the URL to show statistics for. Go back to the dashboard and try again."
                    .to_owned(),
            );
            return;
        };
        self.status = Status::Loading;

        let days = self.days.as_str();
        let fetched = tokio::try_join!(
            ctx.api.fetch_stats(code, Metric::Date, days),
            ctx.api.fetch_stats(code, Metric::Referrer, days),
            ctx.api.fetch_stats(code, Metric::Device, days),
        );

        match fetched {
            Ok((date, referrer, device)) => {
                tracing::debug!(
                    "stats for {} over {} day(s): {} date / {} referrer / {} device bucket(s)",
                    code,
                    days,
                    date.len(),
                    referrer.len(),
                    device.len()
                );
                self.status = Status::Ready {
                    date: chart::date_chart(&date, days),
                    referrer: chart::referrer_chart(&referrer, days),
                    device: chart::device_chart(&device),
                };
            }
            Err(e) => {
                tracing::error!("Failed to load stats for {}: {}", code, e);
                self.status = Status::Failed(e.to_string());
                ctx.notifier.error(e.to_string());
            }
        }
    }
}

/// Keep the `days` query only when it is a plain number.
fn normalize_days(days: Option<&str>) -> String {
    match days {
        Some(days) if !days.is_empty() && days.chars().all(|c| c.is_ascii_digit()) => days.to_owned(),
        _ => DEFAULT_DAYS.to_owned(),
    }
}

fn card(id: &'static str, heading: &'static str, view: &ChartView) -> ChartCard {
    ChartCard {
        id,
        heading,
        option_json: view.option_json(),
        empty: view.is_empty(),
    }
}

#[async_trait]
impl Page for InsightPage {
    fn render(&self) -> askama::Result<String> {
        let ranges = RANGES
            .iter()
            .map(|&(days, label)| RangeOption {
                days,
                label,
                active: days == self.days,
            })
            .collect();

        let (cards, error) = match &self.status {
            Status::Ready {
                date,
                referrer,
                device,
            } => (
                vec![
                    card("dateChart", "Visits by date", date),
                    card("refererChart", "Referrers", referrer),
                    card("deviceChart", "Devices", device),
                ],
                None,
            ),
            Status::Failed(message) => (Vec::new(), Some(message.as_str())),
            Status::Loading => (Vec::new(), None),
        };

        InsightTemplate {
            ranges,
            loading: self.status == Status::Loading,
            error,
            cards,
        }
        .render()
    }

    async fn mount(&mut self, ctx: &mut Context<'_>) {
        self.load(ctx).await;
    }

    async fn handle(&mut self, action: PageAction, ctx: &mut Context<'_>) -> Handled {
        let PageAction::Insight(action) = action else {
            return Handled::No;
        };

        match action {
            InsightAction::SelectRange { days } => {
                self.days = normalize_days(Some(&days));
                self.location = self.location.with_query_param("days", &self.days);
                ctx.push_state(self.location.clone());
                self.load(ctx).await;
            }
        }
        Handled::Yes
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{models::StatsBucket, router::Router};

    fn page(href: &str) -> InsightPage {
        let location = Location::parse(href).unwrap();
        InsightPage::from_match(&Router::new().resolve(&location))
    }

    #[test]
    fn days_come_from_query_with_default() {
        assert_eq!(page("/insight/abc?days=30").days(), "30");
        assert_eq!(page("/insight/abc").days(), DEFAULT_DAYS);
        assert_eq!(page("/insight/abc?days=soon").days(), DEFAULT_DAYS);
    }

    #[test]
    fn active_range_is_marked() {
        let html = page("/insight/abc?days=90").render().unwrap();
        assert!(html.contains(
            r#"<li class="active" data-page="insight" data-action="select-range" data-days="90" data-pending="insightContainer">"#
        ));
        assert!(html.contains(r#"data-days="7" data-pending="insightContainer">"#));
        assert!(html.contains(r#"class="loading-message">Loading statistics..."#));
    }

    #[test]
    fn empty_metrics_render_placeholders() {
        let mut page = page("/insight/abc");
        let zero = vec![StatsBucket {
            range: "2026-10-16".into(),
            stats: BTreeMap::from([("count".to_owned(), 0)]),
        }];
        let busy = vec![StatsBucket {
            range: "2026-10-16".into(),
            stats: BTreeMap::from([("count".to_owned(), 4), ("Mobile".to_owned(), 4)]),
        }];
        page.status = Status::Ready {
            date: chart::date_chart(&busy, "7"),
            referrer: chart::referrer_chart(&zero, "7"),
            device: chart::device_chart(&busy),
        };

        let html = page.render().unwrap();
        assert_eq!(html.matches("No visits yet").count(), 1);
        assert!(html.contains(r#"id="dateChart""#));
        // Kept in the markup, hidden, for the shell to show during a reload.
        assert!(html.contains(r#"class="loading-message" hidden>Loading statistics..."#));
    }

    #[test]
    fn failure_replaces_charts_with_message() {
        let mut page = page("/insight/abc");
        page.status = Status::Failed("Failed to load date data: 500 - boom".into());
        let html = page.render().unwrap();
        assert!(html.contains("Failed to load date data: 500 - boom"));
        assert!(!html.contains("data-chart"));
    }
}
