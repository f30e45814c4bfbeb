//! Client-side form validation, run before any network call.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+)+[/#?]?.*$")
        .expect("URL pattern is valid")
});

pub const NAME_MAX_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 15;

/// Korean mobile number: `01` followed by 8 or 9 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    (10..=11).contains(&phone.len())
        && phone.starts_with("01")
        && phone.bytes().all(|b| b.is_ascii_digit())
}

/// 8 to 15 ASCII letters and digits, with at least one of each.
pub fn is_valid_password(password: &str) -> bool {
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password.len())
        && password.bytes().all(|b| b.is_ascii_alphanumeric())
        && password.bytes().any(|b| b.is_ascii_alphabetic())
        && password.bytes().any(|b| b.is_ascii_digit())
}

/// Absolute http(s) URL with a dotted host.
pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

/// A `YYYYMMDD` birth date between 1900 and next year that exists on the
/// calendar.
pub fn is_valid_birth_date(raw: &str) -> bool {
    is_valid_birth_date_in(raw, chrono::Local::now().year())
}

/// Same as [`is_valid_birth_date`] against a fixed current year.
pub fn is_valid_birth_date_in(raw: &str, current_year: i32) -> bool {
    parse_birth_date(raw)
        .map(|date| (1900..=current_year + 1).contains(&date.year()))
        .unwrap_or(false)
}

fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = raw[0..4].parse::<i32>().ok()?;
    let month = raw[4..6].parse::<u32>().ok()?;
    let day = raw[6..8].parse::<u32>().ok()?;
    // from_ymd_opt rejects month 13, Feb 30 and Feb 29 outside leap years.
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Keep ASCII digits only, as the phone input does while typing.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Keep ASCII digits only and cut to at most `max` of them.
pub fn digits_truncated(input: &str, max: usize) -> String {
    input.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// The fields of the signup form, as submitted.
#[derive(Debug, Clone, Default)]
pub struct SignupFields<'a> {
    pub name: &'a str,
    pub phone_number: &'a str,
    pub password: &'a str,
    pub birth_date: &'a str,
    pub gender: Option<&'a str>,
    pub iso_code: &'a str,
    pub agree_terms: bool,
}

/// Check the signup form in display order and return the first problem.
pub fn check_signup(fields: &SignupFields<'_>, current_year: i32) -> Result<(), &'static str> {
    if fields.name.is_empty() || fields.name.chars().count() > NAME_MAX_CHARS {
        return Err("A name is required and can be at most 10 characters.");
    }
    if !is_valid_phone(fields.phone_number) {
        return Err("Please enter a valid phone number (e.g. 01012345678).");
    }
    if !is_valid_password(fields.password) {
        return Err("Passwords must be 8-15 characters and include letters and digits.");
    }
    if !is_valid_birth_date_in(fields.birth_date, current_year) {
        return Err("Please enter a valid birth date (YYYYMMDD).");
    }
    if !matches!(fields.gender, Some("0") | Some("1")) {
        return Err("Please select a gender.");
    }
    if fields.iso_code.is_empty() {
        return Err("Please select a country.");
    }
    if !fields.agree_terms {
        return Err("Please agree to the terms of service.");
    }
    Ok(())
}

/// Title edit: required, at most 50 characters.
pub fn check_title(title: &str) -> Result<(), &'static str> {
    if title.is_empty() {
        return Err("Please enter a title.");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err("Titles can be at most 50 characters.");
    }
    Ok(())
}

/// Password change: required, confirmed, and well-formed.
pub fn check_new_password(new_password: &str, confirm_password: &str) -> Result<(), &'static str> {
    if new_password.is_empty() {
        return Err("Please enter a new password.");
    }
    if new_password != confirm_password {
        return Err("The passwords do not match.");
    }
    if !is_valid_password(new_password) {
        return Err("Passwords must be 8-15 characters and include letters and digits.");
    }
    Ok(())
}
