//! Date normalisation: loosely formatted capture → canonical `MM-DD-YYYY`.
//!
//! Captures arrive with trailing noise (`"03/04/1980 Sex: F"`), mixed
//! separators (`03.04.1980`, `03\04\1980`), textual months (`Sep 10, 1985`)
//! and OCR-damaged years (`1066`). The normaliser corrects *format*, not
//! calendar validity: `02/30/1980` comes out as `02-30-1980`.
//!
//! ## Algorithm
//!
//! 0. A bare 8-digit run is split positionally as `MM/DD/YYYY`.
//! 1. Separators `\`, `.` and `-` are unified to `/`.
//! 2. Lenient parse: locate the first date-shaped substring and parse it
//!    with chrono, trying four-digit then two-digit year formats.
//! 3. Strict fallback: `(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})`, two-digit years
//!    prefixed with `20`.
//!
//! Every result must have a year in [`MIN_YEAR`]..=[`MAX_YEAR`] and a month
//! in 1..=12. The day is passed through as read.

use crate::error::FieldError;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

static RE_NUMERIC_MDY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").unwrap());

static RE_NUMERIC_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})/(\d{1,2})/(\d{1,2})\b").unwrap());

static RE_TEXTUAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})/?\s*(\d{1,2})(?:st|nd|rd|th)?\s*,?\s*(\d{4}|\d{2})\b").unwrap()
});

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

static RE_STRICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})").unwrap());

/// A canonical date of birth.
///
/// Month and year are range-checked; the day is kept as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateValue {
    month: u32,
    day: u32,
    year: i32,
}

impl DateValue {
    pub fn new(month: u32, day: u32, year: i32) -> Result<Self, FieldError> {
        let shown = format!("{month}/{day}/{year}");
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(FieldError::date(
                &shown,
                format!("year {year} outside {MIN_YEAR}–{MAX_YEAR}"),
            ));
        }
        if !(1..=12).contains(&month) {
            return Err(FieldError::date(&shown, format!("month {month} out of range")));
        }
        Ok(Self { month, day, year })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}-{:04}", self.month, self.day, self.year)
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        Self {
            month: d.month(),
            day: d.day(),
            year: d.year(),
        }
    }
}

/// Normalise a captured date string.
pub fn normalize_date(input: &str) -> Result<DateValue, FieldError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FieldError::date(input, "empty"));
    }

    let split = split_eight_digits(trimmed);
    let unified = unify_separators(&split);

    if let Some(date) = lenient_parse(&unified) {
        return Ok(date);
    }
    strict_parse(input, &unified)
}

/// `"05101985"` → `"05/10/1985"`; anything else unchanged.
fn split_eight_digits(s: &str) -> String {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}/{}/{}", &s[..2], &s[2..4], &s[4..])
    } else {
        s.to_string()
    }
}

fn unify_separators(s: &str) -> String {
    s.replace(['\\', '.', '-'], "/")
}

fn in_range(d: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&d.year())
}

fn parse_first_in_range(candidate: &str, formats: &[&str]) -> Option<DateValue> {
    formats
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
        .find(|d| in_range(*d))
        .map(DateValue::from)
}

fn lenient_parse(s: &str) -> Option<DateValue> {
    if let Some(caps) = RE_NUMERIC_MDY.captures(s) {
        let candidate = format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]);
        if let Some(d) = parse_first_in_range(&candidate, &["%m/%d/%Y", "%m/%d/%y"]) {
            return Some(d);
        }
    }

    if let Some(caps) = RE_NUMERIC_YMD.captures(s) {
        let candidate = format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]);
        if let Some(d) = parse_first_in_range(&candidate, &["%Y/%m/%d"]) {
            return Some(d);
        }
    }

    for caps in RE_TEXTUAL.captures_iter(s) {
        let Some(month) = month_from_name(&caps[1]) else {
            continue;
        };
        let candidate = format!("{}/{}/{}", month, &caps[2], &caps[3]);
        if let Some(d) = parse_first_in_range(&candidate, &["%m/%d/%Y", "%m/%d/%y"]) {
            return Some(d);
        }
    }

    None
}

/// `"Sep"`, `"Sept"`, `"SEPTEMBER"` → 9. At least three letters, and a
/// prefix of a real month name.
fn month_from_name(token: &str) -> Option<u32> {
    if token.len() < 3 {
        return None;
    }
    let token = token.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&token))
        .map(|i| i as u32 + 1)
}

fn strict_parse(original: &str, s: &str) -> Result<DateValue, FieldError> {
    let caps = RE_STRICT
        .captures(s)
        .ok_or_else(|| FieldError::date(original, "no day/month/year triple"))?;

    let parse = |i: usize| -> Result<u32, FieldError> {
        caps[i]
            .parse::<u32>()
            .map_err(|e| FieldError::date(original, e.to_string()))
    };
    let month = parse(1)?;
    let day = parse(2)?;

    let year_str = &caps[3];
    let year = match year_str.len() {
        4 => parse(3)? as i32,
        2 => 2000 + parse(3)? as i32,
        _ => {
            return Err(FieldError::date(
                original,
                format!("ambiguous year {year_str:?}"),
            ))
        }
    };

    DateValue::new(month, day, year).map_err(|e| match e {
        FieldError::DateParse { reason, .. } => FieldError::date(original, reason),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        normalize_date(s).map(|d| d.to_string()).unwrap_or_else(|e| format!("ERR {e}"))
    }

    #[test]
    fn canonical_round_trip() {
        for d in ["03-04-1980", "12-31-1999", "01-01-1900", "12-31-2100", "02-29-2000"] {
            assert_eq!(norm(d), d);
        }
    }

    #[test]
    fn year_boundaries() {
        assert!(normalize_date("01/01/1899").is_err());
        assert!(normalize_date("12/31/2101").is_err());
        assert_eq!(norm("01/01/1900"), "01-01-1900");
        assert_eq!(norm("12/31/2100"), "12-31-2100");
    }

    #[test]
    fn rejects_ocr_year() {
        assert!(normalize_date("07/04/1066").is_err());
    }

    #[test]
    fn mixed_separators() {
        assert_eq!(norm("3.4.1980"), "03-04-1980");
        assert_eq!(norm("3\\4\\1980"), "03-04-1980");
        assert_eq!(norm("3-4-1980"), "03-04-1980");
    }

    #[test]
    fn trailing_noise_is_ignored() {
        assert_eq!(norm("03/04/1980 Sex: F Age: 44"), "03-04-1980");
    }

    #[test]
    fn two_digit_year_lenient() {
        assert_eq!(norm("3/4/80"), "03-04-1980");
        assert_eq!(norm("3/4/05"), "03-04-2005");
    }

    #[test]
    fn textual_month() {
        assert_eq!(norm("Sep 10, 1985"), "09-10-1985");
        assert_eq!(norm("September 10 1985"), "09-10-1985");
        assert_eq!(norm("mar 4 1980"), "03-04-1980");
    }

    #[test]
    fn full_and_dotted_month_names() {
        assert_eq!(norm("SEPTEMBER 10, 85"), "09-10-1985");
        assert_eq!(norm("Sept. 10, 1985"), "09-10-1985");
        assert_eq!(norm("Sept 10 1985"), "09-10-1985");
        assert_eq!(norm("December 1st, 1999"), "12-01-1999");
        assert_eq!(month_from_name("Marble"), None);
        assert_eq!(month_from_name("Ma"), None);
        assert!(normalize_date("Marble 10 1985").is_err());
    }

    #[test]
    fn iso_order() {
        assert_eq!(norm("1980-03-04"), "03-04-1980");
    }

    #[test]
    fn day_not_checked_against_month_length() {
        assert_eq!(norm("02/30/1980"), "02-30-1980");
        assert_eq!(norm("04/31/1975"), "04-31-1975");
    }

    #[test]
    fn day_digits_surface_as_read() {
        assert_eq!(norm("02/45/1980"), "02-45-1980");
        assert_eq!(DateValue::new(2, 45, 1980).unwrap().day(), 45);
    }

    #[test]
    fn month_out_of_range_rejected() {
        assert!(normalize_date("13/05/1980").is_err());
    }

    #[test]
    fn eight_digit_run_split() {
        assert_eq!(norm("05101985"), "05-10-1985");
    }

    #[test]
    fn nothing_date_like() {
        assert!(matches!(
            normalize_date("Female"),
            Err(FieldError::DateParse { .. })
        ));
        assert!(normalize_date("").is_err());
    }

    #[test]
    fn value_accessors_and_serialize() {
        let d = normalize_date("7/22/1975").unwrap();
        assert_eq!((d.month(), d.day(), d.year()), (7, 22, 1975));
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"07-22-1975\"");
    }
}
