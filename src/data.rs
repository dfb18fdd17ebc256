//! Raw and normalized cell values plus the string coercion grammar.
//!
//! Input rows arrive as [`RawValue`] cells (whatever the parsing collaborator
//! produced); normalization turns them into [`Value`] cells typed after the
//! column's inferred [`ColumnType`](crate::classify::ColumnType). Every
//! coercion here is total: a string that does not fit the grammar becomes
//! `None`, never an error.

use std::{fmt, sync::OnceLock};

use chrono::{Month, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// Blank text is treated the same as an absent cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, RawValue::Text(s) if s.trim().is_empty())
    }

    pub fn as_display(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Date(d) => format_date(d),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Returns the cell when it carries a non-blank value.
pub fn non_empty(cell: Option<&RawValue>) -> Option<&RawValue> {
    cell.filter(|value| !value.is_blank())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => format_date(d),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "t" | "yes" | "y" | "1" | "x"
            ),
            Value::Date(_) => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(format_date(d)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub fn format_date(value: &NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Whole days between two instants, rounding any partial day up.
pub fn span_in_days(earliest: NaiveDateTime, latest: NaiveDateTime) -> i64 {
    let millis = (latest - earliest).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Parses a currency-ish string: `$` and `,` are stripped before parsing.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.replace(['$', ','], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateShape {
    Iso,
    SlashMdy,
    DashMdy,
    MonthName,
}

fn date_patterns() -> &'static [(DateShape, Regex)] {
    static PATTERNS: OnceLock<Vec<(DateShape, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                DateShape::Iso,
                r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
            ),
            (DateShape::SlashMdy, r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$"),
            (DateShape::DashMdy, r"^(\d{1,2})-(\d{1,2})-(\d{4}|\d{2})$"),
            (DateShape::MonthName, r"^([A-Za-z]{3,9})\.? (\d{1,2}), (\d{4})$"),
        ]
        .into_iter()
        .filter_map(|(shape, pattern)| Regex::new(pattern).ok().map(|re| (shape, re)))
        .collect()
    })
}

/// Returns true when the string has one of the recognised date shapes,
/// whether or not the calendar values are valid.
pub fn looks_like_date(value: &str) -> bool {
    let trimmed = value.trim();
    date_patterns().iter().any(|(_, re)| re.is_match(trimmed))
}

pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    for (shape, re) in date_patterns() {
        let Some(caps) = re.captures(trimmed) else {
            continue;
        };
        let field = |idx: usize| caps.get(idx).map(|m| m.as_str());
        let number = |idx: usize| field(idx).and_then(|s| s.parse::<u32>().ok());
        return match shape {
            DateShape::Iso => {
                let date = NaiveDate::from_ymd_opt(
                    field(1)?.parse().ok()?,
                    number(2)?,
                    number(3)?,
                )?;
                let time = match number(4) {
                    Some(hour) => {
                        NaiveTime::from_hms_opt(hour, number(5)?, number(6).unwrap_or(0))?
                    }
                    None => NaiveTime::MIN,
                };
                Some(date.and_time(time))
            }
            DateShape::SlashMdy | DateShape::DashMdy => {
                let year = expand_year(field(3)?)?;
                NaiveDate::from_ymd_opt(year, number(1)?, number(2)?)
                    .map(|d| d.and_time(NaiveTime::MIN))
            }
            DateShape::MonthName => {
                let month = field(1)?.parse::<Month>().ok()?;
                NaiveDate::from_ymd_opt(
                    field(3)?.parse().ok()?,
                    month.number_from_month(),
                    number(2)?,
                )
                .map(|d| d.and_time(NaiveTime::MIN))
            }
        };
    }
    None
}

fn expand_year(token: &str) -> Option<i32> {
    let year: i32 = token.parse().ok()?;
    if token.len() == 2 {
        Some(if year < 50 { 2000 + year } else { 1900 + year })
    } else {
        Some(year)
    }
}
