//! Field normalizers
//!
//! Pure, total functions turning raw cells into the canonical string forms
//! written to the output tables: short identifiers, certificate names,
//! `YYYY-MM-DD` dates and download links.

use crate::constants::{CERT_NAME_PREFIX, DATE_OUTPUT_FORMAT, DATE_SENTINELS, ID_DIGITS};
use crate::sheet::CellValue;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static BA5_SAFETY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(EA-E-\d{3})\s*-?\s*BA5 Safety").expect("Invalid BA5 safety regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Reduce an identifier to its rightmost five digits.
///
/// Non-digits are dropped first. Fewer than five digits are returned as they
/// are, so the result is empty when the input carries no digits at all.
pub fn normalize_id(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(ID_DIGITS);
    digits[start..].iter().collect()
}

/// Identifier normalization for a raw cell
pub fn normalize_id_cell(cell: &CellValue) -> String {
    normalize_id(&cell.as_text())
}

/// Canonical certificate name
pub fn normalize_cert_name(raw: &str) -> String {
    let without_prefix = raw.replace(CERT_NAME_PREFIX, "");
    let rewritten = BA5_SAFETY.replace_all(&without_prefix, "${1} - BA5 Safety");
    WHITESPACE.replace_all(&rewritten, " ").trim().to_string()
}

/// Canonical date for a raw cell.
///
/// Numeric cells yield an empty string: a bare serial number is not
/// interpreted as a date.
pub fn normalize_date(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty | CellValue::Number(_) | CellValue::Bool(_) => String::new(),
        CellValue::Date(value) => value.format(DATE_OUTPUT_FORMAT).to_string(),
        CellValue::Text(text) | CellValue::Error(text) => normalize_date_text(text),
    }
}

/// Canonical date for free text.
///
/// Sentinel phrases and unparseable text are returned trimmed but otherwise
/// unchanged.
pub fn normalize_date_text(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() || is_date_sentinel(text) {
        return text.to_string();
    }

    DATE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.parse(text))
        .map(|date| date.format(DATE_OUTPUT_FORMAT).to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Whether the text is one of the "no expiry" phrases
pub fn is_date_sentinel(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    DATE_SENTINELS.contains(&lowered.as_str())
}

/// Hyperlink target of a cell.
///
/// An explicit target wins; otherwise text that already looks like a web
/// address is taken as-is.
pub fn extract_hyperlink(cell: &CellValue, target: Option<&str>) -> Option<String> {
    if let Some(target) = target.filter(|t| !t.trim().is_empty()) {
        return Some(target.to_string());
    }
    match cell {
        CellValue::Text(text) if text.starts_with("http://") || text.starts_with("https://") => {
            Some(text.clone())
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    YearMonthDay,
    DayMonthYear,
    MonthDayYear,
}

/// One accepted textual date layout
#[derive(Debug, Clone, Copy)]
struct DatePattern {
    order: FieldOrder,
    separator: Option<char>,
    year_digits: usize,
}

impl DatePattern {
    const fn new(order: FieldOrder, separator: Option<char>, year_digits: usize) -> Self {
        Self {
            order,
            separator,
            year_digits,
        }
    }

    fn parse(&self, text: &str) -> Option<NaiveDate> {
        let (first, second, third) = match self.separator {
            Some(separator) => {
                let mut parts = text.split(separator);
                let parts = (parts.next()?, parts.next()?, parts.next()?, parts.next());
                if parts.3.is_some() {
                    return None;
                }
                (parts.0, parts.1, parts.2)
            }
            None => split_compact(text)?,
        };

        let (year, month, day) = match self.order {
            FieldOrder::YearMonthDay => (first, second, third),
            FieldOrder::DayMonthYear => (third, second, first),
            FieldOrder::MonthDayYear => (third, first, second),
        };

        if year.len() != self.year_digits {
            return None;
        }
        let year = expand_year(number(year)?, self.year_digits);
        let month = short_number(month)?;
        let day = short_number(day)?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

const DATE_PATTERNS: [DatePattern; 9] = [
    DatePattern::new(FieldOrder::YearMonthDay, Some('-'), 4),
    DatePattern::new(FieldOrder::DayMonthYear, Some('-'), 4),
    DatePattern::new(FieldOrder::DayMonthYear, Some('/'), 4),
    DatePattern::new(FieldOrder::MonthDayYear, Some('/'), 4),
    DatePattern::new(FieldOrder::DayMonthYear, Some('/'), 2),
    DatePattern::new(FieldOrder::DayMonthYear, Some('-'), 2),
    DatePattern::new(FieldOrder::YearMonthDay, Some('/'), 4),
    DatePattern::new(FieldOrder::DayMonthYear, Some('.'), 4),
    DatePattern::new(FieldOrder::YearMonthDay, None, 4),
];

/// `YYYYMMDD` with one-digit month or day allowed: "2024035" is 2024-03-05.
/// A two-digit month is preferred when it is valid.
fn split_compact(text: &str) -> Option<(&str, &str, &str)> {
    if !(6..=8).contains(&text.len()) || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (year, rest) = text.split_at(4);
    [2, 1].into_iter().find_map(|month_digits| {
        if rest.len() <= month_digits {
            return None;
        }
        let (month, day) = rest.split_at(month_digits);
        let month_ok = (1..=12).contains(&number(month)?);
        let day_ok = day.len() <= 2 && (1..=31).contains(&number(day)?);
        (month_ok && day_ok).then_some((year, month, day))
    })
}

fn number(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Day or month: one or two digits
fn short_number(part: &str) -> Option<u32> {
    if part.len() > 2 {
        return None;
    }
    number(part)
}

/// Two-digit years pivot at 69: 69..=99 are 19xx, the rest 20xx
fn expand_year(year: u32, digits: usize) -> i32 {
    let year = year as i32;
    match digits {
        2 if year >= 69 => 1900 + year,
        2 => 2000 + year,
        _ => year,
    }
}
