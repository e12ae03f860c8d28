use std::fmt;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const UNKNOWN_DATE: &str = "UNKNOWN";

pub const MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sept", 9),
    ("sep", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TocDate {
    Known(NaiveDate),
    Unknown,
}

impl TocDate {
    pub fn is_unknown(&self) -> bool {
        matches!(self, TocDate::Unknown)
    }

    pub fn parse_iso(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(UNKNOWN_DATE) {
            return Some(TocDate::Unknown);
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(TocDate::Known)
    }
}

impl fmt::Display for TocDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TocDate::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TocDate::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl Serialize for TocDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TocDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TocDate::parse_iso(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid TOC date: {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub month: u32,
    pub day: u32,
    pub year: i32,
}

pub fn normalize_date(parts: DateParts) -> TocDate {
    let year = if (0..100).contains(&parts.year) {
        2000 + parts.year
    } else {
        parts.year
    };

    NaiveDate::from_ymd_opt(year, parts.month, parts.day)
        .map(TocDate::Known)
        .unwrap_or(TocDate::Unknown)
}

pub fn month_from_name<S: AsRef<str>>(name: &str, months: &[(S, u32)]) -> Option<u32> {
    let key = name
        .trim()
        .trim_end_matches(['.', ','])
        .to_ascii_lowercase();
    months
        .iter()
        .find(|(candidate, _)| candidate.as_ref() == key)
        .map(|(_, month)| *month)
}

#[derive(Debug, Clone, Copy)]
enum DateFormat {
    Slash,
    Iso,
    Dashed,
    MonthName,
}

#[derive(Debug)]
pub struct DateNormalizer {
    formats: Vec<(DateFormat, Regex)>,
}

impl DateNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            formats: vec![
                (
                    DateFormat::Slash,
                    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$")
                        .context("failed to compile slash date regex")?,
                ),
                (
                    DateFormat::Iso,
                    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$")
                        .context("failed to compile ISO date regex")?,
                ),
                (
                    DateFormat::Dashed,
                    Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4}|\d{2})$")
                        .context("failed to compile dashed date regex")?,
                ),
                (
                    DateFormat::MonthName,
                    Regex::new(r"^([A-Za-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})$")
                        .context("failed to compile month-name date regex")?,
                ),
            ],
        })
    }

    pub fn parts(&self, text: &str) -> Option<DateParts> {
        let text = text.trim();
        for (format, regex) in &self.formats {
            let Some(captures) = regex.captures(text) else {
                continue;
            };
            let field = |index: usize| captures.get(index).map(|m| m.as_str()).unwrap_or("");

            let parts = match format {
                DateFormat::Slash | DateFormat::Dashed => DateParts {
                    month: field(1).parse().ok()?,
                    day: field(2).parse().ok()?,
                    year: field(3).parse().ok()?,
                },
                DateFormat::Iso => DateParts {
                    year: field(1).parse().ok()?,
                    month: field(2).parse().ok()?,
                    day: field(3).parse().ok()?,
                },
                DateFormat::MonthName => DateParts {
                    month: month_from_name(field(1), MONTH_NAMES)?,
                    day: field(2).parse().ok()?,
                    year: field(3).parse().ok()?,
                },
            };
            return Some(parts);
        }

        None
    }

    pub fn normalize(&self, text: &str) -> TocDate {
        self.parts(text)
            .map(normalize_date)
            .unwrap_or(TocDate::Unknown)
    }
}
