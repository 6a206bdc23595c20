//! Attribute types for inline chip nodes.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::defaults::INVALID_DATE_LABEL;

/// Color of a tag chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChipColor {
    #[default]
    Blue,
    Green,
    Red,
    Yellow,
    Purple,
}

impl ChipColor {
    /// All colors in palette order.
    pub const ALL: [ChipColor; 5] = [
        ChipColor::Blue,
        ChipColor::Green,
        ChipColor::Red,
        ChipColor::Yellow,
        ChipColor::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
        }
    }
}

impl std::fmt::Display for ChipColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChipColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "purple" => Ok(Self::Purple),
            _ => Err(format!("Invalid chip color: {}", s)),
        }
    }
}

/// Parse the ISO-8601 forms a date chip may carry.
///
/// Accepts a bare date (`2024-03-05`), an RFC 3339 timestamp, or a naive
/// timestamp without offset. Timestamps keep the calendar date they were
/// written with; no timezone conversion is applied.
pub fn parse_chip_date(iso: &str) -> Option<NaiveDate> {
    let iso = iso.trim();
    if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(iso) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(iso, fmt).ok())
        .map(|ts| ts.date())
}

/// Display label for a date chip: `Mar 5, 2024`, or `Invalid Date` when the
/// attribute does not parse. Never panics.
pub fn format_date_label(iso: &str) -> String {
    match parse_chip_date(iso) {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => INVALID_DATE_LABEL.to_string(),
    }
}
