use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fare text exactly as it was scraped from a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFare(pub String);

impl RawFare {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawFare {
    fn from(text: String) -> Self {
        RawFare(text)
    }
}

impl From<&str> for RawFare {
    fn from(text: &str) -> Self {
        RawFare(text.to_string())
    }
}

/// Whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedFare(pub u64);

impl ParsedFare {
    pub fn amount(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParsedFare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parsed fares from one run, grouped by the outbound date searched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FareQuotes {
    by_date: BTreeMap<NaiveDate, Vec<ParsedFare>>,
}

impl FareQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outbound: NaiveDate, fares: Vec<ParsedFare>) {
        self.by_date.entry(outbound).or_default().extend(fares);
    }

    pub fn all(&self) -> Vec<ParsedFare> {
        self.by_date.values().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest fare per searched day; days with no fares are left out.
    pub fn daily_lows(&self) -> DailyLows {
        self.by_date
            .iter()
            .filter_map(|(date, fares)| fares.iter().min().map(|low| (*date, *low)))
            .collect()
    }
}

pub type DailyLows = BTreeMap<NaiveDate, ParsedFare>;
