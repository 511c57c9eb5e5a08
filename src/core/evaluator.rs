use serde::Serialize;

use crate::models::ParsedFare;

/// Outcome of comparing a run's lowest fare against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "min_price", rename_all = "snake_case")]
pub enum Decision {
    NoFares,
    AboveThreshold(ParsedFare),
    Alert(ParsedFare),
}

impl Decision {
    pub fn min_price(&self) -> Option<ParsedFare> {
        match self {
            Decision::NoFares => None,
            Decision::AboveThreshold(price) | Decision::Alert(price) => Some(*price),
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Decision::Alert(_))
    }
}

/// The threshold is inclusive: a minimum equal to it alerts.
pub fn evaluate(fares: &[ParsedFare], threshold: u64) -> Decision {
    match fares.iter().min() {
        None => Decision::NoFares,
        Some(&min) if min.amount() <= threshold => Decision::Alert(min),
        Some(&min) => Decision::AboveThreshold(min),
    }
}
