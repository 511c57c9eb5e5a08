use regex::Regex;
use std::sync::LazyLock;

use crate::models::{ParsedFare, RawFare};
use crate::plugins::traits::TrackerPlugin;
use crate::utils::error::ParseError;

// Optional currency prefix ("$", "US$", "Rs.", "From INR"), digits with
// comma or non-breaking-space grouping in any layout, optional fraction,
// optional currency suffix ("USD", "€", "*").
static FARE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:\p{L}+\.?|\p{Sc}|\s)*?(?P<number>\d[\d,\x{00A0}\x{202F}]*(?:\.\d+)?)(?:\s|\p{L}|\p{Sc}|\*)*$",
    )
    .expect("fare pattern is a valid regex")
});

const GROUP_SEPARATORS: [char; 3] = [',', '\u{00A0}', '\u{202F}'];

/// Parses displayed fares into whole currency units.
///
/// Fractions are truncated, not rounded: `"$1,234.56"` is `1234`.
pub struct FareParser {
    currency_symbol: String,
}

impl Default for FareParser {
    fn default() -> Self {
        Self::new("$")
    }
}

impl FareParser {
    pub fn new(currency_symbol: &str) -> Self {
        Self {
            currency_symbol: currency_symbol.to_string(),
        }
    }
}

impl TrackerPlugin for FareParser {
    fn name(&self) -> &str {
        "Fare Parser"
    }

    fn plugin_type(&self) -> &str {
        "fare"
    }

    fn parse(&self, raw: &RawFare) -> Result<ParsedFare, ParseError> {
        let unparsable = || ParseError::UnparsableText(raw.as_str().to_string());

        let captures = FARE_PATTERN.captures(raw.as_str()).ok_or_else(unparsable)?;
        let whole = captures["number"]
            .split('.')
            .next()
            .unwrap_or_default();
        let digits: String = whole
            .chars()
            .filter(|c| !GROUP_SEPARATORS.contains(c))
            .collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(unparsable());
        }
        digits.parse::<u64>().map(ParsedFare).map_err(|_| unparsable())
    }

    fn format(&self, fare: ParsedFare) -> String {
        let digits = fare.amount().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        format!("{}{}", self.currency_symbol, grouped)
    }
}
