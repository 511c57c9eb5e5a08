use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{DATE_FORMAT, ParsedFare};
use crate::utils::error::NotifyError;

/// Everything an alert message says about the fare that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FareAlert {
    pub origin: String,
    pub destination: String,
    pub outbound: NaiveDate,
    pub return_date: NaiveDate,
    pub price: ParsedFare,
    pub threshold: u64,
    pub formatted_price: String,
    pub formatted_threshold: String,
    pub link: String,
    /// Per-day lows at or below the threshold, when searched day by day.
    pub daily_lows: Vec<DailyLowInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyLowInfo {
    pub date: NaiveDate,
    pub formatted_price: String,
}

impl FareAlert {
    pub fn subject(&self) -> String {
        format!(
            "✈️ Flight Price Alert: {} to {} for {}!",
            self.origin, self.destination, self.formatted_price
        )
    }

    pub fn date_range(&self) -> String {
        format!(
            "{} to {}",
            self.outbound.format(DATE_FORMAT),
            self.return_date.format(DATE_FORMAT)
        )
    }

    pub fn text_body(&self) -> String {
        let mut text = String::new();

        text.push_str("Good news!\n\n");
        text.push_str(&format!(
            "A flight from {} to {} is available for {}, which is at or below your threshold of {}.\n\n",
            self.origin, self.destination, self.formatted_price, self.formatted_threshold
        ));
        text.push_str(&format!("Search dates: {}\n\n", self.date_range()));

        if !self.daily_lows.is_empty() {
            text.push_str("LOW FARES BY DEPARTURE DATE:\n");
            for low in &self.daily_lows {
                text.push_str(&format!(
                    "{}: {}\n",
                    low.date.format(DATE_FORMAT),
                    low.formatted_price
                ));
            }
            text.push('\n');
        }

        text.push_str("Book now (remember to verify this price on the actual website)!\n");
        text.push_str(&self.link);
        text.push('\n');

        text
    }
}

/// Trait for delivering fare alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    /// Delivers one alert; a failure is reported, never retried.
    async fn notify(&self, alert: &FareAlert) -> Result<(), NotifyError>;
}
