use chrono::{Days, NaiveDate};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::error::ConfigError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One round-trip search: route, travel dates and the alert ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub outbound: NaiveDate,
    pub return_date: NaiveDate,
    pub threshold: u64,
}

impl SearchRequest {
    pub fn new(
        origin: &str,
        destination: &str,
        outbound: NaiveDate,
        return_date: NaiveDate,
        threshold: u64,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let origin = route_code("DEPARTURE", origin)?;
        let destination = route_code("ARRIVAL", destination)?;

        if origin.eq_ignore_ascii_case(&destination) {
            return Err(ConfigError::invalid(
                "ARRIVAL",
                format!("destination must differ from origin {}", origin),
            ));
        }

        if outbound < today {
            return Err(ConfigError::invalid(
                "START_DATE",
                format!("{} is in the past (today is {})", outbound, today),
            ));
        }

        if return_date < outbound {
            return Err(ConfigError::invalid(
                "END_DATE",
                format!("{} is before the outbound date {}", return_date, outbound),
            ));
        }

        Ok(Self {
            origin,
            destination,
            outbound,
            return_date,
            threshold,
        })
    }

    /// One request per outbound day up to and including the return date.
    pub fn per_day(&self) -> Vec<SearchRequest> {
        let mut requests = Vec::new();
        let mut day = self.outbound;

        while day <= self.return_date {
            requests.push(SearchRequest {
                outbound: day,
                ..self.clone()
            });
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }

        requests
    }

    pub fn date_range(&self) -> String {
        format!(
            "{} to {}",
            self.outbound.format(DATE_FORMAT),
            self.return_date.format(DATE_FORMAT)
        )
    }
}

fn route_code(field: &str, raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(ConfigError::MissingField(field.to_string()));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::invalid(
            field,
            format!("route code '{}' must be alphanumeric", code),
        ));
    }
    Ok(code.to_uppercase())
}

/// Where alerts go and how the sender authenticates.
#[derive(Debug, Clone, Validate)]
pub struct NotificationTarget {
    #[validate(email(message = "not a valid email address"))]
    pub recipient: String,
    #[validate(email(message = "not a valid email address"))]
    pub sender: String,
    pub credential: SecretString,
}
