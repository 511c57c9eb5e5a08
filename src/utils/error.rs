use std::time::Duration;

use thiserror::Error;

use crate::core::extractor::ExtractionStep;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration field: {0}")]
    MissingField(String),

    #[error("Invalid configuration field {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the field that failed, when the failure is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField(name) => Some(name),
            ConfigError::Invalid { field, .. } => Some(field),
            ConfigError::Source(_) => None,
        }
    }
}

// Keep the first failing field so the report stays deterministic
impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = err.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        match fields.into_iter().next() {
            Some((field, errors)) => {
                let reason = errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                ConfigError::invalid(field.to_uppercase(), reason)
            }
            None => ConfigError::invalid("unknown", err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to build browser launch options: {0}")]
    LaunchOptions(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open browser tab: {0}")]
    Tab(String),
}

/// Fault reported by a single browser primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionFault {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Driver(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Search page not ready: '{selector}' did not appear within {timeout:?}")]
    PageNotReady { selector: String, timeout: Duration },

    #[error("Search results not ready: '{selector}' did not appear within {timeout:?}")]
    ResultsNotReady { selector: String, timeout: Duration },

    #[error("Browser session fault during {step}: {cause}")]
    SessionFault { step: ExtractionStep, cause: String },
}

impl ExtractionError {
    pub fn step(&self) -> ExtractionStep {
        match self {
            ExtractionError::PageNotReady { .. } => ExtractionStep::AwaitReady,
            ExtractionError::ResultsNotReady { .. } => ExtractionStep::AwaitResults,
            ExtractionError::SessionFault { step, .. } => *step,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Could not parse fare from text: '{0}'")]
    UnparsableText(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid email address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build email message: {0}")]
    Message(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit status reported to the invoking scheduler.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Io(_) => 1,
            AppError::Config(_) => 2,
            AppError::Session(_) => 3,
            AppError::Extraction(_) => 4,
            AppError::Notify(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
