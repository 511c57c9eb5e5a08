use crate::plugins::traits::{FareAlert, NotifierPlugin};
use crate::utils::error::NotifyError;
use async_trait::async_trait;

/// Writes the alert to the log instead of sending it (`--dry-run`).
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &FareAlert) -> Result<(), NotifyError> {
        tracing::info!(
            subject = %alert.subject(),
            "Dry run, alert not sent:\n{}",
            alert.text_body()
        );
        Ok(())
    }
}
