use crate::config::SmtpSettings;
use crate::models::{DATE_FORMAT, NotificationTarget};
use crate::plugins::traits::{FareAlert, NotifierPlugin};
use crate::utils::error::NotifyError;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Sends alerts through an authenticated SMTP relay using STARTTLS.
pub struct EmailNotifier {
    target: NotificationTarget,
    smtp: SmtpSettings,
}

impl EmailNotifier {
    pub fn new(target: NotificationTarget, smtp: SmtpSettings) -> Self {
        EmailNotifier { target, smtp }
    }

    fn format_html_body(&self, alert: &FareAlert) -> String {
        let mut html = String::new();

        html.push_str(&format!(r#"
<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .header {{ background: #f0f0f0; padding: 15px; border-radius: 5px; }}
        .route {{ font-size: 18px; font-weight: bold; }}
        .price-drop {{ margin: 15px 0; padding: 10px; border-radius: 5px; background: #e8f5e8; border-left: 4px solid #4CAF50; }}
        .days {{ margin: 15px 0; }}
        .day {{ margin: 5px 0; padding: 10px; background: #f9f9f9; border-radius: 3px; }}
        .button {{ display: inline-block; padding: 8px 15px; margin: 5px; text-decoration: none; border-radius: 3px; background: #007cba; color: white; }}
    </style>
</head>
<body>
    <div class="header">
        <div class="route">{} &rarr; {}</div>
        <div>{}</div>
    </div>
"#, alert.origin, alert.destination, alert.date_range()));

        html.push_str(&format!(r#"
    <div class="price-drop">
        <strong>Lowest fare:</strong> {}<br>
        <strong>Your threshold:</strong> {}
    </div>
"#, alert.formatted_price, alert.formatted_threshold));

        if !alert.daily_lows.is_empty() {
            html.push_str(r#"<div class="days"><h3>Low fares by departure date</h3>"#);
            for low in &alert.daily_lows {
                html.push_str(&format!(
                    r#"<div class="day"><strong>{}</strong>: {}</div>"#,
                    low.date.format(DATE_FORMAT),
                    low.formatted_price
                ));
            }
            html.push_str("</div>");
        }

        html.push_str(&format!(r#"
    <p>Remember to verify this price on the actual website before booking.</p>
    <a href="{}" class="button">Search Flights</a>
</body>
</html>
"#, alert.link));

        html
    }

    fn build_message(&self, alert: &FareAlert) -> Result<Message, NotifyError> {
        let from = Mailbox::new(Some(self.smtp.from_name.clone()), parse_address(&self.target.sender)?);
        let to = Mailbox::new(None, parse_address(&self.target.recipient)?);

        Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(alert.text_body()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(self.format_html_body(alert)),
                    ),
            )
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        let credentials = Credentials::new(
            self.target.sender.clone(),
            self.target.credential.expose_secret().clone(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(self.smtp.port)
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(self.smtp.timeout_secs)))
            .build();

        Ok(mailer)
    }
}

fn parse_address(address: &str) -> Result<Address, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    async fn notify(&self, alert: &FareAlert) -> Result<(), NotifyError> {
        let email = self.build_message(alert)?;
        let mailer = self.transport()?;

        tracing::info!(
            recipient = %self.target.recipient,
            host = %self.smtp.host,
            "Sending email alert"
        );
        mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::info!("Email alert sent successfully");
        Ok(())
    }
}
