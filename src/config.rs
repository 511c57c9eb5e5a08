use chrono::NaiveDate;
use config::{Config, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::models::{DATE_FORMAT, NotificationTarget, SearchRequest};
use crate::utils::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "config.ini";
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const SENDER_VAR: &str = "FLIGHT_ALERT_EMAIL";
pub const PASSWORD_VAR: &str = "FLIGHT_ALERT_PASSWORD";
pub const RECIPIENT_VAR: &str = "FLIGHT_ALERT_RECIPIENT";
pub const CHROME_PATH_VAR: &str = "CHROME_PATH";

const OVERRIDE_PREFIX: &str = "FARE_WATCHER__";

const FLIGHTS: &str = "FLIGHTS";
const SITE: &str = "SITE";
const TIMEOUTS: &str = "TIMEOUTS";
const SMTP: &str = "SMTP";
const BROWSER: &str = "BROWSER";

/// Runtime environment lookups (secrets and machine-specific paths).
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    /// `FARE_WATCHER__SECTION__KEY` overrides for the config file.
    /// `None` reads them from the process environment.
    fn overrides(&self) -> Option<HashMap<String, String>> {
        None
    }
}

/// Process environment, optionally seeded from a dotenv file.
#[derive(Debug, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn from_dotenv(path: &Path) -> Self {
        match dotenvy::from_path(path) {
            Ok(()) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {
                tracing::debug!("No env file at {}, using process environment", path.display())
            }
            Err(e) => tracing::warn!("Failed to read env file {}: {}", path.display(), e),
        }
        ProcessEnv
    }
}

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn overrides(&self) -> Option<HashMap<String, String>> {
        let overrides = self
            .iter()
            .filter(|(name, _)| name.starts_with(OVERRIDE_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Some(overrides)
    }
}

/// Site-specific locators for one booking site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct SiteProfile {
    #[validate(url(message = "not a valid URL"))]
    pub entry_url: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub ready_selector: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub origin_input: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub destination_input: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub submit_button: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub results_selector: String,
    #[validate(length(min = 1, message = "selector must not be empty"))]
    pub fare_selector: String,
    pub outbound_date_input: Option<String>,
    pub return_date_input: Option<String>,
    #[validate(length(min = 1, message = "date format must not be empty"))]
    pub date_format: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            entry_url: "https://www.example-flight-booking-website.com".to_string(),
            ready_selector: "#some-search-box-id".to_string(),
            origin_input: "#departure-field-id".to_string(),
            destination_input: "#arrival-field-id".to_string(),
            submit_button: "#search-button-id".to_string(),
            results_selector: ".result-class-name".to_string(),
            fare_selector: ".price-class-name".to_string(),
            outbound_date_input: None,
            return_date_input: None,
            date_format: DATE_FORMAT.to_string(),
        }
    }
}

impl SiteProfile {
    /// Entry URL with `{origin}`, `{destination}`, `{outbound}` and `{return}` filled in.
    pub fn entry_url_for(&self, request: &SearchRequest) -> String {
        self.entry_url
            .replace("{origin}", &request.origin)
            .replace("{destination}", &request.destination)
            .replace("{outbound}", &self.format_date(request.outbound))
            .replace("{return}", &self.format_date(request.return_date))
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(&self.date_format).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Validate)]
pub struct TimeoutSettings {
    #[validate(range(min = 1, max = 600, message = "must be between 1 and 600 seconds"))]
    pub page_ready_secs: u64,
    #[validate(range(min = 1, max = 600, message = "must be between 1 and 600 seconds"))]
    pub submit_ready_secs: u64,
    #[validate(range(min = 1, max = 600, message = "must be between 1 and 600 seconds"))]
    pub results_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            page_ready_secs: 20,
            submit_ready_secs: 10,
            results_secs: 30,
        }
    }
}

impl TimeoutSettings {
    pub fn page_ready(&self) -> Duration {
        Duration::from_secs(self.page_ready_secs)
    }

    pub fn submit_ready(&self) -> Duration {
        Duration::from_secs(self.submit_ready_secs)
    }

    pub fn results(&self) -> Duration {
        Duration::from_secs(self.results_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct SmtpSettings {
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,
    #[validate(range(min = 1, message = "port must be greater than 0"))]
    pub port: u16,
    pub from_name: String,
    #[validate(range(min = 1, max = 300, message = "must be between 1 and 300 seconds"))]
    pub timeout_secs: u64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            from_name: "Fare Watcher".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            screenshot_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub search: SearchRequest,
    pub target: NotificationTarget,
    pub currency_symbol: String,
    pub site: SiteProfile,
    pub timeouts: TimeoutSettings,
    pub smtp: SmtpSettings,
    pub browser: BrowserSettings,
}

impl AppConfig {
    /// Loads the INI file at `path` (with `FARE_WATCHER__SECTION__KEY`
    /// overrides) and the credentials from `env_source`.
    ///
    /// Credentials are checked before the file is read so a run without a
    /// notification path stops before any browser is launched.
    pub fn load(
        path: &Path,
        env_source: &dyn EnvSource,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let target = load_target(env_source)?;

        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
            .add_source(
                Environment::with_prefix("FARE_WATCHER")
                    .prefix_separator("__")
                    .separator("__")
                    .source(env_source.overrides()),
            )
            .build()?;

        let sections = Sections::from_config(settings)?;
        Self::from_sections(&sections, target, env_source, today)
    }

    fn from_sections(
        sections: &Sections,
        target: NotificationTarget,
        env_source: &dyn EnvSource,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let outbound = sections.date(FLIGHTS, "START_DATE")?;
        let return_date = sections.date(FLIGHTS, "END_DATE")?;
        let threshold = sections.require(FLIGHTS, "PRICE_THRESHOLD")?;
        let threshold: u64 = threshold.parse().map_err(|_| {
            ConfigError::invalid(
                "PRICE_THRESHOLD",
                format!("'{}' is not a non-negative integer", threshold),
            )
        })?;
        let origin = sections.require(FLIGHTS, "DEPARTURE")?;
        let destination = sections.require(FLIGHTS, "ARRIVAL")?;

        let search =
            SearchRequest::new(origin, destination, outbound, return_date, threshold, today)?;

        let currency_symbol = sections
            .get(FLIGHTS, "CURRENCY_SYMBOL")
            .unwrap_or("$")
            .to_string();

        let site_defaults = SiteProfile::default();
        let site = SiteProfile {
            entry_url: sections.string_or(SITE, "ENTRY_URL", &site_defaults.entry_url),
            ready_selector: sections.string_or(SITE, "READY_SELECTOR", &site_defaults.ready_selector),
            origin_input: sections.string_or(SITE, "ORIGIN_INPUT", &site_defaults.origin_input),
            destination_input: sections.string_or(
                SITE,
                "DESTINATION_INPUT",
                &site_defaults.destination_input,
            ),
            submit_button: sections.string_or(SITE, "SUBMIT_BUTTON", &site_defaults.submit_button),
            results_selector: sections.string_or(
                SITE,
                "RESULTS_SELECTOR",
                &site_defaults.results_selector,
            ),
            fare_selector: sections.string_or(SITE, "FARE_SELECTOR", &site_defaults.fare_selector),
            outbound_date_input: sections.get(SITE, "OUTBOUND_DATE_INPUT").map(str::to_string),
            return_date_input: sections.get(SITE, "RETURN_DATE_INPUT").map(str::to_string),
            date_format: sections.string_or(SITE, "DATE_FORMAT", &site_defaults.date_format),
        };
        site.validate()?;

        let timeout_defaults = TimeoutSettings::default();
        let timeouts = TimeoutSettings {
            page_ready_secs: sections.parse_or(
                TIMEOUTS,
                "PAGE_READY_SECS",
                timeout_defaults.page_ready_secs,
            )?,
            submit_ready_secs: sections.parse_or(
                TIMEOUTS,
                "SUBMIT_READY_SECS",
                timeout_defaults.submit_ready_secs,
            )?,
            results_secs: sections.parse_or(TIMEOUTS, "RESULTS_SECS", timeout_defaults.results_secs)?,
        };
        timeouts.validate()?;

        let smtp_defaults = SmtpSettings::default();
        let smtp = SmtpSettings {
            host: sections.string_or(SMTP, "HOST", &smtp_defaults.host),
            port: sections.parse_or(SMTP, "PORT", smtp_defaults.port)?,
            from_name: sections.string_or(SMTP, "FROM_NAME", &smtp_defaults.from_name),
            timeout_secs: sections.parse_or(SMTP, "TIMEOUT_SECS", smtp_defaults.timeout_secs)?,
        };
        smtp.validate()?;

        let browser = BrowserSettings {
            headless: sections.parse_or(BROWSER, "HEADLESS", true)?,
            chrome_path: sections
                .get(BROWSER, "CHROME_PATH")
                .map(str::to_string)
                .or_else(|| env_source.var(CHROME_PATH_VAR))
                .map(PathBuf::from),
            screenshot_dir: sections.get(BROWSER, "SCREENSHOT_DIR").map(PathBuf::from),
        };

        Ok(AppConfig {
            search,
            target,
            currency_symbol,
            site,
            timeouts,
            smtp,
            browser,
        })
    }
}

fn load_target(env_source: &dyn EnvSource) -> Result<NotificationTarget, ConfigError> {
    let sender = non_empty(env_source.var(SENDER_VAR))
        .ok_or_else(|| ConfigError::MissingField(SENDER_VAR.to_string()))?;
    let credential = non_empty(env_source.var(PASSWORD_VAR))
        .ok_or_else(|| ConfigError::MissingField(PASSWORD_VAR.to_string()))?;
    let recipient = non_empty(env_source.var(RECIPIENT_VAR)).unwrap_or_else(|| sender.clone());

    let target = NotificationTarget {
        recipient,
        sender,
        credential: SecretString::new(credential),
    };

    if let Err(errors) = target.validate() {
        let field = if errors.field_errors().contains_key("sender") {
            SENDER_VAR
        } else {
            RECIPIENT_VAR
        };
        return Err(ConfigError::invalid(field, "not a valid email address"));
    }

    Ok(target)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Key/value sections with section and key names upper-cased.
#[derive(Debug, Default)]
struct Sections(HashMap<String, HashMap<String, String>>);

impl Sections {
    fn from_config(settings: Config) -> Result<Self, ConfigError> {
        let root: HashMap<String, config::Value> = settings.try_deserialize()?;
        let mut sections = HashMap::new();

        for (name, value) in root {
            let Ok(table) = value.into_table() else {
                tracing::debug!("Ignoring top-level configuration key {}", name);
                continue;
            };

            let mut entries = HashMap::new();
            for (key, value) in table {
                let text = value.into_string()?;
                entries.insert(key.to_uppercase(), text);
            }
            sections.insert(name.to_uppercase(), entries);
        }

        Ok(Sections(sections))
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.0
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        self.get(section, key)
            .ok_or_else(|| ConfigError::MissingField(key.to_string()))
    }

    fn string_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    fn parse_or<T>(&self, section: &str, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(section, key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::invalid(key, format!("'{}': {}", raw, e))),
            None => Ok(default),
        }
    }

    fn date(&self, section: &str, key: &str) -> Result<NaiveDate, ConfigError> {
        let raw = self.require(section, key)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| ConfigError::invalid(key, format!("'{}' is not YYYY-MM-DD: {}", raw, e)))
    }
}
