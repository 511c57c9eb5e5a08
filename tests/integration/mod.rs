// Integration tests for Fare Watcher
// These tests drive the whole run through scripted browser sessions

pub mod config_tests;
pub mod pipeline_tests;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;

use fare_watcher::AppConfig;
use fare_watcher::config::{PASSWORD_VAR, SENDER_VAR, SiteProfile};
use fare_watcher::core::extractor::ExtractionStep;
use fare_watcher::plugins::traits::{FareAlert, NotifierPlugin};
use fare_watcher::scraper::{BrowserOptions, BrowserSession, SessionLauncher};
use fare_watcher::utils::error::{NotifyError, SessionError, SessionFault};

pub const TEST_INI: &str = "\
[FLIGHTS]
START_DATE = 2026-12-10
END_DATE = 2026-12-12
PRICE_THRESHOLD = 2000
DEPARTURE = lhe
ARRIVAL = atl

[SITE]
OUTBOUND_DATE_INPUT = #depart-date
RETURN_DATE_INPUT = #return-date
";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn test_credentials() -> HashMap<String, String> {
    HashMap::from([
        (SENDER_VAR.to_string(), "alerts@example.com".to_string()),
        (PASSWORD_VAR.to_string(), "app-password".to_string()),
    ])
}

pub fn write_ini(contents: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".ini").tempfile()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

/// Test configuration loaded through the real INI loader
pub fn get_test_config() -> anyhow::Result<AppConfig> {
    let file = write_ini(TEST_INI)?;
    Ok(AppConfig::load(file.path(), &test_credentials(), today())?)
}

/// Plays back one results page and counts how often it is closed.
pub struct ScriptedSession {
    site: SiteProfile,
    fares: Vec<String>,
    fail_at: Option<ExtractionStep>,
    closes: Rc<Cell<usize>>,
}

impl ScriptedSession {
    fn fail_if(&self, step: ExtractionStep, timeout: Option<Duration>) -> Result<(), SessionFault> {
        if self.fail_at != Some(step) {
            return Ok(());
        }
        match timeout {
            Some(timeout) => Err(SessionFault::Timeout(timeout)),
            None => Err(SessionFault::Driver(format!("scripted failure at {}", step))),
        }
    }
}

impl BrowserSession for ScriptedSession {
    fn navigate(&mut self, _url: &str, timeout: Duration) -> Result<(), SessionFault> {
        self.fail_if(ExtractionStep::Navigate, Some(timeout))
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionFault> {
        if selector == self.site.ready_selector {
            self.fail_if(ExtractionStep::AwaitReady, Some(timeout))
        } else if selector == self.site.results_selector {
            self.fail_if(ExtractionStep::AwaitResults, Some(timeout))
        } else {
            Ok(())
        }
    }

    fn fill(&mut self, selector: &str, _text: &str) -> Result<(), SessionFault> {
        if selector == self.site.origin_input {
            self.fail_if(ExtractionStep::EnterRoute, None)
        } else if self.site.outbound_date_input.as_deref() == Some(selector) {
            self.fail_if(ExtractionStep::EnterDates, None)
        } else {
            Ok(())
        }
    }

    fn click_when_ready(&mut self, _selector: &str, timeout: Duration) -> Result<(), SessionFault> {
        self.fail_if(ExtractionStep::Submit, Some(timeout))
    }

    fn texts_within(&mut self, _container: &str, _item: &str) -> Result<Vec<String>, SessionFault> {
        self.fail_if(ExtractionStep::CollectFares, None)?;
        Ok(self.fares.clone())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, SessionFault> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn close(&mut self) -> Result<(), SessionFault> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}

/// Hands out scripted sessions, or fails to launch at all.
pub struct ScriptedLauncher {
    pub site: SiteProfile,
    pub fares: Vec<String>,
    pub fail_at: Option<ExtractionStep>,
    pub launch_fails: bool,
    pub launches: Cell<usize>,
    pub closes: Rc<Cell<usize>>,
}

impl ScriptedLauncher {
    pub fn new(config: &AppConfig, fares: &[&str]) -> Self {
        Self {
            site: config.site.clone(),
            fares: fares.iter().map(|f| f.to_string()).collect(),
            fail_at: None,
            launch_fails: false,
            launches: Cell::new(0),
            closes: Rc::new(Cell::new(0)),
        }
    }

    pub fn failing_at(mut self, step: ExtractionStep) -> Self {
        self.fail_at = Some(step);
        self
    }

    pub fn unlaunchable(mut self) -> Self {
        self.launch_fails = true;
        self
    }
}

impl SessionLauncher for ScriptedLauncher {
    fn launch(&self, _options: &BrowserOptions) -> Result<Box<dyn BrowserSession>, SessionError> {
        self.launches.set(self.launches.get() + 1);
        if self.launch_fails {
            return Err(SessionError::Launch("no chrome binary in test".to_string()));
        }
        Ok(Box::new(ScriptedSession {
            site: self.site.clone(),
            fares: self.fares.clone(),
            fail_at: self.fail_at,
            closes: self.closes.clone(),
        }))
    }
}

/// Records every alert instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<FareAlert>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<FareAlert> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &FareAlert) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(alert.clone());
        if self.fail {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}
