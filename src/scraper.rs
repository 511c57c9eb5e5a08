use anyhow::{Context, anyhow};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::util::{Timeout, Wait};
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::BrowserSettings;
use crate::core::extractor::ExtractionStep;
use crate::utils::error::{SessionError, SessionFault};

const INTERACTIVE_CHECK: &str =
    "function() { return !this.disabled && this.offsetParent !== null; }";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub idle_timeout: Duration,
}

impl From<&BrowserSettings> for BrowserOptions {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            chrome_path: settings.chrome_path.clone(),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// The page primitives the fare extractor drives.
///
/// Every wait is bounded by the timeout passed in; a wait that runs out
/// reports [`SessionFault::Timeout`] so callers can tell it apart from a
/// broken session.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionFault>;
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionFault>;
    fn fill(&mut self, selector: &str, text: &str) -> Result<(), SessionFault>;
    fn click_when_ready(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionFault>;
    /// Text of every `item` element inside `container`, in document order.
    fn texts_within(&mut self, container: &str, item: &str) -> Result<Vec<String>, SessionFault>;
    fn screenshot(&mut self) -> Result<Vec<u8>, SessionFault>;
    fn close(&mut self) -> Result<(), SessionFault>;
}

#[cfg_attr(test, mockall::automock)]
pub trait SessionLauncher {
    fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserSession>, SessionError>;
}

/// Owns a session for one run and closes it exactly once.
///
/// `release` closes it on the normal path; `Drop` closes it on any path that
/// never got there.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    pub fn session_mut(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    pub fn release(mut self) -> Result<(), SessionFault> {
        self.close_once()
    }

    fn close_once(&mut self) -> Result<(), SessionFault> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::info!("Closing browser session");
        self.session.close()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close_once() {
            tracing::warn!("Failed to close browser session: {}", e);
        }
    }
}

pub struct ChromeLauncher;

impl SessionLauncher for ChromeLauncher {
    fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserSession>, SessionError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--window-size=1920,1080"),
            ])
            .build()
            .map_err(|e| SessionError::LaunchOptions(e.to_string()))?;

        if let Some(chrome_path) = &options.chrome_path {
            launch_options.path = Some(chrome_path.clone());
        }
        launch_options.idle_browser_timeout = options.idle_timeout;

        tracing::info!(headless = options.headless, "Launching Chrome");
        let browser =
            Browser::new(launch_options).map_err(|e| SessionError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Tab(e.to_string()))?;

        tracing::info!("Browser session ready");
        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), SessionFault> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| classify(e, timeout))
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionFault> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| classify(e, timeout))
    }

    fn fill(&mut self, selector: &str, text: &str) -> Result<(), SessionFault> {
        let element = self.tab.find_element(selector).map_err(driver_fault)?;
        element.click().map_err(driver_fault)?;
        element.type_into(text).map_err(driver_fault)?;
        Ok(())
    }

    fn click_when_ready(&mut self, selector: &str, timeout: Duration) -> Result<(), SessionFault> {
        let started = Instant::now();
        let element = self
            .tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| classify(e, timeout))?;

        let remaining = timeout.saturating_sub(started.elapsed());
        Wait::with_timeout(remaining)
            .until(|| {
                element
                    .call_js_fn(INTERACTIVE_CHECK, vec![], false)
                    .ok()
                    .and_then(|object| object.value)
                    .and_then(|value| value.as_bool())
                    .filter(|ready| *ready)
            })
            .map_err(|_| SessionFault::Timeout(timeout))?;

        element.click().map_err(driver_fault)?;
        Ok(())
    }

    fn texts_within(&mut self, container: &str, item: &str) -> Result<Vec<String>, SessionFault> {
        let html = self.tab.get_content().map_err(driver_fault)?;
        fare_texts_in(&html, container, item)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, SessionFault> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(driver_fault)
    }

    fn close(&mut self) -> Result<(), SessionFault> {
        let closed = self.tab.close(true).map(|_| ()).map_err(driver_fault);
        // Dropping the browser terminates the Chrome process
        drop(self.browser.take());
        closed
    }
}

fn driver_fault(err: anyhow::Error) -> SessionFault {
    SessionFault::Driver(err.to_string())
}

fn classify(err: anyhow::Error, timeout: Duration) -> SessionFault {
    if err.is::<Timeout>() {
        SessionFault::Timeout(timeout)
    } else {
        driver_fault(err)
    }
}

/// Non-empty text of each `item` element nested under `container`.
pub fn fare_texts_in(html: &str, container: &str, item: &str) -> Result<Vec<String>, SessionFault> {
    let query = format!("{} {}", container, item);
    let selector = Selector::parse(&query)
        .map_err(|e| SessionFault::Driver(format!("Invalid CSS selector '{}': {:?}", query, e)))?;

    let document = Html::parse_document(html);
    let texts = document
        .select(&selector)
        .map(|element| element.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    Ok(texts)
}

/// Saves a PNG of the current page into `dir` for diagnosing a failed step.
pub fn save_failure_screenshot(
    session: &mut dyn BrowserSession,
    dir: &Path,
    step: ExtractionStep,
) -> anyhow::Result<PathBuf> {
    let data = session
        .screenshot()
        .map_err(|e| anyhow!("Screenshot capture failed: {}", e))?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!(
        "{}_{}_{}.png",
        step.slug(),
        timestamp,
        uuid::Uuid::new_v4().simple()
    );
    let path = dir.join(filename);

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create screenshot directory {}", dir.display()))?;
    std::fs::write(&path, data)
        .with_context(|| format!("Failed to write screenshot {}", path.display()))?;

    Ok(path)
}
