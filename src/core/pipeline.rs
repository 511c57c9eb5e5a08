use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::core::evaluator::{Decision, evaluate};
use crate::core::extractor::FareExtractor;
use crate::models::{DailyLows, FareQuotes, ParsedFare, RawFare, SearchRequest};
use crate::plugins::traits::{DailyLowInfo, FareAlert, NotifierPlugin, TrackerPlugin};
use crate::scraper::{
    BrowserOptions, BrowserSession, SessionGuard, SessionLauncher, save_failure_screenshot,
};
use crate::utils::error::{AppError, ExtractionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Search each outbound day separately and keep a low per day.
    pub per_day: bool,
}

/// What one run observed and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub decision: Decision,
    pub threshold: u64,
    pub fares_found: usize,
    pub fares_rejected: usize,
    pub daily_lows: DailyLows,
    pub alert_sent: bool,
}

/// One end-to-end run: session, extraction, parsing, evaluation and,
/// when the threshold is met, a single notification.
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    launcher: &'a dyn SessionLauncher,
    tracker: &'a dyn TrackerPlugin,
    notifier: &'a dyn NotifierPlugin,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AppConfig,
        launcher: &'a dyn SessionLauncher,
        tracker: &'a dyn TrackerPlugin,
        notifier: &'a dyn NotifierPlugin,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            launcher,
            tracker,
            notifier,
            options,
        }
    }

    pub async fn run(&self) -> Result<RunReport, AppError> {
        let search = &self.config.search;
        info!(
            origin = %search.origin,
            destination = %search.destination,
            dates = %search.date_range(),
            threshold = %self.tracker.format(ParsedFare(search.threshold)),
            per_day = self.options.per_day,
            tracker = self.tracker.name(),
            "Searching for flights"
        );

        let session = self
            .launcher
            .launch(&BrowserOptions::from(&self.config.browser))?;
        let mut guard = SessionGuard::new(session);

        let extracted = self.extract_all(guard.session_mut());
        if let Err(e) = &extracted {
            error!("{}", e);
            self.capture_failure(guard.session_mut(), e);
        }
        if let Err(e) = guard.release() {
            warn!("Failed to close browser session: {}", e);
        }
        let extracted = extracted?;

        let mut quotes = FareQuotes::new();
        let mut fares_rejected = 0;
        for (outbound, raws) in extracted {
            let parsed = self.tracker.parse_batch(&raws);
            fares_rejected += raws.len() - parsed.len();
            quotes.record(outbound, parsed);
        }
        info!(
            parsed = quotes.len(),
            rejected = fares_rejected,
            "Parsed fares"
        );

        let decision = evaluate(&quotes.all(), search.threshold);
        let daily_lows = if self.options.per_day {
            quotes.daily_lows()
        } else {
            DailyLows::new()
        };

        let alert_sent = match decision {
            Decision::NoFares => {
                info!("No flight prices were found or scraped");
                false
            }
            Decision::AboveThreshold(min) => {
                info!(
                    "Minimum price {} is above threshold {}. No alert sent.",
                    self.tracker.format(min),
                    self.tracker.format(ParsedFare(search.threshold))
                );
                false
            }
            Decision::Alert(min) => {
                info!(
                    notifier = self.notifier.plugin_type(),
                    "Low price found: {} (threshold {}). Sending alert via {}.",
                    self.tracker.format(min),
                    self.tracker.format(ParsedFare(search.threshold)),
                    self.notifier.name()
                );
                let alert = self.build_alert(search, min, &daily_lows);
                self.notifier.notify(&alert).await?;
                true
            }
        };

        Ok(RunReport {
            decision,
            threshold: search.threshold,
            fares_found: quotes.len(),
            fares_rejected,
            daily_lows,
            alert_sent,
        })
    }

    fn extract_all(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<Vec<(NaiveDate, Vec<RawFare>)>, ExtractionError> {
        let extractor = FareExtractor::new(&self.config.site, self.config.timeouts);
        let requests = if self.options.per_day {
            self.config.search.per_day()
        } else {
            vec![self.config.search.clone()]
        };

        let mut extracted = Vec::with_capacity(requests.len());
        for request in &requests {
            let raws = extractor.extract(session, request)?;
            info!(outbound = %request.outbound, found = raws.len(), "Collected fare texts");
            extracted.push((request.outbound, raws));
        }

        Ok(extracted)
    }

    fn capture_failure(&self, session: &mut dyn BrowserSession, err: &ExtractionError) {
        let Some(dir) = &self.config.browser.screenshot_dir else {
            return;
        };

        match save_failure_screenshot(session, dir, err.step()) {
            Ok(path) => info!("Screenshot saved to {}", path.display()),
            Err(e) => warn!("Could not save failure screenshot: {:#}", e),
        }
    }

    fn build_alert(
        &self,
        search: &SearchRequest,
        price: ParsedFare,
        daily_lows: &DailyLows,
    ) -> FareAlert {
        let daily_lows = daily_lows
            .iter()
            .filter(|(_, low)| low.amount() <= search.threshold)
            .map(|(date, low)| DailyLowInfo {
                date: *date,
                formatted_price: self.tracker.format(*low),
            })
            .collect();

        FareAlert {
            origin: search.origin.clone(),
            destination: search.destination.clone(),
            outbound: search.outbound,
            return_date: search.return_date,
            price,
            threshold: search.threshold,
            formatted_price: self.tracker.format(price),
            formatted_threshold: self.tracker.format(ParsedFare(search.threshold)),
            link: self.config.site.entry_url_for(search),
            daily_lows,
        }
    }
}
