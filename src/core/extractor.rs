use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::{SiteProfile, TimeoutSettings};
use crate::models::{RawFare, SearchRequest};
use crate::scraper::BrowserSession;
use crate::utils::error::{ExtractionError, SessionFault};

/// The fixed steps of one search, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStep {
    Navigate,
    AwaitReady,
    EnterRoute,
    EnterDates,
    Submit,
    AwaitResults,
    CollectFares,
}

impl ExtractionStep {
    pub const ALL: [ExtractionStep; 7] = [
        ExtractionStep::Navigate,
        ExtractionStep::AwaitReady,
        ExtractionStep::EnterRoute,
        ExtractionStep::EnterDates,
        ExtractionStep::Submit,
        ExtractionStep::AwaitResults,
        ExtractionStep::CollectFares,
    ];

    pub fn number(self) -> u8 {
        match self {
            ExtractionStep::Navigate => 1,
            ExtractionStep::AwaitReady => 2,
            ExtractionStep::EnterRoute => 3,
            ExtractionStep::EnterDates => 4,
            ExtractionStep::Submit => 5,
            ExtractionStep::AwaitResults => 6,
            ExtractionStep::CollectFares => 7,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ExtractionStep::Navigate => "navigate",
            ExtractionStep::AwaitReady => "await_ready",
            ExtractionStep::EnterRoute => "enter_route",
            ExtractionStep::EnterDates => "enter_dates",
            ExtractionStep::Submit => "submit",
            ExtractionStep::AwaitResults => "await_results",
            ExtractionStep::CollectFares => "collect_fares",
        }
    }
}

impl fmt::Display for ExtractionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.slug())
    }
}

/// Drives a browser session through the search form of one site.
pub struct FareExtractor<'a> {
    site: &'a SiteProfile,
    timeouts: TimeoutSettings,
}

impl<'a> FareExtractor<'a> {
    pub fn new(site: &'a SiteProfile, timeouts: TimeoutSettings) -> Self {
        Self { site, timeouts }
    }

    /// Runs the search for `request` and returns every fare text listed.
    ///
    /// An empty result page is `Ok(vec![])`; a page that never becomes ready
    /// is an error.
    pub fn extract(
        &self,
        session: &mut dyn BrowserSession,
        request: &SearchRequest,
    ) -> Result<Vec<RawFare>, ExtractionError> {
        let site = self.site;
        let url = site.entry_url_for(request);

        info!(url = %url, "Navigating to flight search page");
        session
            .navigate(&url, self.timeouts.page_ready())
            .map_err(|f| fault(ExtractionStep::Navigate, f))?;

        session
            .wait_for(&site.ready_selector, self.timeouts.page_ready())
            .map_err(|f| match f {
                SessionFault::Timeout(timeout) => ExtractionError::PageNotReady {
                    selector: site.ready_selector.clone(),
                    timeout,
                },
                other => fault(ExtractionStep::AwaitReady, other),
            })?;
        info!("Flight search page loaded");

        session
            .fill(&site.origin_input, &request.origin)
            .map_err(|f| fault(ExtractionStep::EnterRoute, f))?;
        info!(origin = %request.origin, "Entered departure");
        session
            .fill(&site.destination_input, &request.destination)
            .map_err(|f| fault(ExtractionStep::EnterRoute, f))?;
        info!(destination = %request.destination, "Entered arrival");

        self.enter_dates(session, request)?;

        session
            .click_when_ready(&site.submit_button, self.timeouts.submit_ready())
            .map_err(|f| fault(ExtractionStep::Submit, f))?;
        info!("Clicked search button");

        session
            .wait_for(&site.results_selector, self.timeouts.results())
            .map_err(|f| match f {
                SessionFault::Timeout(timeout) => ExtractionError::ResultsNotReady {
                    selector: site.results_selector.clone(),
                    timeout,
                },
                other => fault(ExtractionStep::AwaitResults, other),
            })?;
        info!("Flight results page loaded");

        let texts = session
            .texts_within(&site.results_selector, &site.fare_selector)
            .map_err(|f| fault(ExtractionStep::CollectFares, f))?;

        if texts.is_empty() {
            warn!(
                selector = %site.fare_selector,
                "No price elements found. Check selectors or website structure."
            );
        }

        Ok(texts.into_iter().map(RawFare).collect())
    }

    // Date pickers differ per site; this profile can only type into plain inputs
    fn enter_dates(
        &self,
        session: &mut dyn BrowserSession,
        request: &SearchRequest,
    ) -> Result<(), ExtractionError> {
        let site = self.site;
        let outbound = site.format_date(request.outbound);
        let return_date = site.format_date(request.return_date);

        if site.outbound_date_input.is_none() && site.return_date_input.is_none() {
            warn!(
                dates = %request.date_range(),
                "No date inputs configured for this site; relying on the entry URL or site defaults"
            );
            return Ok(());
        }

        if let Some(selector) = &site.outbound_date_input {
            session
                .fill(selector, &outbound)
                .map_err(|f| fault(ExtractionStep::EnterDates, f))?;
        }
        if let Some(selector) = &site.return_date_input {
            session
                .fill(selector, &return_date)
                .map_err(|f| fault(ExtractionStep::EnterDates, f))?;
        }
        info!(outbound = %outbound, return_date = %return_date, "Entered travel dates");

        Ok(())
    }
}

fn fault(step: ExtractionStep, cause: SessionFault) -> ExtractionError {
    ExtractionError::SessionFault {
        step,
        cause: cause.to_string(),
    }
}
