use crate::models::{ParsedFare, RawFare};
use crate::utils::error::ParseError;

/// Trait for turning scraped price text into amounts.
pub trait TrackerPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    /// Core functionality
    fn parse(&self, raw: &RawFare) -> Result<ParsedFare, ParseError>;
    fn format(&self, fare: ParsedFare) -> String;

    /// Parses each token on its own; a token that fails is logged and left out.
    fn parse_batch(&self, raws: &[RawFare]) -> Vec<ParsedFare> {
        raws.iter()
            .filter_map(|raw| match self.parse(raw) {
                Ok(fare) => Some(fare),
                Err(e) => {
                    tracing::warn!(tracker = self.plugin_type(), "{}", e);
                    None
                }
            })
            .collect()
    }
}
