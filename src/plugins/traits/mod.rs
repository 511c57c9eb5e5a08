pub mod notifier;
pub mod tracker;

pub use notifier::{DailyLowInfo, FareAlert, NotifierPlugin};
pub use tracker::TrackerPlugin;
