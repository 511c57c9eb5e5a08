// Tracker plugin implementations
pub mod fare;

pub use fare::FareParser;
