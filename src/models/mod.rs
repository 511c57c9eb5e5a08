pub mod fare;
pub mod search;

// Re-exports for convenience
pub use fare::*;
pub use search::*;
