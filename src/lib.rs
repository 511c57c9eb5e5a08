pub mod cli;
pub mod config;
pub mod core;
pub mod models;
pub mod plugins;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use crate::core::pipeline::{Pipeline, RunOptions, RunReport};
pub use crate::utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
