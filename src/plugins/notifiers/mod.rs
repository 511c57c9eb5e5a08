// Notifier plugin implementations
pub mod email;
pub mod log;

pub use email::EmailNotifier;
pub use log::LogNotifier;
