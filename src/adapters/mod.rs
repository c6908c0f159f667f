pub mod config_providers;

/// Re-export commonly used types from adapters
pub use config_providers::{FileConfigProvider, InlineConfigProvider};
