pub mod loader;
pub mod models;
pub mod template;
pub mod validation;

pub use loader::{load_config, load_validated_config};
pub use models::*;
pub use template::DEFAULT_POLICY_TOML;
pub use validation::{PolicyConfigValidator, ValidationError, ValidationResult};
