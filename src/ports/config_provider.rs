use async_trait::async_trait;
use eyre::Result;

use crate::config::models::PolicyConfig;

/// Trait for sources that supply the policy declaration at startup.
///
/// The declaration is read once; resolvers built from it stay immutable for
/// the lifetime of the process.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load the policy declaration.
    async fn load_config(&self) -> Result<PolicyConfig>;

    /// Human readable origin of the declaration, used in logs and errors.
    fn describe(&self) -> String;
}
