use async_trait::async_trait;
use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::{
    config::{models::PolicyConfig, template::DEFAULT_POLICY_TOML},
    ports::config_provider::ConfigProvider,
};

/// Configuration provider backed by a declaration embedded in the binary or
/// supplied by the host application as a string.
pub struct InlineConfigProvider {
    source: String,
    format: FileFormat,
}

impl InlineConfigProvider {
    pub fn new(source: impl Into<String>, format: FileFormat) -> Self {
        Self {
            source: source.into(),
            format,
        }
    }

    /// Provider for the built-in starter policy
    pub fn builtin() -> Self {
        Self::new(DEFAULT_POLICY_TOML, FileFormat::Toml)
    }
}

#[async_trait]
impl ConfigProvider for InlineConfigProvider {
    async fn load_config(&self) -> Result<PolicyConfig> {
        Config::builder()
            .add_source(File::from_str(&self.source, self.format))
            .build()
            .wrap_err("Failed to parse inline policy declaration")?
            .try_deserialize()
            .wrap_err("Failed to deserialize inline policy declaration")
    }

    fn describe(&self) -> String {
        "inline declaration".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builtin_policy_loads() {
        let config = InlineConfigProvider::builtin().load_config().await.unwrap();
        assert_eq!(config.headers.len(), 4);
        assert_eq!(config.redirects.len(), 1);
        assert_eq!(config.images.remote_patterns.len(), 4);
        assert_eq!(config.images.formats, vec!["image/webp", "image/avif"]);
    }

    #[tokio::test]
    async fn test_json_source() {
        let provider = InlineConfigProvider::new(
            r#"{ "images": { "domains": ["cdn.example.com"] } }"#,
            FileFormat::Json,
        );
        let config = provider.load_config().await.unwrap();
        assert_eq!(config.images.domains, vec!["cdn.example.com"]);
        assert!(config.headers.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_source_is_an_error() {
        let provider = InlineConfigProvider::new("[[redirects]\nsource =", FileFormat::Toml);
        assert!(provider.load_config().await.is_err());
    }
}
