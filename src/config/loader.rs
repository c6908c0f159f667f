use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::{models::PolicyConfig, validation::PolicyConfigValidator};

/// Load a policy declaration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<PolicyConfig> {
    load_config_sync(config_path)
}

/// Load a policy declaration synchronously
pub fn load_config_sync(config_path: &str) -> Result<PolicyConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml, // Default to TOML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let policy_config: PolicyConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize policy from {}",
            config_path.display()
        )
    })?;

    tracing::debug!(
        path = %config_path.display(),
        header_rules = policy_config.headers.len(),
        redirect_rules = policy_config.redirects.len(),
        "Loaded policy declaration"
    );

    Ok(policy_config)
}

/// Load a policy declaration and reject it unless it passes validation
pub async fn load_validated_config(config_path: &str) -> Result<PolicyConfig> {
    let policy_config = load_config(config_path).await?;
    PolicyConfigValidator::validate(&policy_config)
        .with_context(|| format!("Policy declaration {config_path} is invalid"))?;
    Ok(policy_config)
}
