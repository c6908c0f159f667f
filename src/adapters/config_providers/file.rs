use std::path::PathBuf;

use async_trait::async_trait;
use eyre::Result;

use crate::{
    config::{loader::load_config, models::PolicyConfig},
    ports::config_provider::ConfigProvider,
};

/// Configuration provider that loads the policy declaration from a local file.
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(eyre::eyre!("Invalid config path: {}", path.display()));
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<PolicyConfig> {
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Invalid path"))?;
        load_config(path_str).await
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_file_config_provider() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("policy.toml");

        let policy = r#"
            [[redirects]]
            source = "/game"
            destination = "/"
            permanent = true

            [images]
            domains = ["api.dicebear.com"]
        "#;
        {
            let mut file = File::create(&file_path)?;
            file.write_all(policy.as_bytes())?;
        }

        let provider = FileConfigProvider::new(&file_path)?;
        let config = provider.load_config().await?;
        assert_eq!(config.redirects[0].source, "/game");
        assert_eq!(config.images.domains, vec!["api.dicebear.com"]);
        assert!(provider.describe().contains("policy.toml"));

        Ok(())
    }

    #[test]
    fn test_rejects_directory_like_path() {
        assert!(FileConfigProvider::new("/").is_err());
    }
}
