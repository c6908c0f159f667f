//! Configuration data structures for Warden.
//!
//! These types map directly to TOML (also JSON / YAML) policy declarations. They are
//! serde‑friendly and carry defaults so that minimal declarations remain concise.
//! Rule tables keep declaration order, which is significant for matching.
use serde::{Deserialize, Serialize};

fn default_formats() -> Vec<String> {
    vec!["image/webp".to_string()]
}

fn default_device_sizes() -> Vec<u32> {
    vec![640, 750, 828, 1080, 1200, 1920, 2048, 3840]
}

fn default_image_sizes() -> Vec<u32> {
    vec![16, 32, 48, 64, 96, 128, 256, 384]
}

fn default_size_limit() -> String {
    "8mb".to_string()
}

/// A single response header set by a rule
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

/// Headers attached to every path matching `source`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HeaderRuleConfig {
    /// Path pattern, e.g. "/api/(.*)"
    pub source: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
}

/// Redirect declaration; the first matching one wins
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RedirectRuleConfig {
    pub source: String,
    /// Site-relative path or absolute URL; may use "$1" for the wildcard capture
    pub destination: String,
    pub permanent: bool,
}

/// Protocol-pinned hostname glob for remote image sources
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RemotePatternConfig {
    /// "http" or "https"
    pub protocol: String,
    /// Literal hostname or "**.example.com"
    pub hostname: String,
}

/// Image optimization settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ImagesConfig {
    /// Hostnames allowed on any protocol
    pub domains: Vec<String>,
    pub remote_patterns: Vec<RemotePatternConfig>,
    /// Output formats in preference order ("image/avif", "image/webp")
    pub formats: Vec<String>,
    pub device_sizes: Vec<u32>,
    pub image_sizes: Vec<u32>,
    /// Allow SVG sources to be served as-is
    pub dangerously_allow_svg: bool,
    /// CSP attached to optimized image responses
    pub content_security_policy: Option<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            remote_patterns: Vec::new(),
            formats: default_formats(),
            device_sizes: default_device_sizes(),
            image_sizes: default_image_sizes(),
            dangerously_allow_svg: false,
            content_security_policy: None,
        }
    }
}

/// Platform switches passed through to the serving runtime unchanged
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformFlags {
    pub strict_transport_security: bool,
    /// Maximum API response size, e.g. "8mb"
    pub response_limit: String,
    /// Maximum request body size, e.g. "8mb"
    pub body_size_limit: String,
    pub compress: bool,
    pub powered_by_header: bool,
    pub generate_etags: bool,
}

impl Default for PlatformFlags {
    fn default() -> Self {
        Self {
            strict_transport_security: true,
            response_limit: default_size_limit(),
            body_size_limit: default_size_limit(),
            compress: true,
            powered_by_header: false,
            generate_etags: true,
        }
    }
}

impl PlatformFlags {
    pub fn response_limit_bytes(&self) -> Option<u64> {
        parse_size_limit(&self.response_limit)
    }

    pub fn body_size_limit_bytes(&self) -> Option<u64> {
        parse_size_limit(&self.body_size_limit)
    }
}

/// Parse a human size such as "8mb", "512kb" or "1024" (bytes)
pub fn parse_size_limit(value: &str) -> Option<u64> {
    let value = value.trim().to_ascii_lowercase();
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(digits_end);
    let number: u64 = number.parse().ok()?;
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };
    number.checked_mul(multiplier)
}

/// Monitoring tunnel settings, only surfaced when monitoring is enabled at build time
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitoringConfig {
    pub tunnel_route: String,
    pub hide_source_maps: bool,
    pub silent: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            tunnel_route: "/monitoring".to_string(),
            hide_source_maps: true,
            silent: true,
        }
    }
}

/// Complete policy declaration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub headers: Vec<HeaderRuleConfig>,
    #[serde(default)]
    pub redirects: Vec<RedirectRuleConfig>,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub platform: PlatformFlags,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl PolicyConfig {
    /// Create a new policy configuration builder
    pub fn builder() -> PolicyConfigBuilder {
        PolicyConfigBuilder::default()
    }
}

/// Builder for PolicyConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct PolicyConfigBuilder {
    headers: Vec<HeaderRuleConfig>,
    redirects: Vec<RedirectRuleConfig>,
    images: Option<ImagesConfig>,
    platform: Option<PlatformFlags>,
    monitoring: Option<MonitoringConfig>,
}

impl PolicyConfigBuilder {
    /// Append a header rule; later rules override earlier ones
    pub fn header_rule(mut self, rule: HeaderRuleConfig) -> Self {
        self.headers.push(rule);
        self
    }

    /// Append headers for a path pattern
    pub fn headers<I, K, V>(mut self, source: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.push(HeaderRuleConfig {
            source: source.into(),
            headers: headers
                .into_iter()
                .map(|(key, value)| HeaderEntry {
                    key: key.into(),
                    value: value.into(),
                })
                .collect(),
        });
        self
    }

    /// Append a redirect rule; earlier rules take precedence
    pub fn redirect(mut self, rule: RedirectRuleConfig) -> Self {
        self.redirects.push(rule);
        self
    }

    /// Set image configuration
    pub fn images(mut self, config: ImagesConfig) -> Self {
        self.images = Some(config);
        self
    }

    /// Set platform flags
    pub fn platform(mut self, flags: PlatformFlags) -> Self {
        self.platform = Some(flags);
        self
    }

    /// Set monitoring configuration
    pub fn monitoring(mut self, config: MonitoringConfig) -> Self {
        self.monitoring = Some(config);
        self
    }

    /// Build the final PolicyConfig
    pub fn build(self) -> Result<PolicyConfig, String> {
        let images = self.images.unwrap_or_default();

        if self.headers.is_empty()
            && self.redirects.is_empty()
            && images.domains.is_empty()
            && images.remote_patterns.is_empty()
        {
            return Err("At least one header rule, redirect or image source must be declared".to_string());
        }

        Ok(PolicyConfig {
            headers: self.headers,
            redirects: self.redirects,
            images,
            platform: self.platform.unwrap_or_default(),
            monitoring: self.monitoring.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_limit() {
        assert_eq!(parse_size_limit("8mb"), Some(8 * 1024 * 1024));
        assert_eq!(parse_size_limit("512KB"), Some(512 * 1024));
        assert_eq!(parse_size_limit("100"), Some(100));
        assert_eq!(parse_size_limit("mb"), None);
        assert_eq!(parse_size_limit("8 parsecs"), None);
    }

    #[test]
    fn test_builder_requires_some_policy() {
        assert!(PolicyConfig::builder().build().is_err());

        let config = PolicyConfig::builder()
            .headers("/(.*)", [("X-Frame-Options", "DENY")])
            .build()
            .unwrap();
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.platform, PlatformFlags::default());
        assert_eq!(config.monitoring.tunnel_route, "/monitoring");
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: PolicyConfig = serde_json::from_str(
            r#"{ "redirects": [{ "source": "/game", "destination": "/", "permanent": true }] }"#,
        )
        .unwrap();
        assert_eq!(config.redirects.len(), 1);
        assert!(config.headers.is_empty());
        assert_eq!(config.images.formats, vec!["image/webp"]);
        assert_eq!(config.platform.response_limit_bytes(), Some(8 * 1024 * 1024));
        assert!(!config.platform.powered_by_header);
    }
}
