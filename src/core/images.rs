//! Image source authorization.
//!
//! A remote image may only be fetched and optimized when its hostname is on the
//! exact-domain allowlist or matches one of the protocol-pinned remote patterns.
//! Vector sources are additionally refused unless explicitly enabled, since an
//! SVG served from the optimizer origin could carry script.

use std::{collections::HashSet, fmt, str::FromStr};

use serde::Serialize;

use crate::{
    config::{ImagesConfig, RemotePatternConfig},
    core::{
        pattern::{HostPattern, PatternError, Protocol},
        policy::PolicyError,
    },
};

/// A protocol + hostname glob pair authorizing remote sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePattern {
    pub protocol: Protocol,
    pub hostname: HostPattern,
}

impl RemotePattern {
    pub fn new(protocol: Protocol, hostname: HostPattern) -> Self {
        Self { protocol, hostname }
    }

    pub fn from_config(config: &RemotePatternConfig) -> Result<Self, PatternError> {
        Ok(Self::new(
            config.protocol.parse()?,
            HostPattern::parse(&config.hostname)?,
        ))
    }

    fn matches(&self, protocol: Protocol, hostname: &str) -> bool {
        self.protocol == protocol && self.hostname.matches(hostname)
    }
}

/// Output formats the optimizer may negotiate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Avif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "image/avif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/avif" => Ok(ImageFormat::Avif),
            "image/webp" => Ok(ImageFormat::Webp),
            other => Err(format!(
                "unsupported image format '{other}', expected 'image/avif' or 'image/webp'"
            )),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Verdict for a complete image URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDecision {
    Allowed,
    /// Host is neither an allowed domain nor covered by a remote pattern
    DeniedHost,
    /// Vector source while raw SVG rendering is disabled
    DeniedSvg,
    /// Not a parseable http(s) URL or site-relative path
    Invalid,
}

impl ImageDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ImageDecision::Allowed)
    }
}

/// Immutable allowlist consulted before any remote image is fetched
#[derive(Debug, Clone, Default)]
pub struct ImageSourceValidator {
    exact_domains: HashSet<String>,
    remote_patterns: Vec<RemotePattern>,
    dangerously_allow_svg: bool,
    formats: Vec<ImageFormat>,
    device_sizes: Vec<u32>,
    image_sizes: Vec<u32>,
    content_security_policy: Option<String>,
}

impl ImageSourceValidator {
    pub fn new(exact_domains: impl IntoIterator<Item = String>, remote_patterns: Vec<RemotePattern>) -> Self {
        Self {
            exact_domains: exact_domains
                .into_iter()
                .map(|domain| domain.trim().to_ascii_lowercase())
                .collect(),
            remote_patterns,
            ..Self::default()
        }
    }

    /// Compile the image section of a policy declaration
    pub fn from_config(config: &ImagesConfig) -> Result<Self, PolicyError> {
        let remote_patterns = config
            .remote_patterns
            .iter()
            .map(|pattern| {
                RemotePattern::from_config(pattern).map_err(|source| PolicyError::Pattern {
                    rule: format!("remote image pattern '{}'", pattern.hostname),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for domain in &config.domains {
            if let HostPattern::Subdomains(_) =
                HostPattern::parse(domain).map_err(|source| PolicyError::Pattern {
                    rule: format!("image domain '{domain}'"),
                    source,
                })?
            {
                return Err(PolicyError::InvalidImages {
                    message: format!(
                        "image domain '{domain}' uses a wildcard; declare it as a remote pattern"
                    ),
                });
            }
        }

        let formats = config
            .formats
            .iter()
            .map(|format| {
                format
                    .parse::<ImageFormat>()
                    .map_err(|message| PolicyError::InvalidImages { message })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut validator = Self::new(config.domains.iter().cloned(), remote_patterns);
        validator.dangerously_allow_svg = config.dangerously_allow_svg;
        validator.formats = formats;
        validator.device_sizes = config.device_sizes.clone();
        validator.image_sizes = config.image_sizes.clone();
        validator.content_security_policy = config.content_security_policy.clone();

        tracing::debug!(
            domains = validator.exact_domains.len(),
            remote_patterns = validator.remote_patterns.len(),
            allow_svg = validator.dangerously_allow_svg,
            "Compiled image source policy"
        );
        Ok(validator)
    }

    /// Whether a source at `protocol://hostname` may be fetched.
    ///
    /// Exact domains are accepted on either protocol; remote patterns pin one.
    /// Anything other than `http` or `https` is denied.
    pub fn is_allowed(&self, protocol: &str, hostname: &str) -> bool {
        let hostname = hostname.trim_end_matches('.');
        let Ok(protocol) = protocol.parse::<Protocol>() else {
            tracing::debug!(protocol, hostname, "Image source denied: unknown protocol");
            return false;
        };

        if self.exact_domains.contains(&hostname.to_ascii_lowercase()) {
            return true;
        }

        let allowed = self
            .remote_patterns
            .iter()
            .any(|pattern| pattern.matches(protocol, hostname));
        if !allowed {
            tracing::debug!(%protocol, hostname, "Image source denied: no matching domain or pattern");
        }
        allowed
    }

    /// Check a full image reference, including the vector-source rule.
    ///
    /// Site-relative paths are local assets and skip the host check. A leading
    /// `//` or `/\` is protocol-relative and is never treated as local.
    pub fn check_url(&self, source: &str) -> ImageDecision {
        if source.starts_with("/\\") {
            return ImageDecision::Invalid;
        }
        let path = if source.starts_with('/') && !source.starts_with("//") {
            source.to_string()
        } else {
            let Ok(url) = url::Url::parse(source) else {
                return ImageDecision::Invalid;
            };
            let Some(host) = url.host_str() else {
                return ImageDecision::Invalid;
            };
            if !self.is_allowed(url.scheme(), host) {
                return ImageDecision::DeniedHost;
            }
            url.path().to_string()
        };

        if !self.dangerously_allow_svg && Self::is_vector(&path) {
            tracing::debug!(source, "Image source denied: SVG rendering disabled");
            return ImageDecision::DeniedSvg;
        }

        ImageDecision::Allowed
    }

    fn is_vector(path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        path.to_ascii_lowercase().ends_with(".svg")
    }

    /// Whether the optimizer may produce an image of this width
    pub fn is_allowed_width(&self, width: u32) -> bool {
        self.device_sizes.contains(&width) || self.image_sizes.contains(&width)
    }

    /// First configured output format admitted by an `Accept` header
    pub fn preferred_format(&self, accept: &str) -> Option<ImageFormat> {
        let accepted: Vec<&str> = accept
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';').map(str::trim);
                let media = parts.next()?;
                let refused = parts.any(|param| {
                    param
                        .strip_prefix("q=")
                        .and_then(|q| q.parse::<f32>().ok())
                        .is_some_and(|q| q <= 0.0)
                });
                (!refused).then_some(media)
            })
            .collect();

        self.formats.iter().copied().find(|format| {
            accepted
                .iter()
                .any(|media| media.eq_ignore_ascii_case(format.mime_type()))
        })
    }

    pub fn allows_svg(&self) -> bool {
        self.dangerously_allow_svg
    }

    pub fn content_security_policy(&self) -> Option<&str> {
        self.content_security_policy.as_deref()
    }

    pub fn remote_patterns(&self) -> &[RemotePattern] {
        &self.remote_patterns
    }
}
