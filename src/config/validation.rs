use std::collections::HashSet;

use eyre::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::models::{
        HeaderRuleConfig, ImagesConfig, MonitoringConfig, PlatformFlags, PolicyConfig,
        RedirectRuleConfig,
    },
    core::{
        headers::HeaderRule,
        images::{ImageFormat, RemotePattern},
        pattern::{HostPattern, PathPattern},
        redirects::RedirectRule,
    },
};

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("invalid hostname regex")
});

static SIZE_LIMIT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d+\s*(b|kb|mb|gb)?$").expect("invalid size limit regex"));

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Policy declaration validator.
///
/// Unlike engine compilation, which stops at the first bad rule, validation
/// walks the whole declaration and reports every problem at once.
pub struct PolicyConfigValidator;

impl PolicyConfigValidator {
    /// Validate the entire policy configuration
    pub fn validate(config: &PolicyConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        for (index, rule) in config.headers.iter().enumerate() {
            if let Err(e) = Self::validate_header_rule(index, rule) {
                errors.push(e);
            }
        }

        for (index, rule) in config.redirects.iter().enumerate() {
            if let Err(e) = Self::validate_redirect_rule(index, rule) {
                errors.push(e);
            }
        }

        for message in Self::unreachable_redirects(&config.redirects) {
            tracing::warn!("{message}");
        }

        if let Err(mut image_errors) = Self::validate_images(&config.images) {
            errors.append(&mut image_errors);
        }

        if let Err(mut platform_errors) = Self::validate_platform(&config.platform) {
            errors.append(&mut platform_errors);
        }

        if let Err(e) = Self::validate_monitoring(&config.monitoring) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate a single header rule
    fn validate_header_rule(index: usize, rule: &HeaderRuleConfig) -> ValidationResult<()> {
        if rule.headers.is_empty() {
            tracing::warn!(source = %rule.source, "Header rule declares no headers");
        }

        HeaderRule::from_config(rule)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: format!("headers[{index}]"),
                message: e.to_string(),
            })
    }

    /// Validate a single redirect rule
    fn validate_redirect_rule(index: usize, rule: &RedirectRuleConfig) -> ValidationResult<()> {
        RedirectRule::from_config(rule)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: format!("redirects[{index}]"),
                message: e.to_string(),
            })
    }

    /// Describe redirect rules that can never fire because an earlier rule
    /// already covers every path they match. Overlap is legal; the first
    /// matching rule wins.
    pub fn unreachable_redirects(rules: &[RedirectRuleConfig]) -> Vec<String> {
        let patterns: Vec<(usize, PathPattern)> = rules
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                PathPattern::parse(&rule.source)
                    .ok()
                    .map(|pattern| (index, pattern))
            })
            .collect();

        let mut unreachable = Vec::new();
        for (i, (earlier_index, earlier)) in patterns.iter().enumerate() {
            for (later_index, later) in patterns.iter().skip(i + 1) {
                if Self::shadows(earlier, later) {
                    unreachable.push(format!(
                        "Redirect '{later}' (redirects[{later_index}]) is unreachable; \
                         '{earlier}' (redirects[{earlier_index}]) always matches first"
                    ));
                }
            }
        }
        unreachable
    }

    /// Whether every path matched by `later` is also matched by `earlier`
    fn shadows(earlier: &PathPattern, later: &PathPattern) -> bool {
        match (earlier, later) {
            (PathPattern::CatchAll, _) => true,
            (_, PathPattern::CatchAll) => false,
            (PathPattern::Exact(a), PathPattern::Exact(b)) => a == b,
            (PathPattern::Exact(_), PathPattern::Prefix(_)) => false,
            (PathPattern::Prefix(prefix), PathPattern::Exact(path)) => path.starts_with(prefix.as_str()),
            (PathPattern::Prefix(a), PathPattern::Prefix(b)) => b.starts_with(a.as_str()),
        }
    }

    fn validate_images(config: &ImagesConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for (index, domain) in config.domains.iter().enumerate() {
            let field = format!("images.domains[{index}]");
            if !HOSTNAME_REGEX.is_match(domain) {
                errors.push(ValidationError::InvalidField {
                    field,
                    message: format!("Invalid hostname format: '{domain}'"),
                });
            } else if !seen.insert(domain.to_ascii_lowercase()) {
                errors.push(ValidationError::InvalidField {
                    field,
                    message: format!("Duplicate image domain '{domain}'"),
                });
            }
        }

        for (index, pattern) in config.remote_patterns.iter().enumerate() {
            let field = format!("images.remote_patterns[{index}]");
            match RemotePattern::from_config(pattern) {
                Ok(compiled) => {
                    let (HostPattern::Exact(host) | HostPattern::Subdomains(host)) =
                        &compiled.hostname;
                    if !HOSTNAME_REGEX.is_match(host) {
                        errors.push(ValidationError::InvalidField {
                            field,
                            message: format!("Invalid hostname format: '{}'", pattern.hostname),
                        });
                    }
                }
                Err(e) => errors.push(ValidationError::InvalidField {
                    field,
                    message: e.to_string(),
                }),
            }
        }

        for (index, format) in config.formats.iter().enumerate() {
            if let Err(message) = format.parse::<ImageFormat>() {
                errors.push(ValidationError::InvalidField {
                    field: format!("images.formats[{index}]"),
                    message,
                });
            }
        }

        for (name, sizes) in [
            ("images.device_sizes", &config.device_sizes),
            ("images.image_sizes", &config.image_sizes),
        ] {
            if sizes.contains(&0) {
                errors.push(ValidationError::InvalidField {
                    field: name.to_string(),
                    message: "Image sizes must be greater than 0".to_string(),
                });
            }
        }

        if config.device_sizes.is_empty() && config.image_sizes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "images.device_sizes".to_string(),
            });
        }

        if config.dangerously_allow_svg && config.content_security_policy.is_none() {
            errors.push(ValidationError::InvalidField {
                field: "images.content_security_policy".to_string(),
                message: "A content security policy is required when SVG sources are allowed"
                    .to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_platform(flags: &PlatformFlags) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("platform.response_limit", &flags.response_limit),
            ("platform.body_size_limit", &flags.body_size_limit),
        ] {
            if !SIZE_LIMIT_REGEX.is_match(value.trim()) {
                errors.push(ValidationError::InvalidField {
                    field: field.to_string(),
                    message: format!("Size limit must look like '8mb', '512kb' or '1024', got '{value}'"),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_monitoring(config: &MonitoringConfig) -> ValidationResult<()> {
        if !config.tunnel_route.starts_with('/') {
            return Err(ValidationError::InvalidField {
                field: "monitoring.tunnel_route".to_string(),
                message: "Must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::RemotePatternConfig;

    fn minimal_valid_config() -> PolicyConfig {
        PolicyConfig::builder()
            .headers("/(.*)", [("X-Content-Type-Options", "nosniff")])
            .redirect(RedirectRuleConfig {
                source: "/game".to_string(),
                destination: "/".to_string(),
                permanent: true,
            })
            .build()
            .unwrap()
    }

    fn redirect(source: &str) -> RedirectRuleConfig {
        RedirectRuleConfig {
            source: source.to_string(),
            destination: "/".to_string(),
            permanent: false,
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(PolicyConfigValidator::validate(&minimal_valid_config()).is_ok());
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut config = minimal_valid_config();
        config.headers[0].source = "no-slash".to_string();
        config.images.domains = vec!["bad host".to_string()];
        config.platform.response_limit = "eight megabytes".to_string();

        let err = PolicyConfigValidator::validate(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Found 3 validation errors"), "{message}");
        assert!(message.contains("headers[0]"));
        assert!(message.contains("images.domains[0]"));
        assert!(message.contains("platform.response_limit"));
    }

    #[test]
    fn validate_accepts_shadowed_redirects() {
        let mut config = minimal_valid_config();
        config.redirects = vec![redirect("/old/(.*)"), redirect("/old/page")];
        assert!(PolicyConfigValidator::validate(&config).is_ok());
        assert_eq!(
            PolicyConfigValidator::unreachable_redirects(&config.redirects).len(),
            1
        );

        config.redirects = vec![redirect("/old/special"), redirect("/old/special")];
        assert!(PolicyConfigValidator::validate(&config).is_ok());

        config.redirects = vec![redirect("/old/page"), redirect("/old/(.*)")];
        assert!(PolicyConfigValidator::validate(&config).is_ok());
        assert!(PolicyConfigValidator::unreachable_redirects(&config.redirects).is_empty());
    }

    #[test]
    fn validate_rejects_duplicate_domains() {
        let mut config = minimal_valid_config();
        config.images.domains = vec!["cdn.example.com".to_string(), "CDN.example.com".to_string()];
        assert!(PolicyConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn validate_rejects_unknown_remote_protocol() {
        let mut config = minimal_valid_config();
        config.images.remote_patterns = vec![RemotePatternConfig {
            protocol: "gopher".to_string(),
            hostname: "**.example.com".to_string(),
        }];
        assert!(PolicyConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn validate_requires_csp_for_svg() {
        let mut config = minimal_valid_config();
        config.images.dangerously_allow_svg = true;
        assert!(PolicyConfigValidator::validate(&config).is_err());

        config.images.content_security_policy =
            Some("default-src 'self'; script-src 'none'; sandbox;".to_string());
        assert!(PolicyConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        let mut config = minimal_valid_config();
        config.images.image_sizes.push(0);
        assert!(PolicyConfigValidator::validate(&config).is_err());
    }
}
