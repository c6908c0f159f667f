//! Redirect lookup. The first matching rule in declaration order wins.

use serde::Serialize;

use crate::{
    config::RedirectRuleConfig,
    core::{pattern::PathPattern, policy::PolicyError},
};

/// Placeholder in a destination that receives the wildcard capture
pub const CAPTURE_PLACEHOLDER: &str = "$1";

/// A compiled redirect rule
#[derive(Debug, Clone)]
pub struct RedirectRule {
    pattern: PathPattern,
    destination: String,
    permanent: bool,
}

impl RedirectRule {
    /// Compile a redirect declaration.
    ///
    /// Destinations must be site-relative (`/...`) or absolute http(s) URLs, and
    /// may only use the capture placeholder when the source pattern has a wildcard.
    pub fn from_config(config: &RedirectRuleConfig) -> Result<Self, PolicyError> {
        let pattern =
            PathPattern::parse(&config.source).map_err(|source| PolicyError::Pattern {
                rule: format!("redirect rule '{}'", config.source),
                source,
            })?;

        let invalid = |message: &str| PolicyError::InvalidRedirect {
            rule: config.source.clone(),
            message: message.to_string(),
        };

        let destination = config.destination.trim();
        if destination.is_empty() {
            return Err(invalid("destination cannot be empty"));
        }

        if !destination.starts_with('/') {
            let url = url::Url::parse(destination)
                .map_err(|e| invalid(&format!("destination is not a valid URL: {e}")))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(invalid("absolute destinations must use http or https"));
            }
        }

        if destination.contains(CAPTURE_PLACEHOLDER) && !pattern.has_wildcard() {
            return Err(invalid(
                "destination uses '$1' but the source pattern has no '(.*)' wildcard",
            ));
        }

        Ok(Self {
            pattern,
            destination: destination.to_string(),
            permanent: config.permanent,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    fn apply(&self, path: &str) -> Option<Redirect> {
        if !self.pattern.matches(path) {
            return None;
        }

        let destination = match self.pattern.capture(path) {
            Some(captured) if self.destination.contains(CAPTURE_PLACEHOLDER) => {
                self.destination.replace(CAPTURE_PLACEHOLDER, captured)
            }
            _ => self.destination.clone(),
        };

        Some(Redirect {
            destination,
            permanent: self.permanent,
        })
    }
}

/// Outcome of a matched redirect rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

impl Redirect {
    /// Status code to answer with; both preserve the request method
    pub fn status_code(&self) -> u16 {
        if self.permanent { 308 } else { 307 }
    }
}

/// Resolves the redirect, if any, for a request path.
#[derive(Debug, Clone, Default)]
pub struct RedirectResolver {
    rules: Vec<RedirectRule>,
}

impl RedirectResolver {
    pub fn new(rules: Vec<RedirectRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(configs: &[RedirectRuleConfig]) -> Result<Self, PolicyError> {
        let rules = configs
            .iter()
            .map(RedirectRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(rules = rules.len(), "Compiled redirect rules");
        Ok(Self::new(rules))
    }

    pub fn resolve(&self, path: &str) -> Option<Redirect> {
        let redirect = self.rules.iter().find_map(|rule| rule.apply(path));
        if let Some(redirect) = &redirect {
            tracing::trace!(
                path,
                destination = %redirect.destination,
                permanent = redirect.permanent,
                "Redirect rule matched"
            );
        }
        redirect
    }

    pub fn rules(&self) -> &[RedirectRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
