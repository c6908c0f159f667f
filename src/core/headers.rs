//! Response header policy.
//!
//! Every rule whose pattern matches the request path contributes its headers.
//! Rules are applied in declaration order, so a later rule overrides the value
//! of a header set by an earlier one while leaving its other headers intact.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::{
    config::HeaderRuleConfig,
    core::{pattern::PathPattern, policy::PolicyError},
};

/// A path pattern together with the headers it attaches
#[derive(Debug, Clone)]
pub struct HeaderRule {
    pattern: PathPattern,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderRule {
    pub fn new(pattern: PathPattern, headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self { pattern, headers }
    }

    /// Compile a rule declaration, validating the pattern and every header
    pub fn from_config(config: &HeaderRuleConfig) -> Result<Self, PolicyError> {
        let pattern =
            PathPattern::parse(&config.source).map_err(|source| PolicyError::Pattern {
                rule: format!("header rule '{}'", config.source),
                source,
            })?;

        let mut headers = Vec::with_capacity(config.headers.len());
        for entry in &config.headers {
            let name = HeaderName::from_bytes(entry.key.as_bytes()).map_err(|_| {
                PolicyError::InvalidHeaderName {
                    rule: config.source.clone(),
                    name: entry.key.clone(),
                }
            })?;
            let value = HeaderValue::from_str(&entry.value).map_err(|_| {
                PolicyError::InvalidHeaderValue {
                    rule: config.source.clone(),
                    name: entry.key.clone(),
                }
            })?;
            headers.push((name, value));
        }

        Ok(Self::new(pattern, headers))
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }
}

/// Resolves the merged header set for a request path.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicyResolver {
    rules: Vec<HeaderRule>,
}

impl HeaderPolicyResolver {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// Compile all header rule declarations, failing on the first invalid one
    pub fn from_config(configs: &[HeaderRuleConfig]) -> Result<Self, PolicyError> {
        let rules = configs
            .iter()
            .map(HeaderRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(rules = rules.len(), "Compiled header rules");
        Ok(Self::new(rules))
    }

    /// Merge the headers of every rule matching `path`, last declaration wins.
    pub fn resolve(&self, path: &str) -> HeaderMap {
        let mut merged = HeaderMap::new();
        for rule in self.rules.iter().filter(|rule| rule.pattern.matches(path)) {
            tracing::trace!(path, pattern = %rule.pattern, "Header rule matched");
            for (name, value) in &rule.headers {
                // `insert` replaces every previous value for the name.
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }

    /// Indices of the rules that apply to `path`, in application order
    pub fn matching_rules(&self, path: &str) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.pattern.matches(path))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderEntry;

    fn rule(source: &str, headers: &[(&str, &str)]) -> HeaderRuleConfig {
        HeaderRuleConfig {
            source: source.to_string(),
            headers: headers
                .iter()
                .map(|(key, value)| HeaderEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    fn resolver() -> HeaderPolicyResolver {
        HeaderPolicyResolver::from_config(&[
            rule(
                "/(.*)",
                &[("X-Frame-Options", "DENY"), ("X-Content-Type-Options", "nosniff")],
            ),
            rule("/api/(.*)", &[("Cache-Control", "no-store")]),
            rule("/embed/(.*)", &[("X-Frame-Options", "SAMEORIGIN")]),
            rule("/embed/widget", &[("Cache-Control", "public, max-age=60")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_unmatched_path_gets_catch_all_only() {
        let headers = resolver().resolve("/about");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
    }

    #[test]
    fn test_later_rule_overrides_same_name() {
        let headers = resolver().resolve("/embed/widget");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["cache-control"], "public, max-age=60");
        assert_eq!(headers.get_all("x-frame-options").iter().count(), 1);
    }

    #[test]
    fn test_header_names_merge_case_insensitively() {
        let resolver = HeaderPolicyResolver::from_config(&[
            rule("/(.*)", &[("cache-control", "public")]),
            rule("/(.*)", &[("CACHE-CONTROL", "private")]),
        ])
        .unwrap();
        let headers = resolver.resolve("/x");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Cache-Control"], "private");
    }

    #[test]
    fn test_no_rules_yields_empty_map() {
        let resolver = HeaderPolicyResolver::default();
        assert!(resolver.resolve("/anything").is_empty());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_matching_rules_reports_declaration_order() {
        assert_eq!(resolver().matching_rules("/embed/widget"), vec![0, 2, 3]);
        assert_eq!(resolver().matching_rules("/"), vec![0]);
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let err = HeaderPolicyResolver::from_config(&[rule("/(.*)", &[("Bad Header", "x")])])
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidHeaderName { .. }));
    }

    #[test]
    fn test_rejects_invalid_header_value() {
        let err = HeaderPolicyResolver::from_config(&[rule("/(.*)", &[("X-Test", "a\nb")])])
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidHeaderValue { .. }));
    }

    #[test]
    fn test_rejects_invalid_pattern() {
        let err = HeaderPolicyResolver::from_config(&[rule("api/(.*)", &[])]).unwrap_err();
        assert!(matches!(err, PolicyError::Pattern { .. }));
    }
}
