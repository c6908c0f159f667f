use std::{fmt, str::FromStr};

use thiserror::Error;

/// Trailing token that turns a path declaration into a prefix match.
const WILDCARD: &str = "(.*)";

/// Leading label that turns a hostname declaration into a subdomain match.
const HOST_WILDCARD: &str = "**.";

/// Errors raised while parsing pattern declarations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatternError {
    /// Path pattern does not begin with '/'
    #[error("Path pattern '{0}' must start with '/'")]
    NotAbsolute(String),

    /// Wildcard used somewhere other than the trailing position
    #[error("Path pattern '{0}' may only use '(.*)' once, as its final token")]
    MisplacedWildcard(String),

    /// Regex syntax other than the trailing wildcard
    #[error("Path pattern '{0}' contains unsupported pattern syntax")]
    UnsupportedSyntax(String),

    /// Hostname pattern is empty or malformed
    #[error("Invalid hostname pattern '{pattern}': {reason}")]
    InvalidHost { pattern: String, reason: String },

    /// Protocol other than http / https
    #[error("Unknown protocol '{0}', expected 'http' or 'https'")]
    UnknownProtocol(String),
}

/// Result type for pattern parsing
pub type PatternResult<T> = Result<T, PatternError>;

/// A compiled request path pattern.
///
/// Declarations use the `"/api/(.*)"` notation: a literal prefix optionally
/// followed by a single trailing `(.*)` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPattern {
    /// Matches only the identical path
    Exact(String),
    /// Matches any path starting with the prefix
    Prefix(String),
    /// Matches every path
    CatchAll,
}

impl PathPattern {
    /// Parse a path pattern declaration
    pub fn parse(source: &str) -> PatternResult<Self> {
        if !source.starts_with('/') {
            return Err(PatternError::NotAbsolute(source.to_string()));
        }

        let (literal, wildcard) = match source.strip_suffix(WILDCARD) {
            Some(prefix) => (prefix, true),
            None => (source, false),
        };

        if literal.contains(WILDCARD) {
            return Err(PatternError::MisplacedWildcard(source.to_string()));
        }

        // Only the literal part is left; any remaining regex operator means the
        // declaration expects a matcher we do not provide.
        if literal
            .chars()
            .any(|c| matches!(c, '(' | ')' | '*' | '?' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '+'))
        {
            return Err(PatternError::UnsupportedSyntax(source.to_string()));
        }

        Ok(match (literal, wildcard) {
            ("/", true) => PathPattern::CatchAll,
            (prefix, true) => PathPattern::Prefix(prefix.to_string()),
            (exact, false) => PathPattern::Exact(exact.to_string()),
        })
    }

    /// Check whether a normalized request path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::CatchAll => true,
        }
    }

    /// Return the part of `path` consumed by the wildcard, if the pattern has one and matches
    pub fn capture<'a>(&self, path: &'a str) -> Option<&'a str> {
        match self {
            PathPattern::Exact(_) => None,
            PathPattern::Prefix(prefix) => path.strip_prefix(prefix.as_str()),
            PathPattern::CatchAll => path.strip_prefix('/'),
        }
    }

    /// Whether the pattern carries a wildcard capture
    pub fn has_wildcard(&self) -> bool {
        !matches!(self, PathPattern::Exact(_))
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathPattern::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(exact) => write!(f, "{exact}"),
            PathPattern::Prefix(prefix) => write!(f, "{prefix}{WILDCARD}"),
            PathPattern::CatchAll => write!(f, "/{WILDCARD}"),
        }
    }
}

/// A compiled hostname glob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPattern {
    /// Matches a single hostname
    Exact(String),
    /// Matches one or more labels in front of the suffix (`**.example.com`)
    Subdomains(String),
}

impl HostPattern {
    /// Parse a hostname declaration, normalizing it to lowercase
    pub fn parse(source: &str) -> PatternResult<Self> {
        let invalid = |reason: &str| PatternError::InvalidHost {
            pattern: source.to_string(),
            reason: reason.to_string(),
        };

        let normalized = source.trim().to_ascii_lowercase();
        let (host, wildcard) = match normalized.strip_prefix(HOST_WILDCARD) {
            Some(rest) => (rest, true),
            None => (normalized.as_str(), false),
        };

        if host.is_empty() {
            return Err(invalid("hostname cannot be empty"));
        }
        if host.contains('*') {
            return Err(invalid("only a single leading '**.' wildcard is supported"));
        }
        if host.contains("://") || host.contains('/') {
            return Err(invalid("hostname must not contain a scheme or path"));
        }
        if host.starts_with('.') || host.ends_with('.') || host.contains("..") {
            return Err(invalid("hostname labels cannot be empty"));
        }

        Ok(if wildcard {
            HostPattern::Subdomains(host.to_string())
        } else {
            HostPattern::Exact(host.to_string())
        })
    }

    /// Case-insensitive hostname match
    pub fn matches(&self, hostname: &str) -> bool {
        match self {
            HostPattern::Exact(expected) => hostname.eq_ignore_ascii_case(expected),
            HostPattern::Subdomains(suffix) => {
                // Need at least one label plus the separating dot in front of the suffix.
                if hostname.len() < suffix.len() + 2 {
                    return false;
                }
                let split = hostname.len() - suffix.len();
                let (Some(head), Some(tail)) = (hostname.get(..split), hostname.get(split..))
                else {
                    return false;
                };
                tail.eq_ignore_ascii_case(suffix)
                    && head.ends_with('.')
                    && !head.starts_with('.')
                    && !head.contains("..")
            }
        }
    }
}

impl FromStr for HostPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostPattern::parse(s)
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPattern::Exact(host) => write!(f, "{host}"),
            HostPattern::Subdomains(suffix) => write!(f, "{HOST_WILDCARD}{suffix}"),
        }
    }
}

/// URL scheme permitted for remote image sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Lowercase scheme name
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(':');
        if trimmed.eq_ignore_ascii_case("http") {
            Ok(Protocol::Http)
        } else if trimmed.eq_ignore_ascii_case("https") {
            Ok(Protocol::Https)
        } else {
            Err(PatternError::UnknownProtocol(s.to_string()))
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_patterns() {
        assert_eq!(PathPattern::parse("/(.*)").unwrap(), PathPattern::CatchAll);
        assert_eq!(
            PathPattern::parse("/api/(.*)").unwrap(),
            PathPattern::Prefix("/api/".to_string())
        );
        assert_eq!(
            PathPattern::parse("/.well-known/farcaster.json").unwrap(),
            PathPattern::Exact("/.well-known/farcaster.json".to_string())
        );
    }

    #[test]
    fn test_reject_malformed_path_patterns() {
        assert!(matches!(
            PathPattern::parse("api/(.*)"),
            Err(PatternError::NotAbsolute(_))
        ));
        assert!(matches!(
            PathPattern::parse("/(.*)/tail"),
            Err(PatternError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            PathPattern::parse("/(.*)(.*)"),
            Err(PatternError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            PathPattern::parse("/users/[id]"),
            Err(PatternError::UnsupportedSyntax(_))
        ));
    }

    #[test]
    fn test_path_matching() {
        let exact = PathPattern::parse("/game").unwrap();
        assert!(exact.matches("/game"));
        assert!(!exact.matches("/game/1"));
        assert!(!exact.matches("/gam"));

        let prefix = PathPattern::parse("/static/(.*)").unwrap();
        assert!(prefix.matches("/static/app.js"));
        assert!(prefix.matches("/static/"));
        assert!(!prefix.matches("/static"));
        assert!(!prefix.matches("/api/static/x"));

        let all = PathPattern::parse("/(.*)").unwrap();
        assert!(all.matches("/"));
        assert!(all.matches("/anything/at/all"));
    }

    #[test]
    fn test_capture() {
        let prefix = PathPattern::parse("/docs/(.*)").unwrap();
        assert_eq!(prefix.capture("/docs/intro/setup"), Some("intro/setup"));
        assert_eq!(prefix.capture("/blog"), None);

        let exact = PathPattern::parse("/docs").unwrap();
        assert_eq!(exact.capture("/docs"), None);
    }

    #[test]
    fn test_path_pattern_display_round_trips_declaration() {
        for source in ["/(.*)", "/api/(.*)", "/game"] {
            assert_eq!(PathPattern::parse(source).unwrap().to_string(), source);
        }
    }

    #[test]
    fn test_host_pattern_subdomains() {
        let pattern = HostPattern::parse("**.vercel-storage.com").unwrap();
        assert!(pattern.matches("foo.vercel-storage.com"));
        assert!(pattern.matches("a.b.vercel-storage.com"));
        assert!(pattern.matches("FOO.Vercel-Storage.COM"));
        assert!(!pattern.matches("vercel-storage.com"));
        assert!(!pattern.matches("evilvercel-storage.com"));
        assert!(!pattern.matches(".vercel-storage.com"));
        assert!(!pattern.matches("a..vercel-storage.com"));
    }

    #[test]
    fn test_host_pattern_exact() {
        let pattern = HostPattern::parse("Res.Cloudinary.com").unwrap();
        assert_eq!(pattern, HostPattern::Exact("res.cloudinary.com".to_string()));
        assert!(pattern.matches("res.cloudinary.com"));
        assert!(pattern.matches("RES.CLOUDINARY.COM"));
        assert!(!pattern.matches("x.res.cloudinary.com"));
    }

    #[test]
    fn test_reject_malformed_host_patterns() {
        assert!(HostPattern::parse("").is_err());
        assert!(HostPattern::parse("**.").is_err());
        assert!(HostPattern::parse("*.example.com").is_err());
        assert!(HostPattern::parse("cdn.**.example.com").is_err());
        assert!(HostPattern::parse("https://example.com").is_err());
        assert!(HostPattern::parse("example..com").is_err());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("https".parse::<Protocol>().unwrap(), Protocol::Https);
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!("https:".parse::<Protocol>().unwrap(), Protocol::Https);
        assert!("ftp".parse::<Protocol>().is_err());
    }
}
