//! Policy engine.
//!
//! `PolicyEngine` compiles a [`PolicyConfig`] into the three resolvers once at
//! startup and answers per-request questions from those immutable tables:
//! * redirect lookup, which short-circuits everything else
//! * merged response headers for non-redirected paths
//! * image source authorization
//!
//! Nothing here performs I/O or holds mutable state, so an engine behind an
//! `Arc` can be queried from any number of tasks without locking.
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{MonitoringConfig, PlatformFlags, PolicyConfig},
    core::{
        headers::HeaderPolicyResolver,
        images::ImageSourceValidator,
        pattern::PatternError,
        redirects::{Redirect, RedirectResolver},
    },
};

/// Errors raised while compiling a policy declaration.
///
/// Any of these must abort startup; a partially compiled policy is never served.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    #[error("Invalid pattern in {rule}: {source}")]
    Pattern {
        rule: String,
        source: PatternError,
    },

    #[error("Header rule '{rule}' has an invalid header name '{name}'")]
    InvalidHeaderName { rule: String, name: String },

    #[error("Header rule '{rule}' has an invalid value for header '{name}'")]
    InvalidHeaderValue { rule: String, name: String },

    #[error("Redirect rule '{rule}' is invalid: {message}")]
    InvalidRedirect { rule: String, message: String },

    #[error("Invalid image policy: {message}")]
    InvalidImages { message: String },

    #[error("Route '{route}' is reserved: {message}")]
    ReservedRoute { route: String, message: String },
}

/// Named build-time switches that decide how the final policy is assembled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Expose the monitoring tunnel settings
    pub enable_monitoring: bool,
    /// Request bundle analysis output from the bundler
    pub analyze_bundle: bool,
}

impl BuildOptions {
    pub fn new(enable_monitoring: bool, analyze_bundle: bool) -> Self {
        Self {
            enable_monitoring,
            analyze_bundle,
        }
    }

    /// Derive the options from environment-style variables.
    ///
    /// Monitoring requires a production environment and a configured DSN;
    /// bundle analysis is requested with `ANALYZE=true`.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let analyze_bundle = lookup("ANALYZE").as_deref() == Some("true");
        let enable_monitoring = lookup("NODE_ENV").as_deref() == Some("production")
            && lookup("SENTRY_DSN").is_some_and(|dsn| !dsn.trim().is_empty());
        Self::new(enable_monitoring, analyze_bundle)
    }

    /// Read the options from the process environment
    pub fn from_process_env() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }
}

/// Monitoring pass-through settings, present only when monitoring is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoringSettings {
    pub tunnel_route: String,
    pub hide_source_maps: bool,
    pub silent: bool,
}

impl From<&MonitoringConfig> for MonitoringSettings {
    fn from(config: &MonitoringConfig) -> Self {
        Self {
            tunnel_route: config.tunnel_route.clone(),
            hide_source_maps: config.hide_source_maps,
            silent: config.silent,
        }
    }
}

/// What to do with an inbound request path
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Answer with a redirect; no further policy applies
    Redirect(Redirect),
    /// Serve the request, attaching these headers to the response
    Respond(HeaderMap),
}

/// Compiled, immutable policy for the lifetime of the process
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    headers: HeaderPolicyResolver,
    redirects: RedirectResolver,
    images: ImageSourceValidator,
    platform: PlatformFlags,
    monitoring: Option<MonitoringSettings>,
    options: BuildOptions,
}

impl PolicyEngine {
    /// Compile every rule table, failing on the first invalid declaration.
    pub fn from_config(config: &PolicyConfig, options: BuildOptions) -> Result<Self, PolicyError> {
        let headers = HeaderPolicyResolver::from_config(&config.headers)?;
        let redirects = RedirectResolver::from_config(&config.redirects)?;
        let images = ImageSourceValidator::from_config(&config.images)?;

        let monitoring = if options.enable_monitoring {
            let settings = MonitoringSettings::from(&config.monitoring);
            if !settings.tunnel_route.starts_with('/') {
                return Err(PolicyError::ReservedRoute {
                    route: settings.tunnel_route,
                    message: "monitoring tunnel route must start with '/'".to_string(),
                });
            }
            if let Some(redirect) = redirects.resolve(&settings.tunnel_route) {
                return Err(PolicyError::ReservedRoute {
                    route: settings.tunnel_route,
                    message: format!(
                        "monitoring tunnel would be redirected to '{}'",
                        redirect.destination
                    ),
                });
            }
            Some(settings)
        } else {
            None
        };

        tracing::info!(
            header_rules = headers.len(),
            redirect_rules = redirects.len(),
            remote_patterns = images.remote_patterns().len(),
            monitoring = options.enable_monitoring,
            analyze_bundle = options.analyze_bundle,
            "Policy compiled"
        );

        Ok(Self {
            headers,
            redirects,
            images,
            platform: config.platform.clone(),
            monitoring,
            options,
        })
    }

    /// Decide how to answer a request path: redirect first, headers otherwise.
    pub fn evaluate(&self, path: &str) -> Decision {
        match self.redirects.resolve(path) {
            Some(redirect) => Decision::Redirect(redirect),
            None => Decision::Respond(self.headers.resolve(path)),
        }
    }

    pub fn headers(&self, path: &str) -> HeaderMap {
        self.headers.resolve(path)
    }

    pub fn redirect(&self, path: &str) -> Option<Redirect> {
        self.redirects.resolve(path)
    }

    pub fn header_resolver(&self) -> &HeaderPolicyResolver {
        &self.headers
    }

    pub fn redirect_resolver(&self) -> &RedirectResolver {
        &self.redirects
    }

    pub fn images(&self) -> &ImageSourceValidator {
        &self.images
    }

    /// Platform flags, passed through verbatim
    pub fn platform(&self) -> &PlatformFlags {
        &self.platform
    }

    pub fn monitoring(&self) -> Option<&MonitoringSettings> {
        self.monitoring.as_ref()
    }

    pub fn bundle_analysis(&self) -> bool {
        self.options.analyze_bundle
    }

    pub fn build_options(&self) -> BuildOptions {
        self.options
    }
}
