//! Warden - a path-pattern policy resolver for web platforms.
//!
//! Warden compiles a static platform declaration (response header rules,
//! redirects and an image source allowlist) into immutable rule tables and
//! answers three questions per request:
//!
//! - which response headers apply to a path (ordered, last-write-wins merge)
//! - whether a path redirects, and where (first match wins)
//! - whether an image source may be fetched and optimized
//!
//! Enforcement (serving, transcoding, bundling) belongs to the embedding runtime;
//! this crate only decides which policy applies.
//!
//! # Quick Example
//! ```no_run
//! use warden::{BuildOptions, Decision, PolicyEngine};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg = warden::config::load_validated_config("policy.toml").await?;
//! let engine = PolicyEngine::from_config(&cfg, BuildOptions::from_process_env())?;
//!
//! match engine.evaluate("/api/users") {
//!     Decision::Redirect(redirect) => println!("{} -> {}", redirect.status_code(), redirect.destination),
//!     Decision::Respond(headers) => println!("{} headers", headers.len()),
//! }
//! assert!(engine.images().is_allowed("https", "foo.vercel-storage.com"));
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Pattern types and resolvers live in `core` and are free of I/O. Declarations are
//! sourced through the `ports::config_provider::ConfigProvider` trait, with file and
//! inline adapters under `adapters`.
//!
//! # Error Handling
//! Compilation errors are typed (`PolicyError`, `PatternError`, `ValidationError`);
//! loading APIs return `eyre::Result<T>` with context attached via `WrapErr`.
//! Resolution never fails: no match means no headers, no redirect, or deny.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{FileConfigProvider, InlineConfigProvider},
    config::PolicyConfig,
    core::{
        BuildOptions, Decision, HeaderPolicyResolver, ImageDecision, ImageSourceValidator,
        PolicyEngine, PolicyError, Redirect, RedirectResolver,
    },
    ports::config_provider::ConfigProvider,
};

/// Load a declaration from `provider`, validate it and compile the engine.
///
/// Fails fast: any parse, validation or compilation error aborts startup.
pub async fn build_engine(
    provider: &dyn ConfigProvider,
    options: BuildOptions,
) -> eyre::Result<PolicyEngine> {
    use eyre::WrapErr;
    use tracing::Instrument;

    let origin = provider.describe();
    let span = tracing_setup::create_policy_load_span(&origin);

    async {
        let policy_config = provider
            .load_config()
            .await
            .wrap_err_with(|| format!("Failed to load policy from {origin}"))?;
        config::PolicyConfigValidator::validate(&policy_config)
            .wrap_err_with(|| format!("Policy from {origin} failed validation"))?;
        let engine = PolicyEngine::from_config(&policy_config, options)
            .wrap_err_with(|| format!("Failed to compile policy from {origin}"))?;

        let current = tracing::Span::current();
        current.record("header_rules", engine.header_resolver().len());
        current.record("redirect_rules", engine.redirect_resolver().len());
        Ok::<_, eyre::Report>(engine)
    }
    .instrument(span)
    .await
}
