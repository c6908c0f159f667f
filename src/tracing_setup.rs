use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging with JSON output for Warden
pub fn init_tracing() -> Result<()> {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .wrap_err("Failed to install JSON tracing subscriber")?;

    tracing::info!("Warden structured logging initialized");
    Ok(())
}

/// Initialize console-friendly logging for interactive use
pub fn init_console_tracing() -> Result<()> {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .wrap_err("Failed to install console tracing subscriber")?;

    tracing::debug!("Warden console logging initialized");
    Ok(())
}

/// Initialize tracing with custom configuration
pub fn init_tracing_with_config(level: &str, json_format: bool, include_spans: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_new(level).wrap_err_with(|| format!("Invalid log level: {level}"))?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json_format {
        Registry::default()
            .with(env_filter)
            .with(
                fmt_layer
                    .json()
                    .with_current_span(include_spans)
                    .with_span_list(include_spans),
            )
            .try_init()
            .wrap_err("Failed to install JSON tracing subscriber")?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.compact())
            .try_init()
            .wrap_err("Failed to install console tracing subscriber")?;
    }

    tracing::debug!(
        level,
        json = json_format,
        spans = include_spans,
        "Warden logging initialized with custom configuration"
    );
    Ok(())
}

/// Span covering the compilation of a policy declaration
pub fn create_policy_load_span(origin: &str) -> tracing::Span {
    tracing::info_span!(
        "policy_load",
        policy.origin = origin,
        header_rules = tracing::field::Empty,
        redirect_rules = tracing::field::Empty,
    )
}

/// Span covering the evaluation of one request path
pub fn create_evaluation_span(path: &str) -> tracing::Span {
    tracing::info_span!(
        "evaluate",
        http.path = path,
        decision = tracing::field::Empty,
    )
}

/// Span covering an image source check
pub fn create_image_check_span(source: &str) -> tracing::Span {
    tracing::info_span!(
        "image_check",
        image.source = source,
        decision = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spans are only enabled while a subscriber is listening
    fn span_name(make: impl FnOnce() -> tracing::Span) -> Option<&'static str> {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            make().metadata().map(|m| m.name())
        })
    }

    #[test]
    fn test_init_tracing_with_config() {
        let result = init_tracing_with_config("debug", true, true);
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_invalid_level() {
        assert!(init_tracing_with_config("not[a=level", false, false).is_err());
    }

    #[test]
    fn test_create_evaluation_span() {
        let name = span_name(|| create_evaluation_span("/api/test"));
        assert_eq!(name, Some("evaluate"));
    }

    #[test]
    fn test_create_image_check_span() {
        let name = span_name(|| create_image_check_span("https://cdn.example.com/a.png"));
        assert_eq!(name, Some("image_check"));
    }

    #[test]
    fn test_create_policy_load_span() {
        let name = span_name(|| create_policy_load_span("inline declaration"));
        assert_eq!(name, Some("policy_load"));
    }
}
