use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use warden::{
    BuildOptions, Decision, FileConfigProvider, ImageDecision, InlineConfigProvider,
    PolicyEngine,
    config::{DEFAULT_POLICY_TOML, PolicyConfigValidator, loader::load_config},
    ports::config_provider::ConfigProvider,
    tracing_setup,
};

/// Config value that selects the declaration compiled into the binary
const BUILTIN_CONFIG: &str = "builtin";

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Commands,

    /// Log filter directive (e.g. "info", "warden=debug")
    #[clap(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    json_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate a policy declaration
    Validate {
        /// Policy file to validate
        #[clap(short, long, default_value = "policy.toml")]
        config: String,
    },
    /// Write the starter policy declaration
    Init {
        /// Output path for the new policy file
        #[clap(short, long, default_value = "policy.toml")]
        config: String,
    },
    /// Show the redirect or response headers for a request path
    Resolve {
        /// Policy file, or "builtin" for the starter policy
        #[clap(short, long, default_value = "policy.toml")]
        config: String,
        /// Request path, e.g. /api/users
        path: String,
        /// Print the decision as JSON
        #[clap(long)]
        json: bool,
    },
    /// Check whether an image source may be optimized
    CheckImage {
        /// Policy file, or "builtin" for the starter policy
        #[clap(short, long, default_value = "policy.toml")]
        config: String,
        /// Image URL or site-relative path
        url: String,
        /// Accept header used to pick an output format
        #[clap(long)]
        accept: Option<String>,
        /// Requested width in pixels
        #[clap(long)]
        width: Option<u32>,
        /// Print the decision as JSON
        #[clap(long)]
        json: bool,
    },
}

fn create_config_provider(config_path: &str) -> Result<Arc<dyn ConfigProvider>> {
    if config_path == BUILTIN_CONFIG {
        Ok(Arc::new(InlineConfigProvider::builtin()))
    } else {
        Ok(Arc::new(FileConfigProvider::new(config_path)?))
    }
}

async fn load_engine(config_path: &str) -> Result<PolicyEngine> {
    let provider = create_config_provider(config_path).context("Failed to create config provider")?;
    let options = BuildOptions::from_process_env();
    warden::build_engine(provider.as_ref(), options).await
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    tracing_setup::init_tracing_with_config(&args.log_level, args.json_logs, args.json_logs)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    match args.command {
        Commands::Validate { config } => validate_config_command(&config).await,
        Commands::Init { config } => init_config_command(&config).await,
        Commands::Resolve { config, path, json } => resolve_command(&config, &path, json).await,
        Commands::CheckImage {
            config,
            url,
            accept,
            width,
            json,
        } => check_image_command(&config, &url, accept.as_deref(), width, json).await,
    }
}

/// Validate a policy declaration and compile it
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating policy file: {config_path}");

    if config_path != BUILTIN_CONFIG && !Path::new(config_path).exists() {
        eprintln!("❌ Error: Policy file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = if config_path == BUILTIN_CONFIG {
        InlineConfigProvider::builtin().load_config().await
    } else {
        load_config(config_path).await
    };
    let config = match config {
        Ok(config) => {
            println!("✅ Policy parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Policy parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = PolicyConfigValidator::validate(&config) {
        eprintln!("❌ Policy validation failed:");
        eprintln!("{e}");
        println!();
        println!("💡 Common fixes:");
        println!("   • Path patterns must start with '/' and may only end in '(.*)'");
        println!("   • Remote image protocols must be 'http' or 'https'");
        println!("   • Hostname wildcards are only allowed as a leading '**.'");
        println!("   • Later redirects covered by an earlier pattern never fire");
        std::process::exit(1);
    }
    println!("✅ Policy validation: OK");

    let options = BuildOptions::from_process_env();
    match PolicyEngine::from_config(&config, options) {
        Ok(engine) => {
            println!("✅ Policy compilation: OK");
            println!();
            println!("📋 Policy Summary:");
            println!("   • Header rules: {}", engine.header_resolver().len());
            println!("   • Redirect rules: {}", engine.redirect_resolver().len());
            println!("   • Image domains: {}", config.images.domains.len());
            println!(
                "   • Remote image patterns: {}",
                engine.images().remote_patterns().len()
            );
            println!("   • SVG sources allowed: {}", engine.images().allows_svg());
            println!("   • Monitoring: {}", engine.monitoring().is_some());
            println!("   • Bundle analysis: {}", engine.bundle_analysis());
            println!();
            println!("🎉 Policy is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Policy compilation failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    }
}

/// Write the starter policy declaration
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Policy file '{config_path}' already exists");
        std::process::exit(1);
    }

    tokio::fs::write(path, DEFAULT_POLICY_TOML)
        .await
        .context("Failed to write policy file")?;
    println!("✅ Created starter policy at: {config_path}");
    println!("   Run 'warden validate --config {config_path}' to check it");
    Ok(())
}

async fn resolve_command(config_path: &str, path: &str, json: bool) -> Result<()> {
    if !path.starts_with('/') {
        return Err(eyre!("Request path must start with '/', got '{path}'"));
    }

    let engine = load_engine(config_path).await?;
    let span = tracing_setup::create_evaluation_span(path);
    let _guard = span.enter();

    match engine.evaluate(path) {
        Decision::Redirect(redirect) => {
            span.record("decision", "redirect");
            if json {
                let body = serde_json::json!({
                    "path": path,
                    "redirect": {
                        "destination": redirect.destination,
                        "permanent": redirect.permanent,
                        "status": redirect.status_code(),
                    },
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!(
                    "↪️  {path} → {} ({})",
                    redirect.destination,
                    redirect.status_code()
                );
            }
        }
        Decision::Respond(headers) => {
            span.record("decision", "respond");
            let rules = engine.header_resolver().matching_rules(path);
            if json {
                let headers: serde_json::Map<String, serde_json::Value> = headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            serde_json::Value::String(
                                String::from_utf8_lossy(value.as_bytes()).into_owned(),
                            ),
                        )
                    })
                    .collect();
                let body = serde_json::json!({
                    "path": path,
                    "matched_rules": rules,
                    "headers": headers,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("📄 {path} (matched rules: {rules:?})");
                for (name, value) in headers.iter() {
                    println!("   {}: {}", name, String::from_utf8_lossy(value.as_bytes()));
                }
            }
        }
    }
    Ok(())
}

async fn check_image_command(
    config_path: &str,
    url: &str,
    accept: Option<&str>,
    width: Option<u32>,
    json: bool,
) -> Result<()> {
    let engine = load_engine(config_path).await?;
    let span = tracing_setup::create_image_check_span(url);
    let _guard = span.enter();

    let images = engine.images();
    let decision = images.check_url(url);
    let width_allowed = width.map(|w| images.is_allowed_width(w));
    let format = accept.and_then(|accept| images.preferred_format(accept));
    span.record("decision", tracing::field::debug(decision));

    if json {
        let body = serde_json::json!({
            "source": url,
            "decision": decision,
            "width_allowed": width_allowed,
            "format": format.map(|f| f.mime_type()),
            "content_security_policy": images.content_security_policy(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let verdict = match decision {
            ImageDecision::Allowed => "✅ allowed".to_string(),
            ImageDecision::DeniedHost => "❌ denied: host is not allowlisted".to_string(),
            ImageDecision::DeniedSvg => "❌ denied: SVG sources are disabled".to_string(),
            ImageDecision::Invalid => "❌ denied: not a valid image URL".to_string(),
        };
        println!("{url}: {verdict}");
        if let Some(allowed) = width_allowed {
            println!("   • width allowed: {allowed}");
        }
        if let Some(format) = format {
            println!("   • output format: {format}");
        }
    }

    if !decision.is_allowed() || width_allowed == Some(false) {
        std::process::exit(2);
    }
    Ok(())
}
