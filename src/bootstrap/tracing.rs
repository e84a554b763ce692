//! Tracing subscriber setup for the `onboard` binary.
//!
//! Logs go to stderr so stdout stays free for the interactive prompts and
//! `--json` snapshots.

use std::io;

use tracing_subscriber::{fmt, prelude::*, registry};

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Default filter directives, used when `RUST_LOG` is not set.
fn build_filter_directives(is_dev: bool, verbose: bool) -> Vec<String> {
    let base = if verbose { "debug" } else { "info" };
    let ours = if is_dev || verbose { "debug" } else { "info" };
    vec![
        base.to_string(),
        "hyper_util=warn".to_string(),
        "reqwest=info".to_string(),
        format!("sf_app={ours}"),
        format!("sf_infra={ours}"),
        format!("storefront_onboarding={ours}"),
    ]
}

/// Registers the global subscriber. Call once, before anything logs.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing_subscriber(verbose: bool) -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development(), verbose);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_level(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(io::stderr);

    registry().with(env_filter).with(stderr_layer).try_init()?;
    Ok(())
}
