//! `onboard` command line.

mod command;
mod flows;
mod prompt;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use crate::bootstrap::{resolve_config, wire, TracingEventPort};

pub use flows::{run_password_reset, run_registration};
pub use prompt::{Console, Prompt};

#[derive(Parser, Debug)]
#[command(name = "onboard", version, about = "Storefront seller onboarding and password recovery")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Marketplace API base URL, overriding the config file
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Print every snapshot as a JSON line
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a seller account, verify it, and set up a shop
    Register,
    /// Reset a forgotten password via an emailed code
    ResetPassword {
        /// Account email; asked for when omitted
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the resolved configuration
    ShowConfig,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.api_url.as_deref())?;
    let console = Console { json: cli.json };

    if let Commands::ShowConfig = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut app = wire(&config, Arc::new(TracingEventPort::new())).await?;
    let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()));

    let result = match cli.command {
        Commands::Register => run_registration(&app.registration, &mut prompt, console).await,
        Commands::ResetPassword { email } => {
            run_password_reset(&app.password_reset, &mut prompt, console, email).await
        }
        Commands::ShowConfig => Ok(()),
    };
    app.shutdown().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "onboard",
            "reset-password",
            "--email",
            "ada@atelier.test",
            "--api-url",
            "http://localhost:9000/api",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9000/api"));
        match cli.command {
            Commands::ResetPassword { email } => {
                assert_eq!(email.as_deref(), Some("ada@atelier.test"))
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["onboard"]).is_err());
    }
}
