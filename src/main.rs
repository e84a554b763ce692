use clap::Parser;

use storefront_onboarding::bootstrap::tracing::init_tracing_subscriber;
use storefront_onboarding::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_subscriber(cli.verbose)?;
    run(cli).await
}
