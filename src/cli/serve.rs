//! CLI entry-point for serving the scored tables.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::{instrument, warn};

use crate::{api, config::Settings, risk::output};

/// Run the Axum server over `OUTPUTS_DIR`.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Port to bind (default 8080).
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Host address, defaults to localhost.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    if !settings.join_output(output::SUMMARY_FILE).exists() {
        warn!("no scored run found; endpoints will return empty tables until `score` runs");
    }
    api::serve(settings, args.host, args.port).await
}
