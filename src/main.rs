use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::Ordering;
use tracing::{error, warn};

use visionmine::{
    cli::{apply_command_overrides, CliApp},
    cli_types::Cli,
    config::MineConfig,
    logging::init_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data_dir) = &cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    apply_command_overrides(&mut config, &cli.command);

    let log_file = config.storage.log_file();
    let _guard = init_logging(&config.logging, cli.verbose, Some(&log_file)).context("Failed to initialize logging")?;

    let colors_enabled = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let mut app = CliApp::new(config, cli.verbose, colors_enabled)?;

    let running = app.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, finishing current batch");
                running.store(false, Ordering::SeqCst);
            }
            Err(e) => error!("Unable to listen for interrupt: {}", e),
        }
    });

    app.run(cli.command).await
}
