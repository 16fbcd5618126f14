use clap::Parser;

use darebox_worker::cli::{self, Cli};
use darebox_worker::logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match cli::load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    logger::init_logger(&settings.logger)?;

    cli::execute_command(&cli, settings).await?;

    Ok(())
}
