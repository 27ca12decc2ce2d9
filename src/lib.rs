pub mod cli;
pub mod commands;
pub mod engine;
pub mod persistence;
pub mod playback;
pub mod source;
pub mod state;

use std::process::ExitCode;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, CliCommand};

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Starting Read to Me v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => persistence::settings_path()?,
    };

    match cli.command {
        CliCommand::Read { topic, overrides } => {
            let mut settings = persistence::load_settings(&settings_path);
            overrides.apply(&mut settings);
            let end = commands::tts::read_topic(&settings, &topic.join(" ")).await?;
            tracing::info!("Session ended: {:?}", end);
        }
        CliCommand::Say { text, overrides } => {
            let mut settings = persistence::load_settings(&settings_path);
            overrides.apply(&mut settings);
            let end = commands::tts::speak_text(&settings, &text.join(" ")).await?;
            tracing::info!("Session ended: {:?}", end);
        }
        CliCommand::Settings { action } => {
            commands::settings::handle(&settings_path, &action)?;
        }
    }

    Ok(())
}
