//! CLI entry point for the ring builder.

use std::process::ExitCode;

use clap::Parser;
use cli::CliConfig;
use tracing_subscriber::EnvFilter;

const EXIT_ERROR: u8 = 2;

fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let config = CliConfig::parse();
    setup_tracing(&config.log_level);

    match config.run() {
        Ok(output) => {
            let rendered = output.to_string();
            if !rendered.is_empty() {
                println!("{}", rendered.trim_end());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
