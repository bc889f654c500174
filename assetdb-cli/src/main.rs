// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

use std::process::ExitCode;

use assetdb_cli::commands::{self, Cli};
use assetdb_cli::config::Config;
use assetdb_cli::error::CliError;
use assetdb_cli::logging;
use clap::Parser;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("assetdb: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logger(&config.log_level);

    let mut stdout = std::io::stdout().lock();
    match commands::run(&cli.command, &config, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::io("Failed to determine working directory", e))?;
    let mut config = Config::discover(cli.config.as_deref(), &cwd)?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}
