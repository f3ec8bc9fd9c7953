// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! txnlite CLI entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        // -v/--verbose flag takes precedence
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Version => {
            println!("{} {}", "txnlite".bold().green(), txnlite::VERSION);
            println!("In-memory transactional table engine (read-committed MVCC)");
            Ok(())
        }

        Commands::Console => cli::handle_console(config),

        Commands::Run {
            script,
            format,
            keep_going,
        } => cli::handle_run(config, script, format, keep_going),
    }
}
