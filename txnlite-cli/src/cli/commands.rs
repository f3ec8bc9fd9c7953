// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "txnlite", version, about = "txnlite transactional table engine")]
pub struct Cli {
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print version information
    Version,

    /// Interactive console; statements end with ';'
    Console,

    /// Execute a ';'-separated script file ('-' reads stdin)
    Run {
        script: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Continue with the next statement after an error
        #[arg(long)]
        keep_going: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from(["txnlite", "-v", "run", "script.sql", "--format", "csv"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                script,
                format,
                keep_going,
            } => {
                assert_eq!(script, "script.sql");
                assert_eq!(format, OutputFormat::Csv);
                assert!(!keep_going);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from([
            "txnlite",
            "console",
            "--log-level",
            "info",
            "--config",
            "engine.json",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Info));
        assert_eq!(cli.config, Some(PathBuf::from("engine.json")));
    }
}
