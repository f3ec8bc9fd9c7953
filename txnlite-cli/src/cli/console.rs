// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for txnlite

use colored::Colorize;
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use txnlite::{Database, EngineConfig, Session};

/// Load the engine configuration, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Handle the console command (interactive REPL)
pub fn handle_console(config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(Arc::new(Database::with_config(config)?));

    println!("{} {}", "txnlite".bold().green(), txnlite::VERSION);
    println!("Type 'help' for commands, 'exit' or 'quit' to exit");
    println!("Multi-line statements supported - use ';' to terminate\n");

    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(config)?;

    let history_path = ".txnlite/.history.txt";
    if let Some(parent) = Path::new(&history_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.load_history(&history_path);

    let mut buffer = String::new();

    loop {
        let prompt = match (buffer.is_empty(), session.in_transaction()) {
            (true, false) => "txnlite> ".to_string(),
            (true, true) => format!("txnlite{}> ", "*".yellow()),
            (false, _) => "     ...> ".to_string(),
        };

        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if !buffer.is_empty() {
                    buffer.clear();
                    println!("{}", "\nStatement buffer cleared".yellow());
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();

        if buffer.is_empty() {
            match trimmed.to_lowercase().as_str() {
                "exit" | "quit" => {
                    println!("{}", "Goodbye!".green());
                    break;
                }
                "help" => {
                    print_help();
                    continue;
                }
                "stats" => {
                    let stats = session.database().statistics();
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    continue;
                }
                "tables" => {
                    for name in session.database().table_names() {
                        println!("{}", name);
                    }
                    continue;
                }
                "gc" => {
                    let stats = session.database().collect_garbage();
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }

        buffer.push_str(&line);
        buffer.push('\n');

        if trimmed.ends_with(';') {
            let statement = buffer.trim().to_string();
            rl.add_history_entry(&statement)?;

            match session.execute(&statement) {
                Ok(result) => print!("{}", ResultFormatter::format(&result, OutputFormat::Table)),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }
            buffer.clear();
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

/// Handle the run command (script execution)
pub fn handle_run(
    config: EngineConfig,
    script: String,
    format: OutputFormat,
    keep_going: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = if script == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(&script)
            .map_err(|e| format!("Cannot read script {}: {}", script, e))?
    };

    let session = Session::new(Arc::new(Database::with_config(config)?));
    let mut failures = 0;

    for statement in txnlite::split_script(&text) {
        log::debug!("Running: {}", statement);
        match session.execute(&statement) {
            Ok(result) => print!("{}", ResultFormatter::format(&result, format)),
            Err(e) => {
                eprintln!("{}", format!("Error: {}", e).red());
                if !keep_going {
                    return Err(e.into());
                }
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} statements failed", failures).into());
    }
    Ok(())
}

fn print_help() {
    println!("{}", "Available commands:".bold().green());
    println!("  {}  - Show this help message", "help".cyan());
    println!("  {}  - Exit the console", "exit/quit".cyan());
    println!("  {}  - List tables", "tables".cyan());
    println!("  {}  - Show transaction statistics", "stats".cyan());
    println!("  {}  - Run garbage collection now", "gc".cyan());
    println!("\n{}", "Statements (terminate with ';'):".bold().green());
    println!("  {}", "CREATE TABLE t (i TINYINT NOT NULL, s VARCHAR(10));".yellow());
    println!("  {}", "BEGIN ISOLATION LEVEL READ COMMITTED;".yellow());
    println!("  {}", "INSERT INTO t VALUES (42, 'x');".yellow());
    println!("  {}", "SELECT COUNT(*) FROM t WHERE i > 1;".yellow());
    println!("  {}", "COMMIT;".yellow());
}
