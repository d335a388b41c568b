//! The engram REPL: argument parsing, exit-code policy, and the interactive
//! read-eval loop.
//!
//! The loop is generic over its input reader so tests can drive it with
//! scripted stdin; the binary in `main.rs` wires it to the real stdin, the
//! database, and the LLM endpoints.

use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

use engram_agent::Agent;
use engram_core::Error;

/// Normal termination.
pub const EXIT_OK: i32 = 0;
/// Configuration error (bad environment, bad flags, unusable workspace).
pub const EXIT_CONFIG: i32 = 2;
/// Database unreachable or migration failure.
pub const EXIT_DATABASE: i32 = 3;
/// Interrupted at the prompt.
pub const EXIT_INTERRUPT: i32 = 130;

/// Command-line options.
#[derive(Debug, Parser)]
#[command(
    name = "engram",
    about = "A conversational agent with hierarchical memory",
    version
)]
pub struct Cli {
    /// Agent name (created on first use)
    #[arg(long)]
    pub agent: String,

    /// Chat model identifier (existing agents keep their stored model)
    #[arg(long)]
    pub model: Option<String>,

    /// Workspace directory for this agent's tools
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// FIFO context capacity
    #[arg(long, value_name = "N")]
    pub context: Option<usize>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Map an `Agent::open` failure to the process exit code: an unreachable
/// store is a database error, everything else is configuration.
pub fn startup_exit_code(err: &Error) -> i32 {
    match err {
        Error::Store(_) => EXIT_DATABASE,
        _ => EXIT_CONFIG,
    }
}

/// The interactive read-eval loop. Reads lines from `input`, runs each as a
/// user turn, and prints responses to stdout. Returns the process exit code.
///
/// SIGINT during a turn cancels it and returns to the prompt (the pending
/// subprocess is killed by its own timeout or kill-on-drop); SIGINT at the
/// prompt exits with code 130. SIGTERM exits cleanly from the prompt.
pub async fn repl<R>(agent: &Agent, input: R) -> i32
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    if let Ok(stats) = agent.memory_stats().await {
        println!();
        println!("  engram — agent '{}'", agent.name());
        println!("  model:     {}", agent.record().model_id);
        println!("  workspace: {}", agent.record().workspace_root.display());
        println!(
            "  memory:    {} archival entries, {} conversation rows, FIFO {}/{}",
            stats.archival_entries, stats.log_entries, stats.fifo_len, stats.fifo_capacity
        );
        println!();
        println!("  Type a message and press Enter. 'exit' or Ctrl+C to quit.");
        println!();
    }

    let mut lines = input.lines();

    loop {
        print!("You > ");
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => return EXIT_OK,
                Err(e) => {
                    eprintln!("[error] stdin: {e}");
                    return EXIT_OK;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                return EXIT_INTERRUPT;
            },
            _ = wait_sigterm() => {
                println!();
                return EXIT_OK;
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            return EXIT_OK;
        }

        tokio::select! {
            result = agent.process(line) => match result {
                Ok(response) => {
                    println!();
                    for out in response.lines() {
                        println!("{} > {out}", agent.name());
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("[error] {e}");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                // The pending turn is dropped; any in-flight subprocess is
                // killed by its own timeout or kill-on-drop.
                eprintln!("[interrupted]");
            },
        }
    }
}

/// Resolve when SIGTERM arrives; never on platforms without it.
async fn wait_sigterm() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
            return;
        }
    }
    std::future::pending::<()>().await;
}
