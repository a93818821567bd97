mod config;
mod output;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::warn;

use diffi_core::{PollEvent, Poller, TokioClock};
use diffi_logging::{init_tracing, LogEvent, LogFormat, Logger};

use crate::config::{Overrides, WatchConfig};
use crate::output::{fingerprint, print_changes};

#[derive(Parser, Debug)]
#[command(
    name = "diffi",
    about = "Resolve and watch git changes",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also write tracing output to this file as JSON lines
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Print change lists as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll a repository and print its working tree changes as they change
    Watch {
        /// Repository directory (default: current directory)
        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,

        /// Polling interval in seconds (overrides diffi.toml)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Leave untracked files out
        #[arg(long)]
        no_untracked: bool,

        /// Only report image files
        #[arg(long)]
        images_only: bool,
    },
    /// List changes between two revisions
    Diff {
        from: String,
        to: String,

        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },
    /// List working tree and index status
    Status {
        /// Include untracked files
        #[arg(long)]
        untracked: bool,

        /// Include ignored files
        #[arg(long)]
        ignored: bool,

        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },
    /// Print a file's contents at a revision
    Show {
        rev: String,
        path: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short = 'd', long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let _guard = init_tracing(&cli.log_level, log_format, cli.log_file.as_deref());

    match cli.command {
        Command::Watch {
            dir,
            interval,
            no_untracked,
            images_only,
        } => {
            let overrides = Overrides {
                interval: interval.map(Duration::from_secs),
                no_untracked,
                images_only,
            };
            watch(&working_dir(dir)?, overrides, Logger::new(log_format), cli.json).await
        }
        Command::Diff { from, to, dir } => {
            let dir = working_dir(dir)?;
            let changes = diffi_git::resolve_diff(&dir, &from, &to)
                .with_context(|| format!("Failed to diff {}..{}", from, to))?;
            print_changes(&changes, cli.json)
        }
        Command::Status {
            untracked,
            ignored,
            dir,
        } => {
            let dir = working_dir(dir)?;
            let changes = diffi_git::resolve_status(&dir, untracked, ignored)
                .context("Failed to read repository status")?;
            print_changes(&changes, cli.json)
        }
        Command::Show {
            rev,
            path,
            output,
            dir,
        } => {
            let dir = working_dir(dir)?;
            let bytes = diffi_git::show_file(&dir, &rev, &path)
                .with_context(|| format!("Failed to read {} at {}", path, rev))?;
            match output {
                Some(target) => std::fs::write(&target, &bytes)
                    .with_context(|| format!("Failed to write {}", target.display())),
                None => std::io::stdout()
                    .write_all(&bytes)
                    .context("Failed to write to stdout"),
            }
        }
    }
}

fn working_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Poll `dir` until Ctrl+C, printing the change list whenever it differs
/// from the previous one.
async fn watch(dir: &Path, overrides: Overrides, logger: Logger, json: bool) -> Result<()> {
    let config = WatchConfig::load(dir)?.unwrap_or_default();
    let poll_config = config.poll_config(overrides)?;
    let interval = poll_config.interval;

    let poller = Poller::spawn(
        Arc::new(config.resolver(overrides)),
        Arc::new(TokioClock),
        poll_config,
    );
    let mut events = poller.subscribe();

    // Handle Ctrl+C gracefully
    let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel();
    let handle = poller.handle();
    ctrlc::set_handler(move || {
        handle.stop();
        let _ = interrupt_tx.send(());
    })
    .context("Failed to set Ctrl+C handler")?;

    logger.log(&LogEvent::PollingStarted {
        path: dir.to_path_buf(),
        interval_secs: interval.as_secs_f64(),
    });
    poller.start(dir);

    let mut last = None;
    loop {
        tokio::select! {
            _ = interrupt_rx.recv() => break,
            event = events.recv() => match event {
                Ok(PollEvent::Changes { path, changes }) => {
                    let current = fingerprint(&changes);
                    if last.as_ref() == Some(&current) {
                        continue;
                    }
                    logger.log(&LogEvent::ChangesDetected {
                        path,
                        count: changes.len(),
                    });
                    print_changes(&changes, json)?;
                    last = Some(current);
                }
                Ok(PollEvent::Failed {
                    path,
                    error,
                    consecutive_failures,
                    retry_in,
                    user_visible,
                }) => {
                    logger.log(&LogEvent::ResolutionFailed {
                        path,
                        error: error.to_string(),
                        consecutive_failures,
                        retry_in_secs: retry_in.as_secs_f64(),
                        user_visible,
                    });
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watcher fell behind; some poll events were dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    logger.log(&LogEvent::PollingStopped {
        path: dir.to_path_buf(),
    });
    poller.shutdown().await;
    Ok(())
}
