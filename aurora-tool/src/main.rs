mod config;
mod error;
mod logging;
mod output;
mod session;

#[cfg(feature = "chat")]
mod chat;

use std::path::PathBuf;

use anyhow::bail;
use aurora_core::{IgnoreReason, SubmitOutcome};
use clap::{Parser, Subcommand};

use crate::config::load_config;
use crate::logging::LogTarget;
use crate::session::{build_formatter, build_session};

#[derive(Parser)]
#[command(name = "aurora")]
#[command(about = "Emotion-support chat with inline GIFs and music", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[cfg(feature = "chat")]
    /// Start an interactive chat session
    Chat {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Send one message and print the formatted reply
    Ask {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Attach a file (not sent to the model)
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,

        /// Print blocks as JSON
        #[arg(long)]
        json: bool,

        /// Message text
        text: String,
    },

    /// Format text into content blocks without calling the chat model
    Format {
        /// Treat the text as an assistant reply (enables music embeds)
        #[arg(long)]
        assistant: bool,

        /// Print blocks as JSON
        #[arg(long)]
        json: bool,

        /// Message text
        text: String,
    },
}

impl Command {
    fn log_target(&self, explicit: Option<PathBuf>) -> LogTarget {
        if let Some(path) = explicit {
            return LogTarget::File(path);
        }
        match self {
            #[cfg(feature = "chat")]
            Command::Chat { .. } => LogTarget::File(logging::default_log_file()),
            _ => LogTarget::Stderr,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.command.log_target(cli.log_file), cli.verbose)?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        #[cfg(feature = "chat")]
        Command::Chat { model } => {
            let session = build_session(&config, model)?;
            chat::run(session).await?;
        }
        Command::Ask {
            model,
            attachments,
            json,
            text,
        } => {
            let session = build_session(&config, model)?;
            match session.controller.submit(&text, &attachments).await {
                SubmitOutcome::Replied(reply) => {
                    let blocks = session.formatter.format_message(&reply).await;
                    output::print_blocks(&blocks, json)?;
                }
                SubmitOutcome::Ignored(IgnoreReason::EmptyInput) => bail!("nothing to send"),
                SubmitOutcome::Ignored(IgnoreReason::Busy) => bail!("a reply is already pending"),
            }
        }
        Command::Format {
            assistant,
            json,
            text,
        } => {
            let formatter = build_formatter(&config);
            let blocks = formatter.format(&text, assistant).await;
            output::print_blocks(&blocks, json)?;
        }
    }

    Ok(())
}
