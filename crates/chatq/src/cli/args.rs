use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask the ChatQ assistant questions from the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Base URL of the chat backend (e.g. 'https://example.com/api/chat')
    #[arg(long, env = "CHATQ_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Tenant the questions are asked for
    #[arg(long, env = "CHATQ_TENANT_ID", global = true)]
    pub tenant: Option<String>,

    /// Email sent along with each question so staff can follow up
    #[arg(long, env = "CHATQ_USER_EMAIL", global = true)]
    pub email: Option<String>,

    /// Path to the session file (defaults to the user data directory)
    #[arg(long, env = "CHATQ_SESSION_FILE", hide = true, global = true)]
    pub session_file: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(long, global = true)]
    pub debug: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Chat interactively, resuming the stored session (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Wait for the whole answer instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },
    /// Print the stored session's conversation
    History,
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Show the effective configuration and where it is read from
    Show,
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
