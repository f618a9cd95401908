use clap::Parser;
use eyre::Result;
use tracing::debug;

use chatq::cli::config::{load_env, resolve_client_config};
use chatq::cli::{Cli, Commands, ConfigCommands};
use chatq::commands::{
    ClientContext, Command,
    ask::AskCommand,
    chat::ChatCommand,
    config::{ConfigAction, ConfigCommand},
    history::HistoryCommand,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    // Load .env first so clap's env fallbacks see its values
    load_env()?;
    let cli = Cli::parse();

    let log_path = chatq::logging::init_tracing(cli.debug)?;
    debug!(path = %log_path.display(), "Logging to file");

    let config = resolve_client_config(&cli)?;
    let context = ClientContext::new(config.clone(), cli.session_file.clone());

    let command: Box<dyn Command + Send + Sync> = match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => Box::new(ChatCommand { context }),
        Commands::Ask {
            question,
            no_stream,
        } => Box::new(AskCommand {
            context,
            question: question.join(" "),
            stream: !no_stream,
        }),
        Commands::History => Box::new(HistoryCommand { context }),
        Commands::Config { action } => Box::new(ConfigCommand {
            action: match action {
                ConfigCommands::Show => ConfigAction::Show,
                ConfigCommands::Init { force } => ConfigAction::Init { force },
            },
            effective: config,
            path: None,
        }),
    };

    command.execute().await
}
