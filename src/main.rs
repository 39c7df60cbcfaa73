use clap::Parser;

use forensight::cli::{self, Cli, Command, ConfigCommand, HistoryCommand};
use forensight::{config, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // These never touch the config file, so a broken one cannot block them.
    match cli.command {
        Command::Version => {
            cli::handle_version();
            return Ok(());
        }
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config()?;
    logging::init_logging(&cfg.logging)?;

    match cli.command {
        Command::Analyze { input, mode, json } => {
            cli::handle_analyze(&cfg, &input, mode, json).await
        }
        Command::History(HistoryCommand::List { json }) => {
            cli::handle_history_list(&cfg, json).await
        }
        Command::History(HistoryCommand::Show { id }) => cli::handle_history_show(&cfg, id).await,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(&cfg),
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            Ok(())
        }
        Command::Version => {
            cli::handle_version();
            Ok(())
        }
    }
}
