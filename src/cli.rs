use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "taskbot")]
#[command(author, version, about = "Telegram bot for managing tasks in groups and forum topics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (the default when no command is given)
    Run {
        /// Receive updates through a webhook instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Create the database schema and exit
    InitDb {
        /// Drop every table first (all data is lost)
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_default_run() {
        let cli = Cli::try_parse_from(["taskbot"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn run_accepts_webhook_flag() {
        let cli = Cli::try_parse_from(["taskbot", "run", "--webhook"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { webhook: true }));
    }

    #[test]
    fn init_db_force() {
        let cli = Cli::try_parse_from(["taskbot", "init-db", "--force"]).unwrap();
        assert_eq!(cli.command, Some(Commands::InitDb { force: true }));
    }
}
