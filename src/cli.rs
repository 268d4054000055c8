use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "storebot")]
#[command(author, version, about = "Telegram storefront bot with credit balances and manual deposits", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Apply database migrations and exit
    Migrate,

    /// Print store totals from the database and exit
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
