use clap::{ArgAction, Parser};
use colored::Colorize;

use crate::{commands::TokenCommand, config::Settings, constants::VERSION, error::Result};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rdsauth",
    about = "Generate short-lived RDS IAM authentication tokens",
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    #[arg(short = 'v', long, help = "Version info")]
    pub version: bool,

    #[arg(long, action = ArgAction::Count, help = "Increase log verbosity (--verbose info, twice debug, three times trace)")]
    pub verbose: u8,

    #[command(flatten)]
    pub token: TokenCommand,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.version {
            println!("{}", format!("rdsauth version: {VERSION}").blue());
            return Ok(());
        }

        let settings = Settings::from_env()?;
        self.token.execute(&settings).await
    }
}
