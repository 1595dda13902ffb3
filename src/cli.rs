use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{
    CommandContext, CompletionsCommand, FetchCommand, OutputFormat, SecretsCommand, StoreCommand,
    SyncCommand,
};
use crate::config::Settings;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "monies",
    version,
    about = "Fetch SimpleFIN account data, with the access credential kept in AWS Secrets Manager",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        env = "AWS_PROFILE",
        default_value = "default",
        help = "AWS profile used for the SSO login"
    )]
    pub profile: String,

    #[arg(long, global = true, help = "AWS region for Secrets Manager calls")]
    pub region: Option<String>,

    #[arg(long, global = true, help = "Name of the secret in AWS Secrets Manager")]
    pub secret_name: Option<String>,

    #[arg(long, global = true, help = "Read the access credential from AWS Secrets Manager")]
    pub use_secrets: bool,

    #[arg(long, global = true, help = "Base64-encoded setup token from SimpleFIN")]
    pub setup_token: Option<String>,

    #[arg(
        short = 'o',
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Output format"
    )]
    pub output: OutputFormat,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Fetch account information from SimpleFIN")]
    Fetch(FetchCommand),
    #[command(about = "Fetch accounts and record their balances in the local database")]
    Sync(SyncCommand),
    #[command(about = "Claim a setup token and store the access credential in AWS Secrets Manager")]
    Store(StoreCommand),
    #[command(about = "Manage secrets in AWS Secrets Manager")]
    Secrets(SecretsCommand),
    #[command(about = "Generate shell completion scripts for monies")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let Self {
            profile,
            region,
            secret_name,
            use_secrets,
            setup_token,
            output,
            command,
            ..
        } = self;

        if let Commands::Completions(cmd) = command {
            cmd.execute();
            return Ok(());
        }

        let ctx = CommandContext {
            settings: Settings::new(profile, region, secret_name)?,
            use_secrets,
            setup_token,
            output,
        };

        match command {
            Commands::Fetch(cmd) => cmd.execute(&ctx).await,
            Commands::Sync(cmd) => cmd.execute(&ctx).await,
            Commands::Store(cmd) => cmd.execute(&ctx).await,
            Commands::Secrets(cmd) => cmd.execute(&ctx).await,
            Commands::Completions(_) => Ok(()),
        }
    }
}
