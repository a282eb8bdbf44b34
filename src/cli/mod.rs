//! CLI module - Command-line interface for keyscout
//!
//! Results go to stdout; status lines and diagnostics go to stderr so the
//! payload can be piped.

mod commands;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::services::OutputFormat;

/// Keyscout - keyword research for content planning
/// Uses DataForSEO search volumes when credentials are available
#[derive(Parser)]
#[command(name = "keyscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Research ranked keywords for a topic
    #[command(alias = "r")]
    Research(ResearchArgs),

    /// Store DataForSEO credentials in the local credential file
    Setup,

    /// Manage cached research results
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct ResearchArgs {
    /// Topic to research
    #[arg(required = true)]
    pub topic: Vec<String>,

    /// Number of keywords to return
    #[arg(short = 'n', long, default_value_t = 5)]
    pub limit: usize,

    /// DataForSEO credential as login:password or Base64
    #[arg(long)]
    pub api_key: Option<String>,

    /// Prompt for a credential when none is configured
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Skip the result cache for this run
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Delete expired entries
    Prune,
    /// Delete every entry
    Clear,
}

pub async fn dispatch(cli: Cli, config: &Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Research(args) => commands::cmd_research(config, args).await,
        Commands::Setup => commands::cmd_setup(config),
        Commands::Cache { command } => match command {
            CacheCommands::Prune => commands::cmd_cache_prune(config),
            CacheCommands::Clear => commands::cmd_cache_clear(config),
        },
        Commands::Init => commands::cmd_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_research_defaults() {
        let cli = Cli::try_parse_from(["keyscout", "research", "email", "marketing"]).unwrap();
        let Commands::Research(args) = cli.command else {
            panic!("expected research");
        };
        assert_eq!(args.topic, vec!["email", "marketing"]);
        assert_eq!(args.limit, 5);
        assert_eq!(args.format, OutputFormat::Markdown);
        assert!(args.api_key.is_none());
        assert!(!args.no_cache);
    }

    #[test]
    fn test_research_flags() {
        let cli = Cli::try_parse_from([
            "keyscout", "r", "seo", "-n", "10", "--format", "json", "--api-key", "a:b",
            "--no-cache",
        ])
        .unwrap();
        let Commands::Research(args) = cli.command else {
            panic!("expected research");
        };
        assert_eq!(args.limit, 10);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.api_key.as_deref(), Some("a:b"));
        assert!(args.no_cache);
    }

    #[test]
    fn test_research_requires_topic() {
        assert!(Cli::try_parse_from(["keyscout", "research"]).is_err());
    }
}
