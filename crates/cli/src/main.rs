//! Wardens CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config with a one-agent roster
//! - `status`: Show the configured roster
//! - `doctor`: Diagnose config problems
//! - `config`: Validate, print, or locate the config file
//! - `bundles`: Print decision bundles in evaluation order

use clap::{Parser, Subcommand};
use wardens_core::Persona;

mod commands;

#[derive(Parser)]
#[command(
    name = "wardens",
    about = "Wardens — persona-driven autonomous agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Onboard,

    /// Show the configured roster
    Status,

    /// Diagnose configuration health
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print decision bundles with their chances
    Bundles {
        /// Only show the bundle for this persona
        #[arg(short, long)]
        persona: Option<Persona>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the config file
    Validate,
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
        Commands::Bundles { persona, json } => commands::bundles::run(persona, json).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bundles_with_persona() {
        let cli = Cli::try_parse_from(["wardens", "bundles", "--persona", "farmer"]).unwrap();
        match cli.command {
            Commands::Bundles { persona, json } => {
                assert_eq!(persona, Some(Persona::Farmer));
                assert!(!json);
            }
            _ => panic!("expected bundles"),
        }
    }

    #[test]
    fn rejects_unknown_persona() {
        assert!(Cli::try_parse_from(["wardens", "bundles", "--persona", "pirate"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["wardens", "config", "show", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
