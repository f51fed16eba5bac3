//! Command line for provisioning the RAG query API stack.
//!
//! `stack` commands synthesize the deployment template and hand it to
//! CloudFormation; `table` commands operate on the deployed query table.
//! Every mutating command shows a plan and asks for confirmation first;
//! `--force` and `--silent` skip the prompt.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aws;
mod prelude;
mod stack;
mod table;

/// Provision and maintain the RAG query API infrastructure
#[derive(Debug, Parser)]
#[command(name = "ragstack")]
#[command(about = "Provision and maintain the RAG query API infrastructure", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output and auto-confirm prompts
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// True when a mutating command should stop for confirmation.
    /// Both `--force` and `--silent` skip the prompt.
    pub fn should_confirm(&self, force: bool) -> bool {
        !force && !self.silent
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Manage the deployment stack
    Stack(stack::StackCommand),

    /// Operate on the deployed query table
    Table(table::TableCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let default_filter = if cli.global.is_verbose() {
        "ragstack=debug,aws_config=warn"
    } else {
        "ragstack=info,aws_config=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Stack(stack_cmd) => {
            stack::run(stack_cmd, cli.global).await?;
        }
        Commands::Table(table_cmd) => {
            table::run(table_cmd, cli.global).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_and_silent_both_skip_confirmation() {
        let interactive = Global {
            silent: false,
            verbose: false,
        };
        assert!(interactive.should_confirm(false));
        assert!(!interactive.should_confirm(true));

        let silent = Global {
            silent: true,
            verbose: false,
        };
        assert!(!silent.should_confirm(false));
        assert!(!silent.should_confirm(true));
    }
}
