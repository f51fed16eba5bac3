//! Query table maintenance commands.

mod clear;
mod error;

pub use error::{Result, TableError};

use dialoguer::Confirm;

use crate::aws;
use crate::prelude::*;
use crate::stack;

/// Query table maintenance commands.
#[derive(Debug, clap::Parser)]
pub struct TableCommand {
    #[command(subcommand)]
    pub action: TableAction,
}

/// Available table actions.
#[derive(Debug, clap::Subcommand)]
pub enum TableAction {
    /// Delete every item in the query table.
    Clear(ClearCommand),
}

/// Delete every item in the query table.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Delete every item in the query table.

The table is resolved from the deployed stack, so the stack must exist
unless --table-name is given. Items are deleted in batches after a
confirmation prompt.

Environment variables:
  AWS_ENDPOINT_URL    - Use a local engine endpoint (e.g., http://localhost:4566)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct ClearCommand {
    /// Stack name to resolve the table from.
    #[arg(long, default_value = "ragstack")]
    pub stack_name: String,

    /// Table name to use instead of resolving it from the stack.
    #[arg(long)]
    pub table_name: Option<String>,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

/// Main entry point for table commands.
pub async fn run(command: TableCommand, global: crate::Global) -> Result<()> {
    match command.action {
        TableAction::Clear(clear_cmd) => run_clear(clear_cmd, &global).await,
    }
}

async fn run_clear(cmd: ClearCommand, global: &crate::Global) -> Result<()> {
    let aws_config = aws::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let table_name = match &cmd.table_name {
        Some(name) => name.clone(),
        None => {
            let cfn_client = aws::create_cloudformation_client(&aws_config).await;
            stack::client::get_physical_resource_id(
                &cfn_client,
                &cmd.stack_name,
                ragstack_core::ids::QUERY_TABLE,
            )
            .await?
            .ok_or_else(|| TableError::TableUnresolved {
                stack_name: cmd.stack_name.clone(),
            })?
        }
    };

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Table:"), table_name);
        aprintln!();
    }

    let dynamo_client = aws::create_dynamodb_client(&aws_config).await;
    let key_attribute = ragstack_core::rag_api_stack_config().table.partition_key.name;

    let keys = clear::collect_keys(&dynamo_client, &table_name, &key_attribute).await?;

    if keys.is_empty() {
        if !global.is_silent() {
            aprintln!("{}", p_g("Table is already empty."));
        }
        return Ok(());
    }

    if global.should_confirm(cmd.force) {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} items from '{}'? ALL DATA WILL BE LOST",
                keys.len(),
                table_name
            ))
            .default(false)
            .interact()
            .map_err(|e| TableError::Prompt(e.to_string()))?;

        if !confirmed {
            return Err(TableError::UserCancelled);
        }
    }

    let deleted = clear::delete_keys(&dynamo_client, &table_name, &key_attribute, &keys).await?;

    if !global.is_silent() {
        aprintln!("{} {} items deleted.", p_g("Success:"), deleted);
    }

    Ok(())
}
