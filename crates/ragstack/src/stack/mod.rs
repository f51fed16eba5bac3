//! Stack infrastructure management commands.

pub(crate) mod client;
mod deploy;
mod error;
mod planning;

pub use error::{Result, StackError};

use std::path::PathBuf;

use dialoguer::Confirm;

use crate::aws;
use crate::prelude::*;

/// Stack infrastructure management commands.
#[derive(Debug, clap::Parser)]
pub struct StackCommand {
    #[command(subcommand)]
    pub action: StackAction,
}

/// Available stack actions.
#[derive(Debug, clap::Subcommand)]
pub enum StackAction {
    /// Render the stack template.
    Synth(SynthCommand),

    /// Deploy or update the stack.
    Deploy(DeployCommand),

    /// Destroy the stack.
    Destroy(DestroyCommand),

    /// Show the deployed stack outputs.
    Outputs(OutputsCommand),
}

/// Render the stack template.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Render the stack template as engine-ready JSON.

The template is synthesized from the built-in stack definition and
printed to stdout, or written to a file with --output. No AWS calls
are made.")]
pub struct SynthCommand {
    /// Write the template to a file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Deploy or update the stack.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Create or update the RAG query API stack.

The command synthesizes the template, diffs it against the deployed
stack, shows a plan of changes, and asks for confirmation before
applying. A stack that previously failed to create is deleted and
created again.

The container image is passed with --image-uri on the first deploy.
Later deploys may omit it to keep the image already running.

Environment variables:
  AWS_ENDPOINT_URL    - Use a local engine endpoint (e.g., http://localhost:4566)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DeployCommand {
    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    /// ECR image URI for the API handler container.
    #[arg(long, value_name = "URI")]
    pub image_uri: Option<String>,

    /// Stack name to use.
    #[arg(long, default_value = "ragstack")]
    pub stack_name: String,
}

/// Destroy the stack.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Delete the RAG query API stack.

All stack resources are deleted, including the query table and the
data it holds. The command shows what will be deleted and asks for
confirmation.

Environment variables:
  AWS_ENDPOINT_URL    - Use a local engine endpoint (e.g., http://localhost:4566)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DestroyCommand {
    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    /// Stack name to use.
    #[arg(long, default_value = "ragstack")]
    pub stack_name: String,
}

/// Show the deployed stack outputs.
#[derive(Debug, clap::Parser)]
pub struct OutputsCommand {
    /// Stack name to use.
    #[arg(long, default_value = "ragstack")]
    pub stack_name: String,
}

/// Main entry point for stack commands.
pub async fn run(command: StackCommand, global: crate::Global) -> Result<()> {
    match command.action {
        StackAction::Synth(synth_cmd) => run_synth(synth_cmd, &global),
        StackAction::Deploy(deploy_cmd) => run_deploy(deploy_cmd, &global).await,
        StackAction::Destroy(destroy_cmd) => run_destroy(destroy_cmd, &global).await,
        StackAction::Outputs(outputs_cmd) => run_outputs(outputs_cmd, &global).await,
    }
}

fn run_synth(cmd: SynthCommand, global: &crate::Global) -> Result<()> {
    let template = ragstack_core::synthesize(&ragstack_core::rag_api_stack_config())?;
    let body = template.to_json()?;

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, &body)?;
            if !global.is_silent() {
                aprintln!("{} Template written to {}.", p_g("Success:"), path.display());
            }
        }
        None => {
            // Plain print so the template can be piped.
            print!("{}", body);
        }
    }

    Ok(())
}

async fn run_deploy(cmd: DeployCommand, global: &crate::Global) -> Result<()> {
    let aws_config = aws::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let template = ragstack_core::synthesize(&ragstack_core::rag_api_stack_config())?;
    let desired = planning::DesiredStack {
        stack_name: cmd.stack_name.clone(),
        template_body: template.to_json()?,
        image_uri: cmd.image_uri.clone(),
    };

    let cfn_client = aws::create_cloudformation_client(&aws_config).await;
    let current_state = client::get_stack_state(&cfn_client, &cmd.stack_name).await?;

    let plan = planning::calculate_deploy_plan(current_state.as_ref(), &desired)?;

    if !global.is_silent() {
        aprintln!("{}", p_c("Deploy Plan:"));
        for line in planning::format_deploy_plan(&plan) {
            if line.starts_with('+') {
                aprintln!("  {}", p_g(&line));
            } else if line.starts_with('-') {
                aprintln!("  {}", p_r(&line));
            } else if line.starts_with('~') {
                aprintln!("  {}", p_y(&line));
            } else {
                aprintln!("  {}", line);
            }
        }
        aprintln!();
    }

    if matches!(plan, planning::DeployPlan::NoChanges { .. }) {
        if !global.is_silent() {
            aprintln!("{}", p_g("Infrastructure is up to date."));
        }
        return Ok(());
    }

    if global.should_confirm(cmd.force) {
        let (prompt, default) = match &plan {
            planning::DeployPlan::RecreateStack { .. } => (
                "The failed stack will be deleted and created again. Continue?",
                false,
            ),
            _ => ("Apply these changes?", true),
        };
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| StackError::Prompt(e.to_string()))?;

        if !confirmed {
            return Err(StackError::UserCancelled);
        }
    }

    if !global.is_silent() {
        aprintln!("{}", p_b("Applying changes..."));
    }

    deploy::execute_deploy_plan(&cfn_client, &plan).await?;

    if !global.is_silent() {
        aprintln!("{}", p_g("Infrastructure deployed successfully."));
        if let Some(state) = client::get_stack_state(&cfn_client, &cmd.stack_name).await? {
            print_outputs(&state);
        }
    }

    Ok(())
}

async fn run_destroy(cmd: DestroyCommand, global: &crate::Global) -> Result<()> {
    let aws_config = aws::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let cfn_client = aws::create_cloudformation_client(&aws_config).await;
    let current_state = client::get_stack_state(&cfn_client, &cmd.stack_name).await?;

    let plan = planning::calculate_destroy_plan(current_state.as_ref(), &cmd.stack_name)?;

    if !global.is_silent() {
        aprintln!("{}", p_y("Destroy Plan:"));
        for line in planning::format_destroy_plan(&plan) {
            aprintln!("  {}", p_r(&line));
        }
        aprintln!();
    }

    if matches!(plan, planning::DestroyPlan::AlreadyGone { .. }) {
        if !global.is_silent() {
            aprintln!("{}", p_g("Nothing to destroy."));
        }
        return Ok(());
    }

    if global.should_confirm(cmd.force) {
        let confirmed = Confirm::new()
            .with_prompt("Are you sure you want to delete this stack? ALL DATA WILL BE LOST")
            .default(false)
            .interact()
            .map_err(|e| StackError::Prompt(e.to_string()))?;

        if !confirmed {
            return Err(StackError::UserCancelled);
        }
    }

    if !global.is_silent() {
        aprintln!("{}", p_b("Deleting stack..."));
    }

    deploy::execute_destroy_plan(&cfn_client, &plan).await?;

    if !global.is_silent() {
        aprintln!("{}", p_g("Stack destroyed successfully."));
    }

    Ok(())
}

async fn run_outputs(cmd: OutputsCommand, global: &crate::Global) -> Result<()> {
    let aws_config = aws::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let cfn_client = aws::create_cloudformation_client(&aws_config).await;
    let state = client::get_stack_state(&cfn_client, &cmd.stack_name)
        .await?
        .ok_or_else(|| StackError::StackNotFound {
            stack_name: cmd.stack_name,
        })?;

    print_outputs(&state);

    Ok(())
}

fn print_outputs(state: &planning::StackState) {
    for (key, value) in &state.outputs {
        aprintln!("{} {}", p_b(&format!("{}:", key)), value);
    }
}
