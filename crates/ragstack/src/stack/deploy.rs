//! Stack deployment operations (Imperative Shell).

use std::time::Duration;

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, Parameter};
use aws_sdk_cloudformation::Client;

use super::client;
use super::error::{Result, StackError};
use super::planning::{DeployPlan, DestroyPlan, ParameterInput, StackCondition};

/// Execute a deploy plan.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    match plan {
        DeployPlan::CreateStack {
            stack_name,
            template_body,
            parameters,
        } => {
            create_stack(client, stack_name, template_body, parameters).await?;
            wait_for_stack_settled(client, stack_name).await?;
        }
        DeployPlan::UpdateStack {
            stack_name,
            template_body,
            parameters,
            ..
        } => {
            // The engine may still judge the update a no-op.
            if update_stack(client, stack_name, template_body, parameters).await? {
                wait_for_stack_settled(client, stack_name).await?;
            }
        }
        DeployPlan::RecreateStack {
            stack_name,
            template_body,
            parameters,
            ..
        } => {
            delete_stack(client, stack_name).await?;
            wait_for_stack_gone(client, stack_name).await?;
            create_stack(client, stack_name, template_body, parameters).await?;
            wait_for_stack_settled(client, stack_name).await?;
        }
        DeployPlan::NoChanges { .. } => {
            // Nothing to do
        }
    }
    Ok(())
}

/// Execute a destroy plan.
pub async fn execute_destroy_plan(client: &Client, plan: &DestroyPlan) -> Result<()> {
    match plan {
        DestroyPlan::DeleteStack { stack_name } => {
            delete_stack(client, stack_name).await?;
            wait_for_stack_gone(client, stack_name).await?;
        }
        DestroyPlan::AlreadyGone { .. } => {
            // Nothing to do
        }
    }
    Ok(())
}

async fn create_stack(
    client: &Client,
    stack_name: &str,
    template_body: &str,
    parameters: &[ParameterInput],
) -> Result<()> {
    tracing::debug!(stack_name, "submitting stack creation");
    client
        .create_stack()
        .stack_name(stack_name)
        .template_body(template_body)
        .set_parameters(Some(to_sdk_parameters(parameters)))
        // The template declares IAM resources.
        .capabilities(Capability::CapabilityIam)
        .send()
        .await
        .map_err(client::sdk_error)?;
    Ok(())
}

/// Submits an update, returns false if the engine found nothing to change.
async fn update_stack(
    client: &Client,
    stack_name: &str,
    template_body: &str,
    parameters: &[ParameterInput],
) -> Result<bool> {
    tracing::debug!(stack_name, "submitting stack update");
    match client
        .update_stack()
        .stack_name(stack_name)
        .template_body(template_body)
        .set_parameters(Some(to_sdk_parameters(parameters)))
        .capabilities(Capability::CapabilityIam)
        .send()
        .await
    {
        Ok(_) => Ok(true),
        Err(err) => {
            let err_str = format!("{}", DisplayErrorContext(&err));
            if err_str.contains("No updates are to be performed") {
                Ok(false)
            } else {
                Err(StackError::AwsSdk(err_str))
            }
        }
    }
}

async fn delete_stack(client: &Client, stack_name: &str) -> Result<()> {
    tracing::debug!(stack_name, "submitting stack deletion");
    client
        .delete_stack()
        .stack_name(stack_name)
        .send()
        .await
        .map_err(client::sdk_error)?;
    Ok(())
}

async fn wait_for_stack_settled(client: &Client, stack_name: &str) -> Result<()> {
    let max_attempts = 120;
    let delay = Duration::from_secs(5);

    for _ in 0..max_attempts {
        match client::get_stack_state(client, stack_name).await? {
            Some(state) if state.condition != StackCondition::InProgress => {
                tracing::info!(stack_name, status = %state.status, "stack operation settled");
                return match state.status.as_str() {
                    "CREATE_COMPLETE" | "UPDATE_COMPLETE" => Ok(()),
                    _ => {
                        let reason = client::first_failure_event(client, stack_name)
                            .await?
                            .unwrap_or_else(|| "no failed resource event reported".to_string());
                        Err(StackError::OperationFailed {
                            status: state.status,
                            reason,
                        })
                    }
                };
            }
            Some(_) => {}
            None => {
                // The stack vanished mid-operation.
                return Err(StackError::OperationFailed {
                    status: "DELETE_COMPLETE".to_string(),
                    reason: "stack no longer exists".to_string(),
                });
            }
        }
        tokio::time::sleep(delay).await;
    }

    Err(StackError::OperationTimeout {
        stack_name: stack_name.to_string(),
    })
}

async fn wait_for_stack_gone(client: &Client, stack_name: &str) -> Result<()> {
    let max_attempts = 120;
    let delay = Duration::from_secs(5);

    for _ in 0..max_attempts {
        match client::get_stack_state(client, stack_name).await? {
            None => {
                tracing::info!(stack_name, "stack deleted");
                return Ok(());
            }
            Some(state) if state.status == "DELETE_FAILED" => {
                let reason = client::first_failure_event(client, stack_name)
                    .await?
                    .unwrap_or_else(|| "no failed resource event reported".to_string());
                return Err(StackError::OperationFailed {
                    status: state.status,
                    reason,
                });
            }
            Some(_) => {}
        }
        tokio::time::sleep(delay).await;
    }

    Err(StackError::OperationTimeout {
        stack_name: stack_name.to_string(),
    })
}

fn to_sdk_parameters(parameters: &[ParameterInput]) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|parameter| match parameter {
            ParameterInput::Value { key, value } => Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build(),
            ParameterInput::UsePrevious { key } => Parameter::builder()
                .parameter_key(key)
                .use_previous_value(true)
                .build(),
        })
        .collect()
}
