//! Engine state queries (Imperative Shell).

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::Client;

use super::error::{Result, StackError};
use super::planning::{StackCondition, StackState};

/// Wraps an SDK error with its full source chain, which is where the
/// service message lives.
pub(crate) fn sdk_error(err: impl std::error::Error) -> StackError {
    StackError::AwsSdk(format!("{}", DisplayErrorContext(err)))
}

/// Fetches current stack state, returns None if the stack doesn't exist.
pub async fn get_stack_state(client: &Client, stack_name: &str) -> Result<Option<StackState>> {
    let response = match client.describe_stacks().stack_name(stack_name).send().await {
        Ok(response) => response,
        Err(err) => {
            let err_str = format!("{}", DisplayErrorContext(&err));
            // The engine reports a missing stack as a validation error.
            if err_str.contains("does not exist") {
                return Ok(None);
            }
            return Err(StackError::AwsSdk(err_str));
        }
    };

    let Some(stack) = response.stacks().first() else {
        return Ok(None);
    };

    let status = stack
        .stack_status()
        .map(|status| status.as_str().to_string())
        .unwrap_or_default();
    if status == "DELETE_COMPLETE" {
        return Ok(None);
    }

    let template_body = client
        .get_template()
        .stack_name(stack_name)
        .send()
        .await
        .map_err(sdk_error)?
        .template_body()
        .map(str::to_string);

    let parameters = stack
        .parameters()
        .iter()
        .filter_map(|parameter| {
            Some((
                parameter.parameter_key()?.to_string(),
                parameter.parameter_value()?.to_string(),
            ))
        })
        .collect();

    let outputs = stack
        .outputs()
        .iter()
        .filter_map(|output| {
            Some((
                output.output_key()?.to_string(),
                output.output_value()?.to_string(),
            ))
        })
        .collect();

    tracing::debug!(stack_name, %status, "described stack");

    Ok(Some(StackState {
        stack_name: stack_name.to_string(),
        condition: StackCondition::classify(&status),
        status,
        template_body,
        parameters,
        outputs,
    }))
}

/// Resolves the physical id of a stack resource, returns None if the
/// stack or the resource doesn't exist.
pub async fn get_physical_resource_id(
    client: &Client,
    stack_name: &str,
    logical_id: &str,
) -> Result<Option<String>> {
    match client
        .describe_stack_resource()
        .stack_name(stack_name)
        .logical_resource_id(logical_id)
        .send()
        .await
    {
        Ok(response) => Ok(response
            .stack_resource_detail()
            .and_then(|detail| detail.physical_resource_id())
            .map(str::to_string)),
        Err(err) => {
            let err_str = format!("{}", DisplayErrorContext(&err));
            if err_str.contains("does not exist") {
                Ok(None)
            } else {
                Err(StackError::AwsSdk(err_str))
            }
        }
    }
}

/// Finds the earliest resource failure of the most recent stack operation.
///
/// Events arrive newest first. The scan stops at the "User Initiated"
/// stack event that marks the start of the operation, keeping the last
/// failure seen before it.
pub async fn first_failure_event(client: &Client, stack_name: &str) -> Result<Option<String>> {
    let response = client
        .describe_stack_events()
        .stack_name(stack_name)
        .send()
        .await
        .map_err(sdk_error)?;

    let mut failure = None;
    for event in response.stack_events() {
        let status = event
            .resource_status()
            .map(|status| status.as_str())
            .unwrap_or_default();
        if event.resource_type() == Some("AWS::CloudFormation::Stack")
            && status.ends_with("_IN_PROGRESS")
            && event.resource_status_reason() == Some("User Initiated")
        {
            break;
        }
        if status.ends_with("_FAILED") {
            failure = Some(format!(
                "{}: {}: {}",
                event.logical_resource_id().unwrap_or("?"),
                status,
                event.resource_status_reason().unwrap_or("no reason reported"),
            ));
        }
    }
    Ok(failure)
}
