//! Pure functions for calculating stack plans (Functional Core).
//!
//! The engine owns provisioning; these functions only decide which engine
//! operation to ask for and how to describe it to the user.

use ragstack_core::{ids, resources_referencing};

use super::error::{Result, StackError};

/// Current state of the deployed stack as reported by the engine.
#[derive(Debug, Clone)]
pub struct StackState {
    pub stack_name: String,
    /// Raw engine status, e.g. `CREATE_COMPLETE`.
    pub status: String,
    pub condition: StackCondition,
    /// Template body stored by the engine, when readable.
    pub template_body: Option<String>,
    pub parameters: Vec<(String, String)>,
    pub outputs: Vec<(String, String)>,
}

impl StackState {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }
}

/// What the engine will let us do with a stack in its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCondition {
    /// Settled and updatable.
    Usable,
    /// Dead on arrival; the engine only allows deletion.
    Defunct,
    /// An operation is still running.
    InProgress,
}

impl StackCondition {
    /// Classifies a raw engine status string.
    pub fn classify(status: &str) -> Self {
        if status.ends_with("_IN_PROGRESS") {
            return StackCondition::InProgress;
        }
        match status {
            "CREATE_FAILED" | "ROLLBACK_COMPLETE" | "ROLLBACK_FAILED" | "DELETE_FAILED"
            | "UPDATE_ROLLBACK_FAILED" => StackCondition::Defunct,
            _ => StackCondition::Usable,
        }
    }
}

/// Desired state to submit to the engine.
#[derive(Debug, Clone)]
pub struct DesiredStack {
    pub stack_name: String,
    /// Freshly synthesized template JSON.
    pub template_body: String,
    /// Image URI supplied on the command line, if any.
    pub image_uri: Option<String>,
}

/// A parameter as submitted with a stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterInput {
    Value { key: String, value: String },
    /// Keep whatever value the deployed stack already has.
    UsePrevious { key: String },
}

/// One displayed difference between current and desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    AddResource(String),
    RemoveResource(String),
    UpdateResource(String),
    /// Template sections outside the resources differ.
    UpdateTemplate,
    /// A parameter value changes, touching the resources that reference it.
    UpdateParameter { key: String, touches: Vec<String> },
}

/// Planned changes for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Stack doesn't exist, needs to be created.
    CreateStack {
        stack_name: String,
        template_body: String,
        parameters: Vec<ParameterInput>,
    },
    /// Stack exists and differs from the desired state.
    UpdateStack {
        stack_name: String,
        template_body: String,
        parameters: Vec<ParameterInput>,
        changes: Vec<Change>,
    },
    /// Stack is defunct; it must be deleted and created again.
    RecreateStack {
        stack_name: String,
        status: String,
        template_body: String,
        parameters: Vec<ParameterInput>,
    },
    /// Stack matches the desired state, no changes needed.
    NoChanges { stack_name: String },
}

/// Plan for destroying the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Stack exists and will be deleted.
    DeleteStack { stack_name: String },
    /// Stack doesn't exist, nothing to do.
    AlreadyGone { stack_name: String },
}

/// Pure function: Calculate what to ask the engine for to reach the
/// desired state.
pub fn calculate_deploy_plan(
    current: Option<&StackState>,
    desired: &DesiredStack,
) -> Result<DeployPlan> {
    let Some(state) = current else {
        let image_uri = desired.image_uri.clone().ok_or(StackError::MissingImageUri)?;
        return Ok(DeployPlan::CreateStack {
            stack_name: desired.stack_name.clone(),
            template_body: desired.template_body.clone(),
            parameters: vec![ParameterInput::Value {
                key: ids::IMAGE_URI.to_string(),
                value: image_uri,
            }],
        });
    };

    match state.condition {
        StackCondition::InProgress => Err(StackError::OperationInProgress {
            stack_name: state.stack_name.clone(),
            status: state.status.clone(),
        }),
        StackCondition::Defunct => {
            // The previous parameters survive on the failed stack, so an
            // omitted image falls back to the one last submitted.
            let image_uri = desired
                .image_uri
                .clone()
                .or_else(|| state.parameter(ids::IMAGE_URI).map(str::to_string))
                .ok_or(StackError::MissingImageUri)?;
            Ok(DeployPlan::RecreateStack {
                stack_name: desired.stack_name.clone(),
                status: state.status.clone(),
                template_body: desired.template_body.clone(),
                parameters: vec![ParameterInput::Value {
                    key: ids::IMAGE_URI.to_string(),
                    value: image_uri,
                }],
            })
        }
        StackCondition::Usable => {
            let changes = calculate_changes(state, desired);
            if changes.is_empty() {
                Ok(DeployPlan::NoChanges {
                    stack_name: desired.stack_name.clone(),
                })
            } else {
                Ok(DeployPlan::UpdateStack {
                    stack_name: desired.stack_name.clone(),
                    template_body: desired.template_body.clone(),
                    parameters: image_parameters(desired.image_uri.as_deref()),
                    changes,
                })
            }
        }
    }
}

/// Pure function: Calculate destroy plan.
pub fn calculate_destroy_plan(
    current: Option<&StackState>,
    stack_name: &str,
) -> Result<DestroyPlan> {
    match current {
        Some(state) if state.condition == StackCondition::InProgress => {
            Err(StackError::OperationInProgress {
                stack_name: state.stack_name.clone(),
                status: state.status.clone(),
            })
        }
        Some(_) => Ok(DestroyPlan::DeleteStack {
            stack_name: stack_name.to_string(),
        }),
        None => Ok(DestroyPlan::AlreadyGone {
            stack_name: stack_name.to_string(),
        }),
    }
}

fn image_parameters(image_uri: Option<&str>) -> Vec<ParameterInput> {
    match image_uri {
        Some(value) => vec![ParameterInput::Value {
            key: ids::IMAGE_URI.to_string(),
            value: value.to_string(),
        }],
        None => vec![ParameterInput::UsePrevious {
            key: ids::IMAGE_URI.to_string(),
        }],
    }
}

fn calculate_changes(state: &StackState, desired: &DesiredStack) -> Vec<Change> {
    let desired_value: Option<serde_json::Value> =
        serde_json::from_str(&desired.template_body).ok();
    let current_value: Option<serde_json::Value> = state
        .template_body
        .as_deref()
        .and_then(|body| serde_json::from_str(body).ok());

    let mut changes = match (&current_value, &desired_value) {
        (Some(current), Some(desired_value)) if current == desired_value => Vec::new(),
        (Some(current), Some(desired_value)) => {
            let mut changes = diff_resources(current, desired_value);
            if changes.is_empty() {
                changes.push(Change::UpdateTemplate);
            }
            changes
        }
        // Stored template unreadable: resubmit and let the engine
        // reconcile.
        _ => vec![Change::UpdateTemplate],
    };

    if let Some(image_uri) = &desired.image_uri {
        if state.parameter(ids::IMAGE_URI) != Some(image_uri.as_str()) {
            let touches = desired_value
                .as_ref()
                .map(|value| resources_referencing(value, ids::IMAGE_URI))
                .unwrap_or_default();
            changes.push(Change::UpdateParameter {
                key: ids::IMAGE_URI.to_string(),
                touches,
            });
        }
    }

    changes
}

fn diff_resources(current: &serde_json::Value, desired: &serde_json::Value) -> Vec<Change> {
    let empty = serde_json::Map::new();
    let current_resources = current
        .get("Resources")
        .and_then(|value| value.as_object())
        .unwrap_or(&empty);
    let desired_resources = desired
        .get("Resources")
        .and_then(|value| value.as_object())
        .unwrap_or(&empty);

    let mut changes = Vec::new();
    for (logical_id, resource) in desired_resources {
        match current_resources.get(logical_id) {
            None => changes.push(Change::AddResource(logical_id.clone())),
            Some(existing) if existing != resource => {
                changes.push(Change::UpdateResource(logical_id.clone()))
            }
            Some(_) => {}
        }
    }
    for logical_id in current_resources.keys() {
        if !desired_resources.contains_key(logical_id) {
            changes.push(Change::RemoveResource(logical_id.clone()));
        }
    }
    changes
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    match plan {
        DeployPlan::CreateStack {
            stack_name,
            template_body,
            parameters,
        } => create_lines(stack_name, template_body, parameters),
        DeployPlan::UpdateStack {
            stack_name,
            changes,
            ..
        } => {
            let mut lines = vec![format!("~ Update stack: {}", stack_name)];
            for change in changes {
                lines.push(match change {
                    Change::AddResource(logical_id) => format!("  + {}", logical_id),
                    Change::RemoveResource(logical_id) => format!("  - {}", logical_id),
                    Change::UpdateResource(logical_id) => format!("  ~ {}", logical_id),
                    Change::UpdateTemplate => "  ~ Template settings".to_string(),
                    Change::UpdateParameter { key, touches } => {
                        if touches.is_empty() {
                            format!("  ~ Parameter {}", key)
                        } else {
                            format!("  ~ Parameter {} (touches {})", key, touches.join(", "))
                        }
                    }
                });
            }
            lines
        }
        DeployPlan::RecreateStack {
            stack_name,
            status,
            template_body,
            parameters,
        } => {
            let mut lines = vec![format!("- Delete failed stack: {} ({})", stack_name, status)];
            lines.extend(create_lines(stack_name, template_body, parameters));
            lines
        }
        DeployPlan::NoChanges { stack_name } => {
            vec![format!("= Stack '{}' is up to date", stack_name)]
        }
    }
}

/// Pure function: Format a destroy plan for display.
pub fn format_destroy_plan(plan: &DestroyPlan) -> Vec<String> {
    match plan {
        DestroyPlan::DeleteStack { stack_name } => {
            vec![format!(
                "- Delete stack: {} (ALL RESOURCES AND DATA WILL BE LOST)",
                stack_name
            )]
        }
        DestroyPlan::AlreadyGone { stack_name } => {
            vec![format!("= Stack '{}' does not exist", stack_name)]
        }
    }
}

fn create_lines(
    stack_name: &str,
    template_body: &str,
    parameters: &[ParameterInput],
) -> Vec<String> {
    let mut lines = vec![format!("+ Create stack: {}", stack_name)];
    if let Ok(template) = serde_json::from_str::<serde_json::Value>(template_body) {
        if let Some(resources) = template.get("Resources").and_then(|value| value.as_object()) {
            for (logical_id, resource) in resources {
                let resource_type = resource
                    .get("Type")
                    .and_then(|value| value.as_str())
                    .unwrap_or("?");
                lines.push(format!("  + {} ({})", logical_id, resource_type));
            }
        }
    }
    for parameter in parameters {
        lines.push(match parameter {
            ParameterInput::Value { key, value } => format!("  Parameter {}: {}", key, value),
            ParameterInput::UsePrevious { key } => format!("  Parameter {}: (previous value)", key),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/rag-api:latest";
    const NEW_IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/rag-api:v2";

    fn template_body() -> String {
        ragstack_core::synthesize(&ragstack_core::rag_api_stack_config())
            .unwrap()
            .to_json()
            .unwrap()
    }

    fn desired(image_uri: Option<&str>) -> DesiredStack {
        DesiredStack {
            stack_name: "ragstack".to_string(),
            template_body: template_body(),
            image_uri: image_uri.map(str::to_string),
        }
    }

    fn state(status: &str, template_body: Option<String>, image: Option<&str>) -> StackState {
        StackState {
            stack_name: "ragstack".to_string(),
            status: status.to_string(),
            condition: StackCondition::classify(status),
            template_body,
            parameters: image
                .map(|value| vec![(ids::IMAGE_URI.to_string(), value.to_string())])
                .unwrap_or_default(),
            outputs: Vec::new(),
        }
    }

    #[test]
    fn test_classify_engine_statuses() {
        assert_eq!(
            StackCondition::classify("CREATE_COMPLETE"),
            StackCondition::Usable
        );
        assert_eq!(
            StackCondition::classify("UPDATE_COMPLETE"),
            StackCondition::Usable
        );
        assert_eq!(
            StackCondition::classify("UPDATE_ROLLBACK_COMPLETE"),
            StackCondition::Usable
        );
        assert_eq!(
            StackCondition::classify("ROLLBACK_COMPLETE"),
            StackCondition::Defunct
        );
        assert_eq!(
            StackCondition::classify("DELETE_FAILED"),
            StackCondition::Defunct
        );
        assert_eq!(
            StackCondition::classify("CREATE_IN_PROGRESS"),
            StackCondition::InProgress
        );
        assert_eq!(
            StackCondition::classify("UPDATE_ROLLBACK_IN_PROGRESS"),
            StackCondition::InProgress
        );
    }

    #[test]
    fn test_create_when_stack_absent() {
        let plan = calculate_deploy_plan(None, &desired(Some(IMAGE))).unwrap();
        match plan {
            DeployPlan::CreateStack {
                stack_name,
                parameters,
                ..
            } => {
                assert_eq!(stack_name, "ragstack");
                assert_eq!(
                    parameters,
                    vec![ParameterInput::Value {
                        key: "ImageUri".to_string(),
                        value: IMAGE.to_string(),
                    }]
                );
            }
            other => panic!("expected CreateStack, got {:?}", other),
        }
    }

    #[test]
    fn test_create_requires_an_image() {
        let err = calculate_deploy_plan(None, &desired(None)).unwrap_err();
        assert!(matches!(err, StackError::MissingImageUri));
    }

    #[test]
    fn test_no_changes_when_template_and_image_match() {
        let current = state("CREATE_COMPLETE", Some(template_body()), Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(Some(IMAGE))).unwrap();
        assert_eq!(
            plan,
            DeployPlan::NoChanges {
                stack_name: "ragstack".to_string()
            }
        );
    }

    #[test]
    fn test_no_changes_when_image_omitted() {
        let current = state("UPDATE_COMPLETE", Some(template_body()), Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(None)).unwrap();
        assert_eq!(
            plan,
            DeployPlan::NoChanges {
                stack_name: "ragstack".to_string()
            }
        );
    }

    #[test]
    fn test_image_change_touches_only_the_function() {
        let current = state("CREATE_COMPLETE", Some(template_body()), Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(Some(NEW_IMAGE))).unwrap();
        match plan {
            DeployPlan::UpdateStack {
                parameters,
                changes,
                ..
            } => {
                assert_eq!(
                    changes,
                    vec![Change::UpdateParameter {
                        key: "ImageUri".to_string(),
                        touches: vec!["ApiFunction".to_string()],
                    }]
                );
                assert_eq!(
                    parameters,
                    vec![ParameterInput::Value {
                        key: "ImageUri".to_string(),
                        value: NEW_IMAGE.to_string(),
                    }]
                );
            }
            other => panic!("expected UpdateStack, got {:?}", other),
        }
    }

    #[test]
    fn test_template_change_reports_resource_diff() {
        // Deployed copy: one resource dropped, one altered, one extra.
        let mut stored: serde_json::Value = serde_json::from_str(&template_body()).unwrap();
        let resources = stored["Resources"].as_object_mut().unwrap();
        resources.remove("ApiFunctionUrlPermission");
        resources["QueryTable"]["Properties"]["BillingMode"] =
            serde_json::Value::String("PROVISIONED".to_string());
        resources.insert(
            "LegacyQueue".to_string(),
            serde_json::json!({"Type": "AWS::SQS::Queue", "Properties": {}}),
        );

        let current = state("CREATE_COMPLETE", Some(stored.to_string()), Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(None)).unwrap();
        match plan {
            DeployPlan::UpdateStack {
                parameters, changes, ..
            } => {
                assert_eq!(
                    changes,
                    vec![
                        Change::AddResource("ApiFunctionUrlPermission".to_string()),
                        Change::UpdateResource("QueryTable".to_string()),
                        Change::RemoveResource("LegacyQueue".to_string()),
                    ]
                );
                assert_eq!(
                    parameters,
                    vec![ParameterInput::UsePrevious {
                        key: "ImageUri".to_string()
                    }]
                );
            }
            other => panic!("expected UpdateStack, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_stored_template_forces_resubmit() {
        let current = state("CREATE_COMPLETE", None, Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(None)).unwrap();
        match plan {
            DeployPlan::UpdateStack { changes, .. } => {
                assert_eq!(changes, vec![Change::UpdateTemplate]);
            }
            other => panic!("expected UpdateStack, got {:?}", other),
        }
    }

    #[test]
    fn test_rolled_back_stack_is_recreated() {
        let current = state("ROLLBACK_COMPLETE", Some(template_body()), Some(IMAGE));
        let plan = calculate_deploy_plan(Some(&current), &desired(None)).unwrap();
        match plan {
            DeployPlan::RecreateStack {
                status, parameters, ..
            } => {
                assert_eq!(status, "ROLLBACK_COMPLETE");
                // Image falls back to the failed stack's parameter.
                assert_eq!(
                    parameters,
                    vec![ParameterInput::Value {
                        key: "ImageUri".to_string(),
                        value: IMAGE.to_string(),
                    }]
                );
            }
            other => panic!("expected RecreateStack, got {:?}", other),
        }
    }

    #[test]
    fn test_recreate_without_any_image_is_an_error() {
        let current = state("ROLLBACK_COMPLETE", None, None);
        let err = calculate_deploy_plan(Some(&current), &desired(None)).unwrap_err();
        assert!(matches!(err, StackError::MissingImageUri));
    }

    #[test]
    fn test_operation_in_progress_is_an_error() {
        let current = state("UPDATE_IN_PROGRESS", None, Some(IMAGE));
        let err = calculate_deploy_plan(Some(&current), &desired(None)).unwrap_err();
        assert!(matches!(err, StackError::OperationInProgress { .. }));
    }

    #[test]
    fn test_destroy_plans() {
        let current = state("CREATE_COMPLETE", None, None);
        assert_eq!(
            calculate_destroy_plan(Some(&current), "ragstack").unwrap(),
            DestroyPlan::DeleteStack {
                stack_name: "ragstack".to_string()
            }
        );
        assert_eq!(
            calculate_destroy_plan(None, "ragstack").unwrap(),
            DestroyPlan::AlreadyGone {
                stack_name: "ragstack".to_string()
            }
        );
        let busy = state("DELETE_IN_PROGRESS", None, None);
        assert!(matches!(
            calculate_destroy_plan(Some(&busy), "ragstack").unwrap_err(),
            StackError::OperationInProgress { .. }
        ));
    }

    #[test]
    fn test_format_create_plan() {
        let plan = calculate_deploy_plan(None, &desired(Some(IMAGE))).unwrap();
        assert_eq!(
            format_deploy_plan(&plan),
            vec![
                "+ Create stack: ragstack".to_string(),
                "  + ApiFunction (AWS::Lambda::Function)".to_string(),
                "  + ApiFunctionRole (AWS::IAM::Role)".to_string(),
                "  + ApiFunctionRolePolicy (AWS::IAM::Policy)".to_string(),
                "  + ApiFunctionUrl (AWS::Lambda::Url)".to_string(),
                "  + ApiFunctionUrlPermission (AWS::Lambda::Permission)".to_string(),
                "  + QueryTable (AWS::DynamoDB::Table)".to_string(),
                format!("  Parameter ImageUri: {}", IMAGE),
            ]
        );
    }

    #[test]
    fn test_format_update_plan() {
        let plan = DeployPlan::UpdateStack {
            stack_name: "ragstack".to_string(),
            template_body: String::new(),
            parameters: vec![ParameterInput::UsePrevious {
                key: "ImageUri".to_string(),
            }],
            changes: vec![
                Change::UpdateParameter {
                    key: "ImageUri".to_string(),
                    touches: vec!["ApiFunction".to_string()],
                },
                Change::RemoveResource("LegacyQueue".to_string()),
            ],
        };
        assert_eq!(
            format_deploy_plan(&plan),
            vec![
                "~ Update stack: ragstack".to_string(),
                "  ~ Parameter ImageUri (touches ApiFunction)".to_string(),
                "  - LegacyQueue".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_no_changes_and_destroy_plans() {
        assert_eq!(
            format_deploy_plan(&DeployPlan::NoChanges {
                stack_name: "ragstack".to_string()
            }),
            vec!["= Stack 'ragstack' is up to date".to_string()]
        );
        assert_eq!(
            format_destroy_plan(&DestroyPlan::DeleteStack {
                stack_name: "ragstack".to_string()
            }),
            vec!["- Delete stack: ragstack (ALL RESOURCES AND DATA WILL BE LOST)".to_string()]
        );
        assert_eq!(
            format_destroy_plan(&DestroyPlan::AlreadyGone {
                stack_name: "ragstack".to_string()
            }),
            vec!["= Stack 'ragstack' does not exist".to_string()]
        );
    }
}
