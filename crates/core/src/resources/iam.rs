//! `AWS::IAM::*` properties: the function's execution role and the inline
//! policy that carries its table grant.

use serde::Serialize;

use crate::expr::Expr;
use crate::template::ResourceProperties;

/// Policy language version understood by the engine.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Statement effect. Grants here are additive, so only `Allow` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// A service principal, e.g. `lambda.amazonaws.com`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServicePrincipal {
    pub service: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<ServicePrincipal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Trust policy allowing the given service to assume the role.
    pub fn assume_role(service: impl Into<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect: Effect::Allow,
                action: vec!["sts:AssumeRole".to_string()],
                principal: Some(ServicePrincipal {
                    service: service.into(),
                }),
                resource: Vec::new(),
            }],
        }
    }

    /// Identity policy allowing the given actions on the given resources.
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect: Effect::Allow,
                action: actions.iter().map(|action| action.to_string()).collect(),
                principal: None,
                resource: resources,
            }],
        }
    }
}

/// Property set for the role declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Expr>,
}

impl ResourceProperties for RoleProperties {
    const TYPE: &'static str = "AWS::IAM::Role";
}

/// Property set for an inline policy attached to roles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
    pub roles: Vec<Expr>,
}

impl ResourceProperties for PolicyProperties {
    const TYPE: &'static str = "AWS::IAM::Policy";
}

/// ARN of an AWS-managed policy, relative to the deploying partition.
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::lit("arn:"),
            Expr::Ref("AWS::Partition".to_string()),
            Expr::lit(format!(":iam::aws:policy/{name}")),
        ],
    )
}
