//! `AWS::Lambda::*` properties: the function, its public URL, and the
//! resource policy that lets anonymous callers use that URL.

use indexmap::IndexMap;
use serde::Serialize;

use crate::expr::Expr;
use crate::template::ResourceProperties;

/// Packaging of the function code. This stack only ships container images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageType {
    Image,
}

/// Instruction set the function runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
}

/// Authentication mode of a function URL. `None` makes the endpoint public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UrlAuthType {
    #[serde(rename = "NONE")]
    None,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Code {
    pub image_uri: Expr,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    pub variables: IndexMap<String, Expr>,
}

/// Property set for the function declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    pub code: Code,
    pub package_type: PackageType,
    pub image_config: ImageConfig,
    pub role: Expr,
    pub memory_size: u32,
    pub timeout: u32,
    pub architectures: Vec<Architecture>,
    pub environment: Environment,
}

impl ResourceProperties for FunctionProperties {
    const TYPE: &'static str = "AWS::Lambda::Function";
}

/// Property set for the function URL declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UrlProperties {
    pub target_function_arn: Expr,
    pub auth_type: UrlAuthType,
}

impl ResourceProperties for UrlProperties {
    const TYPE: &'static str = "AWS::Lambda::Url";
}

/// Property set for a function resource policy statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionProperties {
    pub action: String,
    pub function_name: Expr,
    pub principal: String,
    pub function_url_auth_type: UrlAuthType,
}

impl PermissionProperties {
    /// Lets any caller invoke the function through its URL without signing.
    pub fn public_url_invoke(function: Expr) -> Self {
        Self {
            action: "lambda:InvokeFunctionUrl".to_string(),
            function_name: function,
            principal: "*".to_string(),
            function_url_auth_type: UrlAuthType::None,
        }
    }
}

impl ResourceProperties for PermissionProperties {
    const TYPE: &'static str = "AWS::Lambda::Permission";
}
