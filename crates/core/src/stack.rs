//! Stack configuration and synthesis (Functional Core - pure data).
//!
//! [`StackConfig`] holds the desired state for the whole deployment: one
//! query table, one containerized API function behind a public URL, and the
//! grants that wire them together. [`synthesize`] turns a configuration
//! into the template handed to the provisioning engine.

use indexmap::IndexMap;

use crate::error::Result;
use crate::expr::Expr;
use crate::resources::{dynamodb, iam, lambda};
use crate::template::{Output, Parameter, Resource, Template};

/// Logical ids of everything the stack declares.
pub mod ids {
    /// Deploy-time parameter carrying the container image URI.
    pub const IMAGE_URI: &str = "ImageUri";
    /// The query table.
    pub const QUERY_TABLE: &str = "QueryTable";
    /// The containerized API function.
    pub const API_FUNCTION: &str = "ApiFunction";
    /// Execution role assumed by the API function.
    pub const API_FUNCTION_ROLE: &str = "ApiFunctionRole";
    /// Inline policy granting the role access to the query table.
    pub const API_FUNCTION_ROLE_POLICY: &str = "ApiFunctionRolePolicy";
    /// Public function URL.
    pub const API_FUNCTION_URL: &str = "ApiFunctionUrl";
    /// Resource policy allowing anonymous URL invocation.
    pub const API_FUNCTION_URL_PERMISSION: &str = "ApiFunctionUrlPermission";
    /// Stack output publishing the endpoint URL.
    pub const FUNCTION_URL_OUTPUT: &str = "FunctionUrl";
}

/// Environment variable the function reads the table name from.
pub const TABLE_NAME_ENV: &str = "TABLE_NAME";

/// Action set behind a read/write table grant.
pub const TABLE_READ_WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

const LAMBDA_SERVICE: &str = "lambda.amazonaws.com";
const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// Desired state for the whole stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub description: String,
    pub table: TableConfig,
    pub function: FunctionConfig,
    pub grants: GrantsConfig,
}

/// Desired state for the query table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub partition_key: KeyAttribute,
    pub billing_mode: BillingMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// Attribute types usable as table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

/// Desired state for the API function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionConfig {
    /// Entry point inside the container image.
    pub handler_command: String,
    /// Memory size in megabytes.
    pub memory_size: u32,
    pub timeout_seconds: u32,
    pub architecture: Architecture,
    pub url_auth: UrlAuth,
}

/// Instruction set the function image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
}

/// Authentication mode of the invocation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlAuth {
    /// Anyone with the URL can invoke the function.
    None,
}

/// Grants wired between the function's execution identity and the rest of
/// the stack. Grants are additive; nothing here revokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantsConfig {
    pub table_access: TableAccess,
    /// AWS-managed policies attached by name.
    pub managed_policies: Vec<String>,
}

/// Access level granted on the query table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAccess {
    ReadWrite,
}

impl TableAccess {
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            TableAccess::ReadWrite => TABLE_READ_WRITE_ACTIONS,
        }
    }
}

/// Returns the canonical stack configuration for the RAG query API.
/// This is a pure function - no I/O.
pub fn rag_api_stack_config() -> StackConfig {
    StackConfig {
        description: "RAG query API: query table, containerized API function, public function URL"
            .to_string(),
        table: TableConfig {
            partition_key: KeyAttribute {
                name: "query_id".to_string(),
                attribute_type: AttributeType::String,
            },
            billing_mode: BillingMode::PayPerRequest,
        },
        function: FunctionConfig {
            handler_command: "app_api_handler.handler".to_string(),
            memory_size: 256,
            timeout_seconds: 30,
            architecture: Architecture::X86_64,
            url_auth: UrlAuth::None,
        },
        grants: GrantsConfig {
            table_access: TableAccess::ReadWrite,
            managed_policies: vec!["AmazonBedrockFullAccess".to_string()],
        },
    }
}

/// Synthesizes the deployment template for a stack configuration.
///
/// The resource graph is fixed: table, execution role, table grant,
/// function, function URL, and the permission that makes the URL public.
/// The engine resolves every `Ref`/`Fn::GetAtt` and orders creation; the
/// only explicit ordering declared here is that the function waits for its
/// table grant.
pub fn synthesize(config: &StackConfig) -> Result<Template> {
    let mut template = Template::new(&config.description);

    template.add_parameter(
        ids::IMAGE_URI,
        Parameter::string("ECR image URI for the API handler container"),
    )?;

    let key = &config.table.partition_key;
    template.add_resource(
        ids::QUERY_TABLE,
        Resource::new(&dynamodb::TableProperties {
            attribute_definitions: vec![dynamodb::AttributeDefinition {
                attribute_name: key.name.clone(),
                attribute_type: to_scalar_type(key.attribute_type),
            }],
            key_schema: vec![dynamodb::KeySchemaElement {
                attribute_name: key.name.clone(),
                key_type: dynamodb::KeyType::Hash,
            }],
            billing_mode: to_billing_mode(config.table.billing_mode),
        })?,
    )?;

    // Execution role: the baseline logging policy plus the configured
    // managed-policy grants, all partition-relative.
    let mut managed_policy_arns = vec![iam::managed_policy_arn(BASIC_EXECUTION_POLICY)];
    managed_policy_arns.extend(
        config
            .grants
            .managed_policies
            .iter()
            .map(|name| iam::managed_policy_arn(name)),
    );
    template.add_resource(
        ids::API_FUNCTION_ROLE,
        Resource::new(&iam::RoleProperties {
            assume_role_policy_document: iam::PolicyDocument::assume_role(LAMBDA_SERVICE),
            managed_policy_arns,
        })?,
    )?;

    // Table grant: the configured action set over the table and its
    // indexes.
    let table_arn = Expr::get_att(ids::QUERY_TABLE, "Arn");
    let index_arns = Expr::join("/", vec![table_arn.clone(), Expr::lit("index/*")]);
    template.add_resource(
        ids::API_FUNCTION_ROLE_POLICY,
        Resource::new(&iam::PolicyProperties {
            policy_name: "ApiFunctionTableAccess".to_string(),
            policy_document: iam::PolicyDocument::allow(
                config.grants.table_access.actions(),
                vec![table_arn, index_arns],
            ),
            roles: vec![Expr::Ref(ids::API_FUNCTION_ROLE.to_string())],
        })?,
    )?;

    let mut variables = IndexMap::new();
    variables.insert(
        TABLE_NAME_ENV.to_string(),
        Expr::Ref(ids::QUERY_TABLE.to_string()),
    );
    template.add_resource(
        ids::API_FUNCTION,
        Resource::new(&lambda::FunctionProperties {
            code: lambda::Code {
                image_uri: Expr::Ref(ids::IMAGE_URI.to_string()),
            },
            package_type: lambda::PackageType::Image,
            image_config: lambda::ImageConfig {
                command: vec![config.function.handler_command.clone()],
            },
            role: Expr::get_att(ids::API_FUNCTION_ROLE, "Arn"),
            memory_size: config.function.memory_size,
            timeout: config.function.timeout_seconds,
            architectures: vec![to_architecture(config.function.architecture)],
            environment: lambda::Environment { variables },
        })?
        // The table grant must exist before the function starts serving.
        .depends_on(ids::API_FUNCTION_ROLE_POLICY),
    )?;

    template.add_resource(
        ids::API_FUNCTION_URL,
        Resource::new(&lambda::UrlProperties {
            target_function_arn: Expr::get_att(ids::API_FUNCTION, "Arn"),
            auth_type: to_auth_type(config.function.url_auth),
        })?,
    )?;
    template.add_resource(
        ids::API_FUNCTION_URL_PERMISSION,
        Resource::new(&lambda::PermissionProperties::public_url_invoke(
            Expr::get_att(ids::API_FUNCTION, "Arn"),
        ))?,
    )?;

    template.add_output(
        ids::FUNCTION_URL_OUTPUT,
        Output {
            value: Expr::get_att(ids::API_FUNCTION_URL, "FunctionUrl"),
            description: Some("Public URL of the API function".to_string()),
        },
    )?;

    Ok(template)
}

fn to_scalar_type(attribute_type: AttributeType) -> dynamodb::ScalarAttributeType {
    match attribute_type {
        AttributeType::String => dynamodb::ScalarAttributeType::S,
    }
}

fn to_billing_mode(billing_mode: BillingMode) -> dynamodb::BillingMode {
    match billing_mode {
        BillingMode::PayPerRequest => dynamodb::BillingMode::PayPerRequest,
    }
}

fn to_architecture(architecture: Architecture) -> lambda::Architecture {
    match architecture {
        Architecture::X86_64 => lambda::Architecture::X86_64,
    }
}

fn to_auth_type(auth: UrlAuth) -> lambda::UrlAuthType {
    match auth {
        UrlAuth::None => lambda::UrlAuthType::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_template() -> Template {
        synthesize(&rag_api_stack_config()).unwrap()
    }

    fn properties(template: &Template, logical_id: &str) -> serde_json::Value {
        template.resource(logical_id).unwrap().properties().clone()
    }

    #[test]
    fn test_declares_exactly_one_query_table() {
        let template = canonical_template();
        assert_eq!(
            template.resources_of_type("AWS::DynamoDB::Table"),
            vec![ids::QUERY_TABLE]
        );
        let table = properties(&template, ids::QUERY_TABLE);
        assert_eq!(
            table["KeySchema"],
            json!([{"AttributeName": "query_id", "KeyType": "HASH"}])
        );
        assert_eq!(
            table["AttributeDefinitions"],
            json!([{"AttributeName": "query_id", "AttributeType": "S"}])
        );
        assert_eq!(table["BillingMode"], "PAY_PER_REQUEST");
    }

    #[test]
    fn test_table_name_env_refers_to_table() {
        let template = canonical_template();
        let function = properties(&template, ids::API_FUNCTION);
        assert_eq!(
            function["Environment"]["Variables"][TABLE_NAME_ENV],
            json!({"Ref": ids::QUERY_TABLE})
        );
    }

    #[test]
    fn test_function_memory_timeout_and_entry_point() {
        let template = canonical_template();
        let function = properties(&template, ids::API_FUNCTION);
        assert_eq!(function["MemorySize"], 256);
        assert_eq!(function["Timeout"], 30);
        assert_eq!(function["Architectures"], json!(["x86_64"]));
        assert_eq!(function["PackageType"], "Image");
        assert_eq!(
            function["ImageConfig"]["Command"],
            json!(["app_api_handler.handler"])
        );
        assert_eq!(
            function["Role"],
            json!({"Fn::GetAtt": [ids::API_FUNCTION_ROLE, "Arn"]})
        );
    }

    #[test]
    fn test_image_is_supplied_by_parameter() {
        let template = canonical_template();
        assert!(template.parameters().contains_key(ids::IMAGE_URI));
        let function = properties(&template, ids::API_FUNCTION);
        assert_eq!(function["Code"]["ImageUri"], json!({"Ref": ids::IMAGE_URI}));
    }

    #[test]
    fn test_image_change_touches_only_the_function() {
        let template = canonical_template();
        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(
            crate::template::resources_referencing(&value, ids::IMAGE_URI),
            vec![ids::API_FUNCTION]
        );
    }

    #[test]
    fn test_endpoint_is_unauthenticated() {
        let template = canonical_template();
        let url = properties(&template, ids::API_FUNCTION_URL);
        assert_eq!(url["AuthType"], "NONE");
        assert_eq!(
            url["TargetFunctionArn"],
            json!({"Fn::GetAtt": [ids::API_FUNCTION, "Arn"]})
        );
        let permission = properties(&template, ids::API_FUNCTION_URL_PERMISSION);
        assert_eq!(permission["Action"], "lambda:InvokeFunctionUrl");
        assert_eq!(permission["Principal"], "*");
        assert_eq!(permission["FunctionUrlAuthType"], "NONE");
        assert_eq!(
            permission["FunctionName"],
            json!({"Fn::GetAtt": [ids::API_FUNCTION, "Arn"]})
        );
    }

    #[test]
    fn test_role_carries_both_grants() {
        let template = canonical_template();

        let role = properties(&template, ids::API_FUNCTION_ROLE);
        let trust = &role["AssumeRolePolicyDocument"]["Statement"][0];
        assert_eq!(trust["Principal"]["Service"], "lambda.amazonaws.com");
        assert_eq!(trust["Action"], json!(["sts:AssumeRole"]));
        let managed = serde_json::to_string(&role["ManagedPolicyArns"]).unwrap();
        assert!(managed.contains(":iam::aws:policy/AmazonBedrockFullAccess"));
        assert!(managed.contains(":iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"));

        let policy = properties(&template, ids::API_FUNCTION_ROLE_POLICY);
        let statement = &policy["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], json!(TABLE_READ_WRITE_ACTIONS));
        assert_eq!(
            statement["Resource"][0],
            json!({"Fn::GetAtt": [ids::QUERY_TABLE, "Arn"]})
        );
        assert_eq!(
            statement["Resource"][1],
            json!({"Fn::Join": ["/", [{"Fn::GetAtt": [ids::QUERY_TABLE, "Arn"]}, "index/*"]]})
        );
        assert_eq!(policy["Roles"], json!([{"Ref": ids::API_FUNCTION_ROLE}]));
    }

    #[test]
    fn test_function_waits_for_table_grant() {
        let template = canonical_template();
        assert_eq!(
            template.resource(ids::API_FUNCTION).unwrap().dependencies(),
            [ids::API_FUNCTION_ROLE_POLICY.to_string()]
        );
    }

    #[test]
    fn test_function_url_is_published() {
        let template = canonical_template();
        let output = template.outputs().get(ids::FUNCTION_URL_OUTPUT).unwrap();
        assert_eq!(
            serde_json::to_value(&output.value).unwrap(),
            json!({"Fn::GetAtt": [ids::API_FUNCTION_URL, "FunctionUrl"]})
        );
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let first = canonical_template().to_json().unwrap();
        let second = canonical_template().to_json().unwrap();
        assert_eq!(first, second);
    }
}
