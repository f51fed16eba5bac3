//! Template assembly.
//!
//! [`Template`] is the declarative document handed to the provisioning
//! engine. Sections keep insertion order so the same configuration always
//! renders byte-identical JSON.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::expr::Expr;

/// Template format version understood by the provisioning engine.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A typed property set for one resource kind.
pub trait ResourceProperties: Serialize {
    /// Engine resource type, e.g. `AWS::DynamoDB::Table`.
    const TYPE: &'static str;
}

/// One declared resource: its engine type plus serialized properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    properties: serde_json::Value,
}

impl Resource {
    pub fn new<P: ResourceProperties>(properties: &P) -> Result<Self> {
        let properties = serde_json::to_value(properties).map_err(|source| Error::Properties {
            resource_type: P::TYPE,
            source,
        })?;
        Ok(Self {
            resource_type: P::TYPE.to_string(),
            depends_on: Vec::new(),
            properties,
        })
    }

    /// Adds an explicit ordering dependency on another resource.
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    pub fn properties(&self) -> &serde_json::Value {
        &self.properties
    }
}

/// A deploy-time input to the template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    parameter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Parameter {
    /// A string-typed parameter.
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            description: Some(description.into()),
        }
    }
}

/// A value published by the stack after deployment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The full declarative document: parameters, resources, and outputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    description: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    parameters: IndexMap<String, Parameter>,
    resources: IndexMap<String, Resource>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    outputs: IndexMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: description.into(),
            parameters: IndexMap::new(),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Logical ids share one namespace so `Ref` targets stay unambiguous.
    fn check_unique(&self, logical_id: &str) -> Result<()> {
        if self.parameters.contains_key(logical_id)
            || self.resources.contains_key(logical_id)
            || self.outputs.contains_key(logical_id)
        {
            return Err(Error::DuplicateLogicalId(logical_id.to_string()));
        }
        Ok(())
    }

    pub fn add_parameter(
        &mut self,
        logical_id: impl Into<String>,
        parameter: Parameter,
    ) -> Result<()> {
        let logical_id = logical_id.into();
        self.check_unique(&logical_id)?;
        self.parameters.insert(logical_id, parameter);
        Ok(())
    }

    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> Result<()> {
        let logical_id = logical_id.into();
        self.check_unique(&logical_id)?;
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    pub fn add_output(&mut self, logical_id: impl Into<String>, output: Output) -> Result<()> {
        let logical_id = logical_id.into();
        self.check_unique(&logical_id)?;
        self.outputs.insert(logical_id, output);
        Ok(())
    }

    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.parameters
    }

    pub fn resources(&self) -> &IndexMap<String, Resource> {
        &self.resources
    }

    pub fn outputs(&self) -> &IndexMap<String, Output> {
        &self.outputs
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Logical ids of every resource of the given engine type, in
    /// declaration order.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.resource_type == resource_type)
            .map(|(logical_id, _)| logical_id.as_str())
            .collect()
    }

    /// Renders the template as pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// Logical ids of resources whose properties `Ref` the given name. Works on
/// a parsed template document so callers can inspect both freshly
/// synthesized and engine-stored templates.
pub fn resources_referencing(template: &serde_json::Value, name: &str) -> Vec<String> {
    let Some(resources) = template.get("Resources").and_then(|v| v.as_object()) else {
        return Vec::new();
    };
    resources
        .iter()
        .filter(|(_, resource)| value_references(resource, name))
        .map(|(logical_id, _)| logical_id.clone())
        .collect()
}

fn value_references(value: &serde_json::Value, name: &str) -> bool {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(target)) = map.get("Ref") {
                if map.len() == 1 && target == name {
                    return true;
                }
            }
            map.values().any(|nested| value_references(nested, name))
        }
        serde_json::Value::Array(items) => items.iter().any(|item| value_references(item, name)),
        _ => false,
    }
}
