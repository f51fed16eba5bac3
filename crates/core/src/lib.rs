//! Core model for the RAG query API stack (Functional Core).
//!
//! Everything in this crate is pure data and pure functions: the desired
//! infrastructure is described with plain structs and synthesized into a
//! CloudFormation template. No I/O happens here; handing the template to
//! the provisioning engine is the CLI's job.

mod error;
mod expr;
mod stack;
mod template;

pub mod resources;

pub use error::{Error, Result};
pub use expr::Expr;
pub use stack::{
    ids, rag_api_stack_config, synthesize, Architecture, AttributeType, BillingMode,
    FunctionConfig, GrantsConfig, KeyAttribute, StackConfig, TableAccess, TableConfig, UrlAuth,
    TABLE_NAME_ENV, TABLE_READ_WRITE_ACTIONS,
};
pub use template::{
    resources_referencing, Output, Parameter, Resource, ResourceProperties, Template,
    FORMAT_VERSION,
};
