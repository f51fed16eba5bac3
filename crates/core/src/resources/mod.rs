//! Typed property sets for the resource kinds the stack declares.
//!
//! Each module mirrors the engine's wire schema for one service: PascalCase
//! members, string-coded enums restricted to the variants this stack
//! actually uses.

pub mod dynamodb;
pub mod iam;
pub mod lambda;
