//! Credential model (tokens and redacted secrets) plus token introspection.

pub mod introspection;
pub mod token;

pub use introspection::*;
pub use token::{record::*, secret::*};
