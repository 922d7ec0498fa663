//! Token snapshots and the secret wrapper that keeps identifiers out of logs.

pub mod record;
pub mod secret;
