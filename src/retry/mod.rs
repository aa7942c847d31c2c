//! Retry module
//! - policy.rs: bounded attempts with exponential backoff

pub mod policy;

pub use policy::*;
