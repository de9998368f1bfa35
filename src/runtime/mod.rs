//! # Runtime
//!
//! Long-running loop around the controller plus startup helpers.

pub mod error_policy;
pub mod initialization;
pub mod supervisor;

pub use supervisor::{CycleError, Supervisor};
