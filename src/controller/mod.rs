//! # Controller
//!
//! The mirroring engine: decode stored values, compare them with local files,
//! rewrite stale files, react to keyspace notifications and run the reload
//! command.

pub mod codec;
pub mod events;
pub mod listener;
pub mod mirror;
pub mod notifier;
pub mod reconciler;
pub mod server;

pub use listener::{ListenError, ListenOutcome};
pub use notifier::{CommandOutput, CommandRunner, Notifier, ShellRunner};
pub use reconciler::{PassError, ReconcileError, Reconciler};
