//! Execution engine shared by both protocols.
//!
//! Committed instances form a dependency graph. Execution finds the strongly connected
//! components reachable from a committed root, backward along dependencies, and applies them in
//! reverse topological order, every component sorted by a protocol defined order.

mod engine;
mod log;
mod scc;
mod waiters;

pub use engine::*;
pub use log::*;
pub use scc::*;
pub use waiters::*;

use serde::{Deserialize, Serialize};

use crate::types::Command;

/// ExecPolicy is what execution does on reaching an uncommitted dependency.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPolicy {
    /// Block until the dependency commits; recover it if that takes too long.
    #[serde(rename = "wait")]
    WaitAtUncommitted,

    /// Give up and retry when the dependency commits.
    #[serde(rename = "abort")]
    AbortAtUncommitted,
}

impl Default for ExecPolicy {
    fn default() -> Self {
        ExecPolicy::WaitAtUncommitted
    }
}

/// Apply hands an executed command to the state machine. It is called exactly once per
/// executed instance, no-ops included, in execution order.
///
/// No replica lock is held while it runs, so an applier may read the replica. An instance
/// is marked executed only after its command is applied.
pub trait Apply: Send + Sync {
    fn apply(&self, cmd: &Command);
}

impl<F> Apply for F
where
    F: Fn(&Command) + Send + Sync,
{
    fn apply(&self, cmd: &Command) {
        self(cmd)
    }
}

#[cfg(test)]
mod test_scc;
