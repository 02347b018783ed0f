//! Value types shared by both protocols: ballots, commands, instances and their dependencies.

#[macro_use]
mod macros;

mod ballot;
mod command;
mod conflict;
mod deps;
mod instance;
mod quorums;

pub use ballot::*;
pub use command::*;
pub use conflict::*;
pub use deps::*;
pub use instance::*;
pub use quorums::*;

/// ReplicaId identifies a replica in a group.
pub type ReplicaId = i64;

/// InstanceNo is the per-origin sequence number of an instance. Numbering starts at 1.
pub type InstanceNo = i64;

/// Seq is the EPaxos sequence attribute used to break ties inside a strongly connected
/// component.
pub type Seq = i64;

/// Slot is a position in a copilot log. Slot 0 is a sentinel that is always executed.
pub type Slot = i64;

/// DepKey is the identity of the data a command touches. Two commands interfere iff they share
/// a DepKey and neither is a no-op.
pub type DepKey = String;

/// The DepKey of a no-op. No-ops never interfere with anything.
pub const NOOP_DKEY: &str = "";

#[cfg(test)]
mod test_ballot;
#[cfg(test)]
mod test_quorums;
