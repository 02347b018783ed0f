//! Leaderless replication: EPaxos and its two-log Copilot variant.
//!
//! Any replica proposes a command; conflicts are discovered by quorum voting and recorded as
//! dependencies; every replica executes the committed dependency graph in the same order.

#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate slog;

#[macro_use]
pub mod types;

pub mod comm;
pub mod conf;
pub mod copilot;
pub mod exec;
pub mod message;
pub mod quorum;
pub mod replica;
pub mod replication;
pub mod testutil;
pub mod tracker;

pub use conf::ClusterConf;
pub use conf::ReplicaConf;
pub use copilot::CopilotError;
pub use copilot::CopilotServer;
pub use replica::Replica;
pub use replication::ReplicationError;
