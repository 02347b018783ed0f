//! Copilot: a two-log variant with two designated proposers.
//!
//! The pilot appends to the pilot log and the copilot to the copilot log. Every entry depends
//! on a slot of the other log, so both logs together form one dependency graph, executed with
//! the same engine as EPaxos. If either proposer is slow, the other one's entries still commit
//! and anyone may take over a stuck entry.

mod broadcast;
mod coordinator;
mod errors;
mod exec;
mod logs;
mod message;
mod server;
mod takeover;
mod types;

pub use broadcast::*;
pub use errors::*;
pub use logs::*;
pub use message::*;
pub use server::*;
pub use types::*;

#[cfg(test)]
mod test_server;
