//! Process setup and an in-process workload runner for the `epaxos` crate.

#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate slog;

pub mod runner;
pub mod setup;
