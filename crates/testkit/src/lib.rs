#![warn(missing_docs)]
//! Test support: fixtures, a loopback client/server harness, and an event log.

mod fixtures;
mod harness;
mod log;

pub use fixtures::*;
pub use harness::*;
pub use log::*;
