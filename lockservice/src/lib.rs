//! # Summary
//!
//! A distributed lock service replicated with Paxos. Every server funnels
//! client requests through a single worker that agrees on them, one log
//! instance at a time, and applies the agreed log to its lock table in
//! order. All servers therefore see the same sequence of grants and
//! releases.

#[macro_use] extern crate log;

mod handle;
mod message;
mod op;
mod service;
mod table;

pub mod logging;

pub use crate::handle::LockClient;
pub use crate::message::{LockArgs, Reply, Request, Status, UnlockArgs};
pub use crate::op::{ClientId, Kind, LockId, Op};
pub use crate::service::LockService;
pub use crate::table::{LockTable, Outcome};
