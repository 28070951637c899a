//! # Summary
//!
//! Multi-instance Paxos for a fixed set of peers. Each instance is an
//! independent single-decree agreement, identified by a sequence number.
//! Nothing is written to stable storage: a peer that crashes loses its
//! history and rejoins as if new.
//!
//! The application interface lives on [`Paxos`]:
//!
//! - `start(seq, v)`: begin agreement on instance `seq` with proposed value `v`
//! - `status(seq)`: the decided value of `seq`, if this peer knows it
//! - `done(seq)`: this peer no longer needs any instance `<= seq`
//! - `min()`: instances below this have been (or may be) forgotten
//! - `max()`: highest instance this peer has heard of, or `-1`

#[macro_use] extern crate derivative;
#[macro_use] extern crate log;

mod config;
mod instance;
mod message;
mod peer;
mod state;

pub mod rpc;
pub mod socket;

pub use crate::config::Config;
pub use crate::message::{
    AcceptArgs, AcceptReply, AcceptStatus, DecidedArgs, DecidedReply,
    PrepareArgs, PrepareReply, PrepareStatus, Reply, Request,
};
pub use crate::peer::Paxos;
pub use crate::state::{Ballot, Seq, Value};
