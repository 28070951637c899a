//! # Summary
//!
//! The replicated state machine. Maps each held lock to its holder; a lock
//! with no entry is unlocked. Agreed operations are applied strictly in
//! log order, and only through `apply`.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap as Map;
use paxos::Seq;

use crate::message::Status;
use crate::op::{ClientId, Kind, LockId, Op};

/// Result of applying one operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Final answer for the requesting client.
    Done(Status),

    /// Lock is held by someone; the request must go through the log again.
    Busy,
}

#[derive(Debug)]
pub struct LockTable {
    /// Current holder of every held lock
    locks: Map<LockId, ClientId>,

    /// Highest instance applied so far
    max: Seq,
}

impl Default for LockTable {
    fn default() -> Self {
        LockTable {
            locks: Map::default(),
            max: -1,
        }
    }
}

impl LockTable {
    /// Highest instance applied so far, or -1.
    pub fn max(&self) -> Seq {
        self.max
    }

    pub fn holder(&self, lock: LockId) -> Option<ClientId> {
        self.locks.get(&lock).copied()
    }

    /// Applies the operation agreed on for instance `seq`.
    ///
    /// # Panics
    ///
    /// If `seq` is not exactly one past the last applied instance.
    pub fn apply(&mut self, seq: Seq, op: &Op) -> Outcome {
        if seq != self.max + 1 {
            error!("applying instance {} out of order, expected {}", seq, self.max + 1);
            panic!("[INTERNAL ERROR]: applying instance {} out of order, expected {}", seq, self.max + 1);
        }
        self.max = seq;
        let outcome = match op.kind {
        | Kind::Lock => match self.locks.entry(op.lock) {
            | Entry::Occupied(_) => Outcome::Busy,
            | Entry::Vacant(entry) => {
                entry.insert(op.client);
                Outcome::Done(Status::Ok)
            }
        },
        | Kind::Unlock => match self.locks.get(&op.lock) {
            | None => Outcome::Done(Status::NotLocked),
            | Some(holder) if *holder != op.client => Outcome::Done(Status::NotYourLock),
            | Some(_) => {
                self.locks.remove(&op.lock);
                Outcome::Done(Status::Ok)
            }
        },
        };
        info!("applied {:?} at instance {}: {:?}", op, seq, outcome);
        outcome
    }
}
