//! # Summary
//!
//! This module holds the acceptor and learner state for every instance
//! this peer has heard of. It does no locking of its own: the owning
//! `Paxos` peer only touches it while holding its state mutex.

use hashbrown::HashMap as Map;

use crate::message::{AcceptStatus, PrepareStatus};
use crate::state::{Ballot, Seq, Value};

/// Acceptor state for a single instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance<V> {
    /// Highest prepare seen (n_p)
    promised: Ballot,

    /// Highest accepted proposal (n_a)
    accepted: Ballot,

    /// Value of the highest accepted proposal (v_a)
    value: Option<V>,

    /// Whether `value` is final
    decided: bool,
}

impl<V> Default for Instance<V> {
    fn default() -> Self {
        Instance {
            promised: -1,
            accepted: -1,
            value: None,
            decided: false,
        }
    }
}

impl<V: Value> Instance<V> {
    /// Decided value, if any.
    pub fn decided(&self) -> Option<&V> {
        if self.decided { self.value.as_ref() } else { None }
    }

    /// Promise not to accept anything below `ballot`, if nothing
    /// at or above it has been promised yet.
    pub fn prepare(&mut self, ballot: Ballot) -> PrepareStatus<V> {
        if let Some(value) = self.decided() {
            return PrepareStatus::Decided(value.clone())
        }
        if ballot <= self.promised {
            return PrepareStatus::Reject
        }
        self.promised = ballot;
        let accepted = self.value
            .clone()
            .map(|value| (self.accepted, value));
        PrepareStatus::Ok(accepted)
    }

    /// Accept `value` under `ballot` unless a higher prepare has been seen.
    pub fn accept(&mut self, ballot: Ballot, value: V) -> AcceptStatus<V> {
        if let Some(value) = self.decided() {
            return AcceptStatus::Decided(value.clone())
        }
        if ballot < self.promised {
            return AcceptStatus::Reject
        }
        self.promised = ballot;
        self.accepted = ballot;
        self.value = Some(value);
        AcceptStatus::Ok(ballot)
    }

    /// Mark `value` as final. Returns false if already decided.
    pub fn decide(&mut self, value: V) -> bool {
        if self.decided {
            return false
        }
        self.decided = true;
        self.value = Some(value);
        true
    }
}

/// All instances this peer currently remembers.
#[derive(Debug)]
pub struct Instances<V> {
    instances: Map<Seq, Instance<V>>,
}

impl<V> Default for Instances<V> {
    fn default() -> Self {
        Instances { instances: Map::default() }
    }
}

impl<V: Value> Instances<V> {
    pub fn get(&self, seq: Seq) -> Option<&Instance<V>> {
        self.instances.get(&seq)
    }

    /// Instance record for `seq`, created in its initial state on first contact.
    pub fn entry(&mut self, seq: Seq) -> &mut Instance<V> {
        self.instances.entry(seq).or_default()
    }

    pub fn is_decided(&self, seq: Seq) -> bool {
        self.get(seq).map_or(false, |instance| instance.decided)
    }

    /// Highest instance with a local record, or -1.
    pub fn max(&self) -> Seq {
        self.instances.keys()
            .copied()
            .max()
            .unwrap_or(-1)
    }

    /// Drops every instance below `min`. Returns how many were dropped.
    pub fn forget(&mut self, min: Seq) -> usize {
        let before = self.instances.len();
        self.instances.retain(|seq, _| *seq >= min);
        before - self.instances.len()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }
}
