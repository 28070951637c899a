use serde_derive::{Deserialize, Serialize};

pub type ClientId = i64;

pub type LockId = i64;

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Lock,
    Unlock,
}

/// A single lock operation: the unit of agreement in the replicated log.
/// Two ops are the same request iff all fields match.
#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Op {
    pub kind: Kind,
    pub client: ClientId,
    pub lock: LockId,
}

impl Op {
    pub fn lock(client: ClientId, lock: LockId) -> Self {
        Op { kind: Kind::Lock, client, lock }
    }

    pub fn unlock(client: ClientId, lock: LockId) -> Self {
        Op { kind: Kind::Unlock, client, lock }
    }
}
