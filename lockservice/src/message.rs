use serde_derive::{Deserialize, Serialize};

use crate::op::{ClientId, LockId};

/// Terminal outcome of a lock or unlock request.
#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    NotLocked,
    NotYourLock,

    /// The client could not reach its server. Never sent by a server.
    ConnectionFailure,
}

impl std::fmt::Display for Status {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        let status = match self {
        | Status::Ok => "OK",
        | Status::NotLocked => "NotLocked",
        | Status::NotYourLock => "NotYourLock",
        | Status::ConnectionFailure => "ConnectionFailure",
        };
        write!(fmt, "{}", status)
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LockArgs {
    pub client: ClientId,
    pub lock: LockId,
}

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnlockArgs {
    pub client: ClientId,
    pub lock: LockId,
}

/// Client-to-server requests.
#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Lock(LockArgs),
    Unlock(UnlockArgs),
}

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
}
