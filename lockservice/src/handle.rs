use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;

use crate::message::{LockArgs, Reply, Request, Status, UnlockArgs};
use crate::op::{ClientId, LockId};

/// Client-side handle to a single lock server.
#[derive(Clone, Debug)]
pub struct LockClient {
    server: SocketAddr,
    id: ClientId,

    /// Bound on a whole request; `None` waits for as long as the lock is held
    timeout: Option<Duration>,
}

impl LockClient {
    /// Client with a randomly chosen ID.
    pub fn new(server: SocketAddr) -> Self {
        let id = rand::thread_rng().gen_range(0..ClientId::MAX);
        Self::with_id(server, id)
    }

    pub fn with_id(server: SocketAddr, id: ClientId) -> Self {
        LockClient {
            server,
            id,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Blocks until `lock` is ours.
    pub async fn lock(&self, lock: LockId) -> Status {
        self.call(Request::Lock(LockArgs { client: self.id, lock })).await
    }

    pub async fn unlock(&self, lock: LockId) -> Status {
        self.call(Request::Unlock(UnlockArgs { client: self.id, lock })).await
    }

    /// A failed call says nothing about whether the request took effect.
    async fn call(&self, request: Request) -> Status {
        match paxos::rpc::call::<Request, Reply>(self.server, &request, self.timeout).await {
        | Some(reply) => reply.status,
        | None => Status::ConnectionFailure,
        }
    }
}
