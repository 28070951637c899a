//! # Summary
//!
//! This module defines the `LockService`, which turns client requests
//! into a single agreed log and applies that log to the lock table.
//!
//! Requests from all connections land in one bounded queue. A single
//! worker drains it, one request at a time: it proposes the request at the
//! next free instance, waits for that instance to be decided, and applies
//! whatever was decided. If the decided op was someone else's, the worker
//! tries again at the following instance. Since the worker is the only
//! code that touches the lock table, instances are applied in order and
//! exactly once.

use std::net::SocketAddr;
use std::time::Duration;

use paxos::{Paxos, Seq};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::message::{Reply, Request, Status};
use crate::op::{ClientId, LockId, Op};
use crate::table::{LockTable, Outcome};

/// Capacity of the pending request queue
const QUEUE: usize = 256;

/// First pause when waiting on agreement or a busy lock
const BACKOFF: Duration = Duration::from_millis(10);

/// Cap on the pause between agreement polls
const POLL_CAP: Duration = Duration::from_secs(10);

/// Pause between lock attempts stops doubling once it reaches this
const LOCK_CAP: Duration = Duration::from_secs(1);

/// Handle to a running lock service. All clones refer to the same service.
#[derive(Clone)]
pub struct LockService {
    paxos: Paxos<Op>,
    requests: mpsc::Sender<Pending>,
    dead: CancellationToken,
}

/// A request waiting for its turn in the log.
#[derive(Debug)]
struct Pending {
    op: Op,
    response: oneshot::Sender<Outcome>,
}

/// Sole owner of the lock table.
struct Worker {
    paxos: Paxos<Op>,
    table: LockTable,
    requests: mpsc::Receiver<Pending>,
}

impl LockService {
    /// Starts the serializing worker on top of `paxos`.
    pub fn new(paxos: Paxos<Op>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE);
        let dead = CancellationToken::new();
        let worker = Worker {
            paxos: paxos.clone(),
            table: LockTable::default(),
            requests: rx,
        };
        tokio::spawn(worker.run(dead.clone()));
        LockService {
            paxos,
            requests: tx,
            dead,
        }
    }

    /// Binds the Paxos peer described by `config` and a client listener on
    /// `addr`, and starts serving both.
    pub async fn run(config: paxos::Config, addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let paxos = config.run().await?;
        let service = LockService::new(paxos);
        service.serve(listener);
        info!("[{}] serving clients on {}", service.paxos.me(), addr);
        Ok(service)
    }

    /// Answers client RPCs arriving on `listener` until this service is killed.
    pub fn serve(&self, listener: TcpListener) {
        let service = self.clone();
        let dead = self.dead.clone();
        tokio::spawn(paxos::rpc::serve(listener, dead, move |request: Request| {
            let service = service.clone();
            async move { service.handle(request).await }
        }));
    }

    pub fn paxos(&self) -> &Paxos<Op> {
        &self.paxos
    }

    /// Answers one client RPC. `None` if the service has shut down.
    pub async fn handle(&self, request: Request) -> Option<Reply> {
        trace!("received {:?}", request);
        let status = match request {
        | Request::Lock(args) => self.lock(args.client, args.lock).await,
        | Request::Unlock(args) => self.unlock(args.client, args.lock).await,
        }?;
        Some(Reply { status })
    }

    /// Acquires `lock` for `client`, waiting as long as someone else holds it.
    pub async fn lock(&self, client: ClientId, lock: LockId) -> Option<Status> {
        let op = Op::lock(client, lock);
        let mut pause = BACKOFF;
        loop {
            match self.submit(op).await? {
            | Outcome::Done(status) => return Some(status),
            | Outcome::Busy => {
                debug!("lock {} busy, client {} retrying in {:?}", lock, client, pause);
                tokio::time::sleep(pause).await;
                if pause < LOCK_CAP {
                    pause *= 2;
                }
            }
            }
        }
    }

    /// Releases `lock` on behalf of `client`.
    pub async fn unlock(&self, client: ClientId, lock: LockId) -> Option<Status> {
        match self.submit(Op::unlock(client, lock)).await? {
        | Outcome::Done(status) => Some(status),
        | Outcome::Busy => unreachable!("[INTERNAL ERROR]: unlock reported busy"),
        }
    }

    /// Queues `op` and waits until it has been applied.
    async fn submit(&self, op: Op) -> Option<Outcome> {
        let (tx, rx) = oneshot::channel();
        let pending = Pending { op, response: tx };
        self.requests.send(pending).await.ok()?;
        rx.await.ok()
    }

    /// Shut down the service and its Paxos peer.
    pub fn kill(&self) {
        self.dead.cancel();
        self.paxos.kill();
    }

    pub fn is_dead(&self) -> bool {
        self.dead.is_cancelled()
    }
}

impl Worker {
    async fn run(mut self, dead: CancellationToken) {
        loop {
            let pending = tokio::select! {
                biased;
                _ = dead.cancelled() => break,
                pending = self.requests.recv() => match pending {
                | Some(pending) => pending,
                | None => break,
                },
            };
            let outcome = tokio::select! {
                biased;
                _ = dead.cancelled() => break,
                outcome = self.agree(pending.op) => outcome,
            };
            // Requester may have hung up.
            pending.response.send(outcome).ok();
        }
        debug!("[{}] worker stopped at instance {}", self.paxos.me(), self.table.max());
    }

    /// Gets `op` into the log, applying every instance decided before it.
    async fn agree(&mut self, op: Op) -> Outcome {
        loop {
            let seq = self.table.max() + 1;
            self.paxos.start(seq, op);
            let decided = Self::wait(&self.paxos, seq).await;
            let outcome = self.table.apply(seq, &decided);
            self.paxos.done(seq);
            if decided == op {
                return outcome
            }
            debug!("[{}] instance {} went to {:?}, retrying {:?}", self.paxos.me(), seq, decided, op);
        }
    }

    /// Polls until instance `seq` is decided.
    async fn wait(paxos: &Paxos<Op>, seq: Seq) -> Op {
        let mut pause = BACKOFF;
        loop {
            if let Some(op) = paxos.status(seq) {
                return op
            }
            tokio::time::sleep(pause).await;
            pause = std::cmp::min(pause * 2, POLL_CAP);
        }
    }
}
