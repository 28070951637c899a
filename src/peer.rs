//! # Summary
//!
//! This module defines the `Paxos` peer, which plays proposer, acceptor,
//! and learner for an unbounded sequence of independent instances.
//!
//! All instance state and the done vector sit behind one mutex. The mutex
//! is only ever held to read or mutate that state, never across a network
//! call. Messages to this peer's own acceptor are plain function calls.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::instance::Instances;
use crate::message::*;
use crate::rpc;
use crate::state::{Ballot, Seq, Value};

/// Handle to a Paxos peer. All clones refer to the same peer.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Paxos<V: Value>(Arc<Inner<V>>);

struct Inner<V: Value> {
    /// Index of this peer into `peers`
    me: usize,

    /// Addresses of every peer, including this one
    peers: Vec<SocketAddr>,

    /// Number of peers required for a quorum
    majority: usize,

    /// Timeout for a single RPC to another peer
    timeout: Duration,

    /// Pause between failed proposal rounds
    retry: Duration,

    /// Cancelled once this peer is killed
    dead: CancellationToken,

    state: Mutex<State<V>>,
}

struct State<V> {
    instances: Instances<V>,

    /// Highest done value heard from each peer, -1 if none
    done: Vec<Seq>,
}

impl<V: Value> State<V> {
    fn min(&self) -> Seq {
        self.done.iter()
            .copied()
            .min()
            .unwrap_or(-1) + 1
    }
}

/// Outcome of one prepare or accept phase.
enum Phase<T> {
    /// A majority agreed.
    Quorum(T),

    /// Not enough peers agreed; retry with a higher proposal.
    Short,

    /// Some peer already knows the decided value.
    Decided,
}

impl<V: Value> Paxos<V> {
    pub fn new(config: Config) -> Self {
        let peers = config.peers().to_vec();
        let count = peers.len();
        Paxos(Arc::new(Inner {
            me: config.me(),
            majority: count / 2 + 1,
            timeout: config.timeout(),
            retry: config.retry(),
            dead: CancellationToken::new(),
            state: Mutex::new(State {
                instances: Instances::default(),
                done: vec![-1; count],
            }),
            peers,
        }))
    }

    /// Answers peer RPCs arriving on `listener` until this peer is killed.
    pub fn serve(&self, listener: TcpListener) {
        let paxos = self.clone();
        let dead = self.0.dead.clone();
        tokio::spawn(rpc::serve(listener, dead, move |request: Request<V>| {
            let paxos = paxos.clone();
            async move { Some(paxos.handle(request)) }
        }));
    }

    pub fn me(&self) -> usize {
        self.0.me
    }

    pub fn addr(&self) -> SocketAddr {
        self.0.peers[self.0.me]
    }

    /// Begin agreement on instance `seq` with proposed value `value`.
    /// Returns immediately; poll `status` to learn the outcome, which
    /// need not be `value`.
    pub fn start(&self, seq: Seq, value: V) {
        {
            let mut state = self.0.state.lock();
            if seq < state.min() {
                return
            }
            state.instances.entry(seq);
        }
        debug!("[{}] starting instance {} with {:?}", self.0.me, seq, value);
        tokio::spawn(self.clone().propose(seq, value));
    }

    /// Decided value of instance `seq`, if this peer knows it.
    /// Only inspects local state.
    pub fn status(&self, seq: Seq) -> Option<V> {
        let state = self.0.state.lock();
        if seq < state.min() {
            return None
        }
        state.instances
            .get(seq)
            .and_then(|instance| instance.decided().cloned())
    }

    /// The application on this peer no longer needs any instance `<= seq`.
    pub fn done(&self, seq: Seq) {
        {
            let mut state = self.0.state.lock();
            let me = self.0.me;
            state.done[me] = std::cmp::max(state.done[me], seq);
        }
        self.forget();
    }

    /// One more than the lowest done value across all peers. Instances
    /// below this have been, or may at any moment be, forgotten.
    ///
    /// A peer that has never been heard from counts as -1, so an
    /// unreachable peer holds `min` back until it can catch up.
    pub fn min(&self) -> Seq {
        self.0.state.lock().min()
    }

    /// Highest instance this peer has any record of, or -1.
    pub fn max(&self) -> Seq {
        self.0.state.lock().instances.max()
    }

    /// Shut this peer down. Stops the listener and all proposer loops.
    pub fn kill(&self) {
        info!("[{}] killed", self.0.me);
        self.0.dead.cancel();
    }

    pub fn is_dead(&self) -> bool {
        self.0.dead.is_cancelled()
    }

    /// Dispatches an incoming peer RPC.
    pub fn handle(&self, request: Request<V>) -> Reply<V> {
        match request {
        | Request::Prepare(args) => Reply::Prepare(self.prepare(args)),
        | Request::Accept(args) => Reply::Accept(self.accept(args)),
        | Request::Decided(args) => Reply::Decided(self.decided(args)),
        }
    }

    pub fn prepare(&self, args: PrepareArgs) -> PrepareReply<V> {
        let mut state = self.0.state.lock();
        let done = state.done[self.0.me];
        let status = if args.seq < state.min() {
            PrepareStatus::Reject
        } else {
            state.instances.entry(args.seq).prepare(args.ballot)
        };
        trace!("[{}] prepare {:?} -> {:?}", self.0.me, args, status);
        PrepareReply { status, done }
    }

    pub fn accept(&self, args: AcceptArgs<V>) -> AcceptReply<V> {
        let mut state = self.0.state.lock();
        let done = state.done[self.0.me];
        let status = if args.seq < state.min() {
            AcceptStatus::Reject
        } else {
            state.instances.entry(args.seq).accept(args.ballot, args.value)
        };
        trace!("[{}] accept {} @ {} -> {:?}", self.0.me, args.seq, args.ballot, status);
        AcceptReply { status, done }
    }

    pub fn decided(&self, args: DecidedArgs<V>) -> DecidedReply {
        let mut state = self.0.state.lock();
        let done = state.done[self.0.me];
        if args.seq >= state.min() && state.instances.entry(args.seq).decide(args.value) {
            debug!("[{}] learned instance {}", self.0.me, args.seq);
        }
        DecidedReply { done }
    }

    /// Drive instance `seq` to a decision, proposing `value` if free to.
    async fn propose(self, seq: Seq, value: V) {
        let count = self.0.peers.len() as Ballot;
        let mut ballot = self.0.me as Ballot;
        while !self.is_dead() && !self.settled(seq) {
            match self.send_prepares(seq, ballot).await {
            | Phase::Decided => continue,
            | Phase::Short => (),
            | Phase::Quorum(accepted) => {
                let value = accepted.unwrap_or_else(|| value.clone());
                match self.send_accepts(seq, ballot, value.clone()).await {
                | Phase::Decided => continue,
                | Phase::Short => (),
                | Phase::Quorum(()) => {
                    self.send_decides(seq, value).await;
                    continue
                }
                }
            }
            }
            debug!("[{}] proposal {} for instance {} failed", self.0.me, ballot, seq);
            ballot += count;
            tokio::time::sleep(self.0.retry).await;
        }
        self.forget();
    }

    /// Whether instance `seq` is decided locally or already forgotten.
    fn settled(&self, seq: Seq) -> bool {
        let state = self.0.state.lock();
        seq < state.min() || state.instances.is_decided(seq)
    }

    /// Prepare phase. On quorum, yields the value of the highest
    /// proposal any acceptor has already accepted.
    async fn send_prepares(&self, seq: Seq, ballot: Ballot) -> Phase<Option<V>> {
        let replies = self.broadcast(Request::Prepare(PrepareArgs { seq, ballot })).await;
        let mut oks = 0;
        let mut highest: Option<(Ballot, V)> = None;
        for reply in replies.into_iter().flatten() {
            match reply {
            | Reply::Prepare(PrepareReply { status: PrepareStatus::Ok(accepted), .. }) => {
                oks += 1;
                if let Some((n_a, v_a)) = accepted {
                    if highest.as_ref().map_or(true, |(n, _)| n_a > *n) {
                        highest = Some((n_a, v_a));
                    }
                }
            }
            | Reply::Prepare(PrepareReply { status: PrepareStatus::Decided(value), .. }) => {
                self.send_decides(seq, value).await;
                return Phase::Decided
            }
            | _ => (),
            }
        }
        if oks >= self.0.majority {
            Phase::Quorum(highest.map(|(_, value)| value))
        } else {
            Phase::Short
        }
    }

    /// Accept phase. Only replies naming exactly `ballot` count towards quorum.
    async fn send_accepts(&self, seq: Seq, ballot: Ballot, value: V) -> Phase<()> {
        let replies = self.broadcast(Request::Accept(AcceptArgs { seq, ballot, value })).await;
        let mut oks = 0;
        for reply in replies.into_iter().flatten() {
            match reply {
            | Reply::Accept(AcceptReply { status: AcceptStatus::Ok(accepted), .. }) => {
                if accepted == ballot {
                    oks += 1;
                }
            }
            | Reply::Accept(AcceptReply { status: AcceptStatus::Decided(value), .. }) => {
                self.send_decides(seq, value).await;
                return Phase::Decided
            }
            | _ => (),
            }
        }
        if oks >= self.0.majority {
            Phase::Quorum(())
        } else {
            Phase::Short
        }
    }

    /// Tell every reachable peer, including this one, that `seq` is decided.
    async fn send_decides(&self, seq: Seq, value: V) {
        debug!("[{}] instance {} decided {:?}", self.0.me, seq, value);
        self.broadcast(Request::Decided(DecidedArgs { seq, value })).await;
    }

    /// Sends `request` to all peers in parallel. Replies line up with
    /// `peers`; `None` marks a peer that could not be reached.
    async fn broadcast(&self, request: Request<V>) -> Vec<Option<Reply<V>>> {
        let calls = (0..self.0.peers.len())
            .map(|peer| self.call(peer, request.clone()));
        future::join_all(calls).await
    }

    /// Single RPC to `peer`, recording the done value it piggybacks.
    async fn call(&self, peer: usize, request: Request<V>) -> Option<Reply<V>> {
        let reply = if peer == self.0.me {
            Some(self.handle(request))
        } else {
            rpc::call(self.0.peers[peer], &request, Some(self.0.timeout)).await
        }?;
        let mut state = self.0.state.lock();
        state.done[peer] = std::cmp::max(state.done[peer], reply.done());
        Some(reply)
    }

    /// Drop every instance below `min`.
    fn forget(&self) {
        let mut state = self.0.state.lock();
        let min = state.min();
        let forgotten = state.instances.forget(min);
        if forgotten > 0 {
            debug!(
                "[{}] forgot {} instances below {}, {} remain",
                self.0.me,
                forgotten,
                min,
                state.instances.len(),
            );
        }
    }
}
