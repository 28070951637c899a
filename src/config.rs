use std::net::SocketAddr;
use std::time::Duration;

use crate::peer::Paxos;
use crate::state;

#[derive(Clone, Debug)]
pub struct Config {
    /// Addresses of every peer, including this one
    peers: Vec<SocketAddr>,

    /// Index of this peer into `peers`
    me: usize,

    /// Timeout for a single RPC to another peer
    timeout: Duration,

    /// Pause between failed proposal rounds
    retry: Duration,
}

impl Config {
    pub fn new(peers: Vec<SocketAddr>, me: usize) -> Self {
        assert!(me < peers.len(), "[INTERNAL ERROR]: peer index {} out of range", me);
        Config {
            peers,
            me,
            timeout: Duration::from_secs(1),
            retry: Duration::from_millis(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn me(&self) -> usize {
        self.me
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry(&self) -> Duration {
        self.retry
    }

    /// Address this peer listens on for other peers.
    pub fn addr(&self) -> SocketAddr {
        self.peers[self.me]
    }

    /// Binds this peer's address and starts answering peer RPCs.
    pub async fn run<V: state::Value>(self) -> std::io::Result<Paxos<V>> {
        let listener = tokio::net::TcpListener::bind(self.addr()).await?;
        let paxos = Paxos::new(self);
        paxos.serve(listener);
        Ok(paxos)
    }
}
