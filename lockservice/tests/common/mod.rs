use std::net::SocketAddr;
use std::time::Duration;

use lockservice::{LockClient, LockService};
use paxos::{Config, Paxos};
use tokio::net::TcpListener;

pub struct Server {
    pub service: LockService,
    pub addr: SocketAddr,
}

impl Server {
    pub fn client(&self, id: i64) -> LockClient {
        LockClient::with_id(self.addr, id)
    }
}

async fn loopback() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Starts `count` lock servers in this process, each with its own Paxos peer.
pub async fn cluster(count: usize) -> Vec<Server> {
    let mut peer_listeners = Vec::with_capacity(count);
    let mut peers = Vec::with_capacity(count);
    for _ in 0..count {
        let (listener, addr) = loopback().await;
        peer_listeners.push(listener);
        peers.push(addr);
    }
    let mut servers = Vec::with_capacity(count);
    for (me, peer_listener) in peer_listeners.into_iter().enumerate() {
        let config = Config::new(peers.clone(), me)
            .with_timeout(Duration::from_millis(250));
        let paxos = Paxos::new(config);
        paxos.serve(peer_listener);
        let service = LockService::new(paxos);
        let (client_listener, addr) = loopback().await;
        service.serve(client_listener);
        servers.push(Server { service, addr });
    }
    servers
}

/// Fails the test if `future` takes longer than `secs` seconds.
pub async fn within<F: std::future::Future>(secs: u64, future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(secs), future)
        .await
        .expect("timed out")
}
