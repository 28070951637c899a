use std::net::SocketAddr;
use std::time::Duration;

use paxos::{Config, Paxos, Seq, Value};
use tokio::net::TcpListener;

/// Starts `count` peers on loopback ports, all in this process.
pub async fn cluster<V: Value>(count: usize) -> Vec<Paxos<V>> {
    partial_cluster(count, count).await
}

/// Like `cluster`, but only the first `serving` peers answer RPCs.
/// The rest are unreachable until their address is bound again.
pub async fn partial_cluster<V: Value>(count: usize, serving: usize) -> Vec<Paxos<V>> {
    let mut listeners = Vec::with_capacity(count);
    for _ in 0..count {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let peers: Vec<SocketAddr> = listeners.iter()
        .map(|listener| listener.local_addr().unwrap())
        .collect();
    listeners.into_iter()
        .enumerate()
        .map(|(me, listener)| {
            let config = Config::new(peers.clone(), me)
                .with_timeout(Duration::from_millis(250));
            let paxos = Paxos::new(config);
            if me < serving {
                paxos.serve(listener);
            }
            paxos
        })
        .collect()
}

/// Number of peers that consider `seq` decided. Panics if two peers
/// disagree on the decided value.
pub fn ndecided<V: Value>(peers: &[Paxos<V>], seq: Seq) -> usize {
    let mut decided: Option<V> = None;
    let mut count = 0;
    for peer in peers {
        if let Some(value) = peer.status(seq) {
            if let Some(previous) = &decided {
                assert_eq!(previous, &value, "peers decided different values for {}", seq);
            }
            decided = Some(value);
            count += 1;
        }
    }
    count
}

/// Waits until at least `wanted` peers have decided `seq`.
pub async fn wait_for<V: Value>(peers: &[Paxos<V>], seq: Seq, wanted: usize) {
    let mut pause = Duration::from_millis(10);
    for _ in 0..30 {
        if ndecided(peers, seq) >= wanted {
            return
        }
        tokio::time::sleep(pause).await;
        pause = std::cmp::min(pause * 2, Duration::from_secs(1));
    }
    panic!("too few peers decided instance {}: {} < {}", seq, ndecided(peers, seq), wanted);
}
