mod common;

use std::time::Duration;

use paxos::{AcceptArgs, AcceptStatus, DecidedArgs, PrepareArgs, PrepareStatus, Reply, Request};
use tokio::net::TcpListener;

use common::{cluster, ndecided, partial_cluster, wait_for};

#[tokio::test(flavor = "multi_thread")]
async fn single_peer_decides_alone() {
    let peers = cluster::<String>(1).await;
    peers[0].start(0, "hello".to_string());
    wait_for(&peers, 0, 1).await;
    assert_eq!(peers[0].status(0), Some("hello".to_string()));
    assert_eq!(peers[0].max(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_instance_is_undecided() {
    let peers = cluster::<u64>(3).await;
    assert_eq!(peers[1].status(7), None);
    assert_eq!(peers[1].max(), -1);
    assert_eq!(peers[1].min(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn all_peers_learn_the_value() {
    let peers = cluster::<u64>(3).await;
    peers[0].start(0, 100);
    wait_for(&peers, 0, 3).await;
    for peer in &peers {
        assert_eq!(peer.status(0), Some(100));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_proposers_agree() {
    let peers = cluster::<u64>(5).await;
    for (i, peer) in peers.iter().enumerate() {
        peer.start(0, i as u64 * 10);
    }
    wait_for(&peers, 0, 5).await;
    let value = peers[0].status(0).unwrap();
    assert!(value % 10 == 0 && value < 50);
}

#[tokio::test(flavor = "multi_thread")]
async fn out_of_order_instances() {
    let peers = cluster::<u64>(3).await;
    for seq in [7, 3, 5, 0] {
        peers[(seq % 3) as usize].start(seq, seq as u64 + 1000);
    }
    for seq in [0, 3, 5, 7] {
        wait_for(&peers, seq, 3).await;
        assert_eq!(peers[2].status(seq), Some(seq as u64 + 1000));
    }
    for peer in &peers {
        assert_eq!(peer.max(), 7);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn majority_survives_a_dead_peer() {
    let peers = cluster::<u64>(3).await;
    peers[0].start(0, 1);
    wait_for(&peers, 0, 3).await;

    peers[2].kill();
    peers[0].start(1, 2);
    wait_for(&peers[..2], 1, 2).await;

    // The dead peer keeps what it knew and invents nothing.
    assert_eq!(peers[2].status(0), Some(1));
    assert_eq!(peers[2].status(1), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn minority_cannot_decide() {
    let peers = cluster::<u64>(3).await;
    peers[1].kill();
    peers[2].kill();
    peers[0].start(0, 9);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(ndecided(&peers, 0), 0);
    peers[0].kill();
}

#[tokio::test(flavor = "multi_thread")]
async fn min_waits_for_every_peer() {
    let peers = cluster::<u64>(3).await;
    for seq in 0..4 {
        peers[0].start(seq, seq as u64);
        wait_for(&peers, seq, 3).await;
    }
    peers[0].done(2);
    peers[1].done(2);
    // Peer 2 never called done, so nothing may be forgotten.
    peers[0].start(4, 4);
    wait_for(&peers, 4, 3).await;
    for peer in &peers {
        assert_eq!(peer.min(), 0);
        assert_eq!(peer.status(0), Some(0));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn forgets_once_everyone_is_done() {
    let peers = cluster::<u64>(3).await;
    for seq in 0..4 {
        peers[0].start(seq, seq as u64);
        wait_for(&peers, seq, 3).await;
    }
    for peer in &peers {
        peer.done(2);
    }
    // Done values spread by piggybacking on the next round of traffic.
    for (seq, peer) in (4..7).zip(&peers) {
        peer.start(seq, seq as u64);
        wait_for(&peers, seq, 3).await;
    }
    for peer in &peers {
        assert_eq!(peer.min(), 3);
        assert_eq!(peer.status(1), None);
        assert_eq!(peer.status(3), Some(3));
    }

    // Settled instances below min are never restarted.
    peers[0].start(1, 99);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ndecided(&peers, 1), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn straggler_adopts_the_decided_value() {
    let peers = partial_cluster::<u64>(3, 2).await;
    peers[0].start(0, 7);
    wait_for(&peers[..2], 0, 2).await;
    assert_eq!(peers[2].status(0), None);

    // The straggler comes back and proposes its own value. Its prepare
    // hits peers that already decided, so it learns their value instead.
    let listener = TcpListener::bind(peers[2].addr()).await.unwrap();
    peers[2].serve(listener);
    peers[2].start(0, 99);
    wait_for(&peers, 0, 3).await;
    assert_eq!(peers[2].status(0), Some(7));
}

#[tokio::test(flavor = "multi_thread")]
async fn handlers_reject_forgotten_instances() {
    let peers = cluster::<u64>(1).await;
    peers[0].start(0, 5);
    wait_for(&peers, 0, 1).await;
    peers[0].done(0);
    assert_eq!(peers[0].min(), 1);

    let prepare = peers[0].prepare(PrepareArgs { seq: 0, ballot: 100 });
    assert_eq!(prepare.status, PrepareStatus::Reject);
    assert_eq!(prepare.done, 0);

    let accept = peers[0].accept(AcceptArgs { seq: 0, ballot: 100, value: 6 });
    assert_eq!(accept.status, AcceptStatus::Reject);

    let decided = peers[0].decided(DecidedArgs { seq: 0, value: 6 });
    assert_eq!(decided.done, 0);

    // None of the above brought the instance back.
    assert_eq!(peers[0].status(0), None);
    assert_eq!(peers[0].max(), -1);
}

#[tokio::test(flavor = "multi_thread")]
async fn done_never_moves_backwards() {
    let peers = cluster::<u64>(1).await;
    for seq in 0..3 {
        peers[0].start(seq, seq as u64);
        wait_for(&peers, seq, 1).await;
    }
    peers[0].done(2);
    assert_eq!(peers[0].min(), 3);
    peers[0].done(0);
    assert_eq!(peers[0].min(), 3);
    assert_eq!(peers[0].status(2), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn killed_peer_stops_answering() {
    let peers = cluster::<u64>(2).await;
    let request = Request::<u64>::Prepare(PrepareArgs { seq: 0, ballot: 0 });
    let timeout = Some(Duration::from_millis(250));

    let reply = paxos::rpc::call::<_, Reply<u64>>(peers[1].addr(), &request, timeout).await;
    assert!(reply.is_some());

    peers[1].kill();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reply = paxos::rpc::call::<_, Reply<u64>>(peers[1].addr(), &request, timeout).await;
    assert!(reply.is_none());
}
