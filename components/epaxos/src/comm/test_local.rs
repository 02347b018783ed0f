use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;
use crate::quorum::QuorumEvent;
use crate::quorum::Vote;

/// Echo replies with its own id plus the request.
struct Echo(ReplicaId);

impl Handler<i64, i64> for Echo {
    fn handle(&self, req: i64) -> i64 {
        self.0 * 100 + req
    }
}

fn new_net(n: ReplicaId) -> Arc<LocalNetwork<i64, i64>> {
    let net = LocalNetwork::new();
    for rid in 1..=n {
        net.register(rid, Arc::new(Echo(rid)));
    }
    net
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_send() {
    let net = new_net(3);
    let c1 = net.communicator(1);

    assert_eq!(1, c1.me());
    assert_eq!(Ok(205), c1.send(2, 5).await);
    assert_eq!(Ok(307), c1.send(3, 7).await);
    assert_eq!(Err(TransportError::NoSuchReplica(9)), c1.send(9, 1).await);
    assert_eq!(2, net.rpc_count());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_partition() {
    let net = new_net(3);
    let c1 = net.communicator(1);
    let c2 = net.communicator(2);

    net.cut(2, 1);
    assert_eq!(Err(TransportError::Unreachable(1, 2)), c1.send(2, 0).await);
    assert_eq!(Err(TransportError::Unreachable(2, 1)), c2.send(1, 0).await);
    assert_eq!(Ok(300), c1.send(3, 0).await);

    net.disconnect(3);
    assert!(!net.is_connected(1, 3));
    assert!(!net.is_connected(3, 2));
    assert!(net.is_connected(3, 3));

    net.reconnect(3);
    assert!(net.is_connected(1, 3));

    net.heal();
    assert_eq!(Ok(201), c1.send(2, 1).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bcast_to_event() {
    let net = new_net(5);
    net.disconnect(5);
    let c1 = net.communicator(1);

    let (mut ev, tx) = QuorumEvent::<i64>::new(5, 3);
    ev.vote_self();
    bcast(&c1, &[2, 3, 4, 5], 1, tx, |rep| {
        if rep % 2 == 1 {
            Vote::Yes(rep)
        } else {
            Vote::No(rep)
        }
    });

    ev.wait(Duration::from_secs(5)).await;
    assert!(ev.yes());

    // all peers but the disconnected one replied
    let mut replies = ev.replies.clone();
    replies.sort();
    assert!(replies.len() >= 2);
    for r in replies.iter() {
        assert!([201, 301, 401].contains(r));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_close() {
    let net = new_net(2);
    let c1 = net.communicator(1);

    assert_eq!(Ok(201), c1.send(2, 1).await);
    net.close();
    assert_eq!(Err(TransportError::Closed), c1.send(2, 1).await);
    assert_eq!(1, net.rpc_count());
}
