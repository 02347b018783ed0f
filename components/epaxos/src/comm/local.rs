use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::Communicator;
use super::Handler;
use super::TransportError;
use crate::types::ReplicaId;

/// LocalNetwork connects in-process replicas. Links can be cut to simulate partitions.
///
/// Delivery is a direct call into the target's handler after a yield, so requests and replies
/// interleave like they would over a real network.
pub struct LocalNetwork<Req, Rep> {
    handlers: RwLock<BTreeMap<ReplicaId, Arc<dyn Handler<Req, Rep>>>>,

    /// Replicas cut off from everyone.
    down: RwLock<BTreeSet<ReplicaId>>,

    /// Cut links, stored with the smaller id first.
    cuts: RwLock<BTreeSet<(ReplicaId, ReplicaId)>>,

    n_rpc: AtomicU64,
    closed: AtomicBool,
}

impl<Req, Rep> LocalNetwork<Req, Rep>
where
    Req: Send + 'static,
    Rep: Send + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(LocalNetwork {
            handlers: RwLock::new(BTreeMap::new()),
            down: RwLock::new(BTreeSet::new()),
            cuts: RwLock::new(BTreeSet::new()),
            n_rpc: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn register(&self, rid: ReplicaId, h: Arc<dyn Handler<Req, Rep>>) {
        self.handlers.write().insert(rid, h);
    }

    /// communicator returns the endpoint replica `me` sends through.
    pub fn communicator(self: &Arc<Self>, me: ReplicaId) -> Arc<dyn Communicator<Req, Rep>> {
        Arc::new(LocalCommunicator {
            me,
            net: self.clone(),
        })
    }

    /// disconnect cuts `rid` off from every other replica.
    pub fn disconnect(&self, rid: ReplicaId) {
        self.down.write().insert(rid);
    }

    pub fn reconnect(&self, rid: ReplicaId) {
        self.down.write().remove(&rid);
    }

    /// cut drops every message between `a` and `b`, both ways.
    pub fn cut(&self, a: ReplicaId, b: ReplicaId) {
        self.cuts.write().insert(link(a, b));
    }

    /// heal restores every cut link and every disconnected replica.
    pub fn heal(&self) {
        self.cuts.write().clear();
        self.down.write().clear();
    }

    pub fn is_connected(&self, a: ReplicaId, b: ReplicaId) -> bool {
        if a == b {
            return true;
        }
        {
            let down = self.down.read();
            if down.contains(&a) || down.contains(&b) {
                return false;
            }
        }
        !self.cuts.read().contains(&link(a, b))
    }

    /// close makes every later send fail with `TransportError::Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// rpc_count returns the number of requests delivered so far.
    pub fn rpc_count(&self) -> u64 {
        self.n_rpc.load(Ordering::Relaxed)
    }

    fn deliver(&self, from: ReplicaId, to: ReplicaId, req: Req) -> Result<Rep, TransportError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        if !self.is_connected(from, to) {
            return Err(TransportError::Unreachable(from, to));
        }

        let h = {
            let handlers = self.handlers.read();
            handlers
                .get(&to)
                .cloned()
                .ok_or(TransportError::NoSuchReplica(to))?
        };

        self.n_rpc.fetch_add(1, Ordering::Relaxed);
        let rep = h.handle(req);

        // the link may break while the request is being served
        if !self.is_connected(from, to) {
            return Err(TransportError::Unreachable(to, from));
        }
        Ok(rep)
    }
}

fn link(a: ReplicaId, b: ReplicaId) -> (ReplicaId, ReplicaId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

struct LocalCommunicator<Req, Rep> {
    me: ReplicaId,
    net: Arc<LocalNetwork<Req, Rep>>,
}

#[async_trait]
impl<Req, Rep> Communicator<Req, Rep> for LocalCommunicator<Req, Rep>
where
    Req: Send + 'static,
    Rep: Send + 'static,
{
    fn me(&self) -> ReplicaId {
        self.me
    }

    async fn send(&self, to: ReplicaId, req: Req) -> Result<Rep, TransportError> {
        tokio::task::yield_now().await;
        self.net.deliver(self.me, to, req)
    }
}
