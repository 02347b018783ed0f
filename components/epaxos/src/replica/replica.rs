use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slog::Logger;
use tokio::sync::mpsc;

use super::InstanceSpace;
use crate::comm::Communicator;
use crate::conf::ClusterConf;
use crate::conf::ReplicaConf;
use crate::exec::Apply;
use crate::exec::CommitWaiters;
use crate::message::Reply;
use crate::message::Request;
use crate::tracker::KeyTable;
use crate::types::quorum;
use crate::types::Instance;
use crate::types::InstanceId;
use crate::types::InstanceNo;
use crate::types::ReplicaId;

/// ReplicaState is everything guarded by the replica lock.
/// The lock is never held across an await.
#[derive(Debug)]
pub struct ReplicaState {
    pub space: InstanceSpace,
    pub keys: KeyTable,

    /// The number of the next instance this replica leads.
    pub next_idx: InstanceNo,

    pub waiters: CommitWaiters<InstanceId>,

    /// Instances being recovered by the execution path.
    pub recovering: HashSet<InstanceId>,
}

impl Default for ReplicaState {
    fn default() -> Self {
        ReplicaState {
            space: InstanceSpace::new(),
            keys: KeyTable::new(),
            next_idx: 1,
            waiters: CommitWaiters::new(),
            recovering: HashSet::new(),
        }
    }
}

/// Counters of what a replica has been doing.
#[derive(Debug, Default)]
pub struct ReplicaStats {
    pub fast_path: AtomicU64,
    pub slow_path: AtomicU64,
    pub recoveries: AtomicU64,
    pub executed: AtomicU64,
}

impl ReplicaStats {
    pub fn incr(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Replica is one member of an EPaxos group. It leads the instances it creates and accepts
/// instances of everyone else.
pub struct Replica {
    pub replica_id: ReplicaId,

    /// All replica ids in this group, including this one.
    pub group_replica_ids: Vec<ReplicaId>,

    pub conf: ReplicaConf,

    pub(crate) state: Mutex<ReplicaState>,

    /// Held by one execution at a time, through planning, applying and marking executed.
    pub(crate) applying: Mutex<()>,

    pub(crate) comm: Arc<dyn Communicator<Request, Reply>>,
    pub(crate) applier: Arc<dyn Apply>,
    pub(crate) exec_tx: mpsc::UnboundedSender<InstanceId>,
    pub(crate) closed: AtomicBool,

    pub logger: Logger,
    pub stats: ReplicaStats,
}

impl Replica {
    /// new creates a replica and starts its execution task.
    /// It must be called inside a tokio runtime.
    pub fn new(
        replica_id: ReplicaId,
        cluster: &ClusterConf,
        comm: Arc<dyn Communicator<Request, Reply>>,
        applier: Arc<dyn Apply>,
        logger: &Logger,
    ) -> Arc<Replica> {
        let (exec_tx, exec_rx) = mpsc::unbounded_channel();

        let r = Arc::new(Replica {
            replica_id,
            group_replica_ids: cluster.replicas.clone(),
            conf: cluster.protocol.clone(),
            state: Mutex::new(ReplicaState::default()),
            applying: Mutex::new(()),
            comm,
            applier,
            exec_tx,
            closed: AtomicBool::new(false),
            logger: logger.new(o!("replica_id" => replica_id)),
            stats: ReplicaStats::default(),
        });

        tokio::spawn(Replica::exec_loop(Arc::downgrade(&r), exec_rx));

        info!(r.logger, "replica started"; "group" => ?r.group_replica_ids);
        r
    }

    /// peers returns every other replica of the group.
    pub fn peers(&self) -> Vec<ReplicaId> {
        self.group_replica_ids
            .iter()
            .filter(|x| **x != self.replica_id)
            .copied()
            .collect()
    }

    pub fn n_total(&self) -> usize {
        self.group_replica_ids.len()
    }

    pub fn quorum(&self) -> usize {
        quorum(self.n_total())
    }

    pub fn fast_quorum(&self) -> usize {
        self.conf.fast_quorum_of(self.n_total())
    }

    /// get_instance returns a copy of what this replica knows about an instance.
    pub fn get_instance(&self, iid: InstanceId) -> Option<Instance> {
        self.state.lock().space.get(iid).cloned()
    }

    pub fn is_purged(&self, iid: InstanceId) -> bool {
        self.state.lock().space.is_purged(iid)
    }

    /// max_executed returns the execution watermark of instances from origin `rid`.
    pub fn max_executed(&self, rid: ReplicaId) -> InstanceNo {
        self.state.lock().space.max_executed(rid)
    }

    /// shutdown makes every later proposal fail. Acceptor handlers keep serving.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Relaxed);
        info!(self.logger, "replica shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn n_instances(&self) -> usize {
        self.state.lock().space.len()
    }
}
