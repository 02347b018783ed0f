use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slog::Logger;
use tokio::sync::mpsc;

use super::AcceptReply;
use super::AcceptRequest;
use super::CommitReply;
use super::CommitRequest;
use super::CopilotComm;
use super::CopilotInstance;
use super::CopilotLogs;
use super::CopilotReply;
use super::CopilotRequest;
use super::FastAcceptReply;
use super::FastAcceptRequest;
use super::LogKind;
use super::PrepareReply;
use super::PrepareRequest;
use super::SlotId;
use crate::comm::Handler;
use crate::conf::ClusterConf;
use crate::conf::ConfError;
use crate::conf::ReplicaConf;
use crate::exec::Apply;
use crate::exec::CommitWaiters;
use crate::replica::ReplicaStats;
use crate::types::quorum;
use crate::types::Ballot;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Slot;

/// CopilotState is everything guarded by the server lock.
#[derive(Debug, Default)]
pub struct CopilotState {
    pub logs: CopilotLogs,
    pub waiters: CommitWaiters<SlotId>,
    pub recovering: HashSet<SlotId>,
}

/// CopilotServer is one replica of a Copilot group. The pilot and the copilot propose into
/// their own logs, everyone accepts into both.
pub struct CopilotServer {
    pub replica_id: ReplicaId,
    pub group_replica_ids: Vec<ReplicaId>,

    /// The proposers of the pilot log and of the copilot log.
    pub pilots: [ReplicaId; 2],

    /// The log this replica proposes into, if any.
    pub role: Option<LogKind>,

    pub conf: ReplicaConf,

    pub(crate) state: Mutex<CopilotState>,

    /// Held by one execution at a time, through planning, applying and marking executed.
    pub(crate) applying: Mutex<()>,

    pub(crate) comm: CopilotComm,
    pub(crate) applier: Arc<dyn Apply>,
    pub(crate) exec_tx: mpsc::UnboundedSender<SlotId>,
    closed: AtomicBool,

    pub logger: Logger,
    pub stats: ReplicaStats,
}

impl CopilotServer {
    /// new creates a server and starts its execution task.
    /// The cluster must name exactly two pilots.
    pub fn new(
        replica_id: ReplicaId,
        cluster: &ClusterConf,
        comm: CopilotComm,
        applier: Arc<dyn Apply>,
        logger: &Logger,
    ) -> Result<Arc<CopilotServer>, ConfError> {
        let pilots = match cluster.pilots.as_slice() {
            [p, c] => [*p, *c],
            _ => {
                return Err(ConfError::BadPilots(format!(
                    "want [pilot, copilot], got {:?}",
                    cluster.pilots
                )))
            }
        };

        let role = if replica_id == pilots[0] {
            Some(LogKind::Pilot)
        } else if replica_id == pilots[1] {
            Some(LogKind::Copilot)
        } else {
            None
        };

        let (exec_tx, exec_rx) = mpsc::unbounded_channel();

        let s = Arc::new(CopilotServer {
            replica_id,
            group_replica_ids: cluster.replicas.clone(),
            pilots,
            role,
            conf: cluster.protocol.clone(),
            state: Mutex::new(CopilotState::default()),
            applying: Mutex::new(()),
            comm,
            applier,
            exec_tx,
            closed: AtomicBool::new(false),
            logger: logger.new(o!("replica_id" => replica_id)),
            stats: ReplicaStats::default(),
        });

        tokio::spawn(CopilotServer::exec_loop(Arc::downgrade(&s), exec_rx));

        info!(s.logger, "copilot server started"; "pilots" => ?s.pilots, "role" => ?s.role);
        Ok(s)
    }

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

    pub fn get_instance(&self, sid: SlotId) -> Option<CopilotInstance> {
        self.state.lock().logs.get(sid).cloned()
    }

    pub fn is_purged(&self, sid: SlotId) -> bool {
        self.state.lock().logs.is_purged(sid)
    }

    pub fn max_executed(&self, log: LogKind) -> i64 {
        self.state.lock().logs.log(log).max_executed()
    }

    pub fn max_committed(&self, log: LogKind) -> i64 {
        self.state.lock().logs.log(log).max_committed
    }

    pub fn n_instances(&self) -> usize {
        self.state.lock().logs.len()
    }

    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Relaxed);
        info!(self.logger, "copilot server shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn handle_fast_accept(&self, req: FastAcceptRequest) -> FastAcceptReply {
        let sid = req.slot_id;

        let mut st = self.state.lock();
        let suggest = st.logs.suggest_dep(sid, req.dep);

        let log = st.logs.log_mut(sid.log);
        let inst = match log.entry(sid.slot) {
            Some(x) => x,
            None => return fast_accept_failed(req.ballot, req.dep),
        };

        if req.ballot < inst.highest_seen {
            debug!(self.logger, "fast-accept: stale ballot";
                   "slot" => %sid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return fast_accept_failed(inst.highest_seen, req.dep);
        }

        if inst.status.is_committed()
            || (req.ballot == inst.highest_seen && inst.status > InstanceStatus::PreAccepted)
        {
            return fast_accept_failed(inst.highest_seen, req.dep);
        }

        let compatible = suggest == req.dep;

        inst.adopt(req.cmd, req.dep, req.ballot);
        inst.highest_seen = req.ballot;
        if compatible {
            inst.status = InstanceStatus::PreAccepted;
        }
        let highest_seen = inst.highest_seen;

        if compatible {
            log.advance_accepted(sid.slot);
        }

        debug!(self.logger, "fast-accepted";
               "log" => %sid.log, "slot" => sid.slot, "dep" => req.dep, "suggest" => suggest);

        FastAcceptReply {
            ok: true,
            highest_seen,
            dep: suggest,
            compatible,
        }
    }

    pub fn handle_accept(&self, req: AcceptRequest) -> AcceptReply {
        let sid = req.slot_id;

        let mut st = self.state.lock();
        let log = st.logs.log_mut(sid.log);

        let inst = match log.entry(sid.slot) {
            Some(x) => x,
            None => {
                return AcceptReply {
                    ok: true,
                    highest_seen: req.ballot,
                }
            }
        };

        if req.ballot < inst.highest_seen {
            debug!(self.logger, "accept: stale ballot";
                   "slot" => %sid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return AcceptReply {
                ok: false,
                highest_seen: inst.highest_seen,
            };
        }

        if inst.status.is_committed() {
            return AcceptReply {
                ok: true,
                highest_seen: inst.highest_seen,
            };
        }

        inst.adopt(req.cmd, req.dep, req.ballot);
        inst.highest_seen = req.ballot;
        inst.status = InstanceStatus::Accepted;
        log.advance_accepted(sid.slot);

        debug!(self.logger, "accepted"; "log" => %sid.log, "slot" => sid.slot, "dep" => req.dep);
        AcceptReply {
            ok: true,
            highest_seen: req.ballot,
        }
    }

    pub fn handle_commit(&self, req: CommitRequest) -> CommitReply {
        let sid = req.slot_id;

        let parked = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let log = st.logs.log_mut(sid.log);

            let inst = match log.entry(sid.slot) {
                Some(x) => x,
                None => return CommitReply { ok: true },
            };

            if inst.status.is_committed() {
                return CommitReply { ok: true };
            }

            inst.adopt(req.cmd, req.dep, req.ballot);
            inst.status = InstanceStatus::Committed;
            log.advance_accepted(sid.slot);
            log.advance_committed(sid.slot);

            debug!(self.logger, "committed"; "log" => %sid.log, "slot" => sid.slot, "dep" => req.dep);
            st.waiters.committed(sid)
        };

        self.trigger_execution(sid);
        for root in parked {
            self.trigger_execution(root);
        }

        CommitReply { ok: true }
    }

    pub fn handle_prepare(&self, req: PrepareRequest) -> PrepareReply {
        let sid = req.slot_id;

        let mut st = self.state.lock();
        let inst = match st.logs.entry(sid) {
            Some(x) => x,
            None => return PrepareReply::purged(self.replica_id, sid),
        };

        if !inst.promise(req.ballot) {
            debug!(self.logger, "prepare: stale ballot";
                   "slot" => %sid, "ballot" => %req.ballot, "seen" => %inst.highest_seen);
            return PrepareReply::of(false, self.replica_id, inst);
        }

        PrepareReply::of(true, self.replica_id, inst)
    }
}

fn fast_accept_failed(highest_seen: Ballot, dep: Slot) -> FastAcceptReply {
    FastAcceptReply {
        ok: false,
        highest_seen,
        dep,
        compatible: false,
    }
}

impl Handler<CopilotRequest, CopilotReply> for CopilotServer {
    fn handle(&self, req: CopilotRequest) -> CopilotReply {
        match req {
            CopilotRequest::FastAccept(r) => self.handle_fast_accept(r).into(),
            CopilotRequest::Accept(r) => self.handle_accept(r).into(),
            CopilotRequest::Commit(r) => self.handle_commit(r).into(),
            CopilotRequest::Prepare(r) => self.handle_prepare(r).into(),
        }
    }
}
