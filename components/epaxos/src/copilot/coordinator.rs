//! Proposer side: FastAccept, then the fast path to Commit or the slow path through Accept.

use super::bcast_accept;
use super::bcast_commit;
use super::bcast_fast_accept;
use super::AcceptRequest;
use super::CommitRequest;
use super::CopilotError;
use super::CopilotServer;
use super::FastAcceptRequest;
use super::LogKind;
use super::SlotId;
use crate::replica::ReplicaStats;
use crate::replication::random_backoff;
use crate::replication::ReplicationError;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;

impl CopilotServer {
    /// propose appends `cmd` to the log this replica leads and runs it until it commits,
    /// falling back to takeover of its own entry up to `recovery_attempts` times.
    pub async fn propose(&self, cmd: Command) -> Result<SlotId, CopilotError> {
        let log = self.role.ok_or(CopilotError::NotPilot(self.replica_id))?;
        if self.is_shut_down() {
            return Err(ReplicationError::Shutdown.into());
        }

        let sid = self.pick_init_slot_and_dep(log, cmd);

        let mut rst = self.start_fast_accept(sid).await;
        let mut attempt = 0;

        while let Err(e) = rst {
            if attempt >= self.conf.recovery_attempts {
                return Err(e.into());
            }
            attempt += 1;

            info!(self.logger, "fall back to takeover";
                  "slot" => %sid, "attempt" => attempt, "err" => %e);

            random_backoff(self.conf.quorum_timeout_ms).await;
            rst = self.takeover(sid).await;
        }

        Ok(sid)
    }

    /// pick_init_slot_and_dep allocates the next slot of `log` and makes it depend on the
    /// highest accepted slot of the other log. The entry is fast accepted locally under the
    /// default ballot.
    pub(crate) fn pick_init_slot_and_dep(&self, log: LogKind, cmd: Command) -> SlotId {
        let mut st = self.state.lock();

        let dep = st.logs.log(log.other()).max_accepted;
        let blt = Ballot::default_of(self.conf.epoch, self.replica_id);

        let info = st.logs.log_mut(log);
        loop {
            info.current_slot += 1;
            let slot = info.current_slot;

            // a slot someone else already took over is skipped
            let inst = match info.entry(slot) {
                Some(x) if x.status == InstanceStatus::NotStarted => x,
                _ => continue,
            };

            inst.adopt(cmd, dep, blt);
            inst.highest_seen = blt;
            inst.status = InstanceStatus::PreAccepted;

            debug!(self.logger, "new entry"; "log" => %log, "slot" => slot, "dep" => dep);

            info.advance_accepted(slot);
            return SlotId::new(log, slot);
        }
    }

    /// start_fast_accept broadcasts the local copy of an entry. The fast path is only taken
    /// under a default ballot.
    pub async fn start_fast_accept(&self, sid: SlotId) -> Result<(), ReplicationError> {
        let req = {
            let st = self.state.lock();
            let inst = st
                .logs
                .get(sid)
                .ok_or_else(|| ReplicationError::NotFound(sid.to_string()))?;
            if inst.status.is_committed() {
                return Ok(());
            }
            FastAcceptRequest::from(inst)
        };
        let ballot = req.ballot;
        let proposed = req.dep;

        let mut ev = bcast_fast_accept(
            &self.comm,
            &self.peers(),
            req,
            self.n_total(),
            self.quorum(),
            self.fast_quorum(),
        );
        ev.vote_self();

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "fast-accept replies";
               "slot" => %sid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        if ev.fast() && ballot.is_default() {
            ReplicaStats::incr(&self.stats.fast_path, 1);
            return self.start_commit(sid, ballot).await;
        }

        if !ev.yes() {
            self.observe_ballots(sid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "fast-accept",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        let dep = ev
            .replies
            .iter()
            .filter(|r| r.ok)
            .map(|r| r.dep)
            .fold(proposed, std::cmp::max);

        {
            let mut st = self.state.lock();
            let inst = st
                .logs
                .get_mut(sid)
                .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;

            if inst.status.is_committed() {
                return Ok(());
            }
            if inst.highest_seen > ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }
            inst.dep = dep;
        }

        debug!(self.logger, "slow path"; "slot" => %sid, "proposed" => proposed, "dep" => dep);
        ReplicaStats::incr(&self.stats.slow_path, 1);
        self.start_accept(sid, ballot).await
    }

    pub async fn start_accept(&self, sid: SlotId, ballot: Ballot) -> Result<(), ReplicationError> {
        let req = {
            let mut st = self.state.lock();
            let log = st.logs.log_mut(sid.log);
            let inst = log
                .get_mut(sid.slot)
                .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;

            if inst.status.is_committed() {
                return Ok(());
            }
            if inst.highest_seen > ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }

            inst.ballot = ballot;
            inst.status = InstanceStatus::Accepted;
            let req = AcceptRequest::from(&*inst);

            log.advance_accepted(sid.slot);
            req
        };

        let mut ev = bcast_accept(&self.comm, &self.peers(), req, self.n_total(), self.quorum());
        ev.vote_self();

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "accept replies";
               "slot" => %sid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        if !ev.yes() {
            self.observe_ballots(sid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "accept",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        self.start_commit(sid, ballot).await
    }

    /// start_commit commits the local copy of an entry, hands it to execution and tells
    /// everyone else without waiting for their replies.
    pub async fn start_commit(&self, sid: SlotId, ballot: Ballot) -> Result<(), ReplicationError> {
        let (req, parked) = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let log = st.logs.log_mut(sid.log);
            let inst = log
                .get_mut(sid.slot)
                .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;

            let committed_before = inst.status.is_committed();
            if !committed_before {
                inst.ballot = ballot;
                inst.status = InstanceStatus::Committed;
                info!(self.logger, "committed"; "inst" => %inst);
            }
            let req = CommitRequest::from(&*inst);

            let mut parked = vec![];
            if !committed_before {
                log.advance_accepted(sid.slot);
                log.advance_committed(sid.slot);
                parked = st.waiters.committed(sid);
            }
            (req, parked)
        };

        self.trigger_execution(sid);
        for root in parked {
            self.trigger_execution(root);
        }

        let _ev = bcast_commit(&self.comm, &self.peers(), req, self.n_total(), self.quorum());
        Ok(())
    }

    pub(crate) fn observe_ballots<I: Iterator<Item = Ballot>>(&self, sid: SlotId, ballots: I) {
        if let Some(highest) = ballots.max() {
            let mut st = self.state.lock();
            if let Some(inst) = st.logs.get_mut(sid) {
                inst.promise(highest);
            }
        }
    }
}
