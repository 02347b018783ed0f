//! Leader side of an instance: PreAccept, then the fast path to Commit or the slow path through
//! Accept.

use std::time::Duration;

use rand::Rng;

use super::bcast_accept;
use super::bcast_commit;
use super::bcast_pre_accept;
use super::ReplicationError;
use crate::message::MakeRequest;
use crate::message::PreAcceptStatus;
use crate::replica::Replica;
use crate::replica::ReplicaStats;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::DepKey;
use crate::types::Deps;
use crate::types::Instance;
use crate::types::InstanceId;
use crate::types::InstanceStatus;
use crate::types::NOOP_DKEY;

impl Replica {
    /// start creates an instance for `cmd` led by this replica and runs it until it commits.
    /// An Err means the instance may or may not commit later, e.g. through recovery.
    pub async fn start(&self, cmd: Command, dkey: DepKey) -> Result<InstanceId, ReplicationError> {
        if self.is_shut_down() {
            return Err(ReplicationError::Shutdown);
        }
        let iid = self.new_instance(cmd, dkey);
        self.start_pre_accept(iid).await?;
        Ok(iid)
    }

    /// propose is `start()` that falls back to recovery of its own instance, with a random
    /// backoff, up to `recovery_attempts` times.
    pub async fn propose(
        &self,
        cmd: Command,
        dkey: DepKey,
    ) -> Result<InstanceId, ReplicationError> {
        if self.is_shut_down() {
            return Err(ReplicationError::Shutdown);
        }
        let iid = self.new_instance(cmd, dkey);

        let mut rst = self.start_pre_accept(iid).await;
        let mut attempt = 0;

        while let Err(e) = rst {
            if attempt >= self.conf.recovery_attempts {
                return Err(e);
            }
            attempt += 1;

            info!(self.logger, "fall back to recovery";
                  "iid" => %iid, "attempt" => attempt, "err" => %e);

            self.backoff().await;
            rst = self.start_prepare(iid).await;
        }

        Ok(iid)
    }

    /// new_instance allocates the next instance of this replica, with attributes taken from
    /// the per-key table, under the default ballot.
    pub(crate) fn new_instance(&self, cmd: Command, dkey: DepKey) -> InstanceId {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        let iid = InstanceId::new(self.replica_id, st.next_idx);
        st.next_idx += 1;

        let (dkey, seq, deps) = if cmd.is_noop() {
            (NOOP_DKEY.to_string(), 0, Deps::new())
        } else {
            let (seq, deps) = st.keys.initial_attrs(&dkey);
            (dkey, seq, deps)
        };

        let blt = Ballot::default_of(self.conf.epoch, self.replica_id);
        let inst = Instance {
            instance_id: iid,
            cmd,
            dkey,
            seq,
            deps,
            ballot: blt,
            highest_seen: blt,
            status: InstanceStatus::PreAccepted,
        };

        if !inst.is_noop() {
            st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
        }

        debug!(self.logger, "new instance"; "inst" => %inst);
        st.space.insert(inst);
        iid
    }

    /// start_pre_accept broadcasts the local copy of an instance, already PreAccepted under the
    /// ballot this replica leads with.
    ///
    /// The fast path is only taken under a default ballot; a recovering leader always goes
    /// through Accept.
    pub async fn start_pre_accept(&self, iid: InstanceId) -> Result<(), ReplicationError> {
        let req = {
            let st = self.state.lock();
            let inst = st
                .space
                .get(iid)
                .ok_or_else(|| ReplicationError::NotFound(iid.to_string()))?;
            if inst.status.is_committed() {
                return Ok(());
            }
            MakeRequest::pre_accept(inst)
        };
        let ballot = req.ballot;

        let mut ev = bcast_pre_accept(
            &self.comm,
            &self.peers(),
            req,
            self.n_total(),
            self.quorum(),
            self.fast_quorum(),
        );
        ev.vote_self();

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "pre-accept replies";
               "iid" => %iid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        if ev.fast() && ballot.is_default() {
            ReplicaStats::incr(&self.stats.fast_path, 1);
            return self.start_commit(iid, ballot).await;
        }

        if !ev.yes() {
            self.observe_ballots(iid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "pre-accept",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let inst = st
                .space
                .get_mut(iid)
                .ok_or_else(|| ReplicationError::Purged(iid.to_string()))?;

            if inst.status.is_committed() {
                return Ok(());
            }
            if inst.highest_seen > ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }

            if !inst.is_noop() {
                for r in ev.replies.iter() {
                    if r.status == PreAcceptStatus::Failed {
                        continue;
                    }
                    if r.seq > inst.seq {
                        inst.seq = r.seq;
                    }
                    inst.deps.merge_max(&r.deps);
                }
                st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
            }
        }

        ReplicaStats::incr(&self.stats.slow_path, 1);
        self.start_accept(iid, ballot).await
    }

    /// start_accept runs the Accept round with the local attributes of an instance.
    pub async fn start_accept(&self, iid: InstanceId, ballot: Ballot) -> Result<(), ReplicationError> {
        let req = {
            let mut st = self.state.lock();
            let inst = st
                .space
                .get_mut(iid)
                .ok_or_else(|| ReplicationError::Purged(iid.to_string()))?;

            if inst.status.is_committed() {
                return Ok(());
            }
            if inst.highest_seen > ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }

            inst.ballot = ballot;
            inst.status = InstanceStatus::Accepted;
            MakeRequest::accept(inst)
        };

        let mut ev = bcast_accept(&self.comm, &self.peers(), req, self.n_total(), self.quorum());
        ev.vote_self();

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "accept replies";
               "iid" => %iid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        if !ev.yes() {
            self.observe_ballots(iid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "accept",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        self.start_commit(iid, ballot).await
    }

    /// start_commit commits the local copy of an instance, hands it to execution and tells
    /// everyone else, without waiting for their replies.
    pub async fn start_commit(&self, iid: InstanceId, ballot: Ballot) -> Result<(), ReplicationError> {
        let (req, parked) = {
            let mut guard = self.state.lock();
            let st = &mut *guard;
            let inst = st
                .space
                .get_mut(iid)
                .ok_or_else(|| ReplicationError::Purged(iid.to_string()))?;

            let mut parked = vec![];
            if !inst.status.is_committed() {
                inst.ballot = ballot;
                inst.status = InstanceStatus::Committed;
                if !inst.is_noop() {
                    st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
                }
                parked = st.waiters.committed(iid);
                info!(self.logger, "committed"; "inst" => %inst);
            }

            (MakeRequest::commit(inst), parked)
        };

        self.trigger_execution(iid);
        for root in parked {
            self.trigger_execution(root);
        }

        // no one waits for commit replies
        let _ev = bcast_commit(&self.comm, &self.peers(), req, self.n_total(), self.quorum());
        Ok(())
    }

    /// observe_ballots raises the highest seen ballot of an instance with what peers reported,
    /// so that a later recovery starts above them.
    pub(crate) fn observe_ballots<I: Iterator<Item = Ballot>>(&self, iid: InstanceId, ballots: I) {
        if let Some(highest) = ballots.max() {
            let mut st = self.state.lock();
            if let Some(inst) = st.space.get_mut(iid) {
                inst.promise(highest);
            }
        }
    }

    pub(crate) async fn backoff(&self) {
        random_backoff(self.conf.quorum_timeout_ms).await
    }
}

/// random_backoff sleeps a random time shorter than `max_ms`, to break duels between
/// recovering replicas.
pub(crate) async fn random_backoff(max_ms: u64) {
    let max = std::cmp::max(max_ms, 1);
    let ms = rand::thread_rng().gen_range(0..max);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
