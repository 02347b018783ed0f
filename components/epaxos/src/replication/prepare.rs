//! Recovery of an instance whose leader may have failed.

use super::bcast_prepare;
use super::ReplicationError;
use crate::message::MakeReply;
use crate::message::MakeRequest;
use crate::message::PrepareReply;
use crate::quorum::decide;
use crate::quorum::learnable;
use crate::quorum::PreparedView;
use crate::quorum::Recovery;
use crate::quorum::Vote;
use crate::replica::Replica;
use crate::replica::ReplicaStats;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::DepKey;
use crate::types::Deps;
use crate::types::InstanceId;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Seq;
use crate::types::NOOP_DKEY;

impl PreparedView for PrepareReply {
    fn status(&self) -> InstanceStatus {
        self.status
    }

    fn accepted_ballot(&self) -> Ballot {
        self.ballot
    }

    fn replier(&self) -> ReplicaId {
        self.replica_id
    }

    fn promised(&self) -> bool {
        self.ok
    }

    fn purged(&self) -> bool {
        self.purged
    }

    fn same_proposal(&self, other: &Self) -> bool {
        self.cmd == other.cmd && self.seq == other.seq && self.deps == other.deps
    }
}

/// What recovery continues with after adopting a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Commit,
    Accept,
    PreAccept,
}

impl Replica {
    /// start_prepare takes over an instance with a ballot higher than any this replica has
    /// seen, learns what a quorum knows about it and drives it to commit.
    pub async fn start_prepare(&self, iid: InstanceId) -> Result<(), ReplicationError> {
        let (ballot, self_reply) = {
            let mut st = self.state.lock();
            let inst = st
                .space
                .entry(iid)
                .ok_or_else(|| ReplicationError::Purged(iid.to_string()))?;

            match inst.status {
                InstanceStatus::Executed => return Ok(()),
                InstanceStatus::Committed => (inst.ballot, None),
                _ => {
                    let b = inst.highest_seen.next(self.conf.epoch, self.replica_id);
                    inst.highest_seen = b;
                    (b, Some(MakeReply::prepare(true, self.replica_id, inst)))
                }
            }
        };

        let self_reply = match self_reply {
            Some(r) => r,
            // nothing to recover: make sure everyone learns the commit
            None => return self.start_commit(iid, ballot).await,
        };

        ReplicaStats::incr(&self.stats.recoveries, 1);
        info!(self.logger, "start prepare"; "iid" => %iid, "ballot" => %ballot);

        let mut ev = bcast_prepare(
            &self.comm,
            &self.peers(),
            MakeRequest::prepare(ballot, iid),
            self.n_total(),
            self.quorum(),
        );
        ev.vote(Vote::Yes(self_reply));

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "prepare replies";
               "iid" => %iid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        let committed = ev.replies.iter().any(|r| r.status.is_committed() && !r.purged);
        if !ev.yes() && !committed {
            self.observe_ballots(iid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "prepare",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        let replies = learnable(ev.replies.drain(..).collect())
            .ok_or_else(|| ReplicationError::Purged(iid.to_string()))?;
        let decision = decide(&replies, iid.replica_id, self.n_total());
        debug!(self.logger, "recovery decided"; "iid" => %iid, "decision" => ?decision);

        let (phase, cmd, dkey, seq, deps) = adopted(&decision);

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
            if phase != Phase::Commit && inst.highest_seen != ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }

            let (seq, deps) = if phase == Phase::PreAccept && !cmd.is_noop() {
                let (s, d, _) = st.keys.merge_attrs(&dkey, iid.replica_id, seq, &deps);
                (s, d)
            } else {
                (seq, deps)
            };

            inst.adopt(cmd, dkey, seq, deps);
            inst.ballot = ballot;
            inst.status = InstanceStatus::PreAccepted;

            if !inst.is_noop() {
                st.keys.record(&inst.dkey, iid, inst.seq, &inst.deps);
            }
        }

        match phase {
            Phase::Commit => self.start_commit(iid, ballot).await,
            Phase::Accept => self.start_accept(iid, ballot).await,
            Phase::PreAccept => self.start_pre_accept(iid).await,
        }
    }
}

fn adopted(d: &Recovery<'_, PrepareReply>) -> (Phase, Command, DepKey, Seq, Deps) {
    let (phase, r) = match d {
        Recovery::Commit(r) => (Phase::Commit, r),
        Recovery::Accept(r) => (Phase::Accept, r),
        Recovery::PreAccept(r) => (Phase::PreAccept, r),
        Recovery::NoOp => {
            return (
                Phase::PreAccept,
                Command::noop(),
                NOOP_DKEY.to_string(),
                0,
                Deps::new(),
            )
        }
    };
    (phase, r.cmd.clone(), r.dkey.clone(), r.seq, r.deps.clone())
}
