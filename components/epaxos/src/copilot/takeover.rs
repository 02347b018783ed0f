//! Takeover of an entry whose proposer may have failed.

use super::bcast_prepare;
use super::CopilotServer;
use super::PrepareReply;
use super::PrepareRequest;
use super::SlotId;
use crate::quorum::decide;
use crate::quorum::learnable;
use crate::quorum::PreparedView;
use crate::quorum::Recovery;
use crate::quorum::Vote;
use crate::replica::ReplicaStats;
use crate::replication::ReplicationError;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Slot;

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
        self.cmd == other.cmd && self.dep == other.dep
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Commit,
    Accept,
    FastAccept,
}

impl CopilotServer {
    /// takeover runs Prepare on `sid` with a ballot above any this replica has seen and
    /// drives whatever a quorum knows about it to commit, a no-op if nobody knows anything.
    pub async fn takeover(&self, sid: SlotId) -> Result<(), ReplicationError> {
        let (ballot, self_reply) = {
            let mut st = self.state.lock();
            let inst = st
                .logs
                .entry(sid)
                .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;

            match inst.status {
                InstanceStatus::Executed => return Ok(()),
                InstanceStatus::Committed => (inst.ballot, None),
                _ => {
                    let b = inst.highest_seen.next(self.conf.epoch, self.replica_id);
                    inst.highest_seen = b;
                    (b, Some(PrepareReply::of(true, self.replica_id, inst)))
                }
            }
        };

        let self_reply = match self_reply {
            Some(r) => r,
            None => return self.start_commit(sid, ballot).await,
        };

        ReplicaStats::incr(&self.stats.recoveries, 1);
        info!(self.logger, "start takeover"; "slot" => %sid, "ballot" => %ballot);

        let mut ev = bcast_prepare(
            &self.comm,
            &self.peers(),
            PrepareRequest { ballot, slot_id: sid },
            self.n_total(),
            self.quorum(),
        );
        ev.vote(Vote::Yes(self_reply));

        let status = ev.wait(self.conf.quorum_timeout()).await;
        debug!(self.logger, "prepare replies";
               "slot" => %sid, "status" => ?status, "yes" => ev.n_yes(), "no" => ev.n_no());

        let committed = ev.replies.iter().any(|r| r.status.is_committed() && !r.purged);
        if !ev.yes() && !committed {
            self.observe_ballots(sid, ev.replies.iter().map(|r| r.highest_seen));
            return Err(ReplicationError::round_failed(
                "prepare",
                status,
                ev.no(),
                ev.quorum,
                ev.n_yes(),
            ));
        }

        let replies = learnable(ev.replies.drain(..).collect())
            .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;
        let proposer = self.pilots[sid.log.index()];
        let decision = decide(&replies, proposer, self.n_total());
        debug!(self.logger, "takeover decided"; "slot" => %sid, "decision" => ?decision);

        let (phase, cmd, dep) = adopted(&decision);

        {
            let mut st = self.state.lock();

            // a restarted proposal is checked against what this replica accepted
            let dep = if phase == Phase::FastAccept {
                st.logs.suggest_dep(sid, dep)
            } else {
                dep
            };

            let log = st.logs.log_mut(sid.log);
            let inst = log
                .get_mut(sid.slot)
                .ok_or_else(|| ReplicationError::Purged(sid.to_string()))?;

            if inst.status.is_committed() {
                return Ok(());
            }
            if phase != Phase::Commit && inst.highest_seen != ballot {
                return Err(ReplicationError::Preempted(inst.highest_seen));
            }

            inst.adopt(cmd, dep, ballot);
            inst.status = InstanceStatus::PreAccepted;
            log.advance_accepted(sid.slot);
        }

        match phase {
            Phase::Commit => self.start_commit(sid, ballot).await,
            Phase::Accept => self.start_accept(sid, ballot).await,
            Phase::FastAccept => self.start_fast_accept(sid).await,
        }
    }
}

fn adopted(d: &Recovery<'_, PrepareReply>) -> (Phase, Command, Slot) {
    let (phase, r) = match d {
        Recovery::Commit(r) => (Phase::Commit, r),
        Recovery::Accept(r) => (Phase::Accept, r),
        Recovery::PreAccept(r) => (Phase::FastAccept, r),
        Recovery::NoOp => return (Phase::FastAccept, Command::noop(), 0),
    };
    (phase, r.cmd.clone(), r.dep)
}
