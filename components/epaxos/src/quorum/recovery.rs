use crate::types::recovery_threshold;
use crate::types::Ballot;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;

/// PreparedView is what a recovering leader needs to know about one Prepare reply.
pub trait PreparedView {
    fn status(&self) -> InstanceStatus;

    /// The ballot the replier accepted its current attributes under.
    fn accepted_ballot(&self) -> Ballot;

    fn replier(&self) -> ReplicaId;

    /// promised returns true if the replier accepted the Prepare ballot.
    fn promised(&self) -> bool;

    /// purged returns true if the replier executed and garbage collected the instance, so it
    /// can not tell what was committed.
    fn purged(&self) -> bool;

    /// same_proposal returns true if two replies carry the same command kind and attributes.
    fn same_proposal(&self, other: &Self) -> bool;
}

/// Recovery is what a recovering leader does next, decided from a quorum of Prepare replies.
#[derive(Debug, PartialEq, Eq)]
pub enum Recovery<'a, R> {
    /// Someone committed: commit the same.
    Commit(&'a R),
    /// Run Accept with these attributes.
    Accept(&'a R),
    /// Restart PreAccept with this command, no fast path.
    PreAccept(&'a R),
    /// Nobody knows the command: commit a no-op.
    NoOp,
}

/// learnable keeps the replies recovery can learn from: promises, and commits reported along
/// with a stale ballot, since a committed value is final.
///
/// It returns None if nobody reported a commit but someone purged the instance: what committed
/// can not be learned from this quorum and nothing else may be proposed.
pub fn learnable<R: PreparedView>(replies: Vec<R>) -> Option<Vec<R>> {
    let committed = replies
        .iter()
        .any(|r| r.status().is_committed() && !r.purged());
    if !committed && replies.iter().any(|r| r.purged()) {
        return None;
    }

    Some(
        replies
            .into_iter()
            .filter(|r| !r.purged() && (r.promised() || r.status().is_committed()))
            .collect(),
    )
}

/// decide applies the recovery rules in priority order:
///
/// 1. a committed reply wins;
/// 2. otherwise the accepted reply with the highest accepted ballot;
/// 3. otherwise, if every pre-accepted reply is still under the default ballot of `leader`,
///    `recovery_threshold(n_total)` identical pre-accepted replies from replicas other than
///    `leader` may have committed on the fast path: accept them;
/// 4. otherwise any pre-accepted reply is restarted from PreAccept;
/// 5. otherwise a no-op.
pub fn decide<R: PreparedView>(replies: &[R], leader: ReplicaId, n_total: usize) -> Recovery<'_, R> {
    if let Some(r) = replies.iter().find(|r| r.status().is_committed()) {
        return Recovery::Commit(r);
    }

    let accepted = replies
        .iter()
        .filter(|r| r.status() == InstanceStatus::Accepted)
        .max_by_key(|r| r.accepted_ballot());
    if let Some(r) = accepted {
        return Recovery::Accept(r);
    }

    let pre: Vec<&R> = replies
        .iter()
        .filter(|r| r.status() == InstanceStatus::PreAccepted)
        .collect();

    let highest = pre.iter().map(|r| r.accepted_ballot()).max();
    let untouched = match highest {
        Some(b) => b.is_default_of(leader),
        None => false,
    };

    if untouched {
        let others: Vec<&R> = pre.iter().copied().filter(|r| r.replier() != leader).collect();
        for cand in others.iter() {
            let n = others.iter().filter(|r| r.same_proposal(cand)).count();
            if n >= recovery_threshold(n_total) {
                return Recovery::Accept(*cand);
            }
        }
    }

    if let Some(r) = pre.iter().max_by_key(|r| r.accepted_ballot()) {
        return Recovery::PreAccept(*r);
    }

    Recovery::NoOp
}
