use std::sync::Arc;

use crate::comm::bcast;
use crate::comm::Communicator;
use crate::message::AcceptReply;
use crate::message::AcceptRequest;
use crate::message::CommitReply;
use crate::message::CommitRequest;
use crate::message::PreAcceptReply;
use crate::message::PreAcceptRequest;
use crate::message::PreAcceptStatus;
use crate::message::PrepareReply;
use crate::message::PrepareRequest;
use crate::message::Reply;
use crate::message::Request;
use crate::quorum::QuorumEvent;
use crate::quorum::Vote;
use crate::types::ReplicaId;

pub type EpaxosComm = Arc<dyn Communicator<Request, Reply>>;

/// bcast_pre_accept sends PreAccept to `peers`. Identical replies count toward the fast path.
pub fn bcast_pre_accept(
    comm: &EpaxosComm,
    peers: &[ReplicaId],
    req: PreAcceptRequest,
    n_total: usize,
    quorum: usize,
    fast_quorum: usize,
) -> QuorumEvent<PreAcceptReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);
    let ev = ev.with_fast_path(fast_quorum, |r: &PreAcceptReply| {
        r.status == PreAcceptStatus::Identical
    });

    bcast(comm, peers, Request::PreAccept(req), tx, |rep| match rep {
        Reply::PreAccept(r) if r.status == PreAcceptStatus::Failed => Vote::No(r),
        Reply::PreAccept(r) => Vote::Yes(r),
        _ => Vote::Unreachable,
    });
    ev
}

pub fn bcast_accept(
    comm: &EpaxosComm,
    peers: &[ReplicaId],
    req: AcceptRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<AcceptReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, Request::Accept(req), tx, |rep| match rep {
        Reply::Accept(r) if r.ok => Vote::Yes(r),
        Reply::Accept(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}

/// bcast_commit sends Commit to `peers`. Waiting on the returned event is optional: nothing
/// depends on commit replies for safety.
pub fn bcast_commit(
    comm: &EpaxosComm,
    peers: &[ReplicaId],
    req: CommitRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<CommitReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, Request::Commit(req), tx, |rep| match rep {
        Reply::Commit(r) if r.ok => Vote::Yes(r),
        Reply::Commit(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}

pub fn bcast_prepare(
    comm: &EpaxosComm,
    peers: &[ReplicaId],
    req: PrepareRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<PrepareReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, Request::Prepare(req), tx, |rep| match rep {
        Reply::Prepare(r) if r.ok => Vote::Yes(r),
        Reply::Prepare(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}
