use std::sync::Arc;

use super::AcceptReply;
use super::AcceptRequest;
use super::CommitReply;
use super::CommitRequest;
use super::CopilotReply;
use super::CopilotRequest;
use super::FastAcceptReply;
use super::FastAcceptRequest;
use super::PrepareReply;
use super::PrepareRequest;
use crate::comm::bcast;
use crate::comm::Communicator;
use crate::quorum::QuorumEvent;
use crate::quorum::Vote;
use crate::types::ReplicaId;

pub type CopilotComm = Arc<dyn Communicator<CopilotRequest, CopilotReply>>;

/// bcast_fast_accept sends FastAccept to `peers`. Replies that keep the proposed dependency
/// count toward the fast path.
pub fn bcast_fast_accept(
    comm: &CopilotComm,
    peers: &[ReplicaId],
    req: FastAcceptRequest,
    n_total: usize,
    quorum: usize,
    fast_quorum: usize,
) -> QuorumEvent<FastAcceptReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);
    let ev = ev.with_fast_path(fast_quorum, |r: &FastAcceptReply| r.ok && r.compatible);

    bcast(comm, peers, CopilotRequest::from(req), tx, |rep| match rep {
        CopilotReply::FastAccept(r) if r.ok => Vote::Yes(r),
        CopilotReply::FastAccept(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}

pub fn bcast_accept(
    comm: &CopilotComm,
    peers: &[ReplicaId],
    req: AcceptRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<AcceptReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, CopilotRequest::from(req), tx, |rep| match rep {
        CopilotReply::Accept(r) if r.ok => Vote::Yes(r),
        CopilotReply::Accept(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}

pub fn bcast_commit(
    comm: &CopilotComm,
    peers: &[ReplicaId],
    req: CommitRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<CommitReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, CopilotRequest::from(req), tx, |rep| match rep {
        CopilotReply::Commit(r) if r.ok => Vote::Yes(r),
        CopilotReply::Commit(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}

pub fn bcast_prepare(
    comm: &CopilotComm,
    peers: &[ReplicaId],
    req: PrepareRequest,
    n_total: usize,
    quorum: usize,
) -> QuorumEvent<PrepareReply> {
    let (ev, tx) = QuorumEvent::new(n_total, quorum);

    bcast(comm, peers, CopilotRequest::from(req), tx, |rep| match rep {
        CopilotReply::Prepare(r) if r.ok => Vote::Yes(r),
        CopilotReply::Prepare(r) => Vote::No(r),
        _ => Vote::Unreachable,
    });
    ev
}
