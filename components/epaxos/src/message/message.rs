//! EPaxos messages exchanged between a command leader and its acceptors.

use crate::types::Ballot;
use crate::types::Command;
use crate::types::DepKey;
use crate::types::Deps;
use crate::types::Instance;
use crate::types::InstanceId;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Seq;

#[cfg(test)]
#[path = "./tests/message_tests.rs"]
mod tests;

/// PreAcceptRequest is phase-1 of an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreAcceptRequest {
    pub ballot: Ballot,
    pub instance_id: InstanceId,
    pub cmd: Command,
    pub dkey: DepKey,
    pub seq: Seq,
    pub deps: Deps,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PreAcceptStatus {
    /// The acceptor agrees with the proposed attributes.
    Identical,
    /// The acceptor merged in something the leader did not know.
    NonIdentical,
    /// Stale ballot, or the instance is already committed here.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreAcceptReply {
    pub status: PreAcceptStatus,
    pub highest_seen: Ballot,
    pub seq: Seq,
    pub deps: Deps,
}

/// AcceptRequest is the slow path, with attributes merged from a quorum of PreAccept replies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptRequest {
    pub ballot: Ballot,
    pub instance_id: InstanceId,
    pub cmd: Command,
    pub dkey: DepKey,
    pub seq: Seq,
    pub deps: Deps,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptReply {
    pub ok: bool,
    pub highest_seen: Ballot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRequest {
    pub ballot: Ballot,
    pub instance_id: InstanceId,
    pub cmd: Command,
    pub dkey: DepKey,
    pub seq: Seq,
    pub deps: Deps,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReply {
    pub ok: bool,
}

/// PrepareRequest asks an acceptor to promise `ballot` for an instance and report what it knows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareRequest {
    pub ballot: Ballot,
    pub instance_id: InstanceId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareReply {
    pub ok: bool,
    pub replica_id: ReplicaId,
    pub status: InstanceStatus,
    pub cmd: Command,
    pub dkey: DepKey,
    pub seq: Seq,
    pub deps: Deps,

    /// The ballot the attributes were accepted under.
    pub ballot: Ballot,
    pub highest_seen: Ballot,

    /// The instance is executed and garbage collected: its content is gone.
    pub purged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::From)]
pub enum Request {
    PreAccept(PreAcceptRequest),
    Accept(AcceptRequest),
    Commit(CommitRequest),
    Prepare(PrepareRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::From)]
pub enum Reply {
    PreAccept(PreAcceptReply),
    Accept(AcceptReply),
    Commit(CommitReply),
    Prepare(PrepareReply),
}

/// MakeRequest builds requests from the leader's copy of an instance.
pub struct MakeRequest {}

impl MakeRequest {
    pub fn pre_accept(inst: &Instance) -> PreAcceptRequest {
        PreAcceptRequest {
            ballot: inst.ballot,
            instance_id: inst.instance_id,
            cmd: inst.cmd.clone(),
            dkey: inst.dkey.clone(),
            seq: inst.seq,
            deps: inst.deps.clone(),
        }
    }

    pub fn accept(inst: &Instance) -> AcceptRequest {
        AcceptRequest {
            ballot: inst.ballot,
            instance_id: inst.instance_id,
            cmd: inst.cmd.clone(),
            dkey: inst.dkey.clone(),
            seq: inst.seq,
            deps: inst.deps.clone(),
        }
    }

    pub fn commit(inst: &Instance) -> CommitRequest {
        CommitRequest {
            ballot: inst.ballot,
            instance_id: inst.instance_id,
            cmd: inst.cmd.clone(),
            dkey: inst.dkey.clone(),
            seq: inst.seq,
            deps: inst.deps.clone(),
        }
    }

    pub fn prepare(ballot: Ballot, iid: InstanceId) -> PrepareRequest {
        PrepareRequest {
            ballot,
            instance_id: iid,
        }
    }
}

/// MakeReply builds replies from an acceptor's copy of an instance.
pub struct MakeReply {}

impl MakeReply {
    pub fn pre_accept(status: PreAcceptStatus, inst: &Instance) -> PreAcceptReply {
        PreAcceptReply {
            status,
            highest_seen: inst.highest_seen,
            seq: inst.seq,
            deps: inst.deps.clone(),
        }
    }

    pub fn pre_accept_failed(highest_seen: Ballot) -> PreAcceptReply {
        PreAcceptReply {
            status: PreAcceptStatus::Failed,
            highest_seen,
            seq: 0,
            deps: Deps::new(),
        }
    }

    pub fn accept(ok: bool, highest_seen: Ballot) -> AcceptReply {
        AcceptReply { ok, highest_seen }
    }

    pub fn prepare(ok: bool, rid: ReplicaId, inst: &Instance) -> PrepareReply {
        PrepareReply {
            ok,
            replica_id: rid,
            status: inst.status,
            cmd: inst.cmd.clone(),
            dkey: inst.dkey.clone(),
            seq: inst.seq,
            deps: inst.deps.clone(),
            ballot: inst.ballot,
            highest_seen: inst.highest_seen,
            purged: false,
        }
    }

    /// prepare_purged is the reply for an instance that has been executed and garbage
    /// collected: its content is gone, the requester must learn it elsewhere.
    pub fn prepare_purged(rid: ReplicaId, iid: InstanceId) -> PrepareReply {
        let mut inst = Instance::empty(iid);
        inst.status = InstanceStatus::Executed;
        PrepareReply {
            purged: true,
            ..MakeReply::prepare(false, rid, &inst)
        }
    }
}

impl Request {
    pub fn instance_id(&self) -> InstanceId {
        match self {
            Request::PreAccept(r) => r.instance_id,
            Request::Accept(r) => r.instance_id,
            Request::Commit(r) => r.instance_id,
            Request::Prepare(r) => r.instance_id,
        }
    }
}
