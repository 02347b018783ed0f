//! Copilot messages. Every request names an entry by its SlotId.

use super::CopilotInstance;
use super::SlotId;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Slot;

/// FastAcceptRequest proposes `cmd` at `slot_id`, ordered after `dep` of the other log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastAcceptRequest {
    pub ballot: Ballot,
    pub slot_id: SlotId,
    pub cmd: Command,
    pub dep: Slot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastAcceptReply {
    pub ok: bool,
    pub highest_seen: Ballot,

    /// The dependency the acceptor suggests. Equal to the proposed one if compatible.
    pub dep: Slot,
    pub compatible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptRequest {
    pub ballot: Ballot,
    pub slot_id: SlotId,
    pub cmd: Command,
    pub dep: Slot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptReply {
    pub ok: bool,
    pub highest_seen: Ballot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRequest {
    pub ballot: Ballot,
    pub slot_id: SlotId,
    pub cmd: Command,
    pub dep: Slot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReply {
    pub ok: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareRequest {
    pub ballot: Ballot,
    pub slot_id: SlotId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareReply {
    pub ok: bool,
    pub replica_id: ReplicaId,
    pub status: InstanceStatus,
    pub cmd: Command,
    pub dep: Slot,
    pub ballot: Ballot,
    pub highest_seen: Ballot,

    /// The entry is executed and garbage collected: its content is gone.
    pub purged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::From)]
pub enum CopilotRequest {
    FastAccept(FastAcceptRequest),
    Accept(AcceptRequest),
    Commit(CommitRequest),
    Prepare(PrepareRequest),
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::From)]
pub enum CopilotReply {
    FastAccept(FastAcceptReply),
    Accept(AcceptReply),
    Commit(CommitReply),
    Prepare(PrepareReply),
}

impl CopilotRequest {
    pub fn slot_id(&self) -> SlotId {
        match self {
            CopilotRequest::FastAccept(r) => r.slot_id,
            CopilotRequest::Accept(r) => r.slot_id,
            CopilotRequest::Commit(r) => r.slot_id,
            CopilotRequest::Prepare(r) => r.slot_id,
        }
    }
}

impl From<&CopilotInstance> for FastAcceptRequest {
    fn from(inst: &CopilotInstance) -> Self {
        FastAcceptRequest {
            ballot: inst.ballot,
            slot_id: inst.slot_id,
            cmd: inst.cmd.clone(),
            dep: inst.dep,
        }
    }
}

impl From<&CopilotInstance> for AcceptRequest {
    fn from(inst: &CopilotInstance) -> Self {
        AcceptRequest {
            ballot: inst.ballot,
            slot_id: inst.slot_id,
            cmd: inst.cmd.clone(),
            dep: inst.dep,
        }
    }
}

impl From<&CopilotInstance> for CommitRequest {
    fn from(inst: &CopilotInstance) -> Self {
        CommitRequest {
            ballot: inst.ballot,
            slot_id: inst.slot_id,
            cmd: inst.cmd.clone(),
            dep: inst.dep,
        }
    }
}

impl PrepareReply {
    pub fn of(ok: bool, rid: ReplicaId, inst: &CopilotInstance) -> PrepareReply {
        PrepareReply {
            ok,
            replica_id: rid,
            status: inst.status,
            cmd: inst.cmd.clone(),
            dep: inst.dep,
            ballot: inst.ballot,
            highest_seen: inst.highest_seen,
            purged: false,
        }
    }

    /// purged is the reply for an entry that was executed and garbage collected.
    pub fn purged(rid: ReplicaId, slot_id: SlotId) -> PrepareReply {
        let mut inst = CopilotInstance::empty(slot_id);
        inst.status = InstanceStatus::Executed;
        PrepareReply {
            purged: true,
            ..PrepareReply::of(false, rid, &inst)
        }
    }
}
