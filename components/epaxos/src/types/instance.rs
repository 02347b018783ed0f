use std::fmt;

use serde::{Deserialize, Serialize};

use super::Ballot;
use super::Command;
use super::Conflict;
use super::DepKey;
use super::Deps;
use super::InstanceNo;
use super::ReplicaId;
use super::Seq;
use super::NOOP_DKEY;

/// InstanceId identifies an instance by the replica that created it and a per-replica number.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InstanceId {
    pub replica_id: ReplicaId,
    pub idx: InstanceNo,
}

impl InstanceId {
    pub fn new(replica_id: ReplicaId, idx: InstanceNo) -> InstanceId {
        InstanceId { replica_id, idx }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.replica_id, self.idx)
    }
}

impl<A: Into<ReplicaId>, B: Into<InstanceNo>> From<(A, B)> for InstanceId {
    fn from(t: (A, B)) -> InstanceId {
        InstanceId::new(t.0.into(), t.1.into())
    }
}

/// InstanceStatus is the lifecycle of an instance on one replica.
/// It only moves forward, except that a strictly higher ballot may move an uncommitted instance
/// back to PreAccepted during recovery.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum InstanceStatus {
    NotStarted,
    PreAccepted,
    Accepted,
    Committed,
    Executed,
}

impl Default for InstanceStatus {
    fn default() -> Self {
        InstanceStatus::NotStarted
    }
}

impl InstanceStatus {
    pub fn is_committed(&self) -> bool {
        *self >= InstanceStatus::Committed
    }
}

/// Instance is one EPaxos consensus slot as seen by one replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: InstanceId,
    pub cmd: Command,
    pub dkey: DepKey,
    pub seq: Seq,
    pub deps: Deps,

    /// The ballot under which the current attributes were accepted.
    pub ballot: Ballot,

    /// The highest ballot this replica has promised for the instance. Never below `ballot`.
    pub highest_seen: Ballot,

    pub status: InstanceStatus,
}

impl Instance {
    /// empty creates the record of an instance this replica knows nothing about yet.
    pub fn empty(iid: InstanceId) -> Instance {
        Instance {
            instance_id: iid,
            dkey: NOOP_DKEY.to_string(),
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.cmd.is_noop()
    }

    /// same_attrs returns true if the instance carries exactly these attributes.
    pub fn same_attrs(&self, seq: Seq, deps: &Deps) -> bool {
        self.seq == seq && &self.deps == deps
    }

    /// adopt overwrites command and attributes, e.g. with what a leader or a recovery decided.
    pub fn adopt(&mut self, cmd: Command, dkey: DepKey, seq: Seq, deps: Deps) {
        self.cmd = cmd;
        self.dkey = dkey;
        self.seq = seq;
        self.deps = deps;
    }

    /// promise raises the highest seen ballot. It returns false if `ballot` is stale.
    pub fn promise(&mut self, ballot: Ballot) -> bool {
        if ballot < self.highest_seen {
            return false;
        }
        self.highest_seen = ballot;
        true
    }
}

impl Conflict for Instance {
    fn touched_key(&self) -> Option<&str> {
        if self.is_noop() {
            None
        } else {
            Some(&self.dkey)
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{id:{}, cmd:{}, dkey:{}, seq:{}, deps:{}, blt:{}, seen:{}, status:{:?}}}",
            self.instance_id,
            self.cmd,
            self.dkey,
            self.seq,
            self.deps,
            self.ballot,
            self.highest_seen,
            self.status
        )
    }
}
