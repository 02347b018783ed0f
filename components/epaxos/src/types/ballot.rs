use std::fmt;

use serde::{Deserialize, Serialize};

use super::ReplicaId;

/// Ballot orders competing leaders of one instance.
/// Ballots compare lexicographically by `(epoch, num, replica_id)`.
/// `num == 0` marks the default ballot an instance's original leader starts with.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Ballot {
    pub epoch: i32,
    pub num: i32,
    pub replica_id: ReplicaId,
}

impl Ballot {
    pub fn new(epoch: i32, num: i32, replica_id: ReplicaId) -> Ballot {
        Ballot {
            epoch,
            num,
            replica_id,
        }
    }

    /// The ballot the original leader of an instance uses.
    pub fn default_of(epoch: i32, replica_id: ReplicaId) -> Ballot {
        Ballot::new(epoch, 0, replica_id)
    }

    pub fn is_default(&self) -> bool {
        self.num == 0
    }

    /// is_default_of returns true if this is the default ballot of leader `rid`, i.e. no one has
    /// ever competed for the instance.
    pub fn is_default_of(&self, rid: ReplicaId) -> bool {
        self.num == 0 && self.replica_id == rid
    }

    /// next builds a ballot that is greater than self and owned by `owner`.
    /// The epoch never goes backward.
    pub fn next(&self, epoch: i32, owner: ReplicaId) -> Ballot {
        if epoch > self.epoch {
            Ballot::new(epoch, 1, owner)
        } else {
            Ballot::new(self.epoch, self.num + 1, owner)
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.epoch, self.num, self.replica_id)
    }
}

impl<A, B, C> From<(A, B, C)> for Ballot
where
    A: Into<i32>,
    B: Into<i32>,
    C: Into<ReplicaId>,
{
    fn from(t: (A, B, C)) -> Ballot {
        Ballot::new(t.0.into(), t.1.into(), t.2.into())
    }
}
