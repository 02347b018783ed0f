use std::collections::BTreeMap;
use std::fmt;
use std::iter::FromIterator;
use std::ops::Index;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use super::InstanceId;
use super::InstanceNo;
use super::ReplicaId;

/// Deps records, for every origin replica, the highest instance number an instance depends on.
/// An origin absent from the map means "no dependency on that origin".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deps {
    ids: BTreeMap<ReplicaId, InstanceNo>,
}

/// Let user use method of BTreeMap directly.
impl Deref for Deps {
    type Target = BTreeMap<ReplicaId, InstanceNo>;
    fn deref(&self) -> &Self::Target {
        &self.ids
    }
}

impl DerefMut for Deps {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ids
    }
}

/// Let user use deps[replica_id] to retrieve a dependency.
/// It panics if replica_id not found.
impl Index<ReplicaId> for Deps {
    type Output = InstanceNo;
    fn index(&self, rid: ReplicaId) -> &Self::Output {
        match self.ids.get(&rid) {
            Some(idx) => idx,
            None => panic!("NotFound dep with replica_id={}", rid),
        }
    }
}

/// A Deps equals an InstanceId if it depends on exactly that instance of that origin.
impl PartialEq<InstanceId> for Deps {
    fn eq(&self, other: &InstanceId) -> bool {
        self.get(other.replica_id) == Some(other.idx)
    }
}

impl Deps {
    pub fn new() -> Deps {
        Deps::default()
    }

    /// get returns the highest instance number depended on from origin `rid`.
    pub fn get(&self, rid: ReplicaId) -> Option<InstanceNo> {
        self.ids.get(&rid).copied()
    }

    /// set adds a dependency or overrides the one with the same origin.
    /// It returns the replaced value.
    pub fn set(&mut self, rid: ReplicaId, idx: InstanceNo) -> Option<InstanceNo> {
        self.ids.insert(rid, idx)
    }

    /// set_max raises the dependency on `rid` to at least `idx`.
    /// It returns true if anything changed.
    pub fn set_max(&mut self, rid: ReplicaId, idx: InstanceNo) -> bool {
        match self.ids.get_mut(&rid) {
            Some(cur) if *cur >= idx => false,
            Some(cur) => {
                *cur = idx;
                true
            }
            None => {
                self.ids.insert(rid, idx);
                true
            }
        }
    }

    /// merge_max takes the per-origin maximum of self and `other`.
    /// It returns true if self changed.
    pub fn merge_max(&mut self, other: &Deps) -> bool {
        let mut changed = false;
        for (rid, idx) in other.iter() {
            changed |= self.set_max(*rid, *idx);
        }
        changed
    }

    /// instance_ids returns the dependencies as instance ids.
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.ids
            .iter()
            .map(|(rid, idx)| InstanceId::new(*rid, *idx))
            .collect()
    }
}

impl fmt::Display for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (rid, idx)) in self.ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", rid, idx)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(ReplicaId, InstanceNo)> for Deps {
    fn from_iter<T: IntoIterator<Item = (ReplicaId, InstanceNo)>>(iter: T) -> Self {
        Deps {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<A: Into<ReplicaId> + Copy, B: Into<InstanceNo> + Copy> From<&[(A, B)]> for Deps {
    fn from(v: &[(A, B)]) -> Deps {
        v.iter().map(|(a, b)| ((*a).into(), (*b).into())).collect()
    }
}

impl<A: Into<ReplicaId> + Copy, B: Into<InstanceNo> + Copy, const N: usize> From<[(A, B); N]>
    for Deps
{
    fn from(v: [(A, B); N]) -> Deps {
        v.iter().map(|(a, b)| ((*a).into(), (*b).into())).collect()
    }
}

impl From<Vec<InstanceId>> for Deps {
    fn from(v: Vec<InstanceId>) -> Deps {
        let mut deps = Deps::new();
        for iid in v.iter() {
            deps.set_max(iid.replica_id, iid.idx);
        }
        deps
    }
}
