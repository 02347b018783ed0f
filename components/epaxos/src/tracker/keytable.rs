use std::collections::HashMap;

use crate::types::DepKey;
use crate::types::Deps;
use crate::types::InstanceId;
use crate::types::ReplicaId;
use crate::types::Seq;

/// KeyTable tracks, per dependency key, the highest seq seen and the latest instance of every
/// origin that touched the key.
///
/// No-ops never enter the table.
#[derive(Debug, Default)]
pub struct KeyTable {
    seqs: HashMap<DepKey, Seq>,
    deps: HashMap<DepKey, Deps>,
}

impl KeyTable {
    pub fn new() -> KeyTable {
        KeyTable::default()
    }

    pub fn max_seq(&self, dkey: &str) -> Seq {
        self.seqs.get(dkey).copied().unwrap_or(0)
    }

    pub fn deps_of(&self, dkey: &str) -> Deps {
        self.deps.get(dkey).cloned().unwrap_or_default()
    }

    /// initial_attrs returns the attributes a leader proposes for a new command on `dkey`:
    /// one more than the highest seq, and the latest known instance of every origin.
    pub fn initial_attrs(&self, dkey: &str) -> (Seq, Deps) {
        (self.max_seq(dkey) + 1, self.deps_of(dkey))
    }

    /// merge_attrs merges proposed attributes of an instance from `origin` with what this
    /// replica has seen. It returns the merged attributes and whether they differ from the
    /// proposal.
    ///
    /// The origin's own entry is left alone: the origin always knows its own instances best,
    /// and a later instance of the same origin must not become a dependency.
    pub fn merge_attrs(
        &self,
        dkey: &str,
        origin: ReplicaId,
        seq: Seq,
        deps: &Deps,
    ) -> (Seq, Deps, bool) {
        let mut changed = false;

        let mut new_seq = seq;
        let local = self.max_seq(dkey) + 1;
        if local > new_seq {
            new_seq = local;
            changed = true;
        }

        let mut new_deps = deps.clone();
        if let Some(known) = self.deps.get(dkey) {
            for (rid, idx) in known.iter() {
                if *rid == origin {
                    continue;
                }
                changed |= new_deps.set_max(*rid, *idx);
            }
        }

        (new_seq, new_deps, changed)
    }

    /// record makes an instance's attributes visible to later commands on the same key.
    pub fn record(&mut self, dkey: &str, iid: InstanceId, seq: Seq, deps: &Deps) {
        let cur = self.seqs.entry(dkey.to_string()).or_insert(0);
        if *cur < seq {
            *cur = seq;
        }

        let known = self.deps.entry(dkey.to_string()).or_default();
        known.merge_max(deps);
        known.set_max(iid.replica_id, iid.idx);
    }
}
