use std::collections::BTreeMap;

use crate::exec::DepGraph;
use crate::exec::Executable;
use crate::exec::LogWindow;
use crate::types::Command;
use crate::types::Conflict;
use crate::types::Instance;
use crate::types::InstanceId;
use crate::types::InstanceNo;
use crate::types::InstanceStatus;
use crate::types::ReplicaId;
use crate::types::Seq;

#[derive(Debug, Default)]
struct OriginLog {
    insts: BTreeMap<InstanceNo, Instance>,
    window: LogWindow,
}

/// InstanceSpace holds every instance a replica knows, one log per origin replica.
#[derive(Debug, Default)]
pub struct InstanceSpace {
    logs: BTreeMap<ReplicaId, OriginLog>,
}

impl InstanceSpace {
    pub fn new() -> InstanceSpace {
        InstanceSpace::default()
    }

    /// get returns None for an unknown or a purged instance.
    pub fn get(&self, iid: InstanceId) -> Option<&Instance> {
        self.logs.get(&iid.replica_id)?.insts.get(&iid.idx)
    }

    pub fn get_mut(&mut self, iid: InstanceId) -> Option<&mut Instance> {
        self.logs.get_mut(&iid.replica_id)?.insts.get_mut(&iid.idx)
    }

    pub fn is_purged(&self, iid: InstanceId) -> bool {
        match self.logs.get(&iid.replica_id) {
            Some(log) => log.window.is_purged(iid.idx),
            None => false,
        }
    }

    /// entry returns the instance, creating an empty one if it is unknown.
    /// It returns None if the instance is purged.
    pub fn entry(&mut self, iid: InstanceId) -> Option<&mut Instance> {
        let log = self.logs.entry(iid.replica_id).or_default();
        if log.window.is_purged(iid.idx) {
            return None;
        }
        Some(
            log.insts
                .entry(iid.idx)
                .or_insert_with(|| Instance::empty(iid)),
        )
    }

    pub fn insert(&mut self, inst: Instance) {
        let iid = inst.instance_id;
        self.logs
            .entry(iid.replica_id)
            .or_default()
            .insts
            .insert(iid.idx, inst);
    }

    /// max_executed returns the execution watermark of origin `rid`.
    pub fn max_executed(&self, rid: ReplicaId) -> InstanceNo {
        self.logs
            .get(&rid)
            .map(|log| log.window.max_executed())
            .unwrap_or(0)
    }

    pub fn min_active(&self, rid: ReplicaId) -> InstanceNo {
        self.logs
            .get(&rid)
            .map(|log| log.window.min_active())
            .unwrap_or(1)
    }

    /// gc purges executed instances that fall out of the retention window of every origin.
    /// It returns the number of instances purged.
    pub fn gc(&mut self, retention: i64) -> usize {
        let mut n = 0;
        for log in self.logs.values_mut() {
            for idx in log.window.collect(retention) {
                if let Some(inst) = log.insts.remove(&idx) {
                    debug_assert_eq!(InstanceStatus::Executed, inst.status);
                    n += 1;
                }
            }
        }
        n
    }

    /// len returns the number of instances held, purged ones excluded.
    pub fn len(&self) -> usize {
        self.logs.values().map(|log| log.insts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.logs.values().flat_map(|log| log.insts.values())
    }
}

impl DepGraph for InstanceSpace {
    type Key = InstanceId;
    type Order = (Seq, ReplicaId, InstanceNo);

    /// An instance depending on `(r, n)` has to execute after every interfering instance of
    /// origin `r` up to `n`.
    ///
    /// An instance this replica has never seen, or an uncommitted one that may interfere,
    /// blocks the execution. An uncommitted no-op may still be recovered into a real command
    /// so it blocks too.
    ///
    /// Unknown slots are not skipped: their command is unknown and may interfere. Waiting on
    /// them costs a recovery, which commits whatever was chosen there or a no-op.
    fn predecessors(&self, key: InstanceId) -> Result<Vec<InstanceId>, InstanceId> {
        let inst = self.get(key).ok_or(key)?;

        let mut preds = vec![];
        for (rid, upto) in inst.deps.iter() {
            let from = self.max_executed(*rid) + 1;
            for idx in from..=*upto {
                let iid = InstanceId::new(*rid, idx);
                if iid == key {
                    continue;
                }

                let dep = self.get(iid).ok_or(iid)?;
                match dep.status {
                    InstanceStatus::Executed => {}
                    InstanceStatus::Committed => {
                        if dep.conflict(inst) {
                            preds.push(iid);
                        }
                    }
                    _ => {
                        if dep.is_noop() || dep.conflict(inst) {
                            return Err(iid);
                        }
                    }
                }
            }
        }
        Ok(preds)
    }

    fn order(&self, key: InstanceId) -> Self::Order {
        let seq = self.get(key).map(|x| x.seq).unwrap_or(0);
        (seq, key.replica_id, key.idx)
    }
}

impl Executable for InstanceSpace {
    fn is_executed(&self, key: InstanceId) -> bool {
        if self.is_purged(key) {
            return true;
        }
        self.get(key).map(|x| x.status) == Some(InstanceStatus::Executed)
    }

    fn is_committed(&self, key: InstanceId) -> bool {
        self.get(key).map(|x| x.status.is_committed()) == Some(true)
    }

    fn command(&self, key: InstanceId) -> Option<Command> {
        self.get(key).map(|x| x.cmd.clone())
    }

    fn mark_executed(&mut self, key: InstanceId) -> Option<Command> {
        let log = self.logs.get_mut(&key.replica_id)?;
        let inst = log.insts.get_mut(&key.idx)?;
        if inst.status == InstanceStatus::Executed {
            return None;
        }
        inst.status = InstanceStatus::Executed;
        let cmd = inst.cmd.clone();

        let insts = &log.insts;
        log.window
            .advance(|i| insts.get(&i).map(|x| x.status) == Some(InstanceStatus::Executed));

        Some(cmd)
    }
}
