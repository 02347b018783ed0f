use super::CopilotInstance;
use super::LogInfo;
use super::LogKind;
use super::SlotId;
use crate::exec::DepGraph;
use crate::exec::Executable;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::Slot;

/// CopilotLogs is the pilot log and the copilot log of one replica.
#[derive(Debug)]
pub struct CopilotLogs {
    logs: [LogInfo; 2],
}

impl Default for CopilotLogs {
    fn default() -> Self {
        CopilotLogs {
            logs: [LogInfo::new(LogKind::Pilot), LogInfo::new(LogKind::Copilot)],
        }
    }
}

impl CopilotLogs {
    pub fn new() -> CopilotLogs {
        CopilotLogs::default()
    }

    pub fn log(&self, kind: LogKind) -> &LogInfo {
        &self.logs[kind.index()]
    }

    pub fn log_mut(&mut self, kind: LogKind) -> &mut LogInfo {
        &mut self.logs[kind.index()]
    }

    pub fn get(&self, sid: SlotId) -> Option<&CopilotInstance> {
        self.log(sid.log).get(sid.slot)
    }

    pub fn get_mut(&mut self, sid: SlotId) -> Option<&mut CopilotInstance> {
        self.log_mut(sid.log).get_mut(sid.slot)
    }

    /// entry returns the entry at `sid`, creating it if absent. None if it is purged.
    pub fn entry(&mut self, sid: SlotId) -> Option<&mut CopilotInstance> {
        self.log_mut(sid.log).entry(sid.slot)
    }

    pub fn is_purged(&self, sid: SlotId) -> bool {
        self.log(sid.log).is_purged(sid.slot)
    }

    /// suggest_dep checks whether proposing `sid` after `dep` of the other log keeps every
    /// pair of entries ordered. It returns `dep` if so.
    ///
    /// Otherwise some entry after `dep` of the other log has been accepted with a dependency
    /// earlier than `sid`: neither would wait for the other. The suggestion is then the
    /// highest accepted slot of the other log.
    pub fn suggest_dep(&self, sid: SlotId, dep: Slot) -> Slot {
        let other = self.log(sid.log.other());

        for j in dep + 1..=other.max_accepted {
            if let Some(x) = other.get(j) {
                if x.status >= InstanceStatus::PreAccepted && x.dep < sid.slot {
                    return other.max_accepted;
                }
            }
        }
        dep
    }

    /// gc purges executed entries of both logs. It returns the number of entries removed.
    pub fn gc(&mut self, retention: i64) -> usize {
        self.logs.iter_mut().map(|l| l.gc(retention)).sum()
    }

    pub fn len(&self) -> usize {
        self.logs.iter().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DepGraph for CopilotLogs {
    type Key = SlotId;
    type Order = SlotId;

    /// An entry executes after every earlier slot of its own log and every slot of the other
    /// log up to its dependency.
    fn predecessors(&self, key: SlotId) -> Result<Vec<SlotId>, SlotId> {
        let inst = self.get(key).ok_or(key)?;

        let ranges = [(key.log, key.slot - 1), (key.log.other(), inst.dep)];

        let mut preds = vec![];
        for (kind, upto) in ranges.iter().copied() {
            let log = self.log(kind);
            for slot in log.max_executed() + 1..=upto {
                let sid = SlotId::new(kind, slot);
                match log.get(slot).map(|x| x.status) {
                    Some(InstanceStatus::Executed) => {}
                    Some(InstanceStatus::Committed) => preds.push(sid),
                    _ => return Err(sid),
                }
            }
        }
        Ok(preds)
    }

    /// Pilot entries first, then by slot.
    fn order(&self, key: SlotId) -> SlotId {
        key
    }
}

impl Executable for CopilotLogs {
    fn is_executed(&self, key: SlotId) -> bool {
        self.log(key.log).is_executed(key.slot)
    }

    fn is_committed(&self, key: SlotId) -> bool {
        self.get(key).map(|x| x.status.is_committed()) == Some(true)
    }

    fn command(&self, key: SlotId) -> Option<Command> {
        self.get(key).map(|x| x.cmd.clone())
    }

    fn mark_executed(&mut self, key: SlotId) -> Option<Command> {
        self.log_mut(key.log).mark_executed(key.slot)
    }
}
