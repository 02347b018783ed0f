use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

use crate::exec::LogWindow;
use crate::types::Ballot;
use crate::types::Command;
use crate::types::InstanceStatus;
use crate::types::Slot;

/// LogKind names one of the two logs. The pilot log orders before the copilot log.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LogKind {
    Pilot,
    Copilot,
}

impl LogKind {
    pub fn other(self) -> LogKind {
        match self {
            LogKind::Pilot => LogKind::Copilot,
            LogKind::Copilot => LogKind::Pilot,
        }
    }

    pub fn index(self) -> usize {
        match self {
            LogKind::Pilot => 0,
            LogKind::Copilot => 1,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Pilot => write!(f, "pilot"),
            LogKind::Copilot => write!(f, "copilot"),
        }
    }
}

/// SlotId identifies an entry: the log it lives in and its position.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SlotId {
    pub log: LogKind,
    pub slot: Slot,
}

impl SlotId {
    pub fn new(log: LogKind, slot: Slot) -> SlotId {
        SlotId { log, slot }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.log, self.slot)
    }
}

impl From<(LogKind, Slot)> for SlotId {
    fn from(v: (LogKind, Slot)) -> SlotId {
        SlotId::new(v.0, v.1)
    }
}

/// CopilotInstance is one entry of a log.
///
/// `dep` is the slot of the other log this entry executes after; 0 means none.
/// FastAccepted entries use `InstanceStatus::PreAccepted`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopilotInstance {
    pub slot_id: SlotId,
    pub cmd: Command,
    pub dep: Slot,

    /// The ballot `cmd` and `dep` were accepted under.
    pub ballot: Ballot,
    pub highest_seen: Ballot,
    pub status: InstanceStatus,
}

impl CopilotInstance {
    pub fn empty(slot_id: SlotId) -> CopilotInstance {
        CopilotInstance {
            slot_id,
            cmd: Command::noop(),
            dep: 0,
            ballot: Ballot::default(),
            highest_seen: Ballot::default(),
            status: InstanceStatus::NotStarted,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.cmd.is_noop()
    }

    /// promise raises `highest_seen` to `ballot`. It returns false if a higher ballot is already
    /// promised.
    pub fn promise(&mut self, ballot: Ballot) -> bool {
        if ballot < self.highest_seen {
            return false;
        }
        self.highest_seen = ballot;
        true
    }

    pub fn adopt(&mut self, cmd: Command, dep: Slot, ballot: Ballot) {
        self.cmd = cmd;
        self.dep = dep;
        self.ballot = ballot;
        if ballot > self.highest_seen {
            self.highest_seen = ballot;
        }
    }
}

impl fmt::Display for CopilotInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} cmd:{} dep:{} blt:{} seen:{} {:?}}}",
            self.slot_id, self.cmd, self.dep, self.ballot, self.highest_seen, self.status
        )
    }
}

/// LogInfo is one log and its watermarks.
///
/// Slot 0 is a sentinel that counts as executed and is never stored.
/// `max_accepted` and `max_committed` never go backward.
#[derive(Debug)]
pub struct LogInfo {
    pub kind: LogKind,
    insts: BTreeMap<Slot, CopilotInstance>,

    /// The last slot the proposer of this log allocated.
    pub current_slot: Slot,
    pub max_accepted: Slot,
    pub max_committed: Slot,
    pub(crate) window: LogWindow,
}

impl LogInfo {
    pub fn new(kind: LogKind) -> LogInfo {
        LogInfo {
            kind,
            insts: BTreeMap::new(),
            current_slot: 0,
            max_accepted: 0,
            max_committed: 0,
            window: LogWindow::new(),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&CopilotInstance> {
        self.insts.get(&slot)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut CopilotInstance> {
        self.insts.get_mut(&slot)
    }

    pub fn is_purged(&self, slot: Slot) -> bool {
        self.window.is_purged(slot)
    }

    /// entry returns the entry at `slot`, creating an empty one if absent.
    /// A purged slot, or the sentinel, is never recreated.
    pub fn entry(&mut self, slot: Slot) -> Option<&mut CopilotInstance> {
        if slot <= 0 || self.is_purged(slot) {
            return None;
        }
        let kind = self.kind;
        Some(
            self.insts
                .entry(slot)
                .or_insert_with(|| CopilotInstance::empty(SlotId::new(kind, slot))),
        )
    }

    pub fn is_executed(&self, slot: Slot) -> bool {
        if slot <= self.window.max_executed() {
            return true;
        }
        match self.insts.get(&slot) {
            Some(x) => x.status == InstanceStatus::Executed,
            None => false,
        }
    }

    pub fn max_executed(&self) -> Slot {
        self.window.max_executed()
    }

    pub fn min_active(&self) -> Slot {
        self.window.min_active()
    }

    /// advance_accepted moves `max_accepted` up to `slot`, stopping before the first known
    /// entry that is not yet fast accepted. Unknown slots are passed over.
    pub fn advance_accepted(&mut self, slot: Slot) -> Slot {
        self.max_accepted = self.advance_to(self.max_accepted, slot, InstanceStatus::PreAccepted);
        self.max_accepted
    }

    pub fn advance_committed(&mut self, slot: Slot) -> Slot {
        self.max_committed = self.advance_to(self.max_committed, slot, InstanceStatus::Committed);
        self.max_committed
    }

    fn advance_to(&self, from: Slot, slot: Slot, at_least: InstanceStatus) -> Slot {
        let mut pos = from;
        while pos < slot {
            let lower = self
                .insts
                .get(&(pos + 1))
                .map(|x| x.status < at_least)
                .unwrap_or(false);
            if lower {
                break;
            }
            pos += 1;
        }
        pos
    }

    /// mark_executed moves a committed entry to Executed and advances the executed watermark.
    pub fn mark_executed(&mut self, slot: Slot) -> Option<Command> {
        let cmd = {
            let inst = self.insts.get_mut(&slot)?;
            if inst.status != InstanceStatus::Committed {
                return None;
            }
            inst.status = InstanceStatus::Executed;
            inst.cmd.clone()
        };

        let insts = &self.insts;
        self.window.advance(|s| {
            insts
                .get(&s)
                .map(|x| x.status == InstanceStatus::Executed)
                .unwrap_or(false)
        });
        Some(cmd)
    }

    /// gc purges executed entries that fell `retention` slots behind the executed watermark.
    pub fn gc(&mut self, retention: i64) -> usize {
        let purge: Range<Slot> = self.window.collect(retention);
        let mut n = 0;
        for slot in purge {
            if self.insts.remove(&slot).is_some() {
                n += 1;
            }
        }
        n
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}
