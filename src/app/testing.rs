//! In-memory stand-ins for the native layer, shared by the app tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::policy::{
    ActiveWindow, CpuPriority, CpuTopology, IoPriority, PagePriority, Privilege, ProcessControl, ProcessSnapshot,
    ProcessSnapshotter, SnapshotError,
};

use super::timers::{ActionScheduler, DelayedAction};

pub const TOPOLOGY: CpuTopology = CpuTopology {
    logical_cores: 8,
    physical_cores: 4,
};
pub const SYSTEM_MASK: usize = 0xFF;
pub const SELF_PID: u32 = 4242;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeProcess {
    pub priority_class: u32,
    pub affinity: usize,
    pub page: u32,
    pub io: u32,
}

impl Default for FakeProcess {
    fn default() -> Self {
        Self {
            priority_class: CpuPriority::Normal.code(),
            affinity: SYSTEM_MASK,
            page: PagePriority::Normal.code(),
            io: IoPriority::Normal.code(),
        }
    }
}

#[derive(Default)]
pub struct FakeControl {
    pub processes: Mutex<HashMap<u32, FakeProcess>>,
    pub window: Mutex<ActiveWindow>,
    pub failing: Mutex<HashSet<u32>>,
}

impl FakeControl {
    pub fn focus(&self, pid: u32, is_fullscreen: bool) {
        *self.window.lock().unwrap() = ActiveWindow { pid, is_fullscreen };
    }

    pub fn process(&self, pid: u32) -> FakeProcess {
        self.processes.lock().unwrap().get(&pid).copied().unwrap_or_default()
    }

    fn update(&self, pid: u32, change: impl FnOnce(&mut FakeProcess)) -> bool {
        if self.failing.lock().unwrap().contains(&pid) {
            return false;
        }
        change(self.processes.lock().unwrap().entry(pid).or_default());
        true
    }
}

impl ProcessControl for FakeControl {
    fn get_priority_class(&self, pid: u32) -> Option<u32> {
        Some(self.process(pid).priority_class)
    }

    fn set_priority_class(&self, pid: u32, priority_class: u32) -> bool {
        self.update(pid, |p| p.priority_class = priority_class)
    }

    fn get_processor_affinity(&self, pid: u32) -> Option<(usize, usize)> {
        Some((self.process(pid).affinity, SYSTEM_MASK))
    }

    fn set_processor_affinity(&self, pid: u32, mask: usize) -> bool {
        self.update(pid, |p| p.affinity = mask)
    }

    fn get_page_priority(&self, pid: u32) -> Option<u32> {
        Some(self.process(pid).page)
    }

    fn set_page_priority(&self, pid: u32, priority: u32) -> bool {
        self.update(pid, |p| p.page = priority)
    }

    fn get_io_priority(&self, pid: u32) -> Option<u32> {
        Some(self.process(pid).io)
    }

    fn set_io_priority(&self, pid: u32, priority: u32) -> bool {
        self.update(pid, |p| p.io = priority)
    }

    fn terminate_process(&self, _: u32) -> bool {
        true
    }

    fn suspend_process(&self, _: u32) -> bool {
        true
    }

    fn resume_process(&self, _: u32) -> bool {
        true
    }

    fn adjust_privilege(&self, _: Privilege) -> bool {
        true
    }

    fn active_window(&self) -> ActiveWindow {
        *self.window.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    pub scheduled: Mutex<Vec<DelayedAction>>,
}

impl ActionScheduler for RecordingScheduler {
    fn schedule(&self, action: DelayedAction) {
        self.scheduled.lock().unwrap().push(action);
    }
}

impl RecordingScheduler {
    pub fn take(&self) -> Vec<DelayedAction> {
        std::mem::take(&mut *self.scheduled.lock().unwrap())
    }
}

/// Returns a fixed process list, or an error while `failing` is set.
#[derive(Default)]
pub struct FakeSnapshotter {
    pub processes: Mutex<Vec<ProcessSnapshot>>,
    pub failing: Mutex<bool>,
    pub cmdline_requests: Mutex<Vec<bool>>,
}

impl FakeSnapshotter {
    pub fn set(&self, entries: &[(u32, &str)]) {
        *self.processes.lock().unwrap() = snapshot(entries);
    }
}

impl ProcessSnapshotter for FakeSnapshotter {
    fn snapshot(&self, with_cmdline: bool) -> Result<Vec<ProcessSnapshot>, SnapshotError> {
        self.cmdline_requests.lock().unwrap().push(with_cmdline);
        if *self.failing.lock().unwrap() {
            return Err(SnapshotError::Processes("snapshot unavailable".to_string()));
        }
        Ok(self.processes.lock().unwrap().clone())
    }
}

pub fn snapshot(entries: &[(u32, &str)]) -> Vec<ProcessSnapshot> {
    entries.iter().map(|(pid, name)| ProcessSnapshot::new(*pid, *name)).collect()
}
