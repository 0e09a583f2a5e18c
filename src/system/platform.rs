//! Windows implementation of the policy seams
//!
//! Native failures are logged here at warning level, in the
//! `[<operation> failure] PID: <pid>, <error>` form, and reduced to
//! `false` / `None` for the engine.

use tracing::warn;

use crate::policy::{ActiveWindow, Privilege, ProcessControl, ProcessSnapshot, ProcessSnapshotter, SnapshotError};

use super::error::NativeResult;
use super::{admin, affinity, io, memory, priority, processes, suspend, window};

/// Process control and enumeration through Win32 / NT calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct WinPlatform;

impl WinPlatform {
    pub fn new() -> Self {
        Self
    }
}

fn report<T>(operation: &str, pid: u32, result: NativeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("[{} failure] PID: {}, {}", operation, pid, e);
            None
        }
    }
}

impl ProcessControl for WinPlatform {
    fn get_priority_class(&self, pid: u32) -> Option<u32> {
        report("getPriorityClass", pid, priority::get_priority_class(pid))
    }

    fn set_priority_class(&self, pid: u32, priority_class: u32) -> bool {
        report("setPriorityClass", pid, priority::set_priority_class(pid, priority_class)).is_some()
    }

    fn get_processor_affinity(&self, pid: u32) -> Option<(usize, usize)> {
        report("getProcessorAffinity", pid, affinity::get_affinity(pid))
    }

    fn set_processor_affinity(&self, pid: u32, mask: usize) -> bool {
        report("setProcessorAffinity", pid, affinity::set_affinity(pid, mask)).is_some()
    }

    fn get_page_priority(&self, pid: u32) -> Option<u32> {
        report("getPagePriority", pid, memory::get_page_priority(pid))
    }

    fn set_page_priority(&self, pid: u32, priority: u32) -> bool {
        report("setPagePriority", pid, memory::set_page_priority(pid, priority)).is_some()
    }

    fn get_io_priority(&self, pid: u32) -> Option<u32> {
        report("getIOPriority", pid, io::get_io_priority(pid))
    }

    fn set_io_priority(&self, pid: u32, priority: u32) -> bool {
        report("setIOPriority", pid, io::set_io_priority(pid, priority)).is_some()
    }

    fn terminate_process(&self, pid: u32) -> bool {
        report("terminateProcess", pid, suspend::terminate_process(pid)).is_some()
    }

    fn suspend_process(&self, pid: u32) -> bool {
        report("suspendProcess", pid, suspend::suspend_process(pid)).is_some()
    }

    fn resume_process(&self, pid: u32) -> bool {
        report("resumeProcess", pid, suspend::resume_process(pid)).is_some()
    }

    fn adjust_privilege(&self, privilege: Privilege) -> bool {
        let result = admin::adjust_privilege(privilege.id());
        if let Err(e) = &result {
            warn!("[adjustPrivilege failure] {}: {}", privilege.name(), e);
        }
        result.is_ok()
    }

    fn active_window(&self) -> ActiveWindow {
        report("getActiveWindow", 0, window::active_window()).unwrap_or_default()
    }
}

impl ProcessSnapshotter for WinPlatform {
    fn snapshot(&self, with_cmdline: bool) -> Result<Vec<ProcessSnapshot>, SnapshotError> {
        processes::enumerate_processes(with_cmdline).map_err(|e| SnapshotError::Processes(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_own_process() {
        let platform = WinPlatform::new();
        let pid = std::process::id();

        assert!(platform.get_priority_class(pid).is_some());
        let (mask, system) = platform.get_processor_affinity(pid).unwrap();
        assert_eq!(mask & !system, 0);
        assert!(platform.set_processor_affinity(pid, mask));
    }

    #[test]
    fn test_failures_become_false() {
        let platform = WinPlatform::new();
        assert!(!platform.set_priority_class(u32::MAX - 2, 0x20));
        assert!(platform.get_io_priority(u32::MAX - 2).is_none());
    }

    #[test]
    fn test_snapshot_contains_self() {
        let processes = WinPlatform::new().snapshot(true).unwrap();
        let own = processes.iter().find(|p| p.pid == std::process::id()).unwrap();
        assert!(own.cmdline.is_some());
    }
}
