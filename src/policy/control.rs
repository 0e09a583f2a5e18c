//! The seams between the policy engine and the operating system
//!
//! The engine never calls Win32 directly. It reads process snapshots
//! through [`ProcessSnapshotter`] and applies changes through
//! [`ProcessControl`]; the Windows implementation lives in `system`.

use thiserror::Error;

/// One entry of a process snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    /// Executable name as reported by the OS (e.g. "notepad.exe")
    pub name: String,
    /// Full command line, only filled in when requested
    pub cmdline: Option<String>,
}

impl ProcessSnapshot {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: None,
        }
    }

    pub fn with_cmdline(mut self, cmdline: impl Into<String>) -> Self {
        self.cmdline = Some(cmdline.into());
        self
    }
}

/// The foreground window as seen by the native layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    pub pid: u32,
    /// Window covers the whole primary monitor
    pub is_fullscreen: bool,
}

/// Privileges the daemon enables on itself at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    IncreaseBasePriority,
    Debug,
}

impl Privilege {
    /// Well-known privilege value accepted by `RtlAdjustPrivilege`
    pub fn id(self) -> u32 {
        match self {
            Privilege::IncreaseBasePriority => 14,
            Privilege::Debug => 20,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Privilege::IncreaseBasePriority => "SeIncreaseBasePriorityPrivilege",
            Privilege::Debug => "SeDebugPrivilege",
        }
    }
}

/// Snapshot or file stat failure. The tick is skipped, the loop keeps going.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("process snapshot failed: {0}")]
    Processes(String),

    #[error("cannot stat configuration file: {0}")]
    Stat(#[from] std::io::Error),
}

/// Enumerates running processes.
pub trait ProcessSnapshotter: Send + Sync {
    /// Takes a snapshot. Command lines are only collected when
    /// `with_cmdline` is set, since reading them costs one handle per process.
    fn snapshot(&self, with_cmdline: bool) -> Result<Vec<ProcessSnapshot>, SnapshotError>;
}

/// Process control primitives used by the policy engine.
///
/// Every call acquires a handle, performs one native call and releases the
/// handle. Setters never fail loudly: they log a warning and return `false`.
/// Getters return `None` when the value cannot be read.
pub trait ProcessControl: Send + Sync {
    fn get_priority_class(&self, pid: u32) -> Option<u32>;
    fn set_priority_class(&self, pid: u32, priority_class: u32) -> bool;

    /// Returns `(process_mask, system_mask)`
    fn get_processor_affinity(&self, pid: u32) -> Option<(usize, usize)>;
    fn set_processor_affinity(&self, pid: u32, mask: usize) -> bool;

    fn get_page_priority(&self, pid: u32) -> Option<u32>;
    fn set_page_priority(&self, pid: u32, priority: u32) -> bool;

    fn get_io_priority(&self, pid: u32) -> Option<u32>;
    fn set_io_priority(&self, pid: u32, priority: u32) -> bool;

    fn terminate_process(&self, pid: u32) -> bool;
    fn suspend_process(&self, pid: u32) -> bool;
    fn resume_process(&self, pid: u32) -> bool;

    fn adjust_privilege(&self, privilege: Privilege) -> bool;

    fn active_window(&self) -> ActiveWindow;
}
