//! Owned Win32 handles used by the native operations
//!
//! A [`ProcessHandle`] lives for exactly one operation and remembers its pid,
//! so every failure on it becomes a [`NativeError`] naming the process.
//! [`ProcessEntries`] walks a ToolHelp32 process snapshot.

use std::mem;

use windows::Win32::Foundation::{CloseHandle, HANDLE, NTSTATUS};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_ACCESS_RIGHTS};

use super::error::{NativeError, NativeResult};
use super::ntdll;

pub struct ProcessHandle {
    raw: HANDLE,
    pid: u32,
}

impl ProcessHandle {
    /// Opens `pid` with exactly the access one operation needs.
    pub fn open(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> NativeResult<Self> {
        // SAFETY: OpenProcess has no preconditions; failure is returned as Err.
        unsafe { OpenProcess(access, false, pid) }
            .map(|raw| Self { raw, pid })
            .map_err(|source| NativeError::Open { pid, source })
    }

    pub fn raw(&self) -> HANDLE {
        self.raw
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Attaches the api name and pid to the result of a Win32 call on this handle.
    pub fn call<T>(&self, api: &'static str, result: windows::core::Result<T>) -> NativeResult<T> {
        result.map_err(|source| NativeError::Call {
            api,
            pid: self.pid,
            source,
        })
    }

    /// Same as [`ProcessHandle::call`] for ntdll functions returning NTSTATUS.
    pub fn status(&self, api: &'static str, status: NTSTATUS) -> NativeResult<()> {
        ntdll::check(api, self.pid, status)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: The handle came from OpenProcess and is closed only here.
        unsafe {
            let _ = CloseHandle(self.raw);
        }
    }
}

/// Iterator over `(pid, executable name)` of a process snapshot.
pub struct ProcessEntries {
    snapshot: HANDLE,
    entry: PROCESSENTRY32W,
    started: bool,
}

impl ProcessEntries {
    pub fn capture() -> NativeResult<Self> {
        // SAFETY: The process id argument is ignored for TH32CS_SNAPPROCESS.
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }.map_err(NativeError::Snapshot)?;

        Ok(Self {
            snapshot,
            // dwSize must be set before the first call
            entry: PROCESSENTRY32W {
                dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
                ..Default::default()
            },
            started: false,
        })
    }
}

impl Iterator for ProcessEntries {
    type Item = (u32, String);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: Live snapshot handle and an entry with dwSize set.
        let advanced = unsafe {
            if self.started {
                Process32NextW(self.snapshot, &mut self.entry)
            } else {
                self.started = true;
                Process32FirstW(self.snapshot, &mut self.entry)
            }
        };

        advanced.ok()?;
        Some((self.entry.th32ProcessID, wide_to_string(&self.entry.szExeFile)))
    }
}

impl Drop for ProcessEntries {
    fn drop(&mut self) {
        // SAFETY: The snapshot handle is owned and closed only here.
        unsafe {
            let _ = CloseHandle(self.snapshot);
        }
    }
}

/// Converts a null-terminated wide string to a Rust String.
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}
