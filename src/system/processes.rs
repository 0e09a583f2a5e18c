//! Process enumeration using the ToolHelp32 API
//!
//! Command lines are read from the target with
//! `NtQueryInformationProcess(ProcessCommandLineInformation)`, which only
//! needs query-limited access.

use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::slice;

use windows::Win32::System::Threading::PROCESS_QUERY_LIMITED_INFORMATION;

use crate::policy::ProcessSnapshot;

use super::error::NativeResult;
use super::handle::{ProcessEntries, ProcessHandle};
use super::ntdll::{self, UnicodeString, PROCESS_COMMAND_LINE_INFORMATION};

/// Pids of the idle and System processes, which have no command line
const KERNEL_PIDS: [u32; 2] = [0, 4];

/// Enumerates all running processes on the system.
///
/// # Arguments
/// * `with_cmdline` - Also read each process's command line. Processes
///   whose command line cannot be read keep `cmdline: None`.
pub fn enumerate_processes(with_cmdline: bool) -> NativeResult<Vec<ProcessSnapshot>> {
    let processes = ProcessEntries::capture()?
        .map(|(pid, name)| {
            let mut process = ProcessSnapshot::new(pid, name);
            if with_cmdline && !KERNEL_PIDS.contains(&pid) {
                process.cmdline = command_line(pid).ok();
            }
            process
        })
        .collect();

    Ok(processes)
}

/// Reads the full command line of a process.
pub fn command_line(pid: u32) -> NativeResult<String> {
    let query = ntdll::query_information_process()?;
    let handle = ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION)?;

    // First call only reports the required size
    let mut needed: u32 = 0;
    // SAFETY: A null buffer of length 0 only reports the size.
    let _ = unsafe { query(handle.raw(), PROCESS_COMMAND_LINE_INFORMATION, ptr::null_mut(), 0, &mut needed) };

    if (needed as usize) < mem::size_of::<UnicodeString>() {
        return Ok(String::new());
    }

    // u64 storage keeps the UNICODE_STRING header aligned
    let mut buffer = vec![0u64; (needed as usize).div_ceil(mem::size_of::<u64>())];
    let size = (buffer.len() * mem::size_of::<u64>()) as u32;

    // SAFETY: `buffer` is writable for `size` bytes.
    let status = unsafe {
        query(
            handle.raw(),
            PROCESS_COMMAND_LINE_INFORMATION,
            buffer.as_mut_ptr() as *mut c_void,
            size,
            &mut needed,
        )
    };
    handle.status("NtQueryInformationProcess", status)?;

    // SAFETY: On success the buffer starts with a UNICODE_STRING whose
    // character data lives inside the same buffer.
    unsafe {
        let header = &*(buffer.as_ptr() as *const UnicodeString);
        if header.buffer.is_null() || header.length == 0 {
            return Ok(String::new());
        }
        let chars = slice::from_raw_parts(header.buffer, header.length as usize / 2);
        Ok(String::from_utf16_lossy(chars))
    }
}
