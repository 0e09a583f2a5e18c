//! I/O priority through NtQueryInformationProcess / NtSetInformationProcess
//!
//! Setting `high` requires SeIncreaseBasePriorityPrivilege.

use std::ffi::c_void;
use std::mem;

use windows::Win32::System::Threading::{PROCESS_QUERY_INFORMATION, PROCESS_SET_INFORMATION};

use super::error::NativeResult;
use super::handle::ProcessHandle;
use super::ntdll::{self, PROCESS_IO_PRIORITY};

const VALUE_SIZE: u32 = mem::size_of::<u32>() as u32;

pub fn get_io_priority(pid: u32) -> NativeResult<u32> {
    let query = ntdll::query_information_process()?;
    let handle = ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION)?;

    let mut priority: u32 = 0;
    let mut returned: u32 = 0;

    // SAFETY: `priority` is a live u32 of the advertised size.
    let status = unsafe {
        query(
            handle.raw(),
            PROCESS_IO_PRIORITY,
            &mut priority as *mut u32 as *mut c_void,
            VALUE_SIZE,
            &mut returned,
        )
    };
    handle.status("NtQueryInformationProcess", status)?;

    Ok(priority)
}

pub fn set_io_priority(pid: u32, priority: u32) -> NativeResult<()> {
    let set = ntdll::set_information_process()?;
    let handle = ProcessHandle::open(pid, PROCESS_SET_INFORMATION)?;

    // SAFETY: `priority` is a live u32 of the advertised size.
    let status = unsafe {
        set(
            handle.raw(),
            PROCESS_IO_PRIORITY,
            &priority as *const u32 as *const c_void,
            VALUE_SIZE,
        )
    };
    handle.status("NtSetInformationProcess", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::IoPriority;

    #[test]
    fn test_own_io_priority_round_trip() {
        let pid = std::process::id();
        let original = get_io_priority(pid).unwrap();
        assert!(IoPriority::from_code(original).is_some());

        set_io_priority(pid, IoPriority::Low.code()).unwrap();
        assert_eq!(get_io_priority(pid).unwrap(), IoPriority::Low.code());

        set_io_priority(pid, original).unwrap();
    }
}
