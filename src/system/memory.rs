//! Memory page priority using Get/SetProcessInformation
//!
//! Page priority decides how early a process's pages leave the working set
//! under memory pressure: 1 (very low) to 5 (normal).

use std::ffi::c_void;
use std::mem;

use windows::Win32::System::Threading::{
    GetProcessInformation, ProcessMemoryPriority, SetProcessInformation, PROCESS_QUERY_INFORMATION,
    PROCESS_SET_INFORMATION,
};

use super::error::NativeResult;
use super::handle::ProcessHandle;

/// `MEMORY_PRIORITY_INFORMATION`
#[repr(C)]
#[derive(Default)]
struct MemoryPriorityInformation {
    memory_priority: u32,
}

const INFO_SIZE: u32 = mem::size_of::<MemoryPriorityInformation>() as u32;

pub fn get_page_priority(pid: u32) -> NativeResult<u32> {
    let handle = ProcessHandle::open(pid, PROCESS_QUERY_INFORMATION)?;
    let mut info = MemoryPriorityInformation::default();

    // SAFETY: `info` matches the layout expected for ProcessMemoryPriority.
    let result = unsafe {
        GetProcessInformation(
            handle.raw(),
            ProcessMemoryPriority,
            &mut info as *mut _ as *mut c_void,
            INFO_SIZE,
        )
    };
    handle.call("GetProcessInformation", result)?;

    Ok(info.memory_priority)
}

pub fn set_page_priority(pid: u32, priority: u32) -> NativeResult<()> {
    let handle = ProcessHandle::open(pid, PROCESS_SET_INFORMATION)?;
    let info = MemoryPriorityInformation {
        memory_priority: priority,
    };

    // SAFETY: `info` matches the layout expected for ProcessMemoryPriority.
    let result = unsafe {
        SetProcessInformation(
            handle.raw(),
            ProcessMemoryPriority,
            &info as *const _ as *const c_void,
            INFO_SIZE,
        )
    };
    handle.call("SetProcessInformation", result)
}
