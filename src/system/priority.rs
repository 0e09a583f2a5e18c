//! Process priority class using GetPriorityClass and SetPriorityClass

use windows::Win32::System::Threading::{
    GetPriorityClass, SetPriorityClass, PROCESS_CREATION_FLAGS, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_SET_INFORMATION,
};

use super::error::NativeResult;
use super::handle::ProcessHandle;

/// Gets the raw priority class of a process (e.g. 0x20 for normal).
pub fn get_priority_class(pid: u32) -> NativeResult<u32> {
    let handle = ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION)?;

    // SAFETY: GetPriorityClass is safe with a valid handle.
    match unsafe { GetPriorityClass(handle.raw()) } {
        0 => handle.call("GetPriorityClass", Err(windows::core::Error::from_win32())),
        priority_class => Ok(priority_class),
    }
}

/// Sets the priority class of a process.
///
/// Raising above normal needs SeIncreaseBasePriorityPrivilege for
/// processes of other users.
pub fn set_priority_class(pid: u32, priority_class: u32) -> NativeResult<()> {
    let handle = ProcessHandle::open(pid, PROCESS_SET_INFORMATION)?;

    // SAFETY: SetPriorityClass is safe with a valid handle.
    let result = unsafe { SetPriorityClass(handle.raw(), PROCESS_CREATION_FLAGS(priority_class)) };
    handle.call("SetPriorityClass", result)
}
