//! CPU affinity using GetProcessAffinityMask and SetProcessAffinityMask

use windows::Win32::System::Threading::{
    GetProcessAffinityMask, SetProcessAffinityMask, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SET_INFORMATION,
};

use super::error::NativeResult;
use super::handle::ProcessHandle;

/// Gets `(process_mask, system_mask)` of a process.
pub fn get_affinity(pid: u32) -> NativeResult<(usize, usize)> {
    let handle = ProcessHandle::open(pid, PROCESS_QUERY_LIMITED_INFORMATION)?;

    let mut process_mask: usize = 0;
    let mut system_mask: usize = 0;

    // SAFETY: Valid handle and pointers to live locals.
    let result = unsafe { GetProcessAffinityMask(handle.raw(), &mut process_mask, &mut system_mask) };
    handle.call("GetProcessAffinityMask", result)?;

    Ok((process_mask, system_mask))
}

/// Sets the affinity mask of a process (bit 0 = logical core 0).
pub fn set_affinity(pid: u32, mask: usize) -> NativeResult<()> {
    let handle = ProcessHandle::open(pid, PROCESS_SET_INFORMATION | PROCESS_QUERY_LIMITED_INFORMATION)?;

    // SAFETY: SetProcessAffinityMask is safe with a valid handle.
    let result = unsafe { SetProcessAffinityMask(handle.raw(), mask) };
    handle.call("SetProcessAffinityMask", result)
}
