//! Undocumented ntdll entry points, resolved at call time
//!
//! ntdll.dll is mapped into every process, so `GetModuleHandleA` is enough;
//! the library is never loaded or freed here.

use std::ffi::{c_void, CStr};

use windows::core::PCSTR;
use windows::Win32::Foundation::{HANDLE, NTSTATUS};
use windows::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};

use super::error::{NativeError, NativeResult};

/// `PROCESSINFOCLASS` values used with Nt(Set|Query)InformationProcess
pub const PROCESS_IO_PRIORITY: u32 = 33;
pub const PROCESS_COMMAND_LINE_INFORMATION: u32 = 60;

pub type NtSuspendResumeProcess = unsafe extern "system" fn(HANDLE) -> NTSTATUS;

pub type NtSetInformationProcess = unsafe extern "system" fn(HANDLE, u32, *const c_void, u32) -> NTSTATUS;

pub type NtQueryInformationProcess =
    unsafe extern "system" fn(HANDLE, u32, *mut c_void, u32, *mut u32) -> NTSTATUS;

/// `RtlAdjustPrivilege(privilege, enable, current_thread, was_enabled)`
pub type RtlAdjustPrivilege = unsafe extern "system" fn(u32, u8, u8, *mut u8) -> NTSTATUS;

/// `UNICODE_STRING` as returned by the command line query
#[repr(C)]
pub struct UnicodeString {
    pub length: u16,
    pub maximum_length: u16,
    pub buffer: *mut u16,
}

type RawProc = unsafe extern "system" fn() -> isize;

fn proc_address(symbol: &'static CStr) -> NativeResult<RawProc> {
    let function = symbol.to_str().unwrap_or("ntdll export");
    let missing = || NativeError::NtdllLoad { function };

    // SAFETY: Both strings are nul-terminated and outlive the calls.
    unsafe {
        let module = GetModuleHandleA(PCSTR(c"ntdll.dll".as_ptr().cast())).map_err(|_| missing())?;
        GetProcAddress(module, PCSTR(symbol.as_ptr().cast())).ok_or_else(missing)
    }
}

pub fn suspend_process() -> NativeResult<NtSuspendResumeProcess> {
    let address = proc_address(c"NtSuspendProcess")?;
    // SAFETY: NtSuspendProcess has exactly this signature.
    Ok(unsafe { std::mem::transmute::<RawProc, NtSuspendResumeProcess>(address) })
}

pub fn resume_process() -> NativeResult<NtSuspendResumeProcess> {
    let address = proc_address(c"NtResumeProcess")?;
    // SAFETY: NtResumeProcess has exactly this signature.
    Ok(unsafe { std::mem::transmute::<RawProc, NtSuspendResumeProcess>(address) })
}

pub fn set_information_process() -> NativeResult<NtSetInformationProcess> {
    let address = proc_address(c"NtSetInformationProcess")?;
    // SAFETY: NtSetInformationProcess has exactly this signature.
    Ok(unsafe { std::mem::transmute::<RawProc, NtSetInformationProcess>(address) })
}

pub fn query_information_process() -> NativeResult<NtQueryInformationProcess> {
    let address = proc_address(c"NtQueryInformationProcess")?;
    // SAFETY: NtQueryInformationProcess has exactly this signature.
    Ok(unsafe { std::mem::transmute::<RawProc, NtQueryInformationProcess>(address) })
}

pub fn adjust_privilege() -> NativeResult<RtlAdjustPrivilege> {
    let address = proc_address(c"RtlAdjustPrivilege")?;
    // SAFETY: RtlAdjustPrivilege has exactly this signature.
    Ok(unsafe { std::mem::transmute::<RawProc, RtlAdjustPrivilege>(address) })
}

/// Maps a failure NTSTATUS (negative value) to an error.
pub fn check(api: &'static str, pid: u32, status: NTSTATUS) -> NativeResult<()> {
    if status.0 < 0 {
        return Err(NativeError::NtStatus {
            api,
            pid,
            status: status.0 as u32,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_resolve() {
        assert!(suspend_process().is_ok());
        assert!(resume_process().is_ok());
        assert!(set_information_process().is_ok());
        assert!(query_information_process().is_ok());
        assert!(adjust_privilege().is_ok());
    }

    #[test]
    fn test_check_status() {
        assert!(check("NtResumeProcess", 1, NTSTATUS(0)).is_ok());
        let error = check("NtResumeProcess", 1, NTSTATUS(0xC000_0008_u32 as i32)).unwrap_err();
        assert!(error.to_string().contains("0xC0000008"));
    }
}
