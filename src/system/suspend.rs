//! Process suspension, resumption and termination
//!
//! Suspend and resume use NtSuspendProcess / NtResumeProcess from ntdll.dll.
//! No state is tracked here: suspending twice needs two resumes, exactly as
//! the kernel counts it.

use windows::Win32::System::Threading::{TerminateProcess, PROCESS_SUSPEND_RESUME, PROCESS_TERMINATE};

use super::error::NativeResult;
use super::handle::ProcessHandle;
use super::ntdll;

pub fn suspend_process(pid: u32) -> NativeResult<()> {
    let nt_suspend = ntdll::suspend_process()?;
    let handle = ProcessHandle::open(pid, PROCESS_SUSPEND_RESUME)?;

    // SAFETY: Valid handle opened with PROCESS_SUSPEND_RESUME.
    let status = unsafe { nt_suspend(handle.raw()) };
    handle.status("NtSuspendProcess", status)
}

pub fn resume_process(pid: u32) -> NativeResult<()> {
    let nt_resume = ntdll::resume_process()?;
    let handle = ProcessHandle::open(pid, PROCESS_SUSPEND_RESUME)?;

    // SAFETY: Valid handle opened with PROCESS_SUSPEND_RESUME.
    let status = unsafe { nt_resume(handle.raw()) };
    handle.status("NtResumeProcess", status)
}

/// Terminates a process with exit code 0.
pub fn terminate_process(pid: u32) -> NativeResult<()> {
    let handle = ProcessHandle::open(pid, PROCESS_TERMINATE)?;

    // SAFETY: Valid handle opened with PROCESS_TERMINATE.
    let result = unsafe { TerminateProcess(handle.raw(), 0) };
    handle.call("TerminateProcess", result)
}
