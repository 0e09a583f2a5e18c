//! Elevation status and privilege adjustment

use std::mem;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use super::error::NativeResult;
use super::ntdll;

/// Checks if the current process is running with elevated (administrator) privileges.
///
/// Without elevation the debug privilege cannot be enabled and processes of
/// other users or services stay out of reach.
///
/// # Returns
/// * `true` if running as administrator
/// * `false` if running as standard user or if the check fails
#[must_use]
pub fn is_elevated() -> bool {
    // SAFETY: The token handle is closed before returning.
    unsafe {
        let mut token_handle = HANDLE::default();

        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token_handle).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut return_length: u32 = 0;
        let elevation_size = mem::size_of::<TOKEN_ELEVATION>() as u32;

        let result = GetTokenInformation(
            token_handle,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            elevation_size,
            &mut return_length,
        );

        let _ = CloseHandle(token_handle);

        result.is_ok() && elevation.TokenIsElevated != 0
    }
}

/// Enables a privilege for the whole process with RtlAdjustPrivilege.
///
/// # Arguments
/// * `privilege` - Well-known privilege value (20 = SeDebugPrivilege)
pub fn adjust_privilege(privilege: u32) -> NativeResult<()> {
    let rtl_adjust = ntdll::adjust_privilege()?;
    let mut was_enabled: u8 = 0;

    // SAFETY: `was_enabled` outlives the call.
    let status = unsafe { rtl_adjust(privilege, 1, 0, &mut was_enabled) };
    ntdll::check("RtlAdjustPrivilege", std::process::id(), status)
}
