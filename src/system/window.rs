//! Foreground window and fullscreen detection
//!
//! A window counts as fullscreen when its right and bottom edges match the
//! monitor's. Known false positives are filtered by the policy engine.

use std::mem;

use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Gdi::{GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTOPRIMARY};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowRect, GetWindowThreadProcessId};

use crate::policy::ActiveWindow;

use super::error::{NativeError, NativeResult};

/// Returns the pid owning the foreground window and whether it is fullscreen.
///
/// Without a foreground window (locked desktop, UAC prompt) the pid is 0.
pub fn active_window() -> NativeResult<ActiveWindow> {
    // SAFETY: All out-parameters point to live locals.
    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.0.is_null() {
            return Ok(ActiveWindow::default());
        }

        let mut pid: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32));

        let mut rect = RECT::default();
        GetWindowRect(hwnd, &mut rect).map_err(|source| NativeError::Call {
            api: "GetWindowRect",
            pid,
            source,
        })?;

        let monitor = MonitorFromWindow(hwnd, MONITOR_DEFAULTTOPRIMARY);
        let mut info = MONITORINFO {
            cbSize: mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };

        let is_fullscreen = GetMonitorInfoW(monitor, &mut info).as_bool() && covers_monitor(&rect, &info.rcMonitor);

        Ok(ActiveWindow { pid, is_fullscreen })
    }
}

fn covers_monitor(window: &RECT, monitor: &RECT) -> bool {
    window.right == monitor.right && window.bottom == monitor.bottom
}
