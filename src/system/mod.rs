//! Native process control - Win32 and NT calls behind the policy seams
//!
//! Each operation opens a [`handle::ProcessHandle`] with the access it needs,
//! performs one native call and closes the handle on drop.
//! [`WinPlatform`] adapts these functions to the policy traits.

pub mod admin;
pub mod affinity;
pub mod cpu;
pub mod error;
pub mod handle;
pub mod io;
pub mod memory;
pub mod ntdll;
pub mod platform;
pub mod priority;
pub mod processes;
pub mod suspend;
pub mod window;

pub use admin::is_elevated;
pub use cpu::detect_topology;
pub use platform::WinPlatform;

