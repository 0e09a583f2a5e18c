//! Platform-neutral policy building blocks
//!
//! Core mask translation, priority lookup tables and the traits the
//! engine uses to reach the operating system.

pub mod control;
pub mod coremask;
pub mod priority;

pub use control::{ActiveWindow, Privilege, ProcessControl, ProcessSnapshot, ProcessSnapshotter, SnapshotError};
pub use coremask::{translate, CoreMask, CoreRange, CpuTopology};
pub use priority::{CpuPriority, IoPriority, PagePriority};
