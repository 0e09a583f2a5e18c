//! Processor topology
//!
//! Logical processors come from GetSystemInfo, physical cores from
//! GetLogicalProcessorInformation (one `RelationProcessorCore` entry per
//! core). Hyperthreading is assumed when the two differ.

use std::mem;

use windows::Win32::System::SystemInformation::{
    GetLogicalProcessorInformation, GetSystemInfo, RelationProcessorCore, SYSTEM_INFO,
    SYSTEM_LOGICAL_PROCESSOR_INFORMATION,
};

use crate::policy::CpuTopology;

use super::error::{NativeError, NativeResult};

/// Get the total number of logical processors on the system.
#[must_use]
pub fn logical_core_count() -> u32 {
    // SAFETY: GetSystemInfo fills a zeroed SYSTEM_INFO.
    unsafe {
        let mut sys_info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut sys_info);
        sys_info.dwNumberOfProcessors
    }
}

/// Counts physical processor cores.
pub fn physical_core_count() -> NativeResult<u32> {
    let entry_size = mem::size_of::<SYSTEM_LOGICAL_PROCESSOR_INFORMATION>();
    let mut length: u32 = 0;

    // SAFETY: Size query; fails with ERROR_INSUFFICIENT_BUFFER and sets `length`.
    let _ = unsafe { GetLogicalProcessorInformation(None, &mut length) };
    if length == 0 {
        return Err(NativeError::Topology("GetLogicalProcessorInformation returned no data".to_string()));
    }

    // SAFETY: SYSTEM_LOGICAL_PROCESSOR_INFORMATION is plain data.
    let empty: SYSTEM_LOGICAL_PROCESSOR_INFORMATION = unsafe { mem::zeroed() };
    let mut entries = vec![empty; (length as usize).div_ceil(entry_size)];
    length = (entries.len() * entry_size) as u32;

    // SAFETY: `entries` is writable for `length` bytes.
    unsafe { GetLogicalProcessorInformation(Some(entries.as_mut_ptr()), &mut length) }
        .map_err(|e| NativeError::Topology(e.to_string()))?;

    let returned = length as usize / entry_size;
    let cores = entries[..returned]
        .iter()
        .filter(|entry| entry.Relationship == RelationProcessorCore)
        .count() as u32;

    if cores == 0 {
        return Err(NativeError::Topology("no processor cores reported".to_string()));
    }

    Ok(cores)
}

/// Detects the topology used to translate affinity presets.
pub fn detect_topology() -> NativeResult<CpuTopology> {
    Ok(CpuTopology {
        logical_cores: logical_core_count(),
        physical_cores: physical_core_count()?,
    })
}
