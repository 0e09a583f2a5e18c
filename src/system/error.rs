//! Error type of the native layer
//!
//! Every Win32 / NT failure is turned into a [`NativeError`]. The
//! `ProcessControl` implementation logs it at warning level and reports
//! plain success or failure to the policy engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NativeError {
    /// OpenProcess failed: exited process, protected process or missing privilege
    #[error("cannot open process {pid}: {source}")]
    Open {
        pid: u32,
        #[source]
        source: windows::core::Error,
    },

    /// A Win32 call on an open handle failed
    #[error("{api} failed for process {pid}: {source}")]
    Call {
        api: &'static str,
        pid: u32,
        #[source]
        source: windows::core::Error,
    },

    /// An ntdll call returned a failure NTSTATUS
    #[error("{api} failed for process {pid}, NT_STATUS: 0x{status:08X}")]
    NtStatus { api: &'static str, pid: u32, status: u32 },

    #[error("cannot load {function} from ntdll.dll")]
    NtdllLoad { function: &'static str },

    #[error("process snapshot failed: {0}")]
    Snapshot(#[source] windows::core::Error),

    #[error("cannot determine processor topology: {0}")]
    Topology(String),
}

pub type NativeResult<T> = Result<T, NativeError>;
