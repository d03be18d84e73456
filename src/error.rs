//! Error types for the write-ahead log and recovery subsystem.
//!
//! A single unified error type covers every component (C1-C9). Once a
//! `Corruption` is observed the owning `DbEnv` latches a panic flag and
//! every subsequent call returns `WalError::RunRecovery` until the
//! environment is reopened with recovery, mirroring BDB's panic state.

use std::fmt;
use std::io;

/// Unified error type for log/recovery operations.
#[derive(Debug)]
pub enum WalError {
    /// I/O error (file operations).
    Io(io::Error),
    /// On-disk structure failed validation: bad magic, truncated
    /// record, checksum/size mismatch. Maps to `DB_RUNRECOVERY`.
    Corruption(String),
    /// A lookup (log record by LSN, file by unique id, txn by id)
    /// found nothing.
    NotFound(String),
    /// A requested operation would deadlock or conflicts with another
    /// holder; caller should retry.
    Deadlock,
    /// Transaction-manager-level misuse: commit/abort on an unknown or
    /// already-resolved id, nesting errors, checkpoint while txns are
    /// pending that forbid it.
    Txn(String),
    /// XA protocol-level error, carrying the XA return code.
    Xa(XaErrorCode),
    /// The environment has latched a panic after corruption was
    /// detected; every call fails until recovery is rerun.
    RunRecovery,
    /// Anything else that indicates an internal invariant violation.
    Internal(String),
}

/// XA return codes from the X/Open XA specification, as surfaced by
/// the C9 bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XaErrorCode {
    /// XAER_ASYNC: asynchronous operation already outstanding.
    Async,
    /// XAER_RMERR: resource manager error occurred.
    RmErr,
    /// XAER_NOTA: XID not known to this resource manager.
    NotA,
    /// XAER_INVAL: invalid arguments.
    Inval,
    /// XAER_PROTO: call inappropriate given the XID's current state.
    Proto,
    /// XAER_RMFAIL: resource manager unavailable.
    RmFail,
    /// XAER_DUPID: XID already in use.
    DupId,
    /// XAER_OUTSIDE: resource manager doing work outside global txn.
    Outside,
}

impl fmt::Display for XaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            XaErrorCode::Async => "XAER_ASYNC",
            XaErrorCode::RmErr => "XAER_RMERR",
            XaErrorCode::NotA => "XAER_NOTA",
            XaErrorCode::Inval => "XAER_INVAL",
            XaErrorCode::Proto => "XAER_PROTO",
            XaErrorCode::RmFail => "XAER_RMFAIL",
            XaErrorCode::DupId => "XAER_DUPID",
            XaErrorCode::Outside => "XAER_OUTSIDE",
        };
        write!(f, "{}", s)
    }
}

impl WalError {
    pub fn corruption(msg: impl Into<String>) -> Self {
        WalError::Corruption(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        WalError::NotFound(msg.into())
    }

    /// Whether this error should latch the environment into the
    /// run-recovery panic state (spec's "Panic policy").
    pub fn is_fatal(&self) -> bool {
        matches!(self, WalError::Corruption(_) | WalError::RunRecovery)
    }
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalError::Io(e) => write!(f, "{}", e),
            WalError::Corruption(msg) => write!(f, "corruption detected: {}", msg),
            WalError::NotFound(msg) => write!(f, "{}", msg),
            WalError::Deadlock => write!(f, "deadlock"),
            WalError::Txn(msg) => write!(f, "{}", msg),
            WalError::Xa(code) => write!(f, "XA error: {}", code),
            WalError::RunRecovery => write!(f, "DB_RUNRECOVERY: fatal error, run recovery"),
            WalError::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for WalError {}

impl From<io::Error> for WalError {
    fn from(e: io::Error) -> Self {
        WalError::Io(e)
    }
}

impl From<serde_json::Error> for WalError {
    fn from(e: serde_json::Error) -> Self {
        WalError::Internal(format!("checkpoint marker: {}", e))
    }
}

/// Result type alias for log/recovery operations.
pub type Result<T> = std::result::Result<T, WalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_and_run_recovery_are_fatal() {
        assert!(WalError::corruption("bad magic").is_fatal());
        assert!(WalError::RunRecovery.is_fatal());
        assert!(!WalError::Deadlock.is_fatal());
        assert!(!WalError::not_found("txn 7").is_fatal());
    }
}
