//! Transaction-manager records, grounded on `txn_auto.c`/`txn_rec.c`.
//! `txn_restore_txn` is not a wire record in the original source
//! either — it is the action `__txn_xa_regop_recover` performs on
//! BACKWARD_ROLL when it finds a still-prepared transaction, so it
//! lives as a function in `recovery::handlers::txn`, not a record type
//! here.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::serial::Dbt;

/// Opcode carried by [`TxnRegop`]: the transaction committed or
/// aborted.
pub const TXN_OPCODE_COMMIT: u32 = 1;
pub const TXN_OPCODE_ABORT: u32 = 2;

/// Opcode carried by [`DbregRegister`](super::dbreg::DbregRegister).
pub const TXN_OPCODE_PREPARE: u32 = 3;

log_record!(
    /// The terminal record of an ordinary (non-XA) transaction:
    /// commit or abort, carrying the wall-clock timestamp used by
    /// point-in-time recovery.
    TxnRegop,
    RecType::TxnRegop,
    { opcode: u32, timestamp: u32 }
);

log_record!(
    /// A checkpoint record. `ckp_lsn` is the LSN that was current at
    /// the start of the checkpoint; `last_ckp` back-chains to the
    /// previous checkpoint so recovery's Pass 0 can locate an anchor
    /// without scanning the whole log.
    TxnCkp,
    RecType::TxnCkp,
    { ckp_lsn: Lsn, last_ckp: Lsn, timestamp: u32 }
);

log_record!(
    /// The terminal record of an XA-coordinated transaction reaching
    /// PREPARE. `opcode` must equal [`TXN_OPCODE_PREPARE`]; a
    /// transaction only becomes COMMIT/ABORT via a later, separate
    /// resolution outside the log (the coordinator's decision) or via
    /// `txn_restore_txn` re-admitting it as active on restart.
    TxnXaRegop,
    RecType::TxnXaRegop,
    { opcode: u32, xid: Dbt, format_id: i32, gtrid_len: u32, bqual_len: u32, begin_lsn: Lsn }
);

log_record!(
    /// Links a child transaction's last LSN into its parent's undo
    /// chain, so aborting the parent also undoes the child's work.
    TxnChild,
    RecType::TxnChild,
    { child_txn: u32, c_lsn: Lsn }
);

log_record!(
    /// Transaction id space wrapped around; `min`/`max` bound the
    /// recycled range so recovery's transaction table can tell a
    /// reused id from a stale reference to the same numeric id.
    TxnRecycle,
    RecType::TxnRecycle,
    { min: u32, max: u32 }
);
