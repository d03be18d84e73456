//! Transaction-record REDO/UNDO, grounded on `txn_rec.c`.

use crate::error::{Result, WalError};
use crate::logrec::txn::{TxnChild, TxnRegop, TxnXaRegop, TXN_OPCODE_COMMIT, TXN_OPCODE_PREPARE};
use crate::lsn::Lsn;
use crate::txn::table::{TxnDisposition, TxnTable};

/// BACKWARD_ROLL: the first (i.e. chronologically last) regop seen
/// for a txnid is its real disposition. A commit whose timestamp
/// exceeds the point-in-time recovery target is demoted to `Ignore`,
/// per `__txn_regop_recover`'s `tx_timestamp` check.
pub fn backward_regop(table: &mut TxnTable, txnid: u32, r: &TxnRegop, tx_timestamp: Option<u64>) {
    if table.disposition(txnid).is_some() {
        return;
    }
    let disposition = if r.opcode == TXN_OPCODE_COMMIT {
        match tx_timestamp {
            Some(target) if r.timestamp as u64 > target => TxnDisposition::Ignore,
            _ => TxnDisposition::Commit,
        }
    } else {
        TxnDisposition::Abort
    };
    table.insert(txnid, disposition);
}

/// FORWARD_ROLL: once a terminal record has been replayed there is no
/// more work for this id, so it is dropped from the table.
pub fn forward_regop(table: &mut TxnTable, txnid: u32) {
    table.remove(txnid);
}

/// BACKWARD_ROLL for `txn_ckp`: checkpoints are not transactional
/// operations, so there is nothing to add to the table; the driver
/// uses `last_ckp`/`ckp_lsn` directly to anchor Pass 0/Pass 2.
pub fn backward_ckp() {}

/// BACKWARD_ROLL for `txn_xa_regop`: only a PREPARE opcode is valid on
/// the wire (commit/abort of an XA transaction is resolved by the
/// coordinator, not logged as a second regop), matching the
/// `DB_ASSERT(argp->opcode == TXN_PREPARE)` in `__txn_xa_regop_recover`.
/// A transaction the table hasn't already resolved gets
/// `txn_restore_txn` applied right here, at the LSN of this very
/// record — `__txn_xa_regop_recover` performs the restore inline
/// during its own backward-pass visit, not as a later sweep.
pub fn backward_xa_regop(table: &mut TxnTable, txnid: u32, lsn: Lsn, r: &TxnXaRegop) -> Result<()> {
    if r.opcode != TXN_OPCODE_PREPARE {
        return Err(WalError::corruption("txn_xa_regop record with non-prepare opcode"));
    }
    if table.disposition(txnid).is_none() {
        restore_txn(table, txnid, lsn);
    }
    Ok(())
}

pub fn forward_xa_regop(table: &mut TxnTable, txnid: u32) {
    table.remove(txnid);
}

/// `txn_restore_txn`: re-admits a transaction recovery found still in
/// PREPARE at the end of the backward pass as live, so the XA
/// coordinator can later resolve it with `commit`/`rollback` instead
/// of losing it to the crash.
pub fn restore_txn(table: &mut TxnTable, txnid: u32, begin_lsn: Lsn) {
    table.set_disposition(txnid, TxnDisposition::Prepare);
    table.push_limbo(begin_lsn);
}

/// BACKWARD_ROLL for `txn_child`: a nested commit is recorded in its
/// parent's log stream as a `txn_child` marker referencing the child's
/// own commit LSN. A child the backward pass has already resolved to
/// some disposition (EXPECTED) needs nothing further when the parent
/// committed — its own record already drives REDO, so this marker is
/// just confirmation and the child is demoted to `Ignore` rather than
/// redone twice. A child with no disposition yet (UNEXPECTED) has
/// nothing else in the log to redo it, so it is assigned `Commit`
/// directly. Either way an aborted (or still-unresolved) parent means
/// the child's work must be undone.
pub fn backward_child(table: &mut TxnTable, parent_txnid: u32, r: &TxnChild) {
    let expected = table.disposition(r.child_txn).is_some();
    let disposition = match table.disposition(parent_txnid) {
        Some(TxnDisposition::Commit) if expected => TxnDisposition::Ignore,
        Some(TxnDisposition::Commit) => TxnDisposition::Commit,
        _ => TxnDisposition::Abort,
    };
    table.set_disposition(r.child_txn, disposition);
}

pub fn forward_child(table: &mut TxnTable, r: &TxnChild) {
    table.remove(r.child_txn);
}

/// BACKWARD_ROLL for `txn_recycle`: the id space wrapped, so a
/// generation counter distinguishes a reused id from the transaction
/// that previously held it; walking backward subtracts one generation.
pub fn backward_recycle(table: &mut TxnTable) {
    table.recycle_generation(-1);
}

pub fn forward_recycle(table: &mut TxnTable) {
    table.recycle_generation(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logrec::txn::TXN_OPCODE_ABORT;

    #[test]
    fn commit_past_target_timestamp_is_ignored() {
        let mut t = TxnTable::new();
        let r = TxnRegop { opcode: TXN_OPCODE_COMMIT, timestamp: 1000 };
        backward_regop(&mut t, 1, &r, Some(500));
        assert_eq!(t.disposition(1), Some(TxnDisposition::Ignore));
    }

    #[test]
    fn commit_before_target_timestamp_is_kept() {
        let mut t = TxnTable::new();
        let r = TxnRegop { opcode: TXN_OPCODE_COMMIT, timestamp: 100 };
        backward_regop(&mut t, 1, &r, Some(500));
        assert_eq!(t.disposition(1), Some(TxnDisposition::Commit));
    }

    #[test]
    fn abort_is_always_kept() {
        let mut t = TxnTable::new();
        let r = TxnRegop { opcode: TXN_OPCODE_ABORT, timestamp: 100 };
        backward_regop(&mut t, 1, &r, None);
        assert_eq!(t.disposition(1), Some(TxnDisposition::Abort));
    }

    #[test]
    fn xa_regop_rejects_non_prepare_opcode() {
        let mut t = TxnTable::new();
        let r = TxnXaRegop {
            opcode: TXN_OPCODE_COMMIT,
            xid: crate::serial::Dbt::new(vec![]),
            format_id: 0,
            gtrid_len: 0,
            bqual_len: 0,
            begin_lsn: Lsn::ZERO,
        };
        assert!(backward_xa_regop(&mut t, 1, Lsn::new(1, 10), &r).is_err());
    }

    #[test]
    fn xa_prepare_restores_the_txn_at_its_own_lsn() {
        let mut t = TxnTable::new();
        let r = TxnXaRegop {
            opcode: TXN_OPCODE_PREPARE,
            xid: crate::serial::Dbt::new(vec![0xAB]),
            format_id: 1,
            gtrid_len: 1,
            bqual_len: 0,
            begin_lsn: Lsn::ZERO,
        };
        let lsn = Lsn::new(3, 77);
        backward_xa_regop(&mut t, 1, lsn, &r).unwrap();
        assert_eq!(t.disposition(1), Some(TxnDisposition::Prepare));
        assert_eq!(t.limbo(), &[lsn]);
    }

    #[test]
    fn unexpected_child_of_committed_parent_is_marked_commit() {
        let mut t = TxnTable::new();
        t.insert(1, TxnDisposition::Commit);
        backward_child(&mut t, 1, &TxnChild { child_txn: 2, c_lsn: Lsn::new(1, 10) });
        assert_eq!(t.disposition(2), Some(TxnDisposition::Commit));
    }

    #[test]
    fn expected_child_of_committed_parent_is_demoted_to_ignore() {
        let mut t = TxnTable::new();
        t.insert(1, TxnDisposition::Commit);
        t.insert(2, TxnDisposition::Commit);
        backward_child(&mut t, 1, &TxnChild { child_txn: 2, c_lsn: Lsn::new(1, 10) });
        assert_eq!(t.disposition(2), Some(TxnDisposition::Ignore));
    }

    #[test]
    fn child_inherits_abort_when_parent_unresolved() {
        let mut t = TxnTable::new();
        backward_child(&mut t, 1, &TxnChild { child_txn: 2, c_lsn: Lsn::new(1, 10) });
        assert_eq!(t.disposition(2), Some(TxnDisposition::Abort));
    }

    #[test]
    fn child_of_aborted_parent_is_undone_even_if_already_committed() {
        let mut t = TxnTable::new();
        t.insert(1, TxnDisposition::Abort);
        t.insert(2, TxnDisposition::Commit);
        backward_child(&mut t, 1, &TxnChild { child_txn: 2, c_lsn: Lsn::new(1, 10) });
        assert_eq!(t.disposition(2), Some(TxnDisposition::Abort));
    }
}
