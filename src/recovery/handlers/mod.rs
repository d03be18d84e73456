pub mod common;
pub mod crdel;
pub mod queue;
pub mod structural;
pub mod txn;

use crate::error::Result;
use crate::fileid::FileIdRegistry;
use crate::logrec::LogBody;
use crate::lsn::Lsn;
use crate::txn::table::TxnTable;

fn register_file(fileids: &FileIdRegistry, fileid: i32, name_dbt: &crate::serial::Dbt, uid_dbt: &crate::serial::Dbt) {
    let name = String::from_utf8_lossy(&name_dbt.0).into_owned();
    if !fileids.is_registered(fileid) {
        let mut uid = [0u8; crate::fileid::FILE_ID_LEN];
        let n = uid_dbt.0.len().min(uid.len());
        uid[..n].copy_from_slice(&uid_dbt.0[..n]);
        fileids.register_at(fileid, uid, &name, None);
    }
}

/// OPENFILES pass: register `dbreg_register`/`crdel_fileopen` effects
/// so later passes can resolve `fileid`s. Applied forward, once.
/// `deprecated_recover` gates whether a pre-`dbreg_register` record is
/// honored the same way, or left as a pure cursor-advance per spec's
/// `deprecated_recover` handler.
pub fn apply_openfiles(fileids: &FileIdRegistry, body: &LogBody, deprecated_recover: bool) -> Result<()> {
    match body {
        LogBody::CrdelFileOpen(r) => crdel::redo_fileopen(fileids, r),
        LogBody::DbregRegister(r) => {
            register_file(fileids, r.fileid, &r.name, &r.uid);
            Ok(())
        }
        LogBody::LogRegisterLegacy(r) => {
            if deprecated_recover {
                register_file(fileids, r.fileid, &r.name, &r.uid);
            }
            Ok(())
        }
        LogBody::CrdelRename(r) => crdel::redo_rename(fileids, r),
        LogBody::CrdelDelete(r) => crdel::redo_delete(fileids, r),
        _ => Ok(()),
    }
}

/// BACKWARD_ROLL: build the transaction table's dispositions and undo
/// the work of every transaction that will end up Abort/Ignore.
pub fn apply_backward(
    fileids: &FileIdRegistry,
    table: &mut TxnTable,
    txnid: u32,
    lsn: Lsn,
    body: &LogBody,
    tx_timestamp: Option<u64>,
) -> Result<()> {
    match body {
        LogBody::TxnRegop(r) => {
            txn::backward_regop(table, txnid, r, tx_timestamp);
        }
        LogBody::TxnCkp(_) => txn::backward_ckp(),
        LogBody::TxnXaRegop(r) => txn::backward_xa_regop(table, txnid, lsn, r)?,
        LogBody::TxnChild(r) => txn::backward_child(table, txnid, r),
        LogBody::TxnRecycle(_) => txn::backward_recycle(table),
        LogBody::CrdelFileOpen(r) => {
            if should_undo(table, txnid) {
                crdel::undo_fileopen(fileids, r)?;
            }
        }
        LogBody::CrdelRename(r) => {
            if should_undo(table, txnid) {
                crdel::undo_rename(fileids, r)?;
            }
        }
        LogBody::CrdelDelete(r) => {
            if should_undo(table, txnid) {
                crdel::undo_delete(fileids, r)?;
            }
        }
        LogBody::CrdelMetaSub(r) => {
            if should_undo(table, txnid) {
                crdel::undo_metasub(fileids, r)?;
            }
        }
        LogBody::QamDelete(r) => {
            if should_undo(table, txnid) {
                queue::undo_delete(fileids, r)?;
            }
        }
        LogBody::QamRename(r) => {
            if should_undo(table, txnid) {
                queue::undo_rename(fileids, r)?;
            }
        }
        _ => {
            if should_undo(table, txnid) {
                structural::apply_undo(fileids, lsn, body)?;
            }
        }
    }
    Ok(())
}

/// A disposition this record's owning transaction has *not yet* been
/// assigned counts as "not yet resolved, assume active and therefore
/// undo it" only once the backward pass has actually seen its
/// terminal record; callers only invoke this after `apply_backward`
/// has processed the terminal record for `txnid`, so by this point an
/// absent entry means the transaction was still active at crash time.
fn should_undo(table: &TxnTable, txnid: u32) -> bool {
    !matches!(
        table.disposition(txnid),
        Some(crate::txn::table::TxnDisposition::Commit) | Some(crate::txn::table::TxnDisposition::Ignore)
    )
}

/// FORWARD_ROLL: redo committed work and retire resolved transactions
/// from the table.
pub fn apply_forward(
    fileids: &FileIdRegistry,
    table: &mut TxnTable,
    txnid: u32,
    lsn: Lsn,
    body: &LogBody,
) -> Result<()> {
    match body {
        LogBody::TxnRegop(_) => txn::forward_regop(table, txnid),
        LogBody::TxnCkp(_) => {}
        LogBody::TxnXaRegop(_) => txn::forward_xa_regop(table, txnid),
        LogBody::TxnChild(r) => txn::forward_child(table, r),
        LogBody::TxnRecycle(_) => txn::forward_recycle(table),
        LogBody::CrdelFileOpen(r) => {
            if should_redo(table, txnid) {
                crdel::redo_fileopen(fileids, r)?;
            }
        }
        LogBody::CrdelRename(r) => {
            if should_redo(table, txnid) {
                crdel::redo_rename(fileids, r)?;
            }
        }
        LogBody::CrdelDelete(r) => {
            if should_redo(table, txnid) {
                crdel::redo_delete(fileids, r)?;
            }
        }
        LogBody::CrdelMetaSub(r) => {
            if should_redo(table, txnid) {
                crdel::redo_metasub(fileids, r)?;
            }
        }
        LogBody::QamDelete(r) => {
            if should_redo(table, txnid) {
                queue::redo_delete(fileids, r)?;
            }
        }
        LogBody::QamRename(r) => {
            if should_redo(table, txnid) {
                queue::redo_rename(fileids, r)?;
            }
        }
        _ => {
            if should_redo(table, txnid) {
                structural::apply_redo(fileids, lsn, body)?;
            }
        }
    }
    Ok(())
}

fn should_redo(table: &TxnTable, txnid: u32) -> bool {
    matches!(table.disposition(txnid), Some(crate::txn::table::TxnDisposition::Commit))
}
