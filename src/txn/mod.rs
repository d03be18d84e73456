//! C5: the live transaction manager — begin/commit/abort/prepare and
//! checkpointing. Grounded on `granite::manager::TransactionManager`'s
//! atomic-counter LSN/txnid allocation and its "skip the durable write
//! when there was nothing to make durable" optimization, generalized
//! from row-level undo logging to chaining arbitrary structural
//! records by `prev_lsn`.

pub mod table;

use crate::config::DbEnvConfig;
use crate::error::{Result, WalError};
use crate::fileid::FileIdRegistry;
use crate::log::LogManager;
use crate::logrec::registry::Registry;
use crate::logrec::txn::{TxnCkp, TxnRegop, TxnXaRegop, TXN_OPCODE_ABORT, TXN_OPCODE_COMMIT, TXN_OPCODE_PREPARE};
use crate::logrec::LogBody;
use crate::lsn::Lsn;
use crate::recovery::handlers;
use crate::recovery::Recovery;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Prepared,
    Committed,
    Aborted,
}

#[derive(Debug, Clone)]
struct ActiveTxn {
    state: TxnState,
    begin_lsn: Lsn,
    last_lsn: Lsn,
    parent: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct CheckpointMarker {
    ckp_lsn: (u32, u32),
    last_ckp: (u32, u32),
    timestamp: u64,
}

/// Counters mirroring the subset of `log_stat`/`txn_stat` this crate
/// actually tracks: active-transaction pressure and how much work the
/// last recovery had to hand back for XA resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStat {
    pub nactive: u32,
    pub maxnactive: u32,
    pub nrestores: u32,
}

/// Owns the log, the file-id registry, and the table of currently
/// active transactions. The only collaborator it needs from the
/// access-method layer is the `fileid -> PageCache` registration,
/// performed through [`FileIdRegistry`].
pub struct TransactionManager {
    data_dir: PathBuf,
    log: Arc<LogManager>,
    fileids: Arc<FileIdRegistry>,
    active: RwLock<HashMap<u32, ActiveTxn>>,
    next_txn_id: AtomicU32,
    last_ckp: RwLock<Lsn>,
    config: DbEnvConfig,
    max_active: AtomicU32,
    nrestores: AtomicU32,
}

impl TransactionManager {
    pub fn new(data_dir: impl AsRef<Path>, config: DbEnvConfig) -> Result<Arc<Self>> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let log = LogManager::open(&data_dir, config.clone())?;
        Ok(Arc::new(TransactionManager {
            data_dir,
            log,
            fileids: Arc::new(FileIdRegistry::new()),
            active: RwLock::new(HashMap::new()),
            next_txn_id: AtomicU32::new(1),
            last_ckp: RwLock::new(Lsn::ZERO),
            config,
            max_active: AtomicU32::new(0),
            nrestores: AtomicU32::new(0),
        }))
    }

    pub fn fileids(&self) -> &Arc<FileIdRegistry> {
        &self.fileids
    }

    pub fn log(&self) -> &Arc<LogManager> {
        &self.log
    }

    fn timestamp(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    /// Allocates a fresh transaction id and tracks it as active. There
    /// is no on-disk `txn_begin` record — a transaction only becomes
    /// visible in the log through the records it writes.
    pub fn begin(&self, parent: Option<u32>) -> Result<u32> {
        if let Some(p) = parent {
            if !self.is_active(p) {
                return Err(WalError::Txn(format!("parent txn {} is not active", p)));
            }
        }
        let id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let nactive = {
            let mut active = self.active.write().unwrap();
            active.insert(id, ActiveTxn { state: TxnState::Active, begin_lsn: Lsn::ZERO, last_lsn: Lsn::ZERO, parent });
            active.len() as u32
        };
        self.max_active.fetch_max(nactive, Ordering::SeqCst);
        debug!("txn {} begin (parent {:?})", id, parent);
        Ok(id)
    }

    pub fn is_active(&self, txnid: u32) -> bool {
        matches!(self.active.read().unwrap().get(&txnid).map(|t| t.state), Some(TxnState::Active))
    }

    /// Writes a caller-supplied structural record on behalf of
    /// `txnid`, chaining its `prev_lsn` to the transaction's last
    /// write. `encode` receives `(txn_num, prev_lsn)` and must produce
    /// the fully framed bytes (envelope + body), as every
    /// `log_record!`-generated `encode` method does.
    pub fn log_record(&self, txnid: u32, encode: impl FnOnce(u32, Lsn) -> Result<Vec<u8>>) -> Result<Lsn> {
        let prev_lsn = {
            let active = self.active.read().unwrap();
            let txn = active.get(&txnid).ok_or_else(|| WalError::Txn(format!("txn {} is not active", txnid)))?;
            txn.last_lsn
        };
        let bytes = encode(txnid, prev_lsn)?;
        let lsn = self.log.put(bytes)?;
        let mut active = self.active.write().unwrap();
        if let Some(txn) = active.get_mut(&txnid) {
            if txn.begin_lsn.is_zero() {
                txn.begin_lsn = lsn;
            }
            txn.last_lsn = lsn;
        }
        Ok(lsn)
    }

    /// Commits `txnid`. If the transaction never wrote a record (a
    /// read-only transaction), no commit record is written at all —
    /// the same "nothing to make durable" shortcut
    /// `granite::manager::TransactionManager::commit` takes for an
    /// empty undo log.
    pub fn commit(&self, txnid: u32, durable: bool) -> Result<()> {
        let prev_lsn = self.take_for_finish(txnid)?;
        if prev_lsn.is_zero() {
            self.finalize(txnid, TxnState::Committed);
            return Ok(());
        }
        let rec = TxnRegop { opcode: TXN_OPCODE_COMMIT, timestamp: self.timestamp() as u32 };
        let bytes = rec.encode(txnid, prev_lsn)?;
        let lsn = if durable { self.log.put_durable(bytes)? } else { self.log.put(bytes)? };
        debug!("txn {} commit at {}", txnid, lsn);
        self.finalize(txnid, TxnState::Committed);
        Ok(())
    }

    /// Aborts `txnid`, applying UNDO to every record it wrote (walking
    /// its `prev_lsn` chain backward) before writing the terminal
    /// abort record.
    pub fn abort(&self, txnid: u32) -> Result<()> {
        let last_lsn = self.take_for_finish(txnid)?;
        let mut cursor_lsn = last_lsn;
        while !cursor_lsn.is_zero() {
            let bytes = self.log.get(cursor_lsn)?;
            let (env, body) = Registry::decode(&bytes)?;
            handlers::structural::apply_undo(&self.fileids, cursor_lsn, &body)?;
            cursor_lsn = env.prev_lsn;
        }
        if !last_lsn.is_zero() {
            let rec = TxnRegop { opcode: TXN_OPCODE_ABORT, timestamp: self.timestamp() as u32 };
            let bytes = rec.encode(txnid, last_lsn)?;
            self.log.put(bytes)?;
        }
        self.finalize(txnid, TxnState::Aborted);
        Ok(())
    }

    /// Prepares `txnid` for two-phase commit, writing a durable
    /// `txn_xa_regop` record the XA coordinator can later resolve.
    pub fn prepare(&self, txnid: u32, xid: Vec<u8>, format_id: i32, gtrid_len: u32, bqual_len: u32) -> Result<()> {
        let (prev_lsn, begin_lsn) = {
            let active = self.active.read().unwrap();
            let txn = active.get(&txnid).ok_or_else(|| WalError::Txn(format!("txn {} is not active", txnid)))?;
            (txn.last_lsn, txn.begin_lsn)
        };
        let rec = TxnXaRegop {
            opcode: TXN_OPCODE_PREPARE,
            xid: crate::serial::Dbt::new(xid),
            format_id,
            gtrid_len,
            bqual_len,
            begin_lsn,
        };
        let bytes = rec.encode(txnid, prev_lsn)?;
        self.log.put_durable(bytes)?;
        if let Some(txn) = self.active.write().unwrap().get_mut(&txnid) {
            txn.state = TxnState::Prepared;
        }
        Ok(())
    }

    fn take_for_finish(&self, txnid: u32) -> Result<Lsn> {
        let active = self.active.read().unwrap();
        let txn = active.get(&txnid).ok_or_else(|| WalError::Txn(format!("txn {} is not active or prepared", txnid)))?;
        Ok(txn.last_lsn)
    }

    fn finalize(&self, txnid: u32, state: TxnState) {
        self.active.write().unwrap().remove(&txnid);
        let _ = state;
    }

    fn checkpoint_marker_path(&self) -> PathBuf {
        self.data_dir.join("checkpoint.json")
    }

    /// Writes a checkpoint: a durable `txn_ckp` record plus a small
    /// JSON marker file recording the checkpoint's LSN so a future
    /// open can skip straight to it without scanning the log,
    /// mirroring `granite::manager::TransactionManager::checkpoint`'s
    /// `serde_json`-based marker file.
    pub fn checkpoint(&self) -> Result<Lsn> {
        self.log.force_sync()?;
        let ckp_lsn = self.log.durable_lsn();
        let last_ckp = *self.last_ckp.read().unwrap();
        let timestamp = self.timestamp();
        let rec = TxnCkp { ckp_lsn, last_ckp, timestamp: timestamp as u32 };
        let bytes = rec.encode(0, Lsn::ZERO)?;
        let lsn = self.log.put_durable(bytes)?;
        *self.last_ckp.write().unwrap() = lsn;

        let marker = CheckpointMarker {
            ckp_lsn: (ckp_lsn.file, ckp_lsn.offset),
            last_ckp: (lsn.file, lsn.offset),
            timestamp,
        };
        std::fs::write(self.checkpoint_marker_path(), serde_json::to_string_pretty(&marker)?)?;

        if self.active.read().unwrap().is_empty() {
            self.log.truncate(ckp_lsn)?;
        }
        info!("checkpoint at {}", lsn);
        Ok(lsn)
    }

    /// Runs crash recovery, then advances the internal txn id counter
    /// past anything recovery saw so freshly begun transactions never
    /// collide with one that is still in limbo.
    pub fn recover(&self) -> Result<crate::recovery::RecoveryReport> {
        let report = Recovery::new(&self.data_dir, &self.fileids, &self.config).run()?;
        let mut next = self.next_txn_id.load(Ordering::SeqCst);
        next = next.max(report.max_txnid + 1);
        self.next_txn_id.store(next, Ordering::SeqCst);
        *self.last_ckp.write().unwrap() = report.last_ckp;
        self.nrestores.store(report.limbo.len() as u32, Ordering::SeqCst);
        for lsn in &report.limbo {
            info!("transaction left in limbo at {}, awaiting XA resolution", lsn);
        }
        Ok(report)
    }

    /// A snapshot of the `log_stat`/`txn_stat` counters this crate
    /// tracks: current and peak active-transaction counts, and how many
    /// prepared transactions the most recent recovery had to restore
    /// for later XA resolution.
    pub fn stat(&self) -> LogStat {
        LogStat {
            nactive: self.active.read().unwrap().len() as u32,
            maxnactive: self.max_active.load(Ordering::SeqCst),
            nrestores: self.nrestores.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logrec::crdel::CrdelFileOpen;

    #[test]
    fn read_only_commit_writes_no_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        let txn = mgr.begin(None).unwrap();
        let before = mgr.log.current_lsn();
        mgr.commit(txn, true).unwrap();
        assert_eq!(mgr.log.current_lsn(), before);
    }

    #[test]
    fn commit_with_a_record_persists_it() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        let txn = mgr.begin(None).unwrap();
        let rec = CrdelFileOpen { name: crate::serial::Dbt::new(b"a.db".to_vec()), fileid: 1 };
        mgr.log_record(txn, |n, p| rec.encode(n, p)).unwrap();
        mgr.commit(txn, true).unwrap();
        assert!(!mgr.is_active(txn));
    }

    #[test]
    fn abort_without_records_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        let txn = mgr.begin(None).unwrap();
        mgr.abort(txn).unwrap();
        assert!(!mgr.is_active(txn));
    }

    #[test]
    fn begin_rejects_inactive_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        assert!(mgr.begin(Some(999)).is_err());
    }

    #[test]
    fn checkpoint_writes_marker_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        mgr.checkpoint().unwrap();
        assert!(mgr.checkpoint_marker_path().exists());
    }

    #[test]
    fn stat_tracks_active_and_peak_txn_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        let t1 = mgr.begin(None).unwrap();
        let _t2 = mgr.begin(None).unwrap();
        assert_eq!(mgr.stat().nactive, 2);
        assert_eq!(mgr.stat().maxnactive, 2);
        mgr.commit(t1, true).unwrap();
        assert_eq!(mgr.stat().nactive, 1);
        assert_eq!(mgr.stat().maxnactive, 2);
    }
}
