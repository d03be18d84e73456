//! C8: the recovery driver. Implements the three-pass algorithm from
//! `env_recover.c::__db_apprec`:
//!
//!   Pass 0 — find an anchor: the last checkpoint's `ckp_lsn`, or the
//!     very start of the log under `DB_RECOVER_FATAL`.
//!   Pass 1 (OPENFILES) — forward from the anchor to EOF, registering
//!     every file create/rename/delete/register record so later passes
//!     can resolve `fileid`s.
//!   Pass 2 (BACKWARD_ROLL) — backward from EOF to the same anchor
//!     (or the start of the log under `DB_RECOVER_FATAL`), building the
//!     transaction table and undoing the work of every transaction that
//!     will not end up committed.
//!   Pass 3 (FORWARD_ROLL) — forward again from that same anchor,
//!     redoing the work of every transaction the table says committed.

pub mod handlers;

use crate::config::DbEnvConfig;
use crate::error::Result;
use crate::fileid::FileIdRegistry;
use crate::logrec::registry::Registry;
use crate::logrec::LogBody;
use crate::lsn::{lsn_progress, Lsn};
use crate::txn::table::TxnTable;
use log::{debug, info};

#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub redone: usize,
    pub undone_dispositions: usize,
    /// Prepared transactions still unresolved after recovery; the
    /// caller (an XA coordinator, typically) must commit or roll each
    /// of these back explicitly.
    pub limbo: Vec<Lsn>,
    pub max_txnid: u32,
    pub last_ckp: Lsn,
}

pub struct Recovery<'a> {
    log_dir: &'a std::path::Path,
    fileids: &'a FileIdRegistry,
    config: &'a DbEnvConfig,
}

impl<'a> Recovery<'a> {
    pub fn new(log_dir: &'a std::path::Path, fileids: &'a FileIdRegistry, config: &'a DbEnvConfig) -> Self {
        Recovery { log_dir, fileids, config }
    }

    fn first(&self) -> Result<crate::log::cursor::LogCursor> {
        crate::log::cursor::LogCursor::open_first(self.log_dir)
    }

    fn last(&self) -> Result<crate::log::cursor::LogCursor> {
        crate::log::cursor::LogCursor::open_last(self.log_dir)
    }

    /// Decodes the record at `cur`. `legacy_records = false` refuses
    /// to even parse a pre-`dbreg_register` wire format at all (spec's
    /// "gate reading behind a legacy flag" option); `deprecated_recover`
    /// is the separate, finer-grained question of whether a
    /// successfully-decoded legacy record's *effect* gets applied —
    /// see [`handlers::apply_openfiles`].
    fn decode_at(&self, cur: &crate::log::cursor::LogCursor) -> Result<(Lsn, u32, LogBody)> {
        let bytes = cur.current()?;
        let (env, body) = Registry::decode(&bytes)?;
        if !self.config.legacy_records && matches!(body, LogBody::LogRegisterLegacy(_)) {
            return Err(crate::error::WalError::corruption(
                "legacy log_register record encountered with legacy_records disabled",
            ));
        }
        Ok((cur.lsn(), env.txn_num, body))
    }

    /// `__log_earliest`: scans forward from the very start of the log
    /// for the first `txn_ckp` record whose own `ckp_lsn` is past the
    /// first log record, and returns its timestamp — the earliest
    /// point a `tx_timestamp` recovery target can name, since nothing
    /// before the first checkpoint has a complete enough transaction
    /// table to recover into. Returns `None` when the log holds no
    /// checkpoint yet, in which case any timestamp is acceptable.
    fn earliest_timestamp(&self) -> Result<Option<u64>> {
        let first_lsn = match self.first() {
            Ok(c) => c.lsn(),
            Err(_) => return Ok(None),
        };
        let mut cur = self.first()?;
        loop {
            let (_lsn, _txn, body) = self.decode_at(&cur)?;
            if let LogBody::TxnCkp(ckp) = body {
                if ckp.ckp_lsn >= first_lsn {
                    return Ok(Some(ckp.timestamp as u64));
                }
            }
            if !cur.next()? {
                return Ok(None);
            }
        }
    }

    /// Scans backward from the end of the log for the most recent
    /// `txn_ckp` record, mirroring `env_recover.c`'s own backward
    /// `log_get(DB_PREV)` loop in Pass 0. Returns the record's embedded
    /// `ckp_lsn` — the durable point as of the checkpoint, and the same
    /// anchor Pass 1/2/3 all scan from — not the record's own position.
    fn find_last_checkpoint(&self) -> Result<Option<Lsn>> {
        let mut cur = match self.last() {
            Ok(c) => c,
            Err(_) => return Ok(None),
        };
        loop {
            let (_lsn, _txn, body) = self.decode_at(&cur)?;
            if let LogBody::TxnCkp(ckp) = body {
                return Ok(Some(ckp.ckp_lsn));
            }
            if !cur.prev()? {
                return Ok(None);
            }
        }
    }

    /// Runs full crash recovery, returning a summary. Callers that
    /// supply no `PageCache` registrations will see structural records
    /// skipped with a warning rather than failing outright — this
    /// lets the driver run (and be tested) standalone without a real
    /// access method attached.
    pub fn run(&self) -> Result<RecoveryReport> {
        let first = match self.first() {
            Ok(c) => c,
            Err(_) => {
                info!("log is empty, nothing to recover");
                return Ok(RecoveryReport::default());
            }
        };

        if let Some(target) = self.config.tx_timestamp {
            if let Some(earliest) = self.earliest_timestamp()? {
                if target < earliest {
                    return Err(crate::error::WalError::Txn(format!(
                        "point-in-time target {} predates the earliest recoverable checkpoint at {}",
                        target, earliest
                    )));
                }
            }
        }

        // Pass 0: locate the anchor.
        let open_lsn = if self.config.recover_fatal {
            first.lsn()
        } else {
            match self.find_last_checkpoint()? {
                Some(ckp_lsn) if !ckp_lsn.is_zero() => ckp_lsn,
                _ => first.lsn(),
            }
        };

        // Pass 1: OPENFILES, forward from the anchor.
        let mut cur = crate::log::cursor::LogCursor::open_at(self.log_dir, open_lsn)?;
        loop {
            let (_, _txn, body) = self.decode_at(&cur)?;
            handlers::apply_openfiles(self.fileids, &body, self.config.deprecated_recover)?;
            if !cur.next()? {
                break;
            }
        }

        // Pass 2/3 share the same lower bound as Pass 0/1: BACKWARD_ROLL
        // and FORWARD_ROLL both stop at the anchor, not some earlier
        // checkpoint — there is only one anchor to find per run.
        let lower_bound = if self.config.recover_fatal { Lsn::ZERO } else { open_lsn };

        let mut table = TxnTable::new();
        let mut cur = self.last()?;
        let eof_lsn = cur.lsn();
        let mut undone = 0usize;
        loop {
            let (lsn, txn, body) = self.decode_at(&cur)?;
            handlers::apply_backward(self.fileids, &mut table, txn, lsn, &body, self.config.tx_timestamp)?;
            undone += 1;
            debug!("BACKWARD_ROLL {}% ({})", lsn_progress(lower_bound, eof_lsn, lsn), lsn);
            if lsn <= lower_bound || !cur.prev()? {
                break;
            }
        }

        // Pass 3: FORWARD_ROLL, redoing committed work from the same
        // lower bound back up to EOF.
        let mut cur = crate::log::cursor::LogCursor::open_at(self.log_dir, lower_bound)?;
        let mut redone = 0usize;
        loop {
            let (lsn, txn, body) = self.decode_at(&cur)?;
            handlers::apply_forward(self.fileids, &mut table, txn, lsn, &body)?;
            redone += 1;
            debug!("FORWARD_ROLL {}% ({})", lsn_progress(lower_bound, eof_lsn, lsn), lsn);
            if !cur.next()? {
                break;
            }
        }

        Ok(RecoveryReport {
            redone,
            undone_dispositions: undone,
            limbo: table.limbo().to_vec(),
            max_txnid: table.max_txnid(),
            last_ckp: open_lsn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbEnvConfig;
    use crate::fileid::FileIdRegistry;
    use crate::log::LogManager;
    use crate::logrec::crdel::CrdelFileOpen;
    use crate::logrec::txn::{TxnRegop, TXN_OPCODE_ABORT, TXN_OPCODE_COMMIT};
    use crate::serial::Dbt;

    #[test]
    fn empty_log_recovers_trivially() {
        let tmp = tempfile::tempdir().unwrap();
        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig::default();
        let report = Recovery::new(tmp.path(), &fileids, &cfg).run().unwrap();
        assert_eq!(report.redone, 0);
    }

    #[test]
    fn committed_file_create_is_redone_into_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig::default();
        let log = LogManager::open(tmp.path(), cfg.clone()).unwrap();

        let create = CrdelFileOpen { name: Dbt::new(b"t.db".to_vec()), fileid: 11 };
        let lsn1 = log.put_durable(create.encode(1, Lsn::ZERO).unwrap()).unwrap();
        let commit = TxnRegop { opcode: TXN_OPCODE_COMMIT, timestamp: 1 };
        log.put_durable(commit.encode(1, lsn1).unwrap()).unwrap();
        log.shutdown();

        let report = Recovery::new(tmp.path(), &fileids, &cfg).run().unwrap();
        assert!(report.redone >= 2);
        assert!(fileids.is_registered(11));
    }

    #[test]
    fn aborted_file_create_is_rolled_back() {
        let tmp = tempfile::tempdir().unwrap();
        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig::default();
        let log = LogManager::open(tmp.path(), cfg.clone()).unwrap();

        let create = CrdelFileOpen { name: Dbt::new(b"u.db".to_vec()), fileid: 12 };
        let lsn1 = log.put_durable(create.encode(2, Lsn::ZERO).unwrap()).unwrap();
        let abort = TxnRegop { opcode: TXN_OPCODE_ABORT, timestamp: 1 };
        log.put_durable(abort.encode(2, lsn1).unwrap()).unwrap();
        log.shutdown();

        let report = Recovery::new(tmp.path(), &fileids, &cfg).run().unwrap();
        assert!(report.redone >= 2);
        assert!(!fileids.is_registered(12));
    }

    #[test]
    fn legacy_log_register_is_honored_only_when_deprecated_recover_is_set() {
        use crate::logrec::dbreg::LogRegisterLegacy;
        use crate::serial::Dbt;

        let tmp = tempfile::tempdir().unwrap();
        let log = LogManager::open(tmp.path(), DbEnvConfig::default()).unwrap();
        let rec = LogRegisterLegacy { fileid: 21, name: Dbt::new(b"old.db".to_vec()), uid: Dbt::new(vec![0u8; 20]) };
        log.put_durable(rec.encode(0, Lsn::ZERO).unwrap()).unwrap();
        log.shutdown();

        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig { deprecated_recover: false, ..DbEnvConfig::default() };
        Recovery::new(tmp.path(), &fileids, &cfg).run().unwrap();
        assert!(!fileids.is_registered(21));

        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig { deprecated_recover: true, ..DbEnvConfig::default() };
        Recovery::new(tmp.path(), &fileids, &cfg).run().unwrap();
        assert!(fileids.is_registered(21));
    }

    #[test]
    fn point_in_time_target_before_first_checkpoint_is_rejected() {
        use crate::logrec::txn::TxnCkp;

        let tmp = tempfile::tempdir().unwrap();
        let fileids = FileIdRegistry::new();
        let log = LogManager::open(tmp.path(), DbEnvConfig::default()).unwrap();

        let create = CrdelFileOpen { name: Dbt::new(b"v.db".to_vec()), fileid: 31 };
        let lsn1 = log.put_durable(create.encode(1, Lsn::ZERO).unwrap()).unwrap();
        let ckp = TxnCkp { ckp_lsn: lsn1, last_ckp: Lsn::ZERO, timestamp: 1_000 };
        log.put_durable(ckp.encode(0, Lsn::ZERO).unwrap()).unwrap();
        log.shutdown();

        let cfg = DbEnvConfig::point_in_time(500);
        assert!(Recovery::new(tmp.path(), &fileids, &cfg).run().is_err());

        let cfg = DbEnvConfig::point_in_time(2_000);
        assert!(Recovery::new(tmp.path(), &fileids, &cfg).run().is_ok());
    }

    #[test]
    fn legacy_records_disabled_refuses_to_parse_the_old_format() {
        use crate::logrec::dbreg::LogRegisterLegacy;
        use crate::serial::Dbt;

        let tmp = tempfile::tempdir().unwrap();
        let log = LogManager::open(tmp.path(), DbEnvConfig::default()).unwrap();
        let rec = LogRegisterLegacy { fileid: 22, name: Dbt::new(b"old.db".to_vec()), uid: Dbt::new(vec![0u8; 20]) };
        log.put_durable(rec.encode(0, Lsn::ZERO).unwrap()).unwrap();
        log.shutdown();

        let fileids = FileIdRegistry::new();
        let cfg = DbEnvConfig { legacy_records: false, ..DbEnvConfig::default() };
        assert!(Recovery::new(tmp.path(), &fileids, &cfg).run().is_err());
    }
}
