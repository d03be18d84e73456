//! C9: the XA bridge. Maps X/Open XA's `open/start/end/prepare/commit/
//! rollback/recover/forget/complete` function set onto
//! [`crate::txn::TransactionManager`], grounded on `bdb/xa/xa.c`'s
//! function names and the XID <-> txn association it keeps. This crate
//! doesn't speak the C `XID` ABI directly — [`Xid`] is the same
//! `(format_id, gtrid, bqual)` triple with the length split already
//! applied.

use crate::error::{Result, WalError, XaErrorCode};
use crate::logrec::txn::TXN_OPCODE_PREPARE;
use crate::txn::TransactionManager;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An XA transaction identifier: a global transaction id (`gtrid`)
/// followed by a branch qualifier (`bqual`), tagged with a
/// caller-chosen format id. Equality and hashing cover the whole wire
/// representation, matching XA's `xid_t` comparison rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    pub format_id: i32,
    pub gtrid: Vec<u8>,
    pub bqual: Vec<u8>,
}

impl Xid {
    pub fn new(format_id: i32, gtrid: Vec<u8>, bqual: Vec<u8>) -> Self {
        Xid { format_id, gtrid, bqual }
    }

    fn packed(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.gtrid.len() + self.bqual.len());
        v.extend_from_slice(&self.gtrid);
        v.extend_from_slice(&self.bqual);
        v
    }
}

/// XA association flags. A tiny hand-rolled bitset rather than pulling
/// in a flags crate for the one call site that needs one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XaFlags(u32);

impl XaFlags {
    pub const TMNOFLAGS: XaFlags = XaFlags(0x0000_0000);
    pub const TMJOIN: XaFlags = XaFlags(0x0020_0000);
    pub const TMRESUME: XaFlags = XaFlags(0x0800_0000);
    pub const TMSUCCESS: XaFlags = XaFlags(0x0400_0000);
    pub const TMFAIL: XaFlags = XaFlags(0x2000_0000);
    pub const TMSUSPEND: XaFlags = XaFlags(0x0200_0000);
    pub const TMONEPHASE: XaFlags = XaFlags(0x4000_0000);

    pub fn contains(&self, other: XaFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for XaFlags {
    type Output = XaFlags;
    fn bitor(self, rhs: XaFlags) -> XaFlags {
        XaFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchState {
    Active,
    Suspended,
    Idle,
    Prepared,
}

struct Branch {
    txnid: u32,
    state: BranchState,
}

/// Resource-manager side of the bridge: one per open environment.
/// Grounded on `xa.c`'s global `xa_info` plus its `XID`-to-transaction
/// hash, generalized so the map lives on the struct instead of in a
/// process-wide static (the original ships one RM per process; nothing
/// about this crate's design requires that restriction).
pub struct XaBridge {
    txn_mgr: Arc<TransactionManager>,
    branches: RwLock<HashMap<Xid, Branch>>,
}

impl XaBridge {
    pub fn new(txn_mgr: Arc<TransactionManager>) -> Arc<Self> {
        Arc::new(XaBridge { txn_mgr, branches: RwLock::new(HashMap::new()) })
    }

    /// `xa_open_entry`: no-op beyond validating the bridge has a live
    /// transaction manager to hand transactions to — this crate's
    /// "open" already happened when the caller constructed the
    /// [`TransactionManager`].
    pub fn open(&self) -> Result<()> {
        Ok(())
    }

    /// `xa_close_entry`: refuses to close while branches are still
    /// outstanding, mirroring XAER_PROTO on an RM with live
    /// associations.
    pub fn close(&self) -> Result<()> {
        if !self.branches.read().unwrap().is_empty() {
            return Err(WalError::Xa(XaErrorCode::Proto));
        }
        Ok(())
    }

    /// `xa_start_entry`: begins (or, with `TMJOIN`/`TMRESUME`, resumes)
    /// work under `xid`. A fresh `xid` with neither flag set starts a
    /// brand-new transaction; `TMJOIN`/`TMRESUME` attach to one already
    /// known to this bridge.
    pub fn start(&self, xid: &Xid, flags: XaFlags) -> Result<()> {
        let mut branches = self.branches.write().unwrap();
        if flags.contains(XaFlags::TMJOIN) || flags.contains(XaFlags::TMRESUME) {
            let branch = branches.get_mut(xid).ok_or(WalError::Xa(XaErrorCode::NotA))?;
            if branch.state != BranchState::Suspended && flags.contains(XaFlags::TMRESUME) {
                return Err(WalError::Xa(XaErrorCode::Proto));
            }
            branch.state = BranchState::Active;
            return Ok(());
        }
        if branches.contains_key(xid) {
            return Err(WalError::Xa(XaErrorCode::DupId));
        }
        let txnid = self.txn_mgr.begin(None)?;
        branches.insert(xid.clone(), Branch { txnid, state: BranchState::Active });
        Ok(())
    }

    /// `xa_end_entry`: detaches from `xid` without resolving it.
    /// `TMSUSPEND` leaves it resumable; `TMFAIL`/`TMSUCCESS` just mark
    /// the branch idle, awaiting `prepare`/`commit`/`rollback`.
    pub fn end(&self, xid: &Xid, flags: XaFlags) -> Result<()> {
        let mut branches = self.branches.write().unwrap();
        let branch = branches.get_mut(xid).ok_or(WalError::Xa(XaErrorCode::NotA))?;
        if branch.state != BranchState::Active {
            return Err(WalError::Xa(XaErrorCode::Proto));
        }
        branch.state = if flags.contains(XaFlags::TMSUSPEND) { BranchState::Suspended } else { BranchState::Idle };
        Ok(())
    }

    /// `xa_prepare_entry`: writes the durable `txn_xa_regop` record via
    /// [`TransactionManager::prepare`]. Returns `true` for XA_OK,
    /// `false` for XA_RDONLY (nothing was ever logged for this
    /// branch, so there's nothing left to commit or roll back).
    pub fn prepare(&self, xid: &Xid) -> Result<bool> {
        let txnid = {
            let branches = self.branches.read().unwrap();
            let branch = branches.get(xid).ok_or(WalError::Xa(XaErrorCode::NotA))?;
            if branch.state != BranchState::Idle {
                return Err(WalError::Xa(XaErrorCode::Proto));
            }
            branch.txnid
        };
        if !self.txn_mgr.is_active(txnid) {
            return Err(WalError::Xa(XaErrorCode::Proto));
        }
        let xid_bytes = xid.packed();
        let gtrid_len = xid.gtrid.len() as u32;
        let bqual_len = xid.bqual.len() as u32;
        self.txn_mgr.prepare(txnid, xid_bytes, xid.format_id, gtrid_len, bqual_len)?;
        self.branches.write().unwrap().get_mut(xid).unwrap().state = BranchState::Prepared;
        Ok(true)
    }

    /// `xa_commit_entry`. `one_phase` skips the PREPARE step entirely,
    /// matching the one-phase optimization XA grants when a
    /// transaction spans only a single resource manager.
    pub fn commit(&self, xid: &Xid, one_phase: bool) -> Result<()> {
        let (txnid, state) = {
            let branches = self.branches.read().unwrap();
            let branch = branches.get(xid).ok_or(WalError::Xa(XaErrorCode::NotA))?;
            (branch.txnid, branch.state)
        };
        if !one_phase && state != BranchState::Prepared {
            return Err(WalError::Xa(XaErrorCode::Proto));
        }
        self.txn_mgr.commit(txnid, true).map_err(|_| WalError::Xa(XaErrorCode::RmErr))?;
        self.branches.write().unwrap().remove(xid);
        Ok(())
    }

    /// `xa_rollback_entry`.
    pub fn rollback(&self, xid: &Xid) -> Result<()> {
        let txnid = {
            let branches = self.branches.read().unwrap();
            branches.get(xid).ok_or(WalError::Xa(XaErrorCode::NotA))?.txnid
        };
        self.txn_mgr.abort(txnid).map_err(|_| WalError::Xa(XaErrorCode::RmErr))?;
        self.branches.write().unwrap().remove(xid);
        Ok(())
    }

    /// `xa_forget_entry`: discards a heuristically-completed branch
    /// without touching the log — the transaction was already resolved
    /// outside the normal two-phase protocol, so there's nothing left
    /// for this bridge to redo or undo.
    pub fn forget(&self, xid: &Xid) -> Result<()> {
        self.branches.write().unwrap().remove(xid);
        Ok(())
    }

    /// `xa_complete_entry`: this bridge never returns XAER_ASYNC from
    /// any call, so asynchronous completion never has anything to
    /// poll for.
    pub fn complete(&self) -> Result<()> {
        Ok(())
    }

    /// `xa_recover_entry`: surfaces every transaction crash recovery
    /// left `Prepare`d, by reading the `txn_xa_regop` record at each
    /// limbo LSN back out of the log.
    pub fn recover(&self) -> Result<Vec<Xid>> {
        let report = self.txn_mgr.recover()?;
        let mut xids = Vec::new();
        for lsn in &report.limbo {
            let bytes = self.txn_mgr.log().get(*lsn)?;
            let (_, body) = crate::logrec::registry::Registry::decode(&bytes)?;
            if let crate::logrec::LogBody::TxnXaRegop(r) = body {
                if r.opcode != TXN_OPCODE_PREPARE {
                    continue;
                }
                let gtrid_len = r.gtrid_len as usize;
                let data = &r.xid.0;
                let gtrid = data.get(..gtrid_len).unwrap_or(&[]).to_vec();
                let bqual = data.get(gtrid_len..).unwrap_or(&[]).to_vec();
                xids.push(Xid::new(r.format_id, gtrid, bqual));
            }
        }
        Ok(xids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbEnvConfig;

    fn bridge() -> (tempfile::TempDir, Arc<XaBridge>) {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = TransactionManager::new(tmp.path(), DbEnvConfig::default()).unwrap();
        (tmp, XaBridge::new(mgr))
    }

    #[test]
    fn start_then_unknown_xid_operations_fail() {
        let (_tmp, bridge) = bridge();
        let xid = Xid::new(1, vec![1], vec![2]);
        assert!(bridge.end(&xid, XaFlags::TMSUCCESS).is_err());
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let (_tmp, bridge) = bridge();
        let xid = Xid::new(1, vec![1], vec![2]);
        bridge.start(&xid, XaFlags::TMNOFLAGS).unwrap();
        assert!(bridge.start(&xid, XaFlags::TMNOFLAGS).is_err());
    }

    #[test]
    fn one_phase_commit_skips_prepare() {
        let (_tmp, bridge) = bridge();
        let xid = Xid::new(1, vec![1], vec![2]);
        bridge.start(&xid, XaFlags::TMNOFLAGS).unwrap();
        bridge.end(&xid, XaFlags::TMSUCCESS).unwrap();
        assert!(bridge.commit(&xid, true).is_ok());
    }

    #[test]
    fn two_phase_commit_requires_prepare_first() {
        let (_tmp, bridge) = bridge();
        let xid = Xid::new(1, vec![1], vec![2]);
        bridge.start(&xid, XaFlags::TMNOFLAGS).unwrap();
        bridge.end(&xid, XaFlags::TMSUCCESS).unwrap();
        assert!(bridge.commit(&xid, false).is_err());
    }

    #[test]
    fn rollback_removes_the_branch() {
        let (_tmp, bridge) = bridge();
        let xid = Xid::new(1, vec![1], vec![2]);
        bridge.start(&xid, XaFlags::TMNOFLAGS).unwrap();
        bridge.end(&xid, XaFlags::TMSUCCESS).unwrap();
        bridge.rollback(&xid).unwrap();
        assert!(bridge.end(&xid, XaFlags::TMSUCCESS).is_err());
    }
}
