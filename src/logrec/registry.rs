//! The record registry: given a decoded envelope, dispatch to the
//! right body type. This is the crate's stand-in for BDB's per-type
//! function-pointer table (`DB_RECOPS`/`db_recops`/the `*_print`,
//! `*_read` tables `gen_rec.awk` emits) — a tagged-union `match`
//! instead of an array of function pointers, per SPEC_FULL.md's
//! Design Notes.

use super::btree::*;
use super::crdel::*;
use super::db::*;
use super::dbreg::*;
use super::envelope::{Envelope, RecType};
use super::hash::*;
use super::queue::*;
use super::txn::*;
use crate::error::Result;
use crate::serial::ByteReader;

/// A fully decoded log record: envelope plus the type-specific body.
#[derive(Debug, Clone)]
pub enum LogBody {
    BamPgAlloc(BamPgAlloc),
    BamPgFree(BamPgFree),
    BamSplit(BamSplit),
    BamInsDel(BamInsDel),
    BamAdj(BamAdj),
    BamCadjust(BamCadjust),
    BamCdel(BamCdel),
    BamRepl(BamRepl),
    BamRoot(BamRoot),
    BamCuradj(BamCuradj),
    BamRsplit(BamRsplit),
    BamRcuradj(BamRcuradj),
    HamInsDel(HamInsDel),
    HamNewPage(HamNewPage),
    HamSplitData(HamSplitData),
    HamReplace(HamReplace),
    HamNewPgNo(HamNewPgNo),
    HamOvfl(HamOvfl),
    HamCopyPage(HamCopyPage),
    HamMetagroup(HamMetagroup),
    HamGroupalloc(HamGroupalloc),
    HamCuradj(HamCuradj),
    HamChgpg(HamChgpg),
    QamIncFirst(QamIncFirst),
    QamMvptr(QamMvptr),
    QamDel(QamDel),
    QamAdd(QamAdd),
    QamInc(QamInc),
    QamDelete(QamDelete),
    QamRename(QamRename),
    QamDelext(QamDelext),
    DbAddRem(DbAddRem),
    DbBig(DbBig),
    DbOvRef(DbOvRef),
    DbRelink(DbRelink),
    DbDebug(DbDebug),
    DbNoop(DbNoop),
    CrdelMetaSub(CrdelMetaSub),
    CrdelFileOpen(CrdelFileOpen),
    CrdelRename(CrdelRename),
    CrdelDelete(CrdelDelete),
    CrdelMetapage(CrdelMetapage),
    DbregRegister(DbregRegister),
    TxnRegop(TxnRegop),
    TxnCkp(TxnCkp),
    TxnXaRegop(TxnXaRegop),
    TxnChild(TxnChild),
    TxnRecycle(TxnRecycle),
    LogRegisterLegacy(LogRegisterLegacy),
}

impl LogBody {
    pub fn print(&self) -> String {
        match self {
            LogBody::BamPgAlloc(r) => r.print(),
            LogBody::BamPgFree(r) => r.print(),
            LogBody::BamSplit(r) => r.print(),
            LogBody::BamInsDel(r) => r.print(),
            LogBody::BamAdj(r) => r.print(),
            LogBody::BamCadjust(r) => r.print(),
            LogBody::BamCdel(r) => r.print(),
            LogBody::BamRepl(r) => r.print(),
            LogBody::BamRoot(r) => r.print(),
            LogBody::BamCuradj(r) => r.print(),
            LogBody::BamRsplit(r) => r.print(),
            LogBody::BamRcuradj(r) => r.print(),
            LogBody::HamInsDel(r) => r.print(),
            LogBody::HamNewPage(r) => r.print(),
            LogBody::HamSplitData(r) => r.print(),
            LogBody::HamReplace(r) => r.print(),
            LogBody::HamNewPgNo(r) => r.print(),
            LogBody::HamOvfl(r) => r.print(),
            LogBody::HamCopyPage(r) => r.print(),
            LogBody::HamMetagroup(r) => r.print(),
            LogBody::HamGroupalloc(r) => r.print(),
            LogBody::HamCuradj(r) => r.print(),
            LogBody::HamChgpg(r) => r.print(),
            LogBody::QamIncFirst(r) => r.print(),
            LogBody::QamMvptr(r) => r.print(),
            LogBody::QamDel(r) => r.print(),
            LogBody::QamAdd(r) => r.print(),
            LogBody::QamInc(r) => r.print(),
            LogBody::QamDelete(r) => r.print(),
            LogBody::QamRename(r) => r.print(),
            LogBody::QamDelext(r) => r.print(),
            LogBody::DbAddRem(r) => r.print(),
            LogBody::DbBig(r) => r.print(),
            LogBody::DbOvRef(r) => r.print(),
            LogBody::DbRelink(r) => r.print(),
            LogBody::DbDebug(r) => r.print(),
            LogBody::DbNoop(r) => r.print(),
            LogBody::CrdelMetaSub(r) => r.print(),
            LogBody::CrdelFileOpen(r) => r.print(),
            LogBody::CrdelRename(r) => r.print(),
            LogBody::CrdelDelete(r) => r.print(),
            LogBody::CrdelMetapage(r) => r.print(),
            LogBody::DbregRegister(r) => r.print(),
            LogBody::TxnRegop(r) => r.print(),
            LogBody::TxnCkp(r) => r.print(),
            LogBody::TxnXaRegop(r) => r.print(),
            LogBody::TxnChild(r) => r.print(),
            LogBody::TxnRecycle(r) => r.print(),
            LogBody::LogRegisterLegacy(r) => r.print(),
        }
    }

    /// The `fileid` this record applies to, or `None` for records
    /// that are not scoped to a single open file (txn records).
    pub fn fileid(&self) -> Option<i32> {
        match self {
            LogBody::BamPgAlloc(r) => Some(r.fileid),
            LogBody::BamPgFree(r) => Some(r.fileid),
            LogBody::BamSplit(r) => Some(r.fileid),
            LogBody::BamInsDel(r) => Some(r.fileid),
            LogBody::BamAdj(r) => Some(r.fileid),
            LogBody::BamCadjust(r) => Some(r.fileid),
            LogBody::BamCdel(r) => Some(r.fileid),
            LogBody::BamRepl(r) => Some(r.fileid),
            LogBody::BamRoot(r) => Some(r.fileid),
            LogBody::BamCuradj(r) => Some(r.fileid),
            LogBody::BamRsplit(r) => Some(r.fileid),
            LogBody::BamRcuradj(r) => Some(r.fileid),
            LogBody::HamInsDel(r) => Some(r.fileid),
            LogBody::HamNewPage(r) => Some(r.fileid),
            LogBody::HamSplitData(r) => Some(r.fileid),
            LogBody::HamReplace(r) => Some(r.fileid),
            LogBody::HamNewPgNo(r) => Some(r.fileid),
            LogBody::HamOvfl(r) => Some(r.fileid),
            LogBody::HamCopyPage(r) => Some(r.fileid),
            LogBody::HamMetagroup(r) => Some(r.fileid),
            LogBody::HamGroupalloc(r) => Some(r.fileid),
            LogBody::HamCuradj(r) => Some(r.fileid),
            LogBody::HamChgpg(r) => Some(r.fileid),
            LogBody::QamIncFirst(r) => Some(r.fileid),
            LogBody::QamMvptr(r) => Some(r.fileid),
            LogBody::QamDel(r) => Some(r.fileid),
            LogBody::QamAdd(r) => Some(r.fileid),
            LogBody::QamInc(r) => Some(r.fileid),
            LogBody::QamDelext(r) => Some(r.fileid),
            LogBody::QamDelete(_) | LogBody::QamRename(_) => None,
            LogBody::DbAddRem(r) => Some(r.fileid),
            LogBody::DbBig(r) => Some(r.fileid),
            LogBody::DbOvRef(r) => Some(r.fileid),
            LogBody::DbRelink(r) => Some(r.fileid),
            LogBody::DbDebug(r) => Some(r.fileid),
            LogBody::DbNoop(r) => Some(r.fileid),
            LogBody::CrdelMetaSub(r) => Some(r.fileid),
            LogBody::CrdelFileOpen(r) => Some(r.fileid),
            LogBody::CrdelRename(r) => Some(r.fileid),
            LogBody::CrdelDelete(r) => Some(r.fileid),
            LogBody::CrdelMetapage(r) => Some(r.fileid),
            LogBody::DbregRegister(r) => Some(r.fileid),
            LogBody::LogRegisterLegacy(r) => Some(r.fileid),
            LogBody::TxnRegop(_) | LogBody::TxnCkp(_) | LogBody::TxnXaRegop(_) | LogBody::TxnChild(_) | LogBody::TxnRecycle(_) => None,
        }
    }
}

/// Decodes a record body given its already-parsed envelope and the
/// reader positioned right after the envelope.
pub fn decode_body(env: &Envelope, r: &mut ByteReader) -> Result<LogBody> {
    Ok(match env.rectype {
        RecType::BamPgAlloc => LogBody::BamPgAlloc(BamPgAlloc::decode_body(r)?),
        RecType::BamPgFree => LogBody::BamPgFree(BamPgFree::decode_body(r)?),
        RecType::BamSplit => LogBody::BamSplit(BamSplit::decode_body(r)?),
        RecType::BamInsDel => LogBody::BamInsDel(BamInsDel::decode_body(r)?),
        RecType::BamAdj => LogBody::BamAdj(BamAdj::decode_body(r)?),
        RecType::BamCadjust => LogBody::BamCadjust(BamCadjust::decode_body(r)?),
        RecType::BamCdel => LogBody::BamCdel(BamCdel::decode_body(r)?),
        RecType::BamRepl => LogBody::BamRepl(BamRepl::decode_body(r)?),
        RecType::BamRoot => LogBody::BamRoot(BamRoot::decode_body(r)?),
        RecType::BamCuradj => LogBody::BamCuradj(BamCuradj::decode_body(r)?),
        RecType::BamRsplit => LogBody::BamRsplit(BamRsplit::decode_body(r)?),
        RecType::BamRcuradj => LogBody::BamRcuradj(BamRcuradj::decode_body(r)?),
        RecType::HamInsDel => LogBody::HamInsDel(HamInsDel::decode_body(r)?),
        RecType::HamNewPage => LogBody::HamNewPage(HamNewPage::decode_body(r)?),
        RecType::HamSplitData => LogBody::HamSplitData(HamSplitData::decode_body(r)?),
        RecType::HamReplace => LogBody::HamReplace(HamReplace::decode_body(r)?),
        RecType::HamNewPgNo => LogBody::HamNewPgNo(HamNewPgNo::decode_body(r)?),
        RecType::HamOvfl => LogBody::HamOvfl(HamOvfl::decode_body(r)?),
        RecType::HamCopyPage => LogBody::HamCopyPage(HamCopyPage::decode_body(r)?),
        RecType::HamMetagroup => LogBody::HamMetagroup(HamMetagroup::decode_body(r)?),
        RecType::HamGroupalloc => LogBody::HamGroupalloc(HamGroupalloc::decode_body(r)?),
        RecType::HamCuradj => LogBody::HamCuradj(HamCuradj::decode_body(r)?),
        RecType::HamChgpg => LogBody::HamChgpg(HamChgpg::decode_body(r)?),
        RecType::QamIncFirst => LogBody::QamIncFirst(QamIncFirst::decode_body(r)?),
        RecType::QamMvptr => LogBody::QamMvptr(QamMvptr::decode_body(r)?),
        RecType::QamDel => LogBody::QamDel(QamDel::decode_body(r)?),
        RecType::QamAdd => LogBody::QamAdd(QamAdd::decode_body(r)?),
        RecType::QamInc => LogBody::QamInc(QamInc::decode_body(r)?),
        RecType::QamDelete => LogBody::QamDelete(QamDelete::decode_body(r)?),
        RecType::QamRename => LogBody::QamRename(QamRename::decode_body(r)?),
        RecType::QamDelext => LogBody::QamDelext(QamDelext::decode_body(r)?),
        RecType::DbAddRem => LogBody::DbAddRem(DbAddRem::decode_body(r)?),
        RecType::DbBig => LogBody::DbBig(DbBig::decode_body(r)?),
        RecType::DbOvRef => LogBody::DbOvRef(DbOvRef::decode_body(r)?),
        RecType::DbRelink => LogBody::DbRelink(DbRelink::decode_body(r)?),
        RecType::DbDebug => LogBody::DbDebug(DbDebug::decode_body(r)?),
        RecType::DbNoop => LogBody::DbNoop(DbNoop::decode_body(r)?),
        RecType::CrdelMetaSub => LogBody::CrdelMetaSub(CrdelMetaSub::decode_body(r)?),
        RecType::CrdelFileOpen => LogBody::CrdelFileOpen(CrdelFileOpen::decode_body(r)?),
        RecType::CrdelRename => LogBody::CrdelRename(CrdelRename::decode_body(r)?),
        RecType::CrdelDelete => LogBody::CrdelDelete(CrdelDelete::decode_body(r)?),
        RecType::CrdelMetapage => LogBody::CrdelMetapage(CrdelMetapage::decode_body(r)?),
        RecType::DbregRegister => LogBody::DbregRegister(DbregRegister::decode_body(r)?),
        RecType::TxnRegop => LogBody::TxnRegop(TxnRegop::decode_body(r)?),
        RecType::TxnCkp => LogBody::TxnCkp(TxnCkp::decode_body(r)?),
        RecType::TxnXaRegop => LogBody::TxnXaRegop(TxnXaRegop::decode_body(r)?),
        RecType::TxnChild => LogBody::TxnChild(TxnChild::decode_body(r)?),
        RecType::TxnRecycle => LogBody::TxnRecycle(TxnRecycle::decode_body(r)?),
        RecType::LogRegisterLegacy => LogBody::LogRegisterLegacy(LogRegisterLegacy::decode_body(r)?),
    })
}

/// A fully decoded record: envelope plus body, as produced by reading
/// one entry from the log.
#[derive(Debug, Clone)]
pub struct Registry;

impl Registry {
    /// Decodes a whole record (envelope + body) from a raw byte slice.
    pub fn decode(bytes: &[u8]) -> Result<(Envelope, LogBody)> {
        let mut r = ByteReader::new(bytes);
        let env = Envelope::read(&mut r)?;
        let body = decode_body(&env, &mut r)?;
        r.expect_exhausted()?;
        Ok((env, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsn::Lsn;
    use crate::serial::Dbt;

    #[test]
    fn round_trips_a_structural_record() {
        let rec = BamInsDel {
            fileid: 3,
            pgno: 7,
            page_lsn: Lsn::new(1, 10),
            indx: 2,
            opcode: 1,
            key: Dbt::new(b"k".to_vec()),
            data: Dbt::new(b"v".to_vec()),
        };
        let bytes = rec.encode(9, Lsn::new(1, 0)).unwrap();
        let (env, body) = Registry::decode(&bytes).unwrap();
        assert_eq!(env.txn_num, 9);
        match body {
            LogBody::BamInsDel(r) => {
                assert_eq!(r.pgno, 7);
                assert_eq!(r.key, Dbt::new(b"k".to_vec()));
            }
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn round_trips_a_txn_record() {
        let rec = TxnCkp { ckp_lsn: Lsn::new(2, 0), last_ckp: Lsn::new(1, 500), timestamp: 42 };
        let bytes = rec.encode(0, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::TxnCkp(r) => assert_eq!(r.timestamp, 42),
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn legacy_log_register_record_still_decodes() {
        let rec = LogRegisterLegacy { fileid: 4, name: Dbt::new(b"old.db".to_vec()), uid: Dbt::new(vec![0u8; 20]) };
        let bytes = rec.encode(0, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::LogRegisterLegacy(r) => assert_eq!(r.fileid, 4),
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn fileid_is_none_for_txn_records() {
        let rec = TxnRegop { opcode: TXN_OPCODE_COMMIT, timestamp: 1 };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        assert_eq!(body.fileid(), None);
    }

    #[test]
    fn bam_root_round_trips_meta_and_root_pgno() {
        let rec = BamRoot { fileid: 2, meta_pgno: 1, root_pgno: 9, meta_lsn: Lsn::new(1, 50) };
        let bytes = rec.encode(3, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::BamRoot(r) => {
                assert_eq!(r.meta_pgno, 1);
                assert_eq!(r.root_pgno, 9);
            }
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn db_addrem_carries_opcode_for_undo_to_complement() {
        let rec = DbAddRem {
            opcode: 1,
            fileid: 4,
            pgno: 6,
            indx: 0,
            nbytes: 2,
            hdr: Dbt::new(vec![]),
            data: Dbt::new(b"hi".to_vec()),
            page_lsn: Lsn::new(1, 20),
        };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::DbAddRem(r) => assert_eq!(r.opcode, 1),
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn db_ovref_carries_preimage_lsn_for_undo() {
        let rec = DbOvRef { fileid: 5, pgno: 8, adjust: 1, lsn: Lsn::new(2, 30) };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::DbOvRef(r) => assert_eq!(r.lsn, Lsn::new(2, 30)),
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn ham_groupalloc_is_distinct_from_ham_metagroup() {
        let rec = HamGroupalloc { fileid: 6, meta_lsn: Lsn::new(1, 1), start_pgno: 10, num: 4, free: 9 };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::HamGroupalloc(r) => {
                assert_eq!(r.start_pgno, 10);
                assert_eq!(r.num, 4);
            }
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }

    #[test]
    fn qam_delete_has_no_fileid_since_it_is_named_only() {
        let rec = QamDelete { name: Dbt::new(b"queue.002".to_vec()), lsn: Lsn::new(1, 5) };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        assert_eq!(body.fileid(), None);
    }

    #[test]
    fn crdel_metapage_round_trips_page_image() {
        let rec = CrdelMetapage { fileid: 7, name: Dbt::new(b"new.db".to_vec()), pgno: 0, page: Dbt::new(vec![1, 2, 3]) };
        let bytes = rec.encode(1, Lsn::ZERO).unwrap();
        let (_, body) = Registry::decode(&bytes).unwrap();
        match body {
            LogBody::CrdelMetapage(r) => assert_eq!(r.page, Dbt::new(vec![1, 2, 3])),
            other => panic!("wrong variant decoded: {:?}", other),
        }
    }
}
