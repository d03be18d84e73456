//! REDO/UNDO for the btree/hash/queue/generic structural record
//! types. The actual page layout these records describe belongs to
//! an access method, which is out of scope for this crate (spec's
//! `PageCache` is a named interface only) — what we can do here,
//! without assuming any particular layout, is the part recovery
//! itself owns: decide via LSN comparison whether a change needs
//! applying, and hand whole before/after images through `PageCache`
//! for the record types that carry one (splits, page copies). For
//! records describing a partial, AM-specific edit (insert/delete at
//! an index, in-place replace) we advance or rewind the page's LSN
//! stamp only; splicing the actual bytes is the access method's job
//! once it receives the decoded record.

use super::common::{needs_redo, needs_undo};
use crate::error::Result;
use crate::fileid::FileIdRegistry;
use crate::logrec::LogBody;
use crate::lsn::Lsn;
use crate::page::{Page, Pgno};
use log::warn;
use std::sync::Arc;

fn cache(fileids: &FileIdRegistry, fileid: i32) -> Option<Arc<dyn crate::page::PageCache>> {
    match fileids.handle(fileid) {
        Some(h) => Some(h),
        None => {
            warn!("no page cache registered for fileid {}, skipping structural record", fileid);
            None
        }
    }
}

fn stamp(cache: &Arc<dyn crate::page::PageCache>, fileid: i32, pgno: Pgno, lsn: Lsn) -> Result<()> {
    let mut page = cache.fetch(fileid, pgno)?;
    page.set_lsn(lsn);
    cache.put(fileid, &page)
}

fn apply_image(cache: &Arc<dyn crate::page::PageCache>, fileid: i32, pgno: Pgno, lsn: Lsn, image: &[u8]) -> Result<()> {
    let mut page = Page::new(pgno, image.to_vec());
    page.set_lsn(lsn);
    cache.put(fileid, &page)
}

macro_rules! redo_stamp_if_needed {
    ($cache:expr, $fileid:expr, $pgno:expr, $rec_lsn:expr) => {{
        let page = $cache.fetch($fileid, $pgno)?;
        if needs_redo(&page, $rec_lsn) {
            stamp(&$cache, $fileid, $pgno, $rec_lsn)?;
        }
    }};
}

macro_rules! undo_stamp_if_needed {
    ($cache:expr, $fileid:expr, $pgno:expr, $rec_lsn:expr, $prior_lsn:expr) => {{
        let page = $cache.fetch($fileid, $pgno)?;
        if needs_undo(&page, $rec_lsn) {
            stamp(&$cache, $fileid, $pgno, $prior_lsn)?;
        }
    }};
}

/// REDO for `ham_groupalloc`: the `num` pages starting at `start_pgno`
/// were carved out of the free list in one extend, mirroring
/// `BamPgAlloc`'s single-page version of the same allocate-or-stamp
/// check.
fn redo_groupalloc(c: &Arc<dyn crate::page::PageCache>, fileid: i32, start_pgno: Pgno, num: u32, lsn: Lsn) -> Result<()> {
    for pgno in start_pgno..start_pgno + num {
        let page = match c.fetch(fileid, pgno) {
            Ok(p) => p,
            Err(_) => c.allocate(fileid, pgno)?,
        };
        if needs_redo(&page, lsn) {
            stamp(c, fileid, pgno, lsn)?;
        }
    }
    Ok(())
}

/// UNDO for `ham_groupalloc`: mark the whole group free again.
fn undo_groupalloc(c: &Arc<dyn crate::page::PageCache>, fileid: i32, start_pgno: Pgno, num: u32, lsn: Lsn) -> Result<()> {
    for pgno in start_pgno..start_pgno + num {
        let page = c.fetch(fileid, pgno)?;
        if needs_undo(&page, lsn) {
            c.free(fileid, pgno)?;
        }
    }
    Ok(())
}

pub fn apply_redo(fileids: &FileIdRegistry, lsn: Lsn, body: &LogBody) -> Result<()> {
    let fileid = match body.fileid() {
        Some(f) => f,
        None => return Ok(()),
    };
    let c = match cache(fileids, fileid) {
        Some(c) => c,
        None => return Ok(()),
    };
    match body {
        LogBody::BamPgAlloc(r) => {
            let page = match c.fetch(fileid, r.pgno) {
                Ok(p) => p,
                Err(_) => c.allocate(fileid, r.pgno)?,
            };
            if needs_redo(&page, lsn) {
                stamp(&c, fileid, r.pgno, lsn)?;
            }
        }
        LogBody::BamPgFree(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamSplit(r) => {
            apply_image(&c, fileid, r.npage, lsn, &r.pg_image.0)?;
            redo_stamp_if_needed!(c, fileid, r.left, lsn);
        }
        LogBody::BamInsDel(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamAdj(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamCadjust(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamCdel(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamRepl(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::BamRoot(r) => redo_stamp_if_needed!(c, fileid, r.meta_pgno, lsn),
        LogBody::BamCuradj(_) => {}
        LogBody::BamRsplit(r) => {
            apply_image(&c, fileid, r.pgno, lsn, &r.pgdbt.0)?;
            redo_stamp_if_needed!(c, fileid, r.root_pgno, lsn);
        }
        LogBody::BamRcuradj(_) => {}
        LogBody::HamInsDel(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::HamNewPage(r) => redo_stamp_if_needed!(c, fileid, r.new_pgno, lsn),
        LogBody::HamSplitData(r) => apply_image(&c, fileid, r.pgno, lsn, &r.pageimage.0)?,
        LogBody::HamReplace(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::HamNewPgNo(_) => {}
        LogBody::HamOvfl(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::HamCopyPage(r) => apply_image(&c, fileid, r.pgno, lsn, &r.page.0)?,
        LogBody::HamMetagroup(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::HamGroupalloc(r) => redo_groupalloc(&c, fileid, r.start_pgno, r.num, lsn)?,
        LogBody::HamCuradj(_) => {}
        LogBody::HamChgpg(_) => {}
        LogBody::QamIncFirst(_) => {}
        LogBody::QamMvptr(_) => {}
        LogBody::QamDel(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::QamAdd(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::QamInc(_) => {}
        LogBody::QamDelext(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::DbAddRem(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::DbBig(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::DbOvRef(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::DbRelink(r) => redo_stamp_if_needed!(c, fileid, r.pgno, lsn),
        LogBody::DbDebug(_) => {}
        LogBody::DbNoop(_) => {}
        LogBody::CrdelMetapage(r) => apply_image(&c, fileid, r.pgno, lsn, &r.page.0)?,
        _ => {}
    }
    Ok(())
}

pub fn apply_undo(fileids: &FileIdRegistry, lsn: Lsn, body: &LogBody) -> Result<()> {
    let fileid = match body.fileid() {
        Some(f) => f,
        None => return Ok(()),
    };
    let c = match cache(fileids, fileid) {
        Some(c) => c,
        None => return Ok(()),
    };
    match body {
        LogBody::BamPgAlloc(r) => {
            let page = c.fetch(fileid, r.pgno)?;
            if needs_undo(&page, lsn) {
                c.free(fileid, r.pgno)?;
            }
        }
        LogBody::BamPgFree(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.meta_lsn),
        LogBody::BamSplit(r) => undo_stamp_if_needed!(c, fileid, r.left, lsn, r.left_lsn),
        LogBody::BamInsDel(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::BamAdj(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::BamCadjust(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::BamCdel(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::BamRepl(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::BamRoot(r) => undo_stamp_if_needed!(c, fileid, r.meta_pgno, lsn, r.meta_lsn),
        LogBody::BamCuradj(_) => {}
        LogBody::BamRsplit(r) => undo_stamp_if_needed!(c, fileid, r.root_pgno, lsn, r.rootlsn),
        LogBody::BamRcuradj(_) => {}
        LogBody::HamInsDel(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::HamNewPage(r) => undo_stamp_if_needed!(c, fileid, r.new_pgno, lsn, r.prev_lsn),
        LogBody::HamSplitData(_) => {}
        LogBody::HamReplace(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::HamNewPgNo(_) => {}
        LogBody::HamOvfl(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.pagelsn),
        LogBody::HamCopyPage(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::HamMetagroup(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.pagelsn),
        LogBody::HamGroupalloc(r) => undo_groupalloc(&c, fileid, r.start_pgno, r.num, lsn)?,
        LogBody::HamCuradj(_) => {}
        LogBody::HamChgpg(_) => {}
        LogBody::QamIncFirst(_) => {}
        LogBody::QamMvptr(_) => {}
        LogBody::QamDel(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::QamAdd(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::QamInc(_) => {}
        LogBody::QamDelext(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.lsn),
        LogBody::DbAddRem(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::DbBig(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::DbOvRef(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.lsn),
        LogBody::DbRelink(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::DbDebug(_) => {}
        LogBody::DbNoop(r) => undo_stamp_if_needed!(c, fileid, r.pgno, lsn, r.page_lsn),
        LogBody::CrdelMetapage(_) => {}
        _ => {}
    }
    Ok(())
}
