//! Btree access-method structural records. Grounded on
//! `btree_auto.c`'s `__bam_*_log` functions — field names and the
//! envelope-then-fileid-then-payload layout follow that file; exact
//! byte-for-byte BDB wire compatibility is not a goal, only the same
//! shape and REDO/UNDO semantics.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::page::Pgno;
use crate::serial::Dbt;

log_record!(
    /// A new btree leaf/internal page was allocated off the free list
    /// or by extending the file.
    BamPgAlloc,
    RecType::BamPgAlloc,
    { fileid: i32, meta_lsn: Lsn, page_lsn: Lsn, pgno: Pgno, ptype: u32, next: Pgno }
);

log_record!(
    /// A page was returned to the free list.
    BamPgFree,
    RecType::BamPgFree,
    { fileid: i32, meta_lsn: Lsn, pgno: Pgno, header: Dbt, next: Pgno }
);

log_record!(
    /// A page split: `npage` is the newly allocated right sibling.
    /// `root_pgno` is set when the split produced a new root, so UNDO
    /// knows to also reverse that promotion; `opflags` carries the
    /// split-is-a-root-split and similar bits `__bam_split_recover`
    /// switches on.
    BamSplit,
    RecType::BamSplit,
    { fileid: i32, left: Pgno, left_lsn: Lsn, right: Pgno, right_lsn: Lsn, indx: u32, npage: Pgno, npage_lsn: Lsn, root_pgno: Pgno, pg_image: Dbt, opflags: u32 }
);

log_record!(
    /// A reverse split: the tree shrank back down, folding `pgno`'s
    /// contents into its root entry.
    BamRsplit,
    RecType::BamRsplit,
    { fileid: i32, pgno: Pgno, pgdbt: Dbt, root_pgno: Pgno, nrec: u32, rootent: Dbt, rootlsn: Lsn }
);

log_record!(
    /// A single key/data pair inserted into or deleted from a leaf
    /// page at `indx`. `opcode` distinguishes insert (1) from delete
    /// (2) so UNDO can invert it.
    BamInsDel,
    RecType::BamInsDel,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, opcode: u32, key: Dbt, data: Dbt }
);

log_record!(
    /// An index-entry offset adjustment on a page (internal node entry
    /// shift after a child split/merge).
    BamAdj,
    RecType::BamAdj,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, indx_adj: i32 }
);

log_record!(
    /// A cursor-count or record-count adjustment on a page.
    BamCadjust,
    RecType::BamCadjust,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, adjust: i32, opflags: u32 }
);

log_record!(
    /// A deleted-record marker toggled on a page entry.
    BamCdel,
    RecType::BamCdel,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32 }
);

log_record!(
    /// In-place replacement of an entry's bytes (e.g. a fixed-size
    /// overflow reference update). `isdeleted` marks a tombstone
    /// replacement; `prefix`/`suffix` are the byte counts shared with
    /// the original entry that `repl` does not repeat.
    BamRepl,
    RecType::BamRepl,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, isdeleted: u32, orig: Dbt, repl: Dbt, prefix: u32, suffix: u32 }
);

log_record!(
    /// The tree's root page pointer changed (e.g. after a root split).
    /// `meta_pgno` is the metadata page whose root pointer moved;
    /// `root_pgno` is its new value.
    BamRoot,
    RecType::BamRoot,
    { fileid: i32, meta_pgno: Pgno, root_pgno: Pgno, meta_lsn: Lsn }
);

log_record!(
    /// A cursor stack adjustment following a structural change, so
    /// other open cursors on the same page track the move.
    BamCuradj,
    RecType::BamCuradj,
    { fileid: i32, pgno: Pgno, indx: u32, from_pgno: Pgno, order: u32 }
);

log_record!(
    /// A cursor stack adjustment following a reverse split, keyed by
    /// record number rather than by page index since the entries that
    /// moved no longer live on the same page.
    BamRcuradj,
    RecType::BamRcuradj,
    { fileid: i32, mode: u32, root: Pgno, recno: u32, order: i32 }
);
