//! Hash access-method structural records, grounded on `hash_auto.c`.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::page::Pgno;
use crate::serial::Dbt;

log_record!(
    /// A key/data pair inserted into or deleted from a hash bucket
    /// page, mirroring `BamInsDel`'s opcode convention.
    HamInsDel,
    RecType::HamInsDel,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, ndx: u32, opcode: u32, key: Dbt, data: Dbt }
);

log_record!(
    /// A new overflow/bucket page was linked into the hash chain.
    HamNewPage,
    RecType::HamNewPage,
    { fileid: i32, prev_pgno: Pgno, prev_lsn: Lsn, new_pgno: Pgno, new_lsn: Lsn }
);

log_record!(
    /// A bucket was split during a hash table grow, copying data to
    /// the new page image.
    HamSplitData,
    RecType::HamSplitData,
    { fileid: i32, pgno: Pgno, pageimage: Dbt }
);

log_record!(
    /// An item's data portion was replaced in place.
    HamReplace,
    RecType::HamReplace,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, ndx: u32, off: u32, olditem: Dbt, newitem: Dbt, makedup: u32 }
);

log_record!(
    /// The metadata page's next-bucket-to-split pointer advanced.
    HamNewPgNo,
    RecType::HamNewPgNo,
    { fileid: i32, meta_lsn: Lsn, new_pgno: Pgno, old_pgno: Pgno }
);

log_record!(
    /// An overflow page was allocated/linked for an oversized item.
    HamOvfl,
    RecType::HamOvfl,
    { fileid: i32, pgno: Pgno, npages: u32, pagelsn: Lsn }
);

log_record!(
    /// A page image was duplicated wholesale (used when growing a
    /// bucket chain preserves the old page for split recovery).
    HamCopyPage,
    RecType::HamCopyPage,
    { fileid: i32, pgno: Pgno, next_pgno: Pgno, page_lsn: Lsn, page: Dbt }
);

log_record!(
    /// A bucket's doubling group assignment changed: `bucket` moved to
    /// live on page `pgno`, which carries its own pre-image LSN
    /// alongside the metadata page's.
    HamMetagroup,
    RecType::HamMetagroup,
    { fileid: i32, bucket: u32, pgno: Pgno, metalsn: Lsn, pagelsn: Lsn }
);

log_record!(
    /// Bulk page-group allocation for extendible hashing: `num` pages
    /// starting at `start_pgno` were allocated in one extend, with
    /// `free` the prior head of the free list they were carved from.
    HamGroupalloc,
    RecType::HamGroupalloc,
    { fileid: i32, meta_lsn: Lsn, start_pgno: Pgno, num: u32, free: Pgno }
);

log_record!(
    /// A cursor stack adjustment following a hash bucket change, so
    /// other open cursors on the same page track the move.
    HamCuradj,
    RecType::HamCuradj,
    { fileid: i32, pgno: Pgno, indx: u32, len: u32, dup_off: u32, add: i32, is_dup: i32, order: u32 }
);

log_record!(
    /// An item moved from one page to another during a bucket split or
    /// merge, without the full page image `HamCopyPage` carries.
    HamChgpg,
    RecType::HamChgpg,
    { fileid: i32, mode: u32, old_pgno: Pgno, new_pgno: Pgno, old_indx: u32, new_indx: u32 }
);
