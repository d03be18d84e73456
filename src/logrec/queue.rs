//! Queue access-method structural records, grounded on `qam_auto.c`.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::page::{Pgno, Recno};
use crate::serial::Dbt;

log_record!(
    /// The queue's first-record pointer advanced past consumed slots.
    QamIncFirst,
    RecType::QamIncFirst,
    { fileid: i32, meta_lsn: Lsn, recno: Recno }
);

log_record!(
    /// A queue extent page was moved/reused; `old_first`/`new_first`
    /// bracket the move for UNDO.
    QamMvptr,
    RecType::QamMvptr,
    { fileid: i32, meta_lsn: Lsn, old_first: Recno, new_first: Recno, old_cur: Recno, new_cur: Recno }
);

log_record!(
    /// A fixed-length record slot was deleted (marked free).
    QamDel,
    RecType::QamDel,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, recno: Recno }
);

log_record!(
    /// A fixed-length record slot was written.
    QamAdd,
    RecType::QamAdd,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn, indx: u32, data: Dbt, recno: Recno, olditem: Dbt }
);

log_record!(
    /// The queue's record count incremented, independent of the
    /// first-record pointer `QamIncFirst` tracks.
    QamInc,
    RecType::QamInc,
    { fileid: i32, lsn: Lsn }
);

log_record!(
    /// A queue extent file was deleted. Not scoped to an open
    /// `fileid`: the extent is identified by name alone, since by the
    /// time this record is written the file may already be closed.
    QamDelete,
    RecType::QamDelete,
    { name: Dbt, lsn: Lsn }
);

log_record!(
    /// A queue extent file was renamed, identified by name rather than
    /// `fileid` for the same reason as `QamDelete`.
    QamRename,
    RecType::QamRename,
    { name: Dbt, newname: Dbt }
);

log_record!(
    /// A record slot in an extent was deleted and its bytes captured
    /// for UNDO, distinct from `QamDel`'s in-place tombstone toggle.
    QamDelext,
    RecType::QamDelext,
    { fileid: i32, lsn: Lsn, pgno: Pgno, indx: u32, recno: Recno, data: Dbt }
);
