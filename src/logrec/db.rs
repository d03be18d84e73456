//! Generic, access-method-independent records shared by every AM,
//! grounded on `db_auto.c`.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::page::Pgno;
use crate::serial::Dbt;

log_record!(
    /// Generic add/remove of a chunk of bytes at an offset within a
    /// page, used for overflow item bodies that don't belong to a
    /// specific AM's structural layout. `opcode` distinguishes add
    /// from remove so UNDO can complement it.
    DbAddRem,
    RecType::DbAddRem,
    { opcode: u32, fileid: i32, pgno: Pgno, indx: u32, nbytes: u32, hdr: Dbt, data: Dbt, page_lsn: Lsn }
);

log_record!(
    /// An overflow item spanning multiple pages: `next_pgno` links the
    /// chain, `dbt` carries this page's slice. `opcode` distinguishes
    /// add from remove so UNDO can complement it.
    DbBig,
    RecType::DbBig,
    { opcode: u32, fileid: i32, pgno: Pgno, prev_pgno: Pgno, next_pgno: Pgno, dbt: Dbt, page_lsn: Lsn, prev_lsn: Lsn, next_lsn: Lsn }
);

log_record!(
    /// An overflow reference count changed (shared overflow items).
    /// `lsn` is the page's pre-image LSN, needed so UNDO can restore
    /// the prior refcount by negating `adjust`.
    DbOvRef,
    RecType::DbOvRef,
    { fileid: i32, pgno: Pgno, adjust: i32, lsn: Lsn }
);

log_record!(
    /// A free-list/overflow chain link was rewritten. `opcode`
    /// distinguishes link from unlink so UNDO can complement it.
    DbRelink,
    RecType::DbRelink,
    { opcode: u32, fileid: i32, pgno: Pgno, page_lsn: Lsn, prev_pgno: Pgno, prev_lsn: Lsn, next_pgno: Pgno, next_lsn: Lsn }
);

log_record!(
    /// Diagnostic marker record: carries free-form text, never
    /// mutates page state. REDO/UNDO are both no-ops that only print
    /// when tracing is requested.
    DbDebug,
    RecType::DbDebug,
    { fileid: i32, op: Dbt }
);

log_record!(
    /// Padding/placeholder record with no recovery effect, used to
    /// reserve log space or mark a position without side effects.
    DbNoop,
    RecType::DbNoop,
    { fileid: i32, pgno: Pgno, page_lsn: Lsn }
);
