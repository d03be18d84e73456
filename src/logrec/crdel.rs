//! File create/delete records, grounded on `crdel_auto.c` and
//! `crdel_rec.c`.
use super::envelope::RecType;
use super::macros::log_record;
use crate::lsn::Lsn;
use crate::page::Pgno;
use crate::serial::Dbt;

log_record!(
    /// A metadata sub-database page was allocated as part of creating
    /// a new database within a file.
    CrdelMetaSub,
    RecType::CrdelMetaSub,
    { fileid: i32, meta_pgno: Pgno, page_lsn: Lsn, ptype: u32 }
);

log_record!(
    /// A data file was created and opened. REDO ensures the file
    /// exists (the create committed); UNDO removes it only if it is
    /// still empty/unwritten, per `__crdel_fileopen_recover`.
    CrdelFileOpen,
    RecType::CrdelFileOpen,
    { name: Dbt, fileid: i32 }
);

log_record!(
    /// A file or sub-database was renamed.
    CrdelRename,
    RecType::CrdelRename,
    { fileid: i32, oldname: Dbt, newname: Dbt, fileuid: Dbt }
);

log_record!(
    /// A file or sub-database was deleted.
    CrdelDelete,
    RecType::CrdelDelete,
    { fileid: i32, name: Dbt, fileuid: Dbt }
);

log_record!(
    /// A whole metadata page image was written while creating a new
    /// database file, distinct from `CrdelMetaSub`'s sub-database
    /// allocation within an already-open file.
    CrdelMetapage,
    RecType::CrdelMetapage,
    { fileid: i32, name: Dbt, pgno: Pgno, page: Dbt }
);
