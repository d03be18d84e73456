//! Shared REDO/UNDO guards. The canonical ARIES rule: a page's LSN
//! stamp tells you whether a change already made it to disk, so REDO
//! and UNDO only act when the page is in the state the record expects.

use crate::lsn::Lsn;
use crate::page::Page;

/// True if `page` predates `rec_lsn`, meaning the change this record
/// describes is not yet reflected on the page and REDO should apply it.
pub fn needs_redo(page: &Page, rec_lsn: Lsn) -> bool {
    page.lsn() < rec_lsn
}

/// True if `page` is stamped with exactly `rec_lsn`, meaning this
/// record's change did make it to disk and UNDO should revert it.
pub fn needs_undo(page: &Page, rec_lsn: Lsn) -> bool {
    page.lsn() == rec_lsn
}
