//! Queue extent-file lifecycle REDO/UNDO, grounded on `qam_rec.c`.
//! Extent files are identified by name rather than `fileid`/`fileuid`
//! on the wire, since the queue access method opens and closes them
//! internally without a `dbreg_register` of their own.

use crate::error::Result;
use crate::fileid::FileIdRegistry;
use crate::logrec::queue::{QamDelete, QamRename};

pub fn redo_delete(fileids: &FileIdRegistry, r: &QamDelete) -> Result<()> {
    let name = String::from_utf8_lossy(&r.name.0).into_owned();
    if let Some(id) = fileids.id_of_name(&name) {
        fileids.unregister(id);
    }
    Ok(())
}

/// Recreating a deleted extent from this record alone is not possible
/// without its `fileuid`, which `qam_delete` does not carry; a missing
/// extent is left absent, matching queue recovery's treatment of gaps
/// in the extent sequence as already-consumed.
pub fn undo_delete(_fileids: &FileIdRegistry, _r: &QamDelete) -> Result<()> {
    Ok(())
}

pub fn redo_rename(fileids: &FileIdRegistry, r: &QamRename) -> Result<()> {
    let newname = String::from_utf8_lossy(&r.newname.0).into_owned();
    let name = String::from_utf8_lossy(&r.name.0).into_owned();
    if let Some(id) = fileids.id_of_name(&name) {
        let _ = fileids.rename(id, &newname);
    }
    Ok(())
}

pub fn undo_rename(fileids: &FileIdRegistry, r: &QamRename) -> Result<()> {
    let newname = String::from_utf8_lossy(&r.newname.0).into_owned();
    let name = String::from_utf8_lossy(&r.name.0).into_owned();
    if let Some(id) = fileids.id_of_name(&newname) {
        let _ = fileids.rename(id, &name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileid::FILE_ID_LEN;
    use crate::serial::Dbt;

    #[test]
    fn redo_delete_removes_matching_name() {
        let reg = FileIdRegistry::new();
        let id = reg.register([1u8; FILE_ID_LEN], "queue.002", None);
        let r = QamDelete { name: Dbt::new(b"queue.002".to_vec()), lsn: crate::lsn::Lsn::ZERO };
        redo_delete(&reg, &r).unwrap();
        assert!(!reg.is_registered(id));
    }

    #[test]
    fn redo_rename_updates_matching_name() {
        let reg = FileIdRegistry::new();
        let id = reg.register([2u8; FILE_ID_LEN], "queue.003", None);
        let r = QamRename { name: Dbt::new(b"queue.003".to_vec()), newname: Dbt::new(b"queue.004".to_vec()) };
        redo_rename(&reg, &r).unwrap();
        assert_eq!(reg.name(id), Some("queue.004".to_string()));
    }

    #[test]
    fn undo_rename_reverses_the_name_change() {
        let reg = FileIdRegistry::new();
        let id = reg.register([3u8; FILE_ID_LEN], "queue.004", None);
        let r = QamRename { name: Dbt::new(b"queue.003".to_vec()), newname: Dbt::new(b"queue.004".to_vec()) };
        undo_rename(&reg, &r).unwrap();
        assert_eq!(reg.name(id), Some("queue.003".to_string()));
    }
}
