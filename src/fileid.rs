//! File-id registry (C6): a bidirectional map between a 20-byte
//! file-unique id stamped into a data file's metadata page and the
//! small integer `fileid` that log records reference, plus the open
//! [`PageCache`] handle that `fileid` resolves to during recovery.
//!
//! Grounded on `dbreg_auto.c`'s `dbreg_register` record layout (unique
//! id, fileid, name) and the registry lifecycle implied by
//! `crdel_rename`/`crdel_delete`.

use crate::error::{Result, WalError};
use crate::page::PageCache;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const FILE_ID_LEN: usize = 20;
pub type FileUid = [u8; FILE_ID_LEN];

struct Entry {
    uid: FileUid,
    name: String,
    handle: Option<Arc<dyn PageCache>>,
}

/// Maps small integer `fileid`s used on the wire to open file handles
/// and their on-disk unique ids. A `fileid` is assigned the first time
/// a file is registered in a log record and is stable for the life of
/// the environment (or until the process restarts and recovery
/// re-registers files in the order their `dbreg_register` records
/// appear).
#[derive(Default)]
pub struct FileIdRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<i32, Entry>,
    by_uid: HashMap<FileUid, i32>,
    next_id: i32,
}

impl FileIdRegistry {
    pub fn new() -> Self {
        FileIdRegistry { inner: RwLock::new(Inner { next_id: 1, ..Default::default() }) }
    }

    /// Registers a new file, returning its assigned `fileid`. If the
    /// unique id is already registered, returns the existing id
    /// instead (idempotent, matching `dbreg_register`'s replay
    /// behavior during recovery).
    pub fn register(&self, uid: FileUid, name: &str, handle: Option<Arc<dyn PageCache>>) -> i32 {
        let mut inner = self.inner.write().unwrap();
        if let Some(&id) = inner.by_uid.get(&uid) {
            return id;
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.by_uid.insert(uid, id);
        inner.by_id.insert(id, Entry { uid, name: name.to_string(), handle });
        id
    }

    /// Registers a file at a caller-chosen id, used by recovery to
    /// replay `dbreg_register` records at the id they originally held.
    pub fn register_at(&self, id: i32, uid: FileUid, name: &str, handle: Option<Arc<dyn PageCache>>) {
        let mut inner = self.inner.write().unwrap();
        inner.by_uid.insert(uid, id);
        inner.by_id.insert(id, Entry { uid, name: name.to_string(), handle });
        if id >= inner.next_id {
            inner.next_id = id + 1;
        }
    }

    pub fn unregister(&self, id: i32) {
        let mut inner = self.inner.write().unwrap();
        if let Some(entry) = inner.by_id.remove(&id) {
            inner.by_uid.remove(&entry.uid);
        }
    }

    pub fn rename(&self, id: i32, new_name: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .by_id
            .get_mut(&id)
            .ok_or_else(|| WalError::not_found(format!("fileid {} not registered", id)))?;
        entry.name = new_name.to_string();
        Ok(())
    }

    pub fn handle(&self, id: i32) -> Option<Arc<dyn PageCache>> {
        self.inner.read().unwrap().by_id.get(&id).and_then(|e| e.handle.clone())
    }

    pub fn name(&self, id: i32) -> Option<String> {
        self.inner.read().unwrap().by_id.get(&id).map(|e| e.name.clone())
    }

    pub fn uid_of(&self, id: i32) -> Option<FileUid> {
        self.inner.read().unwrap().by_id.get(&id).map(|e| e.uid)
    }

    pub fn id_of_uid(&self, uid: &FileUid) -> Option<i32> {
        self.inner.read().unwrap().by_uid.get(uid).copied()
    }

    /// Looks up a registered file by name. Used by record types that
    /// identify their target by name alone rather than by `fileuid`
    /// (queue extent files are opened/closed by the access method
    /// without a `dbreg_register` record of their own).
    pub fn id_of_name(&self, name: &str) -> Option<i32> {
        let inner = self.inner.read().unwrap();
        inner.by_id.iter().find(|(_, e)| e.name == name).map(|(&id, _)| id)
    }

    pub fn is_registered(&self, id: i32) -> bool {
        self.inner.read().unwrap().by_id.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(b: u8) -> FileUid {
        [b; FILE_ID_LEN]
    }

    #[test]
    fn register_assigns_increasing_ids() {
        let reg = FileIdRegistry::new();
        let a = reg.register(uid(1), "a.db", None);
        let b = reg.register(uid(2), "b.db", None);
        assert_ne!(a, b);
    }

    #[test]
    fn register_is_idempotent_on_uid() {
        let reg = FileIdRegistry::new();
        let a = reg.register(uid(9), "a.db", None);
        let a2 = reg.register(uid(9), "a.db", None);
        assert_eq!(a, a2);
    }

    #[test]
    fn register_at_replays_original_id_and_advances_counter() {
        let reg = FileIdRegistry::new();
        reg.register_at(5, uid(3), "c.db", None);
        assert_eq!(reg.id_of_uid(&uid(3)), Some(5));
        let next = reg.register(uid(4), "d.db", None);
        assert_eq!(next, 6);
    }

    #[test]
    fn rename_updates_name_not_id() {
        let reg = FileIdRegistry::new();
        let id = reg.register(uid(1), "old.db", None);
        reg.rename(id, "new.db").unwrap();
        assert_eq!(reg.name(id), Some("new.db".to_string()));
        assert_eq!(reg.id_of_uid(&uid(1)), Some(id));
    }

    #[test]
    fn unregister_removes_both_directions() {
        let reg = FileIdRegistry::new();
        let id = reg.register(uid(1), "a.db", None);
        reg.unregister(id);
        assert!(!reg.is_registered(id));
        assert_eq!(reg.id_of_uid(&uid(1)), None);
    }

    #[test]
    fn rename_unknown_id_errors() {
        let reg = FileIdRegistry::new();
        assert!(reg.rename(42, "x").is_err());
    }
}
