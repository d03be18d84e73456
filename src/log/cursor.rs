//! A cursor over the log, supporting the `DB_FIRST`/`DB_LAST`/
//! `DB_NEXT`/`DB_PREV`/`DB_SET` access patterns recovery's three
//! passes drive (`get(..., DB_NEXT)` forward, `get(..., DB_PREV)`
//! backward, per `env_recover.c`).

use super::file;
use crate::error::{Result, WalError};
use crate::lsn::Lsn;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

pub struct LogCursor {
    dir: PathBuf,
    lsn: Lsn,
}

impl LogCursor {
    pub fn open_first(dir: &Path) -> Result<Self> {
        let nums = file::list_file_numbers(dir)?;
        let first_file = *nums.first().ok_or_else(|| WalError::not_found("log is empty"))?;
        let offsets = file::record_offsets(dir, first_file)?;
        let offset = *offsets.first().ok_or_else(|| WalError::not_found("log is empty"))?;
        Ok(LogCursor { dir: dir.to_path_buf(), lsn: Lsn::new(first_file, offset) })
    }

    pub fn open_last(dir: &Path) -> Result<Self> {
        let nums = file::list_file_numbers(dir)?;
        let last_file = *nums.last().ok_or_else(|| WalError::not_found("log is empty"))?;
        let offsets = file::record_offsets(dir, last_file)?;
        let offset = *offsets.last().ok_or_else(|| WalError::not_found("log is empty"))?;
        Ok(LogCursor { dir: dir.to_path_buf(), lsn: Lsn::new(last_file, offset) })
    }

    pub fn open_at(dir: &Path, lsn: Lsn) -> Result<Self> {
        // validate the position is actually a record start.
        file::read_at(dir, lsn.file, lsn.offset)?;
        Ok(LogCursor { dir: dir.to_path_buf(), lsn })
    }

    pub fn lsn(&self) -> Lsn {
        self.lsn
    }

    pub fn current(&self) -> Result<Vec<u8>> {
        file::read_at(&self.dir, self.lsn.file, self.lsn.offset)
    }

    /// Advances to the next record, rolling into the next file when
    /// the current one is exhausted. Returns `Ok(false)` at end of log.
    pub fn next(&mut self) -> Result<bool> {
        match file::next_offset(&self.dir, self.lsn.file, self.lsn.offset)? {
            Some(offset) => {
                self.lsn = Lsn::new(self.lsn.file, offset);
                Ok(true)
            }
            None => {
                let nums = file::list_file_numbers(&self.dir)?;
                match nums.iter().find(|&&n| n > self.lsn.file) {
                    Some(&next_file) => {
                        let offsets = file::record_offsets(&self.dir, next_file)?;
                        match offsets.first() {
                            Some(&offset) => {
                                self.lsn = Lsn::new(next_file, offset);
                                Ok(true)
                            }
                            None => Ok(false),
                        }
                    }
                    None => Ok(false),
                }
            }
        }
    }

    /// Moves to the previous record, rolling into the previous file
    /// when the current one has no earlier record. Returns `Ok(false)`
    /// at the start of the log.
    pub fn prev(&mut self) -> Result<bool> {
        let offsets = file::record_offsets(&self.dir, self.lsn.file)?;
        match offsets.iter().rposition(|&o| o < self.lsn.offset) {
            Some(idx) => {
                self.lsn = Lsn::new(self.lsn.file, offsets[idx]);
                Ok(true)
            }
            None => {
                let nums = file::list_file_numbers(&self.dir)?;
                match nums.iter().rev().find(|&&n| n < self.lsn.file) {
                    Some(&prev_file) => {
                        let offsets = file::record_offsets(&self.dir, prev_file)?;
                        match offsets.last() {
                            Some(&offset) => {
                                self.lsn = Lsn::new(prev_file, offset);
                                Ok(true)
                            }
                            None => Ok(false),
                        }
                    }
                    None => Ok(false),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::file::{write_at, HEADER_LEN};

    #[test]
    fn forward_and_backward_traversal_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let mut offset = HEADER_LEN;
        let mut lsns = Vec::new();
        for i in 0..5u8 {
            write_at(tmp.path(), Lsn::new(1, offset), &[i; 3]).unwrap();
            lsns.push(Lsn::new(1, offset));
            offset += 4 + 3;
        }

        let mut cur = LogCursor::open_first(tmp.path()).unwrap();
        let mut forward = vec![cur.lsn()];
        while cur.next().unwrap() {
            forward.push(cur.lsn());
        }
        assert_eq!(forward, lsns);

        let mut cur = LogCursor::open_last(tmp.path()).unwrap();
        let mut backward = vec![cur.lsn()];
        while cur.prev().unwrap() {
            backward.push(cur.lsn());
        }
        backward.reverse();
        assert_eq!(backward, lsns);
    }
}
