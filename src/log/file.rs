//! Raw log file I/O: fixed-name files (`log.0000000001`, ...), each
//! starting with a small header, holding a sequence of
//! length-prefixed records. Generalizes `granite::wal`'s
//! `write_records`/`write_records_with_sync` (which frame a bincode'd
//! row record behind a `u32` length) to framing arbitrary bytes.

use crate::error::Result;
use crate::lsn::Lsn;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const MAGIC: u32 = 0x4152_4945; // "ARIE"
pub const HEADER_LEN: u32 = 16;
const LEN_PREFIX: usize = 4;

/// Current on-disk log file format version, stamped into each file's
/// header at bytes [4..8). Bumped whenever the record/envelope wire
/// format changes in a way that breaks older readers.
pub const VERSION: u32 = 1;
/// Oldest version this build can still read (but not write). Equal to
/// [`VERSION`] until a second format version actually ships.
pub const MIN_READABLE_VERSION: u32 = 1;

/// Result of validating a log file's header, mirroring `__log_valid`'s
/// NORMAL/OLD_READABLE/OLD_UNREADABLE/INCOMPLETE/NONEXISTENT states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileState {
    /// Current magic and version.
    Normal,
    /// Current magic, an older but still-decodable version.
    OldReadable,
    /// Current magic, a version predating [`MIN_READABLE_VERSION`].
    OldUnreadable,
    /// File exists but is shorter than a full header — a crash landed
    /// between creating the file and finishing the header write.
    Incomplete,
    /// No file at all with this number.
    Nonexistent,
}

pub fn path_for(dir: &Path, file_num: u32) -> PathBuf {
    dir.join(format!("log.{:010}", file_num))
}

fn write_header(f: &mut File) -> Result<()> {
    let mut hdr = vec![0u8; HEADER_LEN as usize];
    hdr[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    hdr[4..8].copy_from_slice(&VERSION.to_le_bytes());
    f.write_all(&hdr)?;
    Ok(())
}

/// Checks file `file_num`'s header without affecting the read/write
/// cursor any other function uses — opens its own handle.
pub fn validate_header(dir: &Path, file_num: u32) -> Result<LogFileState> {
    let path = path_for(dir, file_num);
    if !path.exists() {
        return Ok(LogFileState::Nonexistent);
    }
    let mut f = File::open(&path)?;
    let mut hdr = vec![0u8; HEADER_LEN as usize];
    if f.read_exact(&mut hdr).is_err() {
        return Ok(LogFileState::Incomplete);
    }
    let magic = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
    if magic != MAGIC {
        return Ok(LogFileState::Incomplete);
    }
    let version = u32::from_le_bytes(hdr[4..8].try_into().unwrap());
    Ok(if version == VERSION {
        LogFileState::Normal
    } else if (MIN_READABLE_VERSION..VERSION).contains(&version) {
        LogFileState::OldReadable
    } else {
        LogFileState::OldUnreadable
    })
}

fn open_for_write(dir: &Path, file_num: u32) -> Result<File> {
    let path = path_for(dir, file_num);
    let is_new = !path.exists();
    let mut f = OpenOptions::new().create(true).read(true).write(true).open(&path)?;
    if is_new {
        write_header(&mut f)?;
    }
    Ok(f)
}

/// Writes `bytes` at `lsn.offset` in file `lsn.file`, creating the
/// file (and header) if this is the first write to it.
pub fn write_at(dir: &Path, lsn: Lsn, bytes: &[u8]) -> Result<()> {
    let mut f = open_for_write(dir, lsn.file)?;
    f.seek(SeekFrom::Start(lsn.offset as u64))?;
    f.write_all(&(bytes.len() as u32).to_le_bytes())?;
    f.write_all(bytes)?;
    Ok(())
}

/// Fsyncs every currently-open log file's data. The worker batches
/// writes before calling this once per flush, so a burst of `put`s
/// costs one `fsync`, not one per record — the same trade the teacher
/// makes in `granite::wal`'s group commit.
pub fn sync_all(dir: &Path) -> Result<()> {
    for num in list_file_numbers(dir)? {
        if let Ok(f) = File::open(path_for(dir, num)) {
            f.sync_data()?;
        }
    }
    Ok(())
}

pub fn list_file_numbers(dir: &Path) -> Result<Vec<u32>> {
    let mut nums = Vec::new();
    if !dir.exists() {
        return Ok(nums);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(rest) = name.strip_prefix("log.") {
            if let Ok(n) = rest.parse::<u32>() {
                nums.push(n);
            }
        }
    }
    nums.sort_unstable();
    Ok(nums)
}

/// Scans the highest-numbered log file to find where the last valid
/// record ends, so a freshly opened log manager can resume appending
/// right after it. Returns `(1, 0)` if no log files exist yet.
pub fn tail_position(dir: &Path) -> Result<(u32, u32)> {
    let nums = list_file_numbers(dir)?;
    let last = match nums.last() {
        Some(&n) => n,
        None => return Ok((1, 0)),
    };
    let mut f = File::open(path_for(dir, last))?;
    let mut offset = HEADER_LEN;
    loop {
        f.seek(SeekFrom::Start(offset as u64))?;
        let mut len_buf = [0u8; LEN_PREFIX];
        match f.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(_) => break,
        }
        let len = u32::from_le_bytes(len_buf);
        let body_start = offset + LEN_PREFIX as u32;
        if read_exact_len(&mut f, len).is_err() {
            break;
        }
        offset = body_start + len;
    }
    Ok((last, offset))
}

fn read_exact_len(f: &mut File, len: u32) -> std::io::Result<()> {
    let mut buf = vec![0u8; len as usize];
    f.read_exact(&mut buf)
}

/// Reads the record starting at byte `offset` in file `file_num`.
pub fn read_at(dir: &Path, file_num: u32, offset: u32) -> Result<Vec<u8>> {
    let mut f = File::open(path_for(dir, file_num))?;
    f.seek(SeekFrom::Start(offset as u64))?;
    let mut len_buf = [0u8; LEN_PREFIX];
    f.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf);
    let mut buf = vec![0u8; len as usize];
    f.read_exact(&mut buf)?;
    Ok(buf)
}

/// Returns the offset of the record immediately following the one at
/// `offset`, or `None` if `offset` was the last record in the file.
pub fn next_offset(dir: &Path, file_num: u32, offset: u32) -> Result<Option<u32>> {
    let mut f = File::open(path_for(dir, file_num))?;
    f.seek(SeekFrom::Start(offset as u64))?;
    let mut len_buf = [0u8; LEN_PREFIX];
    if f.read_exact(&mut len_buf).is_err() {
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_buf);
    let candidate = offset + LEN_PREFIX as u32 + len;
    f.seek(SeekFrom::Start(candidate as u64))?;
    let mut probe = [0u8; LEN_PREFIX];
    if f.read_exact(&mut probe).is_err() {
        return Ok(None);
    }
    Ok(Some(candidate))
}

/// Builds the ordered list of record start offsets in a file, used to
/// support backward iteration without a reverse index on disk.
pub fn record_offsets(dir: &Path, file_num: u32) -> Result<Vec<u32>> {
    let mut offsets = Vec::new();
    let mut offset = HEADER_LEN;
    while let Ok(bytes) = read_at(dir, file_num, offset) {
        offsets.push(offset);
        offset = offset + LEN_PREFIX as u32 + bytes.len() as u32;
    }
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_header_reports_nonexistent_for_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(validate_header(tmp.path(), 1).unwrap(), LogFileState::Nonexistent);
    }

    #[test]
    fn validate_header_reports_normal_for_a_freshly_written_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(tmp.path(), Lsn::new(1, HEADER_LEN), b"x").unwrap();
        assert_eq!(validate_header(tmp.path(), 1).unwrap(), LogFileState::Normal);
    }

    #[test]
    fn validate_header_reports_incomplete_for_a_truncated_header() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(path_for(tmp.path(), 1), [0u8; 4]).unwrap();
        assert_eq!(validate_header(tmp.path(), 1).unwrap(), LogFileState::Incomplete);
    }

    #[test]
    fn validate_header_reports_old_unreadable_below_the_floor() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(tmp.path(), Lsn::new(1, HEADER_LEN), b"x").unwrap();
        let path = path_for(tmp.path(), 1);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(validate_header(tmp.path(), 1).unwrap(), LogFileState::OldUnreadable);
    }

    #[test]
    fn tail_position_starts_after_header_for_fresh_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(tail_position(tmp.path()).unwrap(), (1, 0));
    }

    #[test]
    fn tail_position_resumes_after_last_record() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(tmp.path(), Lsn::new(1, HEADER_LEN), b"abc").unwrap();
        let (file, offset) = tail_position(tmp.path()).unwrap();
        assert_eq!(file, 1);
        assert_eq!(offset, HEADER_LEN + 4 + 3);
    }

    #[test]
    fn record_offsets_lists_every_record_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_at(tmp.path(), Lsn::new(1, HEADER_LEN), b"aa").unwrap();
        let off2 = HEADER_LEN + 4 + 2;
        write_at(tmp.path(), Lsn::new(1, off2), b"bbb").unwrap();
        let offsets = record_offsets(tmp.path(), 1).unwrap();
        assert_eq!(offsets, vec![HEADER_LEN, off2]);
    }
}
