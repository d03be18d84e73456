//! Wire-level primitives shared by every log record type: a growable
//! byte writer/reader pair and the length-prefixed blob (`Dbt`).
//!
//! Every record is encoded as a flat byte string whose length is
//! entirely determined by summing its fields' encoded sizes up front;
//! `ByteWriter::finish` asserts the bytes actually written match that
//! precomputed size, mirroring BDB's `DB_ASSERT((bp - data) == size)`
//! check in `__bam_pg_alloc_log` and friends.

use crate::error::{Result, WalError};
use crate::lsn::Lsn;
use std::convert::TryInto;

/// A length-prefixed opaque byte blob, BDB's `DBT` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dbt(pub Vec<u8>);

impl Dbt {
    pub fn new(bytes: Vec<u8>) -> Self {
        Dbt(bytes)
    }

    pub fn encoded_len(&self) -> usize {
        4 + self.0.len()
    }
}

impl From<Vec<u8>> for Dbt {
    fn from(v: Vec<u8>) -> Self {
        Dbt(v)
    }
}

impl From<&[u8]> for Dbt {
    fn from(v: &[u8]) -> Self {
        Dbt(v.to_vec())
    }
}

pub struct ByteWriter {
    buf: Vec<u8>,
    expected_len: usize,
}

impl ByteWriter {
    pub fn with_capacity(expected_len: usize) -> Self {
        ByteWriter { buf: Vec::with_capacity(expected_len), expected_len }
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_lsn(&mut self, v: Lsn) {
        self.put_u32(v.file);
        self.put_u32(v.offset);
    }

    pub fn put_dbt(&mut self, v: &Dbt) {
        self.put_u32(v.0.len() as u32);
        self.buf.extend_from_slice(&v.0);
    }

    /// Consumes the writer, asserting the number of bytes actually
    /// written equals the length declared at construction time.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.buf.len() != self.expected_len {
            return Err(WalError::Internal(format!(
                "log record size mismatch: wrote {} bytes, expected {}",
                self.buf.len(),
                self.expected_len
            )));
        }
        Ok(self.buf)
    }
}

/// A single field of a log record body, writable/readable in terms of
/// the primitives above. Implemented for every scalar and blob type a
/// record struct can be built from, so the `log_record!` macro can
/// stay generic over field type.
pub trait LogField: Sized {
    fn field_size(&self) -> usize;
    fn write_field(&self, w: &mut ByteWriter);
    fn read_field(r: &mut ByteReader) -> Result<Self>;
}

impl LogField for u32 {
    fn field_size(&self) -> usize {
        4
    }
    fn write_field(&self, w: &mut ByteWriter) {
        w.put_u32(*self);
    }
    fn read_field(r: &mut ByteReader) -> Result<Self> {
        r.get_u32()
    }
}

impl LogField for i32 {
    fn field_size(&self) -> usize {
        4
    }
    fn write_field(&self, w: &mut ByteWriter) {
        w.put_i32(*self);
    }
    fn read_field(r: &mut ByteReader) -> Result<Self> {
        r.get_i32()
    }
}

impl LogField for Lsn {
    fn field_size(&self) -> usize {
        8
    }
    fn write_field(&self, w: &mut ByteWriter) {
        w.put_lsn(*self);
    }
    fn read_field(r: &mut ByteReader) -> Result<Self> {
        r.get_lsn()
    }
}

impl LogField for Dbt {
    fn field_size(&self) -> usize {
        self.encoded_len()
    }
    fn write_field(&self, w: &mut ByteWriter) {
        w.put_dbt(self);
    }
    fn read_field(r: &mut ByteReader) -> Result<Self> {
        r.get_dbt()
    }
}

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(WalError::Corruption(format!(
                "log record truncated: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.buf.len()
            )));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let s = self.take(4)?;
        Ok(u32::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        let s = self.take(4)?;
        Ok(i32::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn get_lsn(&mut self) -> Result<Lsn> {
        let file = self.get_u32()?;
        let offset = self.get_u32()?;
        Ok(Lsn::new(file, offset))
    }

    pub fn get_dbt(&mut self) -> Result<Dbt> {
        let len = self.get_u32()? as usize;
        let s = self.take(len)?;
        Ok(Dbt(s.to_vec()))
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn expect_exhausted(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(WalError::Corruption(format!(
                "log record has {} trailing bytes after decode",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars_and_dbt() {
        let mut w = ByteWriter::with_capacity(4 + 4 + 8 + 4 + 3);
        w.put_u32(7);
        w.put_i32(-3);
        w.put_lsn(Lsn::new(1, 200));
        w.put_dbt(&Dbt::new(vec![9, 9]));
        let bytes = w.finish().unwrap();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.get_u32().unwrap(), 7);
        assert_eq!(r.get_i32().unwrap(), -3);
        assert_eq!(r.get_lsn().unwrap(), Lsn::new(1, 200));
        assert_eq!(r.get_dbt().unwrap(), Dbt::new(vec![9, 9]));
        r.expect_exhausted().unwrap();
    }

    #[test]
    fn writer_rejects_size_mismatch() {
        let mut w = ByteWriter::with_capacity(8);
        w.put_u32(1);
        assert!(w.finish().is_err());
    }

    #[test]
    fn reader_rejects_truncated_input() {
        let mut r = ByteReader::new(&[1, 2]);
        assert!(r.get_u32().is_err());
    }
}
