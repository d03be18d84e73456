//! C1/C2: structural log record types and the record registry.
//!
//! Every record starts with a common envelope — record type, owning
//! transaction id, and the previous LSN written by that same
//! transaction — followed by a `fileid` identifying which open file
//! the record applies to, followed by type-specific fields. This
//! mirrors the real on-disk layout BDB's generated `*_log` functions
//! produce (see `btree_auto.c::__bam_pg_alloc_log`): rectype, txn_num,
//! prev_lsn, fileid, then the record's own fields, with the encoder
//! asserting the bytes written match the precomputed size.

pub mod envelope;
pub mod macros;
pub mod btree;
pub mod hash;
pub mod queue;
pub mod db;
pub mod crdel;
pub mod dbreg;
pub mod txn;
pub mod registry;

pub use envelope::{Envelope, RecType};
pub use registry::{LogBody, Registry};
