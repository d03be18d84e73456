//! Environment configuration, grounded on the teacher's
//! `granite::GraniteConfig`/`EngineConfig` preset pattern.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbEnvConfig {
    /// Log buffer size in bytes that triggers a batched write before
    /// the autoflush interval elapses.
    pub lg_bsize: usize,
    /// Maximum size of a single log file before rolling to the next.
    pub lg_max: u32,
    /// How often the background writer flushes on a timer even if
    /// `lg_bsize` hasn't been reached.
    pub lg_autoflush_ms: u64,
    /// Create the environment (and an empty log) if it doesn't exist.
    pub create: bool,
    /// Run normal (non-fatal) recovery on open.
    pub recover: bool,
    /// Run fatal recovery: ignore any existing checkpoint and scan
    /// from the very first log record (spec's `DB_RECOVER_FATAL`).
    pub recover_fatal: bool,
    /// Point-in-time recovery target, as milliseconds since the Unix
    /// epoch; transactions committing after this time are rolled back
    /// as though they had aborted.
    pub tx_timestamp: Option<u64>,
    /// Allow the registry to decode the legacy `log_register` wire
    /// format at all; with this off, encountering one is corruption.
    /// See DESIGN.md's Open Question resolution.
    pub legacy_records: bool,
    /// Honor a successfully-decoded legacy record's effect during
    /// OPENFILES (register the file it names) rather than treating it
    /// as a pure cursor-advance. See DESIGN.md.
    pub deprecated_recover: bool,
}

impl Default for DbEnvConfig {
    fn default() -> Self {
        DbEnvConfig {
            lg_bsize: 32 * 1024,
            lg_max: 10 * 1024 * 1024,
            lg_autoflush_ms: 50,
            create: true,
            recover: true,
            recover_fatal: false,
            tx_timestamp: None,
            legacy_records: true,
            deprecated_recover: true,
        }
    }
}

impl DbEnvConfig {
    /// Scans from the very first log record, ignoring any checkpoint,
    /// for recovering from a corrupted or suspect checkpoint chain.
    pub fn fatal_recovery() -> Self {
        DbEnvConfig { recover: true, recover_fatal: true, ..Self::default() }
    }

    /// Recovers up to (and stops at) a target wall-clock time,
    /// demoting later commits to aborts.
    pub fn point_in_time(timestamp_ms: u64) -> Self {
        DbEnvConfig { recover: true, tx_timestamp: Some(timestamp_ms), ..Self::default() }
    }

    /// Small buffer, frequent flush: favors durability over throughput.
    pub fn synchronous() -> Self {
        DbEnvConfig { lg_bsize: 4 * 1024, lg_autoflush_ms: 5, ..Self::default() }
    }

    /// Large buffer, infrequent flush: favors throughput, widening the
    /// window of work lost on a crash before the next group commit.
    pub fn high_throughput() -> Self {
        DbEnvConfig { lg_bsize: 256 * 1024, lg_autoflush_ms: 200, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_favors_create_and_recover() {
        let cfg = DbEnvConfig::default();
        assert!(cfg.create);
        assert!(cfg.recover);
        assert!(!cfg.recover_fatal);
    }

    #[test]
    fn fatal_recovery_sets_the_flag() {
        assert!(DbEnvConfig::fatal_recovery().recover_fatal);
    }

    #[test]
    fn point_in_time_carries_the_timestamp() {
        let cfg = DbEnvConfig::point_in_time(1000);
        assert_eq!(cfg.tx_timestamp, Some(1000));
    }
}
