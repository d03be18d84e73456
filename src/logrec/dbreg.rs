//! File registration records, grounded on `dbreg_auto.c`. Only the
//! modern `dbreg_register` wire format is emitted; see DESIGN.md's
//! Open Question resolution on the legacy `log_register` type.
use super::envelope::RecType;
use super::macros::log_record;
use crate::serial::Dbt;

log_record!(
    /// Associates a small integer `fileid` with a file's on-disk
    /// unique id and name. `opcode` distinguishes register (1) from
    /// unregister/close (2).
    DbregRegister,
    RecType::DbregRegister,
    { fileid: i32, name: Dbt, uid: Dbt, opcode: u32 }
);

log_record!(
    /// The legacy file-registration record this crate only ever
    /// reads. Same three fields `dbreg_register` carries, minus the
    /// opcode the newer format added.
    LogRegisterLegacy,
    RecType::LogRegisterLegacy,
    { fileid: i32, name: Dbt, uid: Dbt }
);
