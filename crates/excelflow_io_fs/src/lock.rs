//! Append-open lock probe for destination workbooks.
//!
//! The probe is advisory: nothing is held between the probe and the
//! caller's write, so another process may still grab the file in between.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::spec::EnumLockState;
use crate::util::is_permission_class_error;

/// Probe `path` with a scoped append-mode open.
///
/// Returns [`EnumLockState::Absent`] when nothing exists at `path`,
/// [`EnumLockState::Locked`] when the open is refused with a
/// permission-class error, and [`EnumLockState::Unlocked`] when the open
/// succeeds. Nothing is written; the handle is dropped before returning.
///
/// Any other I/O failure (for example `path` being a directory) is returned
/// as-is.
pub fn probe_file_lock<P: AsRef<Path>>(path: P) -> io::Result<EnumLockState> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(EnumLockState::Absent);
    }

    derive_lock_state(OpenOptions::new().append(true).open(path))
}

/// Map the outcome of an append-mode open onto a lock state.
pub fn derive_lock_state(result_open: io::Result<File>) -> io::Result<EnumLockState> {
    match result_open {
        Ok(_file) => Ok(EnumLockState::Unlocked),
        Err(err) if is_permission_class_error(&err) => Ok(EnumLockState::Locked),
        Err(err) => Err(err),
    }
}

/// `true` when `path` exists and refuses an append-mode open with a
/// permission-class error.
///
/// Other probe failures count as "not locked"; the write that follows will
/// hit and report the same condition.
pub fn is_file_locked<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    match probe_file_lock(path) {
        Ok(state) => {
            log::debug!("Lock probe {}: {state}", path.display());
            state.is_locked()
        }
        Err(err) => {
            log::debug!(
                "Lock probe {} failed, treating as unlocked: {err}",
                path.display()
            );
            false
        }
    }
}
