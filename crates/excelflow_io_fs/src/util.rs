use std::io;

////////////////////////////////////////////////////////////////////////////////
// #region ErrorClassification

#[cfg(windows)]
const N_WIN_ERROR_SHARING_VIOLATION: i32 = 32;
#[cfg(windows)]
const N_WIN_ERROR_LOCK_VIOLATION: i32 = 33;

/// Whether an open failure means "someone else holds this file".
///
/// Windows reports a file held open by a spreadsheet application as a
/// sharing/lock violation rather than `PermissionDenied`.
pub(crate) fn is_permission_class_error(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    #[cfg(windows)]
    {
        if let Some(n_code) = err.raw_os_error() {
            return n_code == N_WIN_ERROR_SHARING_VIOLATION
                || n_code == N_WIN_ERROR_LOCK_VIOLATION;
        }
    }
    false
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
