//! Lock probe result models.

use std::fmt;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Outcome of one append-open probe against a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumLockState {
    /// Nothing exists at the path, so nothing can hold it.
    Absent,
    /// The file exists and accepted an append-mode open.
    Unlocked,
    /// The file exists and the append-mode open was refused with a
    /// permission-class error.
    Locked,
}

impl EnumLockState {
    /// `true` only for [`EnumLockState::Locked`].
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl fmt::Display for EnumLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txt = match self {
            Self::Absent => "absent",
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
        };
        write!(f, "{txt}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
