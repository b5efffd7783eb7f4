//! Status indicators
//!
//! Plain text markers so output stays readable without special fonts.

use pinhook_engine::HookStatus;

/// Icon constants
pub struct Icons;

impl Icons {
    pub const STATUS_SUCCESS: &'static str = "[OK]";
    pub const STATUS_WARNING: &'static str = "[!]";
    pub const STATUS_ERROR: &'static str = "[X]";
    pub const STATUS_INFO: &'static str = "[i]";
    pub const STATUS_SKIPPED: &'static str = "[-]";
}

/// Status icon types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Success,
    Warning,
    Error,
    Info,
    Skipped,
}

impl StatusIcon {
    /// Text representation of the icon
    pub fn get(self) -> &'static str {
        match self {
            Self::Success => Icons::STATUS_SUCCESS,
            Self::Warning => Icons::STATUS_WARNING,
            Self::Error => Icons::STATUS_ERROR,
            Self::Info => Icons::STATUS_INFO,
            Self::Skipped => Icons::STATUS_SKIPPED,
        }
    }

    /// Icon for a hook outcome
    pub fn for_status(status: &HookStatus) -> Self {
        match status {
            HookStatus::Passed => Self::Success,
            HookStatus::Failed { .. } | HookStatus::Errored { .. } => Self::Error,
            HookStatus::Skipped { .. } => Self::Skipped,
        }
    }
}
