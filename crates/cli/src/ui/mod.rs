//! Terminal output for pinhook
//!
//! - Status icons
//! - Progress spinners
//! - Run report rendering

pub mod icons;
pub mod progress;
pub mod report;

pub use icons::{Icons, StatusIcon};
pub use progress::create_spinner;
pub use report::{render_report, render_summary};
