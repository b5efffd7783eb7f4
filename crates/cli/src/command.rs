//! Subcommand interface
//!
//! Subcommands that work on a project implement [`Command`] and receive the
//! shared [`RuntimeContext`]. `sample-config` needs no project and is
//! dispatched directly.

use crate::common::RuntimeContext;
use crate::error::Result;

/// A subcommand executed against a project
///
/// ```rust,ignore
/// #[derive(Debug, Args)]
/// pub struct CountCommand {}
///
/// impl Command for CountCommand {
///     type Output = usize;
///
///     fn execute(&self, context: &RuntimeContext) -> Result<usize> {
///         Ok(context.load_manifest()?.hook_count())
///     }
/// }
/// ```
pub trait Command {
    /// Value handed back to the caller; printing is the command's own job
    type Output;

    /// Run the command
    ///
    /// # Errors
    ///
    /// Returns a `CommandError` when the command cannot complete, including
    /// a hook run with failed or errored hooks.
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
