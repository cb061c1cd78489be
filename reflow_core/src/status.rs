//! Run status returned from each control tick.

use crate::error::ReflowError;
use crate::timing::Summary;

/// Public status of a single tick of the reflow loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Keep going; profile not finished.
    Running,
    /// Cool completed; heaters already off.
    Complete(Summary),
    /// Fail-stop with a typed error; heaters have been forced off.
    Aborted(ReflowError),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}
