use thiserror::Error;

use crate::transaction::Transaction;

/// Everything that can end a verification run. All variants are terminal:
/// nothing is retried internally, the fault propagates up to the harness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// `start()`/`stop()` called out of order, or a run that can no longer
    /// make progress. Always a usage error, never a property of the DUT.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// A sampled signal was undriven/unresolved where a concrete value was
    /// required.
    #[error("indeterminate value sampled on signal '{signal}'")]
    Indeterminate { signal: String },

    /// Reference model and observed output diverged. Carries both records
    /// for diagnosis.
    #[error("scoreboard mismatch: expected {expected}, actual {actual}")]
    Mismatch {
        expected: Transaction,
        actual: Transaction,
    },

    /// The cycle watchdog expired before the expected number of pairs was
    /// checked.
    #[error("watchdog expired after {cycles} cycles with {checked} pairs checked")]
    Timeout { cycles: u64, checked: u64 },
}

impl Fault {
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Fault::Lifecycle(msg.into())
    }

    pub fn indeterminate(signal: impl Into<String>) -> Self {
        Fault::Indeterminate {
            signal: signal.into(),
        }
    }
}
