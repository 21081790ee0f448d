//! Error types for DQS.

use thiserror::Error;

/// Unified error type for simulator operations.
///
/// Validation failures are collective: every worker invokes the same
/// operation with the same arguments, so a worker that rejects an argument
/// can assume every other worker rejects it too. Each variant carries a
/// numeric code that is identical on all workers and doubles as the
/// transport abort status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Target qubit outside `[0, num_qubits)`
    #[error("target qubit {0} out of range, state has {1} qubits")]
    TargetOutOfRange(usize, usize),

    /// Control qubit outside `[0, num_qubits)`; also covers a control mask
    /// that would exceed the index space
    #[error("control qubit {0} out of range, state has {1} qubits")]
    ControlOutOfRange(usize, usize),

    /// Measured qubit outside `[0, num_qubits)` (shares the control code)
    #[error("measured qubit {0} out of range, state has {1} qubits")]
    MeasureQubitOutOfRange(usize, usize),

    /// Control equals target, or the control mask covers the target bit
    #[error("control set conflicts with target qubit {0}")]
    ControlConflictsTarget(usize),

    /// Number of control qubits outside `[0, num_qubits)`
    #[error("control count {0} out of range for {1} qubits")]
    ControlCountOutOfRange(usize, usize),

    /// Gate matrix is not unitary within `REAL_EPS`
    #[error("gate matrix is not unitary")]
    MatrixNotUnitary,

    /// `|alpha|^2 + |beta|^2` differs from 1 by more than `REAL_EPS`
    #[error("|alpha|^2 + |beta|^2 = {0} is not 1")]
    InvalidCompactPair(f64),

    /// Attempted collapse to an outcome with probability below `REAL_EPS`
    #[error("cannot collapse to outcome {outcome}: probability {probability:e}")]
    CollapseProbabilityTooSmall { outcome: u8, probability: f64 },

    /// Shard geometry cannot be formed: the worker count must be a power of
    /// two no larger than the number of amplitudes
    #[error("cannot shard {num_amps} amplitudes over {num_workers} workers")]
    InvalidSharding { num_amps: u64, num_workers: usize },
}

/// Result type alias for DQS operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    /// Stable numeric code for this error, identical on every worker.
    ///
    /// Codes 1-8 index the gate-validation table (7 is reserved); 9 covers
    /// shard-geometry failures raised before any gate runs.
    pub fn code(&self) -> i32 {
        match self {
            Self::TargetOutOfRange(..) => 1,
            Self::ControlOutOfRange(..) | Self::MeasureQubitOutOfRange(..) => 2,
            Self::ControlConflictsTarget(..) => 3,
            Self::ControlCountOutOfRange(..) => 4,
            Self::MatrixNotUnitary => 5,
            Self::InvalidCompactPair(..) => 6,
            Self::CollapseProbabilityTooSmall { .. } => 8,
            Self::InvalidSharding { .. } => 9,
        }
    }
}
