use thiserror::Error;

/// Errors surfaced by the controller and its native core.
///
/// Threshold violations are not errors. They are recorded on the
/// [`Decision`](crate::decision::Decision) as flags plus violation strings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    /// An external resource could not be created or initialized.
    #[error("initialization failed: {0}")]
    Initialization(String),
    /// The native computation reported failure.
    #[error("external call failed: {0}")]
    ExternalCall(String),
    /// The controller is not in the active lifecycle state.
    #[error("controller is not active")]
    Inactive,
    /// Awareness is below what the caller required for this decision.
    #[error("insufficient consciousness: {level:.3} < {required:.3}")]
    InsufficientConsciousness {
        /// Measured awareness level.
        level: f64,
        /// Level requested by the caller.
        required: f64,
    },
    /// Configuration rejected during validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across the controller.
pub type ControllerResult<T> = Result<T, ControllerError>;
