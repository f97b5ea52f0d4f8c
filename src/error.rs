use num_bigint::BigInt;
use thiserror::Error;

/// Result type used throughout the runtime.
pub type VmResult<T> = Result<T, VmError>;

/// Errors raised while executing contract bytecode or a host call.
///
/// Every variant except [`VmError::Defect`] describes a *fault*: an expected,
/// recoverable termination attributable to untrusted bytecode or its inputs.
/// `Defect` marks an internal consistency violation detected by the engine
/// itself (it still surfaces as a fault to callers, but is reported separately
/// so engine bugs are distinguishable from contract bugs).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("stack underflow: {0}")]
    StackUnderflow(String),

    #[error("stack size limit exceeded: {0}")]
    StackOverflow(String),

    #[error("type mismatch: {0}")]
    InvalidType(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("contract assertion failed: {0}")]
    Assertion(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("gas limit exceeded: used {used} of {max}")]
    OutOfGas { used: BigInt, max: BigInt },

    #[error("unknown external call: {0}")]
    UnknownMethod(String),

    #[error("unknown context: {0}")]
    UnknownContext(String),

    #[error("malformed script: {0}")]
    BadScript(String),

    #[error("exception raised by contract: {0}")]
    Thrown(String),

    #[error("internal defect: {0}")]
    Defect(String),
}
