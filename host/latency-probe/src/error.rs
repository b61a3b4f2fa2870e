// Licensed under the Apache-2.0 license

use std::path::PathBuf;

use latency_messages::{BufferError, ErrorOrigin, Failure, OperationId, TeeError};
use thiserror::Error;

use crate::scenario::Scenario;

/// Errors that end a measurement run.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The TEE context or session could not be set up.
    #[error("{call} failed with {failure}")]
    Environment {
        call: &'static str,
        failure: Failure,
    },

    /// The local counter reports a frequency of zero.
    #[error("system counter frequency reads as zero")]
    ZeroFrequency,

    /// The trusted application rejected the parameter shape or capacity.
    #[error("{call} rejected its parameters with {failure}")]
    Protocol {
        call: &'static str,
        failure: Failure,
    },

    /// A call succeeded but its output buffers do not hold a valid response.
    #[error("{call} returned a malformed response: {error}")]
    MalformedResponse {
        call: &'static str,
        error: BufferError,
    },

    /// Samples that must be ordered are not.
    #[error("{scenario} out of order: {earlier} ({earlier_ticks}) after {later} ({later_ticks})")]
    NonMonotonic {
        scenario: Scenario,
        earlier: &'static str,
        earlier_ticks: u64,
        later: &'static str,
        later_ticks: u64,
    },

    #[error("{operation:?} is not implemented by the trusted application: {failure}")]
    UnsupportedOperation {
        operation: OperationId,
        failure: Failure,
    },

    /// The system call made from inside the trusted application failed.
    #[error("nested system call failed inside the trusted application: {failure}")]
    NestedCallFailure { failure: Failure },

    #[error("{operation:?} failed with {failure}")]
    Invocation {
        operation: OperationId,
        failure: Failure,
    },
}

/// Coarse class of a [`ProbeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Environment,
    Protocol,
    UnsupportedOperation,
    NestedCallFailure,
    Invocation,
}

impl ProbeError {
    /// Classify a failed session open.
    pub fn open_session(failure: Failure) -> Self {
        match (failure.origin, failure.error) {
            (ErrorOrigin::TrustedApp, TeeError::BadParameters | TeeError::ShortBuffer) => {
                ProbeError::Protocol {
                    call: "TEEC_OpenSession",
                    failure,
                }
            }
            _ => ProbeError::Environment {
                call: "TEEC_OpenSession",
                failure,
            },
        }
    }

    /// Classify a failed `invoke_command` for `operation`.
    pub fn invoke(operation: OperationId, failure: Failure) -> Self {
        if failure.origin != ErrorOrigin::TrustedApp {
            return ProbeError::Invocation { operation, failure };
        }
        match (failure.error, operation) {
            // Output buffers are always full size, so a short buffer here was
            // reported by the nested property query.
            (TeeError::ShortBuffer, OperationId::MeasureSyscallTime) => {
                ProbeError::NestedCallFailure { failure }
            }
            (TeeError::BadParameters | TeeError::ShortBuffer, _) => ProbeError::Protocol {
                call: "TEEC_InvokeCommand",
                failure,
            },
            (TeeError::NotImplemented, _) => {
                ProbeError::UnsupportedOperation { operation, failure }
            }
            (_, OperationId::MeasureSyscallTime) => ProbeError::NestedCallFailure { failure },
            _ => ProbeError::Invocation { operation, failure },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Environment { .. } | ProbeError::ZeroFrequency => ErrorKind::Environment,
            ProbeError::Protocol { .. }
            | ProbeError::MalformedResponse { .. }
            | ProbeError::NonMonotonic { .. } => ErrorKind::Protocol,
            ProbeError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ProbeError::NestedCallFailure { .. } => ErrorKind::NestedCallFailure,
            ProbeError::Invocation { .. } => ErrorKind::Invocation,
        }
    }

    /// Status and origin reported by the TEE, if the error came from a call.
    pub fn failure(&self) -> Option<Failure> {
        match self {
            ProbeError::Environment { failure, .. }
            | ProbeError::Protocol { failure, .. }
            | ProbeError::UnsupportedOperation { failure, .. }
            | ProbeError::NestedCallFailure { failure }
            | ProbeError::Invocation { failure, .. } => Some(*failure),
            _ => None,
        }
    }
}

/// Errors loading or validating a [`crate::ProbeConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no scenarios selected")]
    NoScenarios,
}
