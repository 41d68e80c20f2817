//! Error types for binding and dispatching FMI calls.
//!
//! None of these is a native status. A status returned by the unit is
//! handed back to the caller verbatim; the errors below are raised by this
//! layer before the unit is ever called.

use lib_types::{FmiVersion, InterfaceKind, LifecycleMode};
use std::time::Duration;
use thiserror::Error;

/// The binary does not fit the requested interface or version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A procedure the standard mandates for this interface is not exported.
    #[error("Mandatory symbol '{symbol}' for {kind} not found")]
    MissingMandatorySymbol {
        symbol: &'static str,
        kind: InterfaceKind,
    },

    /// Only FMI 2.0 binaries can be bound.
    #[error("FMI version {version} is not supported")]
    IncompatibleVersion { version: FmiVersion },

    /// The description does not declare the requested interface.
    #[error("Model does not provide the {kind} interface")]
    UnsupportedKind { kind: InterfaceKind },
}

/// The call is not legal in the handle's current mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("'{operation}' is not allowed in mode {mode}")]
    IllegalMode {
        operation: &'static str,
        mode: LifecycleMode,
    },

    #[error("'{operation}' called after the instance was terminated")]
    AlreadyTerminated { operation: &'static str },
}

/// Arguments that must never cross the native boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("'{operation}' expects a buffer of length {expected}, got {actual}")]
    BufferLengthMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The instance was already freed.
    #[error("'{operation}' called on a freed instance")]
    NullHandle { operation: &'static str },
}

/// Errors that can occur while loading, binding or driving a unit.
#[derive(Debug, Error)]
pub enum FmiError {
    /// Failed to load the shared library.
    #[error("Failed to load library '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Optional procedure not exported by this binary, or not part of the
    /// bound interface.
    #[error("Operation '{operation}' not supported by this unit")]
    NotSupported { operation: &'static str },

    /// `fmi2Instantiate` returned a null component.
    #[error("Instantiation of '{instance}' failed")]
    InstantiationFailed { instance: String },

    /// Invalid parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Unreadable or inconsistent dispatch configuration.
    #[error("Configuration error in '{path}': {message}")]
    Config { path: String, message: String },

    /// The caller stopped waiting; the native call keeps running.
    #[error("Call did not return within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// Too many workers from earlier deadlines are still running.
    #[error("Too many abandoned workers ({count}), max allowed is {max}")]
    TooManyAbandonedWorkers { count: usize, max: usize },
}

impl FmiError {
    pub fn load_error(path: impl Into<String>, source: libloading::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    pub fn buffer_mismatch(operation: &'static str, expected: usize, actual: usize) -> Self {
        PreconditionError::BufferLengthMismatch {
            operation,
            expected,
            actual,
        }
        .into()
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// State errors clear once the caller moves to a legal mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::State(StateError::IllegalMode { .. })
                | Self::Precondition(PreconditionError::BufferLengthMismatch { .. })
                | Self::DeadlineExceeded(_)
        )
    }

    /// The handle can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::State(StateError::AlreadyTerminated { .. })
                | Self::Precondition(PreconditionError::NullHandle { .. })
                | Self::WorkerPanicked(_)
        )
    }
}

/// Result type for FMI operations.
pub type FmiResult<T> = Result<T, FmiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_in_messages() {
        let err = FmiError::from(BindingError::MissingMandatorySymbol {
            symbol: "fmi2EnterEventMode",
            kind: InterfaceKind::ModelExchange,
        });
        assert_eq!(
            err.to_string(),
            "Mandatory symbol 'fmi2EnterEventMode' for ModelExchange not found"
        );

        let err = FmiError::buffer_mismatch("fmi2GetDerivatives", 2, 1);
        assert!(err.to_string().contains("length 2, got 1"));
        assert!(err.is_recoverable());

        let err = FmiError::from(StateError::IllegalMode {
            operation: "fmi2SetTime",
            mode: LifecycleMode::EventMode,
        });
        assert!(err.to_string().contains("EventMode"));
        assert!(!err.is_fatal());
    }
}
