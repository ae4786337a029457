//! Error types for the metrology_core library.

use std::fmt;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A degraded-but-defined way to continue an operation that rejected an operand.
///
/// Errors that can be recovered from carry the recovery they offer; an
/// [`Evaluator`](crate::Evaluator) configured with a matching
/// [`RecoveryPolicy`](crate::RecoveryPolicy) applies it instead of failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Recovery {
    /// Replace the offending operand's uncertainty with zero
    DropUncertainty,
    /// Replace the offending operand's unit with the dimensionless unit
    DropUnit,
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recovery::DropUncertainty => f.write_str("drop the uncertainty"),
            Recovery::DropUnit => f.write_str("drop the unit"),
        }
    }
}

/// Renders the optional recovery hint appended to error messages
fn offer(recovery: &Option<Recovery>) -> String {
    match recovery {
        Some(recovery) => format!(" (recovery available: {})", recovery),
        None => String::new(),
    }
}

/// Core error type for metrology_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A unit, alias, abbreviation or prefix name is already registered
    #[error("Duplicate definition: '{0}' is already defined")]
    DuplicateDefinition(String),

    /// A unit name could not be resolved in any registry table
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    /// Two units do not share the same base dimensions
    #[error("Cannot convert unit '{from}' into '{to}'")]
    UnitConversion { from: String, to: String },

    /// An operation needs unitless or compatible operands and did not get them
    #[error("Invalid unit operation: {message}{}", offer(.recovery))]
    InvalidUnitOperation {
        message: String,
        recovery: Option<Recovery>,
    },

    /// The operation is mathematically undefined for the given inputs
    #[error("Operation undefined: {message}{}", offer(.recovery))]
    OperationUndefined {
        message: String,
        recovery: Option<Recovery>,
    },

    /// The derivative needed to propagate uncertainty is undefined at this point
    #[error("Error propagation failed: {message}{}", offer(.recovery))]
    ErrorPropagation {
        message: String,
        recovery: Option<Recovery>,
    },

    /// A unit definition refers back to itself
    #[error("Cyclic unit definition: {}", .0.join(" -> "))]
    CyclicDefinition(Vec<String>),

    /// Malformed registration or construction parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// The recovery this error offers, if any.
    ///
    /// Registry errors never offer one.
    pub fn recovery(&self) -> Option<Recovery> {
        match self {
            Error::InvalidUnitOperation { recovery, .. }
            | Error::OperationUndefined { recovery, .. }
            | Error::ErrorPropagation { recovery, .. } => *recovery,
            _ => None,
        }
    }

    pub(crate) fn invalid_unit_operation(
        message: impl Into<String>,
        recovery: Option<Recovery>,
    ) -> Self {
        Error::InvalidUnitOperation {
            message: message.into(),
            recovery,
        }
    }

    pub(crate) fn undefined(message: impl Into<String>, recovery: Option<Recovery>) -> Self {
        Error::OperationUndefined {
            message: message.into(),
            recovery,
        }
    }

    pub(crate) fn propagation(message: impl Into<String>, recovery: Option<Recovery>) -> Self {
        Error::ErrorPropagation {
            message: message.into(),
            recovery,
        }
    }
}
