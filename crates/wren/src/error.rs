//
// error.rs
//
// Error types for include resolution and configuration parsing
//

use thiserror::Error;

/// Failure to turn an include directive into a file on disk.
///
/// Silent while walking the include graph; surfaced to the user only by the
/// `wren.openInclude` command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Include file not found: {spec}")]
    NotFound { spec: String },

    #[error("Line is not an #include directive")]
    NotAnInclude,
}

/// A configuration field that could not be applied. The field keeps its
/// default value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    #[error("Invalid value for wren.{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
