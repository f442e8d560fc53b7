use thiserror::Error;

use crate::unit::status::LifecycleState;

/// Unified error type for the unitflow library.
///
/// Only [`UnitError::IllegalState`] ever surfaces from the public API; the
/// remaining variants are absorbed into lifecycle state, settle-results or
/// log output, and exist so those sites can name their failure precisely.
#[derive(Debug, Error)]
pub enum UnitError {
    /// An operation was invoked while the unit was in the wrong lifecycle
    /// state. Raised synchronously, before any transition or side effect.
    #[error("unit '{unit}' is in state {found:?}, expected {expected:?}")]
    IllegalState {
        unit: String,
        expected: LifecycleState,
        found: LifecycleState,
    },

    /// The main operation failed. Absorbed into the Error lifecycle state,
    /// never re-raised to the caller of `run`.
    #[error("main operation of unit '{unit}' failed: {message}")]
    MainExecution { unit: String, message: String },

    /// The main operation resolved to an empty (null) value, which would
    /// leave dependency fan-out without a meaningful payload.
    #[error("main operation of unit '{unit}' resolved to an empty value")]
    EmptyResult { unit: String },

    /// A single dependency branch failed during fan-out. Captured as a
    /// rejected settle-result, isolated from sibling branches.
    #[error("dependency {index} of unit '{unit}' failed: {message}")]
    DependencyBranch {
        unit: String,
        index: usize,
        message: String,
    },

    /// A hook reaction failed. Logged and swallowed, isolated from sibling
    /// hooks and from the triggering transition.
    #[error("hook on {state:?} of unit '{unit}' failed: {message}")]
    HookReaction {
        unit: String,
        state: LifecycleState,
        message: String,
    },
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, UnitError>;
