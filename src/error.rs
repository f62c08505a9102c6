//! Defines [`GeoShellError`], representing all errors returned by this crate.

use thiserror::Error;

/// Enum with all errors in this crate.
///
/// The first four variants are logic errors raised at the wrapper layer and
/// propagated to the immediate caller; none of them are retried.
/// [`EngineInvariantViolation`](GeoShellError::EngineInvariantViolation) marks
/// an engine contract breach (e.g. a type tag outside the registry) and is
/// never silently mapped to a guessed value.
#[derive(Error, Debug)]
pub enum GeoShellError {
    /// A real geometry was required but a null or stale reference was found,
    /// e.g. as factory input or in a type-name query.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An operation was invoked on a wrapper with no installed handle. Carries
    /// the name of the offending operation.
    #[error("Null geometry supports no operations: {0}")]
    NullGeometry(&'static str),

    /// The operation is structurally inapplicable to the receiver, e.g.
    /// coordinate access on a multi-part geometry.
    #[error("Unsupported operation {op}: {reason}")]
    UnsupportedOperation {
        op: &'static str,
        reason: String,
    },

    /// Part-sequence or coordinate-sequence indexing outside `[0, len)` after
    /// negative-index resolution.
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// The engine broke its own contract. Unrecoverable.
    #[error("Engine invariant violation: {0}")]
    EngineInvariantViolation(String),

    #[error(transparent)]
    Serialization(#[from] geozero::error::GeozeroError),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, GeoShellError>;
