//! Error types shared by the triangulation core.
//!
//! Every failure maps onto one of three kinds ([`ErrorKind`]): a malformed
//! request, a request whose precondition does not hold for this
//! triangulation, or a case the algorithms cannot decide.

use crate::core::perm::PermError;
use thiserror::Error;

/// Coarse classification of [`TriangulationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The arguments are malformed independently of the triangulation's state.
    InvalidArgument,
    /// The arguments are well formed but the triangulation does not satisfy
    /// the operation's precondition.
    FailedPrecondition,
    /// The operation is not implemented for this input.
    UnsolvedCase,
}

/// Errors produced by triangulation queries, moves and constructions.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TriangulationError {
    /// Malformed argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
    /// Precondition not met.
    #[error("Failed precondition: {message}")]
    FailedPrecondition {
        /// Description of the problem.
        message: String,
    },
    /// The algorithm cannot handle this case.
    #[error("Unsolved case: {message}")]
    UnsolvedCase {
        /// Description of the problem.
        message: String,
    },
    /// A simplex index is out of range.
    #[error("Simplex {index} out of range for triangulation of size {size}")]
    SimplexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of simplices.
        size: usize,
    },
    /// A facet number exceeds the dimension.
    #[error("Facet {facet} out of range for dimension {dim}")]
    FacetOutOfRange {
        /// Requested facet.
        facet: usize,
        /// Dimension of the simplex.
        dim: usize,
    },
    /// A face number exceeds the number of faces of that dimension.
    #[error("{subdim}-face {index} out of range ({count} faces)")]
    FaceOutOfRange {
        /// Dimension of the face.
        subdim: usize,
        /// Requested index.
        index: usize,
        /// Number of faces of that dimension.
        count: usize,
    },
    /// A facet that should be free is already glued.
    #[error("Facet {facet} of simplex {simplex} is already glued")]
    FacetAlreadyGlued {
        /// Simplex index.
        simplex: usize,
        /// Facet number.
        facet: usize,
    },
    /// Attempt to glue a facet to itself.
    #[error("Facet {facet} of simplex {simplex} cannot be glued to itself")]
    SelfGluing {
        /// Simplex index.
        simplex: usize,
        /// Facet number.
        facet: usize,
    },
    /// Two objects of different dimension were combined.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        found: usize,
    },
    /// A permutation could not be built.
    #[error(transparent)]
    Perm(#[from] PermError),
}

impl TriangulationError {
    /// Shorthand for [`TriangulationError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`TriangulationError::FailedPrecondition`].
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            message: message.into(),
        }
    }

    /// Shorthand for [`TriangulationError::UnsolvedCase`].
    pub fn unsolved(message: impl Into<String>) -> Self {
        Self::UnsolvedCase {
            message: message.into(),
        }
    }

    /// The coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FailedPrecondition { .. } | Self::FacetAlreadyGlued { .. } => {
                ErrorKind::FailedPrecondition
            }
            Self::UnsolvedCase { .. } => ErrorKind::UnsolvedCase,
            Self::InvalidArgument { .. }
            | Self::SimplexOutOfRange { .. }
            | Self::FacetOutOfRange { .. }
            | Self::FaceOutOfRange { .. }
            | Self::SelfGluing { .. }
            | Self::DimensionMismatch { .. }
            | Self::Perm(_) => ErrorKind::InvalidArgument,
        }
    }
}
