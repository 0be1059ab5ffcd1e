//! # pachner
//!
//! Combinatorial triangulations of manifolds in arbitrary dimension. A
//! triangulation is a collection of abstract d-simplices whose facets are
//! glued in pairs by vertex permutations; no geometry is involved.
//!
//! # Features
//!
//! - Triangulations of dimension 2 through 15 with permutation-labelled gluings
//! - Lazily computed skeleta: faces of every dimension, components, real
//!   boundary components, and vertex links
//! - Validity, orientability, ideal vertices, Euler characteristics, and
//!   integral homology
//! - Pachner moves, edge collapses, pinches and snaps, barycentric
//!   subdivision, ideal/finite conversion, and boundary minimisation
//! - Cones, I- and S¹-bundles, puncturing, connected sums, double covers, and
//!   layered lens spaces
//! - Isomorphism search, canonical labellings, and isomorphism signatures
//! - A parallel, cancellable search of the Pachner graph
//! - Serialization with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use pachner::prelude::*;
//!
//! // Two tetrahedra glued along all four facets form the 3-sphere.
//! let mut tri = Triangulation::new(3);
//! tri.new_simplices(2);
//! for f in 0..4 {
//!     tri.join(0, f, 1, Perm::identity(4)).unwrap();
//! }
//! assert!(tri.is_valid());
//! assert!(tri.is_closed());
//! assert!(tri.homology(1).unwrap().is_trivial());
//!
//! // A 1-4 move on either tetrahedron gives a five-tetrahedron sphere.
//! assert!(tri.pachner(3, 0, true, true).unwrap());
//! assert_eq!(tri.size(), 5);
//! assert_eq!(tri.count_vertices(), 5);
//! ```
//!
//! # Isomorphism Signatures
//!
//! ```rust
//! use pachner::prelude::*;
//! use pachner::triangulation::standard;
//!
//! let knot = standard::figure_eight();
//! assert_eq!(knot.iso_sig(), "cPcbbbiht");
//!
//! let copy = Triangulation::from_iso_sig(3, "cPcbbbiht").unwrap();
//! assert!(copy.is_isomorphic_to(&knot));
//! ```
//!
//! # Retriangulation
//!
//! ```rust
//! use pachner::triangulation::retriangulate::RetriangulateOptionsBuilder;
//! use pachner::triangulation::standard;
//!
//! let options = RetriangulateOptionsBuilder::default()
//!     .height(1)
//!     .build()
//!     .unwrap();
//! let mut sigs = Vec::new();
//! standard::figure_eight().retriangulate(&options, |sig, _| {
//!     sigs.push(sig.to_owned());
//!     false
//! });
//! assert_eq!(sigs.len(), 2);
//! ```
//!
//! # Environment
//!
//! - `PACHNER_DEBUG_SKELETON`: log every skeleton rebuild at debug level.
//! - `PACHNER_TRACE_MOVES`: log every Pachner move performed.
//! - `PACHNER_RETRI_THREADS`: default worker count for retriangulation.
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events and never
//! installs a subscriber.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Triangulations, their skeleta, and the moves that change them.
pub mod core {
    /// Local moves and subdivisions.
    pub mod algorithms {
        /// Close-book moves, layering, and boundary minimisation
        pub mod boundary_moves;
        /// Edge collapse
        pub mod collapse;
        /// Pachner (bistellar) moves
        pub mod pachner;
        /// Edge pinching and snapping
        pub mod pinch;
        /// Barycentric subdivision
        pub mod subdivision;
        /// Ideal to finite and back
        pub mod truncation;
    }
    pub mod boundary;
    /// Hash maps, sets, and inline buffers
    pub mod collections;
    pub mod error;
    pub mod face_numbering;
    pub mod isomorphism;
    pub mod perm;
    pub mod simplex;
    pub mod skeleton;
    pub mod triangulation;
    /// Traits over triangulations.
    pub mod traits {
        pub mod boundary_analysis;
        pub mod property_cache;
        pub use boundary_analysis::*;
        pub use property_cache::*;
    }
    // Re-export the `core` modules.
    pub use error::*;
    pub use isomorphism::*;
    pub use perm::*;
    pub use simplex::*;
    pub use skeleton::*;
    pub use traits::*;
    pub use triangulation::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Topological invariants and constructions.
pub mod topology {
    /// Euler characteristics, validity, and link classification.
    pub mod characteristics {
        pub mod euler;
        pub mod validation;
        pub use euler::*;
        pub use validation::*;
    }
    /// Cones, bundles, punctures, connected sums, and double covers
    pub mod constructions;
    pub mod homology;
    pub mod layered;
    pub use characteristics::*;
    pub use homology::*;
    pub use layered::*;
}

/// Encodings, searches, and a catalogue of standard triangulations.
pub mod triangulation {
    /// Dehydration strings for closed 3-manifold triangulations
    pub mod dehydration;
    /// Isomorphism signatures
    pub mod isosig;
    /// Exploration of the Pachner graph
    pub mod retriangulate;
    /// Small well-known triangulations
    pub mod standard;
    pub use dehydration::DehydrationError;
    pub use isosig::{ISO_SIG_ALPHABET, IsoSigError, decode_iso_sig};
    pub use retriangulate::{ProgressTracker, RetriangulateOptions, RetriangulateOptionsBuilder};
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    pub use crate::core::{
        algorithms::pachner::PachnerKind,
        boundary::RealBoundary,
        error::{ErrorKind, TriangulationError},
        isomorphism::Isomorphism,
        perm::{Perm, PermError},
        simplex::{Gluing, Simplex},
        skeleton::{Component, Face, FaceEmbedding, FaceLink, Skeleton},
        traits::{boundary_analysis::*, property_cache::*},
        triangulation::{MAX_DIMENSION, Triangulation},
    };

    pub use crate::core::collections::{FastHashMap, FastHashSet, SmallBuffer};

    pub use crate::topology::{
        characteristics::{BoundaryComponent, FVector, LinkType},
        homology::AbelianGroup,
        layered::{LayeredSolidTorus, layered_lens_space},
    };

    pub use crate::triangulation::{
        dehydration::DehydrationError,
        isosig::IsoSigError,
        retriangulate::{ProgressTracker, RetriangulateOptions, RetriangulateOptionsBuilder},
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
