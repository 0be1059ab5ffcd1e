//! A catalogue of small, well-known triangulations.
//!
//! Everything here is built from explicit gluing tables, so the results are
//! deterministic and cheap enough for doctests and benchmarks.

use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::triangulation::{MAX_DIMENSION, Triangulation};
use crate::topology::layered::layered_lens_space;

/// Builds `size` simplices of dimension `dim` glued by `(s, f, t, images)`.
fn from_table<const N: usize>(dim: usize, size: usize, table: &[(usize, usize, usize, [usize; N])]) -> Triangulation {
    debug_assert_eq!(N, dim + 1);
    let mut tri = Triangulation::with_simplices(dim, size);
    for &(s, f, t, images) in table {
        tri.glue_raw(s, f, t, Perm::from_images_unchecked(&images));
    }
    tri.debug_check_invariants();
    tri
}

fn check_dimension(dim: usize) -> Result<(), TriangulationError> {
    if (1..=MAX_DIMENSION).contains(&dim) {
        Ok(())
    } else {
        Err(TriangulationError::invalid_argument(format!(
            "dimension {dim} outside 1..={MAX_DIMENSION}"
        )))
    }
}

// =============================================================================
// SPHERES AND BALLS
// =============================================================================

/// A single d-simplex.
///
/// # Panics
///
/// Panics if `dim` is outside `1..=MAX_DIMENSION`.
#[must_use]
pub fn ball(dim: usize) -> Triangulation {
    let mut tri = Triangulation::new(dim);
    tri.new_simplex("");
    tri
}

/// The d-sphere as two d-simplices glued along all facets by the identity.
///
/// # Panics
///
/// Panics if `dim` is outside `1..=MAX_DIMENSION`.
#[must_use]
pub fn sphere_two_simplices(dim: usize) -> Triangulation {
    let mut tri = Triangulation::new(dim);
    tri.new_simplices(2);
    let id = Perm::identity(dim + 1);
    for f in 0..=dim {
        tri.glue_raw(0, f, 1, id);
    }
    tri
}

/// The boundary of the (d+1)-simplex: `d + 2` simplices, simplex `i` being
/// the facet opposite vertex `i` with its vertices in increasing order.
///
/// # Errors
///
/// Returns [`TriangulationError::InvalidArgument`] for an unsupported
/// dimension.
pub fn simplex_boundary(dim: usize) -> Result<Triangulation, TriangulationError> {
    check_dimension(dim)?;
    let mut tri = Triangulation::new(dim);
    tri.new_simplices(dim + 2);
    let local = |omit: usize, v: usize| if v > omit { v - 1 } else { v };
    for i in 0..dim + 2 {
        for j in i + 1..dim + 2 {
            let images: Vec<usize> = (0..dim + 2)
                .filter(|&v| v != i)
                .map(|v| if v == j { i } else { local(j, v) })
                .collect();
            tri.glue_raw(i, local(i, j), j, Perm::from_images(&images)?);
        }
    }
    Ok(tri)
}

/// The one-tetrahedron 3-sphere with two folded pairs of faces.
///
/// Its three edges are, in order, the core of one solid torus of a genus-one
/// splitting, an arc joining the two vertices, and the core of the other.
#[must_use]
pub fn sphere_1tet_snapped() -> Triangulation {
    from_table(3, 1, &[(0, 0, 0, [1, 0, 2, 3]), (0, 2, 0, [0, 1, 3, 2])])
}

// =============================================================================
// SURFACES
// =============================================================================

/// The torus on two triangles.
#[must_use]
pub fn torus() -> Triangulation {
    from_table(
        2,
        2,
        &[(0, 0, 1, [0, 2, 1]), (0, 1, 1, [2, 1, 0]), (0, 2, 1, [1, 0, 2])],
    )
}

/// The Klein bottle on two triangles.
#[must_use]
pub fn klein_bottle() -> Triangulation {
    from_table(
        2,
        2,
        &[(0, 0, 1, [0, 1, 2]), (0, 1, 1, [0, 2, 1]), (0, 2, 1, [2, 0, 1])],
    )
}

/// The projective plane on two triangles.
#[must_use]
pub fn rp2() -> Triangulation {
    from_table(
        2,
        2,
        &[(0, 0, 1, [0, 1, 2]), (0, 1, 1, [0, 1, 2]), (0, 2, 1, [1, 0, 2])],
    )
}

// =============================================================================
// THREE-MANIFOLDS
// =============================================================================

/// The two-tetrahedron ideal triangulation of the figure-eight knot
/// complement.
#[must_use]
pub fn figure_eight() -> Triangulation {
    from_table(
        3,
        2,
        &[
            (0, 0, 1, [1, 3, 0, 2]),
            (0, 1, 1, [2, 0, 3, 1]),
            (0, 2, 1, [0, 3, 2, 1]),
            (0, 3, 1, [2, 1, 0, 3]),
        ],
    )
}

/// The minimal layered lens space `L(p, q)`.
///
/// # Errors
///
/// Returns [`TriangulationError::InvalidArgument`] unless `gcd(p, q) = 1`.
pub fn lens_space(p: u64, q: u64) -> Result<Triangulation, TriangulationError> {
    layered_lens_space(p, q)
}

/// `S² × S¹` as a circle bundle over the two-triangle sphere.
///
/// # Errors
///
/// Never fails in practice; errors from the bundle construction are passed
/// through.
pub fn s2_x_s1() -> Result<Triangulation, TriangulationError> {
    sphere_two_simplices(2).s1_bundle()
}

// =============================================================================
// FOUR-MANIFOLDS
// =============================================================================

/// Real projective 4-space on four pentachora.
#[must_use]
pub fn rp4() -> Triangulation {
    const SWAP: [usize; 5] = [2, 3, 0, 1, 4];
    const ID: [usize; 5] = [0, 1, 2, 3, 4];
    from_table(
        4,
        4,
        &[
            (0, 0, 1, ID),
            (0, 1, 2, ID),
            (0, 2, 1, ID),
            (0, 3, 2, ID),
            (0, 4, 3, ID),
            (1, 1, 3, SWAP),
            (1, 3, 3, SWAP),
            (1, 4, 2, SWAP),
            (2, 0, 3, SWAP),
            (2, 2, 3, SWAP),
        ],
    )
}

/// Signature of the two-pentachoron ideal Cappell-Shaneson triangulation.
pub const CAPPELL_SHANESON_SIG: &str = "cMkabbb+aAa3blb";

/// The ideal Cappell-Shaneson 4-manifold on two pentachora.
///
/// It has a single ideal vertex, whose link is `S² × S¹`; the truncated
/// manifold is a homology `S¹ × B³`.
///
/// # Errors
///
/// Decoding errors are passed through; none occur for the built-in
/// signature.
///
/// # Examples
///
/// ```rust
/// use pachner::triangulation::standard;
///
/// let cs = standard::cappell_shaneson().unwrap();
/// assert_eq!(cs.size(), 2);
/// assert!(cs.is_ideal() && cs.is_orientable());
/// assert_eq!(cs.euler_char_tri(), 1);
/// ```
pub fn cappell_shaneson() -> Result<Triangulation, TriangulationError> {
    Triangulation::from_iso_sig(4, CAPPELL_SHANESON_SIG)
}

/// An ideal triangulation of `S¹ × B³`: the circle bundle over a
/// tetrahedron with its boundary `S² × S¹` coned to one ideal vertex.
///
/// # Errors
///
/// Errors from the bundle construction are passed through.
pub fn ideal_s1_x_b3() -> Result<Triangulation, TriangulationError> {
    let mut tri = ball(3).s1_bundle()?;
    tri.finite_to_ideal();
    Ok(tri)
}
