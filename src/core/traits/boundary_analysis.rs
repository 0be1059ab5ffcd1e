//! Boundary analysis trait for triangulations.

use crate::core::collections::SimplexFacet;
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;

/// Result of walking around a boundary ridge.
///
/// Starting from an unglued facet `(s, f)` and the ridge of that facet that
/// omits vertex `v`, the walk crosses glued facets around the ridge until it
/// reaches the next unglued facet. That facet is facet `facet` of `simplex`;
/// inside it the ridge omits vertex `opposite`, and `map` sends the ridge's
/// vertices as labelled in `s` to their labels in `simplex`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RidgePartner {
    /// Simplex holding the partner facet.
    pub simplex: usize,
    /// The partner facet.
    pub facet: usize,
    /// Vertex of the partner facet not on the ridge.
    pub opposite: usize,
    /// Labels of ridge vertices in `simplex`, indexed by their labels in `s`.
    pub map: Perm,
}

/// Trait for boundary analysis operations on triangulations.
///
/// A boundary facet is a facet slot with no gluing. Boundary facets meet along
/// ridges, and each ridge of a boundary facet is shared with exactly one other
/// boundary facet (possibly the same one), found by
/// [`boundary_ridge_partner`](Self::boundary_ridge_partner).
///
/// # Examples
///
/// ```
/// use pachner::core::traits::boundary_analysis::BoundaryAnalysis;
/// use pachner::core::triangulation::Triangulation;
///
/// let mut tri = Triangulation::new(3);
/// tri.new_simplex("");
/// assert_eq!(tri.number_of_boundary_facets(), 4);
///
/// // Walking around the ridge {1, 2} of facet 3 lands on facet 0.
/// let partner = tri.boundary_ridge_partner(0, 3, 0).unwrap();
/// assert_eq!((partner.simplex, partner.facet, partner.opposite), (0, 0, 3));
/// ```
pub trait BoundaryAnalysis {
    /// All unglued facets as `(simplex, facet)` in increasing order.
    fn boundary_facets(&self) -> Vec<SimplexFacet>;

    /// Whether facet `f` of simplex `s` is unglued.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` or `f` is out of range.
    fn is_boundary_facet(&self, s: usize, f: usize) -> Result<bool, TriangulationError>;

    /// Number of unglued facets.
    fn number_of_boundary_facets(&self) -> usize {
        self.boundary_facets().len()
    }

    /// Walks from boundary facet `(s, f)` across the ridge omitting `v`.
    ///
    /// # Errors
    ///
    /// Returns an error if the indices are out of range, if `v == f`, or if
    /// `(s, f)` is not a boundary facet.
    fn boundary_ridge_partner(
        &self,
        s: usize,
        f: usize,
        v: usize,
    ) -> Result<RidgePartner, TriangulationError>;
}
