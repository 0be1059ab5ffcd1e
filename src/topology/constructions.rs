//! Constructions that build a new triangulation from an old one.
//!
//! Cones and bundles raise the dimension by one; punctures, connected sums
//! and double covers keep it. Bundles triangulate each prism `Δ × [0, 1]` by
//! the staircase `τ_0, …, τ_d`, where `τ_k` has the bottom vertices
//! `0, …, k` followed by the top vertices `k, …, d`. Matching staircases
//! across a gluing needs the gluing to preserve vertex order on the shared
//! facet, so other inputs are barycentrically subdivided first.

use itertools::Itertools;

use crate::core::algorithms::subdivision::{barycentric_raw, chain_index};
use crate::core::error::TriangulationError;
use crate::core::isomorphism::Isomorphism;
use crate::core::perm::{FACTORIALS, Perm};
use crate::core::triangulation::{MAX_DIMENSION, Triangulation};

// =============================================================================
// HELPERS
// =============================================================================

fn is_free(tri: &Triangulation, s: usize, f: usize) -> bool {
    tri.simplices()[s].facet(f).is_none()
}

/// Whether every gluing maps the vertices of its facet in increasing order.
fn is_order_preserving(tri: &Triangulation) -> bool {
    let n = tri.dim() + 1;
    tri.simplices().iter().all(|simplex| {
        simplex.gluings().all(|(f, g)| {
            (0..n)
                .filter(|&v| v != f)
                .map(|v| g.perm.image(v))
                .tuple_windows()
                .all(|(a, b)| a < b)
        })
    })
}

/// A d-ball of `2d` simplices with two outer facets, facet 0 of simplices
/// `0` and `d`, and two inner facets, facet `d` of simplices `d - 1` and
/// `2d - 1`. It is the suspension of a (d-1)-simplex with the north pole
/// truncated; the inner facets triangulate the link of the pole.
fn punctured_pillow(dim: usize) -> Triangulation {
    let mut pillow = Triangulation::with_simplices(dim, 2 * dim);
    let id = Perm::identity(dim + 1);
    let piece = |side: usize, k: usize| side * dim + k - 1;
    for side in 0..2 {
        for k in 2..=dim {
            pillow.glue_raw(piece(side, k), k - 1, piece(side, k - 1), id);
        }
    }
    for j in 1..=dim {
        for k in (1..=dim).filter(|&k| k != j) {
            let facet = if j < k { j - 1 } else { j };
            if is_free(&pillow, piece(0, k), facet) {
                pillow.glue_raw(piece(0, k), facet, piece(1, k), id);
            }
        }
    }
    pillow
}

impl Triangulation {
    fn raised_dimension(&self) -> Result<usize, TriangulationError> {
        if self.dim() < MAX_DIMENSION {
            Ok(self.dim() + 1)
        } else {
            Err(TriangulationError::invalid_argument(format!(
                "no room above dimension {}",
                self.dim()
            )))
        }
    }

    fn same_gluings(&self, other: &Self) -> bool {
        self.size() == other.size()
            && self
                .simplices()
                .iter()
                .zip(other.simplices())
                .all(|(a, b)| a.gluings().eq(b.gluings()))
    }

    /// `self × [0, 1]`, with the ends glued through `monodromy` if given.
    fn prism(&self, monodromy: Option<&Isomorphism>) -> Result<Self, TriangulationError> {
        let top_dim = self.raised_dimension()?;
        let dim = self.dim();
        let n = dim + 1;
        let lifted = !is_order_preserving(self);
        let base = if lifted {
            barycentric_raw(self)
        } else {
            self.clone()
        };

        let piece = |s: usize, k: usize| s * n + k;
        let mut out = Self::with_simplices(top_dim, base.size() * n);
        let id = Perm::identity(n + 1);
        for (s, simplex) in base.simplices().iter().enumerate() {
            for k in 0..dim {
                out.glue_raw(piece(s, k), k + 1, piece(s, k + 1), id);
            }
            for (j, g) in simplex.gluings() {
                let jt = g.perm.image(j);
                for k in (0..n).filter(|&k| k != j) {
                    let facet = if j < k { j } else { j + 1 };
                    if !is_free(&out, piece(s, k), facet) {
                        continue;
                    }
                    // Bottom vertex i sits at slot i of τ_k, top vertex i at
                    // slot i + 1; the gluing keeps the split vertex aligned.
                    let kt = g.perm.image(k);
                    let mut images = vec![0; n + 1];
                    for i in (0..n).filter(|&i| i != j) {
                        let gi = g.perm.image(i);
                        if i <= k {
                            images[i] = gi;
                        }
                        if i >= k {
                            images[i + 1] = gi + 1;
                        }
                    }
                    images[facet] = if jt < kt { jt } else { jt + 1 };
                    out.glue_raw(
                        piece(s, k),
                        facet,
                        piece(g.simplex, kt),
                        Perm::from_images_unchecked(&images),
                    );
                }
            }
        }

        if let Some(phi) = monodromy {
            let fact = FACTORIALS[n] as usize;
            for s in 0..base.size() {
                let (target, perm) = if lifted {
                    let (orig, rank) = (s / fact, s % fact);
                    let chain = Perm::from_index(n, rank as u64)?;
                    let image = phi.facet_perm(orig).compose(chain);
                    (
                        chain_index(n, phi.simplex_image(orig), image),
                        Perm::identity(n),
                    )
                } else {
                    (phi.simplex_image(s), phi.facet_perm(s))
                };
                // The top facet of τ_0 meets the bottom facet of τ_d.
                let images: Vec<usize> = std::iter::once(n)
                    .chain((0..n).map(|i| perm.image(i)))
                    .collect();
                out.glue_raw(
                    piece(s, 0),
                    0,
                    piece(target, dim),
                    Perm::from_images_unchecked(&images),
                );
            }
        }

        if self.is_orientable() && out.is_orientable() {
            out.orient();
        }
        out.debug_check_invariants();
        tracing::debug!(
            base = self.size(),
            size = out.size(),
            subdivided = lifted,
            closed_up = monodromy.is_some(),
            "prism built"
        );
        Ok(out)
    }
}

// =============================================================================
// CONES AND BUNDLES
// =============================================================================

impl Triangulation {
    /// The cone over this triangulation, one dimension up.
    ///
    /// Each simplex becomes the (d+1)-simplex with a new apex at vertex
    /// `d + 1`; facet `d + 1` is the original simplex and stays free.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] at the largest
    /// supported dimension.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let ball = standard::sphere_two_simplices(2).cone().unwrap();
    /// assert_eq!(ball.dim(), 3);
    /// assert_eq!(ball.count_vertices(), 4);
    /// assert_eq!(ball.count_boundary_facets(), 2);
    /// ```
    pub fn cone(&self) -> Result<Self, TriangulationError> {
        let top_dim = self.raised_dimension()?;
        let mut out = Self::with_simplices(top_dim, self.size());
        for (s, f, g) in self.gluings() {
            if is_free(&out, s, f) {
                out.glue_raw(s, f, g.simplex, g.perm.extend(top_dim + 1));
            }
        }
        Ok(out)
    }

    /// `self × [0, 1]`. Both ends are copies of `self` on the boundary.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] at the largest
    /// supported dimension.
    pub fn i_bundle(&self) -> Result<Self, TriangulationError> {
        self.prism(None)
    }

    /// `self × S¹`.
    ///
    /// # Errors
    ///
    /// As for [`i_bundle`](Self::i_bundle).
    pub fn s1_bundle(&self) -> Result<Self, TriangulationError> {
        self.prism(Some(&Isomorphism::identity(self.dim(), self.size())))
    }

    /// The mapping torus of `monodromy`: `self × [0, 1]` with the top copy
    /// of each simplex `s` glued to the bottom copy of its image.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] unless `monodromy` is
    /// an automorphism of this triangulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    /// use pachner::triangulation::standard;
    ///
    /// // Swapping the hemispheres of S² reflects it.
    /// let sphere = standard::sphere_two_simplices(2);
    /// let flip = Isomorphism::new(2, vec![1, 0], vec![Perm::identity(3); 2]).unwrap();
    /// let bundle = sphere.bundle_with_monodromy(&flip).unwrap();
    /// assert!(!bundle.is_orientable());
    /// assert!(bundle.homology(1).unwrap().is_z());
    /// ```
    pub fn bundle_with_monodromy(&self, monodromy: &Isomorphism) -> Result<Self, TriangulationError> {
        let image = monodromy.apply(self)?;
        if !image.same_gluings(self) {
            return Err(TriangulationError::invalid_argument(
                "monodromy is not an automorphism of the fibre",
            ));
        }
        self.prism(Some(monodromy))
    }
}

// =============================================================================
// COVERS, PUNCTURES AND SUMS
// =============================================================================

impl Triangulation {
    /// The orientable double cover.
    ///
    /// Simplex `s` lifts to `s` and `s + size()`. A gluing that agrees with
    /// the orientation chosen on each component stays on its sheet; the
    /// others cross. An orientable input gives two copies of itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let torus = standard::klein_bottle().double_cover();
    /// assert_eq!(torus.size(), 4);
    /// assert!(torus.is_orientable());
    /// assert!(torus.is_connected());
    /// assert_eq!(torus.euler_char_tri(), 0);
    /// ```
    #[must_use]
    pub fn double_cover(&self) -> Self {
        let size = self.size();
        let skeleton = self.skeleton();
        let mut out = Self::with_simplices(self.dim(), 2 * size);
        for (s, f, g) in self.gluings() {
            let consistent = skeleton.orientation(g.simplex)
                == -skeleton.orientation(s) * g.perm.sign();
            for sheet in 0..2 {
                let other = if consistent { sheet } else { 1 - sheet };
                let (s2, t2) = (s + sheet * size, g.simplex + other * size);
                if is_free(&out, s2, f) {
                    out.glue_raw(s2, f, t2, g.perm);
                }
            }
        }
        out.debug_check_invariants();
        out
    }

    /// Removes a small ball, leaving a new (d-1)-sphere boundary component
    /// made of two facets.
    ///
    /// The cut is made along facet `f` of simplex `s` (facet 0 of simplex 0
    /// by default) and filled by `2d` new simplices. The new boundary is
    /// facet `d` of simplices `old + d - 1` and `old + 2d - 1`, where `old`
    /// is the size before the call.
    ///
    /// # Errors
    ///
    /// Returns a range error for a bad location and
    /// [`TriangulationError::FailedPrecondition`] on an empty triangulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let mut sphere = standard::sphere_two_simplices(3);
    /// sphere.puncture(None).unwrap();
    /// assert_eq!(sphere.size(), 8);
    /// assert_eq!(sphere.count_boundary_facets(), 2);
    /// ```
    pub fn puncture(&mut self, at: Option<(usize, usize)>) -> Result<(), TriangulationError> {
        if self.is_empty() {
            return Err(TriangulationError::failed_precondition(
                "cannot puncture an empty triangulation",
            ));
        }
        let (s, f) = at.unwrap_or((0, 0));
        self.check_facet(s, f)?;
        let dim = self.dim();

        let neighbour = self.unglue_raw(s, f);
        let base = self.insert_triangulation(&punctured_pillow(dim))?;
        let images: Vec<usize> = std::iter::once(f)
            .chain((0..=dim).filter(|&v| v != f))
            .collect();
        let p = Perm::from_images_unchecked(&images);
        self.glue_raw(base, 0, s, p);
        if let Some(g) = neighbour {
            self.glue_raw(base + dim, 0, g.simplex, g.perm.compose(p));
        }
        self.debug_check_invariants();
        tracing::debug!(simplex = s, facet = f, size = self.size(), "punctured");
        Ok(())
    }

    /// Replaces this triangulation by its connected sum with `other`.
    ///
    /// Both are punctured at their default locations and the two new sphere
    /// boundaries are glued together.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::DimensionMismatch`] for different
    /// dimensions and [`TriangulationError::FailedPrecondition`] unless both
    /// triangulations are non-empty, closed and connected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let mut sum = standard::lens_space(5, 2).unwrap();
    /// sum.connected_sum(&standard::lens_space(8, 3).unwrap()).unwrap();
    /// assert!(sum.homology(1).unwrap().is_cyclic_of_order(40));
    /// ```
    pub fn connected_sum(&mut self, other: &Self) -> Result<(), TriangulationError> {
        if other.dim() != self.dim() {
            return Err(TriangulationError::DimensionMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        for (which, tri) in [("left", &*self), ("right", other)] {
            if tri.is_empty() || !tri.is_closed() || !tri.is_connected() {
                return Err(TriangulationError::failed_precondition(format!(
                    "{which} summand is not closed and connected"
                )));
            }
        }
        let dim = self.dim();
        let left = self.size();
        self.puncture(None)?;
        let mut right = other.clone();
        right.puncture(None)?;
        let offset = self.insert_triangulation(&right)? + other.size();

        let id = Perm::identity(dim + 1);
        self.glue_raw(left + dim - 1, dim, offset + dim - 1, id);
        self.glue_raw(left + 2 * dim - 1, dim, offset + 2 * dim - 1, id);
        self.debug_check_invariants();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::standard;

    // =========================================================================
    // CONES
    // =========================================================================

    #[test]
    fn test_cone_over_a_sphere_is_a_ball() {
        let ball = standard::sphere_two_simplices(2).cone().unwrap();
        assert!(ball.is_valid());
        assert!(!ball.is_ideal());
        assert_eq!(ball.size(), 2);
        assert_eq!(ball.count_vertices(), 4);
        assert!(ball.homology(1).unwrap().is_trivial());
    }

    #[test]
    fn test_cone_over_a_torus_has_an_ideal_apex() {
        let cone = standard::torus().cone().unwrap();
        assert!(cone.is_valid());
        assert!(cone.is_ideal());
        assert_eq!(cone.count_vertices(), 2);
        assert_eq!(cone.count_boundary_facets(), 2);
    }

    #[test]
    fn test_cone_rejects_the_top_dimension() {
        let mut tri = Triangulation::new(MAX_DIMENSION);
        tri.new_simplex("");
        assert!(tri.cone().is_err());
    }

    // =========================================================================
    // BUNDLES
    // =========================================================================

    #[test]
    fn test_prism_over_a_triangle() {
        let mut triangle = Triangulation::new(2);
        triangle.new_simplex("");
        let prism = triangle.i_bundle().unwrap();
        assert_eq!(prism.size(), 3);
        assert_eq!(prism.count_vertices(), 6);
        assert_eq!(prism.count_boundary_facets(), 8);
        assert!(prism.is_valid());
    }

    #[test]
    fn test_order_preserving_gluings_are_used_directly() {
        let mut disc = Triangulation::new(2);
        disc.new_simplices(2);
        disc.join(0, 0, 1, Perm::from_images(&[2, 0, 1]).unwrap())
            .unwrap();
        assert!(is_order_preserving(&disc));
        let prism = disc.i_bundle().unwrap();
        assert_eq!(prism.size(), 6);
        assert!(prism.is_valid());
        assert!(prism.homology(1).unwrap().is_trivial());
        assert_eq!(prism.count_boundary_facets(), 12);
    }

    #[test]
    fn test_thickened_torus_has_two_torus_boundaries() {
        let torus = standard::torus();
        assert!(!is_order_preserving(&torus));
        let thick = torus.i_bundle().unwrap();
        assert_eq!(thick.size(), 36, "subdivided first: 12 triangles × 3");
        assert!(thick.is_valid());
        assert!(thick.is_orientable());
        assert_eq!(thick.count_boundary_facets(), 24);
        assert_eq!(thick.boundary_components().len(), 2);
        assert_eq!(thick.homology(1).unwrap().rank(), 2);
    }

    #[test]
    fn test_circle_bundles() {
        let s2xs1 = standard::sphere_two_simplices(2).s1_bundle().unwrap();
        assert_eq!(s2xs1.size(), 6);
        assert!(s2xs1.is_valid() && s2xs1.is_closed());
        assert!(s2xs1.is_orientable());
        assert!(s2xs1.homology(1).unwrap().is_z());

        let t3 = standard::torus().s1_bundle().unwrap();
        assert!(t3.is_valid() && t3.is_closed());
        assert_eq!(t3.homology(1).unwrap().rank(), 3);
        assert!(t3.homology(1).unwrap().torsion().is_empty());
    }

    #[test]
    fn test_monodromy_must_be_an_automorphism() {
        let sphere = standard::sphere_two_simplices(2);
        let twist = Isomorphism::new(
            2,
            vec![0, 1],
            vec![Perm::transposition(3, 0, 1), Perm::identity(3)],
        )
        .unwrap();
        let err = sphere.bundle_with_monodromy(&twist).unwrap_err();
        assert!(matches!(err, TriangulationError::InvalidArgument { .. }));

        let wrong_size = Isomorphism::identity(2, 3);
        assert!(sphere.bundle_with_monodromy(&wrong_size).is_err());
    }

    #[test]
    fn test_reflecting_monodromy_is_non_orientable() {
        let sphere = standard::sphere_two_simplices(2);
        let flip = Isomorphism::new(2, vec![1, 0], vec![Perm::identity(3); 2]).unwrap();
        let bundle = sphere.bundle_with_monodromy(&flip).unwrap();
        assert!(bundle.is_valid() && bundle.is_closed());
        assert!(!bundle.is_orientable());
        assert!(bundle.homology(1).unwrap().is_z());
    }

    // =========================================================================
    // DOUBLE COVERS
    // =========================================================================

    #[test]
    fn test_double_covers_of_surfaces() {
        let sphere = standard::rp2().double_cover();
        assert_eq!(sphere.size(), 4);
        assert!(sphere.is_connected() && sphere.is_orientable());
        assert_eq!(sphere.euler_char_tri(), 2);

        let two_tori = standard::torus().double_cover();
        assert_eq!(two_tori.count_components(), 2);
        assert_eq!(two_tori.euler_char_tri(), 0);
    }

    // =========================================================================
    // PUNCTURES AND SUMS
    // =========================================================================

    #[test]
    fn test_pillow_has_four_free_facets() {
        for dim in 2..=4 {
            let pillow = punctured_pillow(dim);
            assert_eq!(pillow.size(), 2 * dim);
            assert_eq!(pillow.count_boundary_facets(), 4, "dimension {dim}");
            assert!(pillow.is_valid());
        }
    }

    #[test]
    fn test_punctured_sphere_is_a_ball() {
        let mut sphere = standard::sphere_two_simplices(3);
        sphere.puncture(None).unwrap();
        assert!(sphere.is_valid());
        assert_eq!(sphere.boundary_components().len(), 1);
        assert!(sphere.homology(1).unwrap().is_trivial());
        assert!(sphere.homology(2).unwrap().is_trivial());
        assert!(sphere.simplices()[2 + 2].facet(3).is_none());
        assert!(sphere.simplices()[2 + 5].facet(3).is_none());
    }

    #[test]
    fn test_puncture_checks_its_location() {
        let mut empty = Triangulation::new(3);
        assert!(matches!(
            empty.puncture(None),
            Err(TriangulationError::FailedPrecondition { .. })
        ));
        let mut sphere = standard::sphere_two_simplices(3);
        assert!(sphere.puncture(Some((2, 0))).is_err());
        assert!(sphere.puncture(Some((0, 4))).is_err());
        assert_eq!(sphere.size(), 2);
    }

    #[test]
    fn test_connected_sum_adds_homology() {
        let mut sum = standard::lens_space(5, 2).unwrap();
        sum.connected_sum(&standard::lens_space(8, 3).unwrap())
            .unwrap();
        assert_eq!(sum.size(), 1 + 2 + 12);
        assert!(sum.is_valid() && sum.is_closed() && sum.is_connected());
        assert!(sum.is_orientable());
        assert!(sum.homology(1).unwrap().is_cyclic_of_order(40));
    }

    #[test]
    fn test_connected_sum_needs_closed_summands() {
        let mut sphere = standard::sphere_two_simplices(3);
        let ball = standard::ball(3);
        assert!(matches!(
            sphere.connected_sum(&ball),
            Err(TriangulationError::FailedPrecondition { .. })
        ));
        assert!(matches!(
            sphere.connected_sum(&standard::torus()),
            Err(TriangulationError::DimensionMismatch { .. })
        ));
    }
}
