//! Layered solid tori and layered lens spaces.
//!
//! A layered solid torus `LST(a, b, a + b)` starts from a single tetrahedron
//! folded onto itself, `LST(1, 2, 3)`, and grows by layering a tetrahedron
//! across one boundary edge at a time. Its boundary is a one-vertex torus of
//! two triangles whose three edges meet the meridian disc `a`, `b` and
//! `a + b` times. Folding the two boundary triangles together about one edge
//! closes it into a lens space.

use std::collections::BTreeMap;

use crate::core::algorithms::boundary_moves::{boundary_component_edges, fold_across, layer_across};
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::triangulation::Triangulation;
use crate::topology::homology::AbelianGroup;
use itertools::Itertools;

/// A layered solid torus with its boundary weights.
#[derive(Clone, Debug)]
pub struct LayeredSolidTorus {
    tri: Triangulation,
    top: usize,
    /// Meridian weight of each boundary edge of `top`, keyed by its sorted
    /// vertex pair in `top`.
    weights: BTreeMap<(usize, usize), u64>,
    params: (u64, u64),
}

pub(crate) const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Inverse of `q` modulo `p`, assuming `gcd(p, q) = 1` and `p > 1`.
fn mod_inverse(q: u64, p: u64) -> u64 {
    let (mut r0, mut r1) = (i128::from(p), i128::from(q % p));
    let (mut t0, mut t1) = (0_i128, 1_i128);
    while r1 != 0 {
        let k = r0 / r1;
        (r0, r1) = (r1, r0 - k * r1);
        (t0, t1) = (t1, t0 - k * t1);
    }
    let p = i128::from(p);
    u64::try_from(t0.rem_euclid(p)).unwrap_or(0)
}

impl LayeredSolidTorus {
    fn base() -> Self {
        let mut tri = Triangulation::with_simplices(3, 1);
        tri.glue_raw(0, 0, 0, Perm::from_images_unchecked(&[1, 2, 3, 0]));
        let weights = BTreeMap::from([((0, 1), 3), ((0, 2), 2), ((1, 3), 2), ((0, 3), 1), ((1, 2), 1)]);
        Self {
            tri,
            top: 0,
            weights,
            params: (1, 2),
        }
    }

    /// Builds `LST(a, b, a + b)`.
    ///
    /// The order of `a` and `b` does not matter. `LST(1, 2, 3)` is one
    /// tetrahedron and every Euclidean step down from `(a, b)` adds one more.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] if either weight is
    /// zero or they are not coprime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::topology::layered::LayeredSolidTorus;
    ///
    /// let lst = LayeredSolidTorus::new(2, 3).unwrap();
    /// assert_eq!(lst.triangulation().size(), 2);
    /// assert_eq!(lst.meridian_weights(), [2, 3, 5]);
    /// assert!(lst.triangulation().homology(1).unwrap().is_z());
    /// ```
    pub fn new(a: u64, b: u64) -> Result<Self, TriangulationError> {
        let (a, b) = (a.min(b), a.max(b));
        if a == 0 || gcd(a, b) != 1 {
            return Err(TriangulationError::invalid_argument(format!(
                "LST({a}, {b}) needs positive coprime weights"
            )));
        }
        let mut steps = Vec::new();
        let (mut x, mut y) = (a, b);
        while (x, y) != (1, 2) && (x, y) != (1, 1) {
            steps.push((x, y));
            let c = y - x;
            (x, y) = (x.min(c), x.max(c));
        }
        let mut lst = Self::base();
        if (x, y) == (1, 1) {
            lst.layer(3)?;
        }
        for &(x, y) in steps.iter().rev() {
            lst.layer(y - x)?;
        }
        lst.params = (a, b);
        tracing::debug!(a, b, size = lst.tri.size(), "layered solid torus built");
        Ok(lst)
    }

    /// Layers across a boundary edge of the given weight, which becomes the
    /// other diagonal of the boundary quadrilateral.
    fn layer(&mut self, weight: u64) -> Result<(), TriangulationError> {
        let (e0, e1) = self.edge_with_weight(weight)?;
        let (top, x1) = layer_across(&mut self.tri, self.top, e0, e1)?;
        let (Some(w0), Some(w1)) = (self.weight(e0, x1), self.weight(e1, x1)) else {
            return Err(TriangulationError::failed_precondition(
                "layered edge does not meet the boundary torus",
            ));
        };
        let flipped = if weight == w0 + w1 { w0.abs_diff(w1) } else { w0 + w1 };
        self.weights = BTreeMap::from([((2, 3), flipped), ((0, 2), w0), ((1, 3), w0), ((1, 2), w1), ((0, 3), w1)]);
        self.top = top;
        Ok(())
    }

    fn edge_with_weight(&self, weight: u64) -> Result<(usize, usize), TriangulationError> {
        self.weights
            .iter()
            .find(|&(_, &w)| w == weight)
            .map(|(&pair, _)| pair)
            .ok_or_else(|| {
                TriangulationError::invalid_argument(format!("no boundary edge has weight {weight}"))
            })
    }

    /// The underlying triangulation.
    #[must_use]
    pub const fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    /// Consumes the torus, returning its triangulation.
    #[must_use]
    pub fn into_triangulation(self) -> Triangulation {
        self.tri
    }

    /// The tetrahedron carrying both boundary triangles.
    #[must_use]
    pub const fn top(&self) -> usize {
        self.top
    }

    /// `[a, b, a + b]` with `a ≤ b`.
    #[must_use]
    pub const fn meridian_weights(&self) -> [u64; 3] {
        let (a, b) = self.params;
        [a, b, a + b]
    }

    /// Meridian weight of edge `u v` of the top tetrahedron, if it lies on
    /// the boundary.
    #[must_use]
    pub fn weight(&self, u: usize, v: usize) -> Option<u64> {
        self.weights.get(&(u.min(v), u.max(v))).copied()
    }

    /// The three boundary edges as vertex pairs of the top tetrahedron, in the
    /// order of [`meridian_weights`](Self::meridian_weights).
    #[must_use]
    pub fn boundary_pairs(&self) -> [(usize, usize); 3] {
        let skel = self.tri.skeleton();
        let mut seen: Vec<(usize, (usize, usize), u64)> = Vec::with_capacity(3);
        for (&(u, v), &w) in &self.weights {
            let e = skel.simplex_edge(self.top, u, v);
            if seen.iter().all(|&(f, _, _)| f != e) {
                seen.push((e, (u, v), w));
            }
        }
        seen.sort_by_key(|&(_, pair, w)| (w, pair));
        let mut pairs = [(0, 0); 3];
        for (slot, &(_, pair, _)) in pairs.iter_mut().zip(&seen) {
            *slot = pair;
        }
        pairs
    }

    /// Maps a boundary edge of the top tetrahedron to its position in
    /// [`boundary_pairs`](Self::boundary_pairs).
    fn slot_lookup(&self) -> impl Fn(usize, usize) -> Option<usize> {
        let skel = self.tri.skeleton();
        let top = self.top;
        let edges = self.boundary_pairs().map(|(u, v)| skel.simplex_edge(top, u, v));
        move |u, v| edges.iter().position(|&e| e == skel.simplex_edge(top, u, v))
    }

    /// Folds the boundary about an edge of the given weight, closing the
    /// torus into a lens space.
    ///
    /// Folding `LST(a, b, a + b)` about its `a` edge gives `L(a + 2b, b)`,
    /// about its `b` edge `L(2a + b, a)`, and about its `a + b` edge a space
    /// with `H_1 = Z_{b - a}` (`S^2 × S^1` when `a = b`).
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] if no boundary edge has
    /// that weight.
    pub fn fold(self, weight: u64) -> Result<Triangulation, TriangulationError> {
        let (e0, e1) = self.edge_with_weight(weight)?;
        let mut tri = self.tri;
        fold_across(&mut tri, self.top, e0, e1)?;
        Ok(tri)
    }

    /// Every closed triangulation obtained by gluing the boundary of `self`
    /// to the boundary of `other`, with boundary edge `i` of `self` matched to
    /// boundary edge `pairing[i]` of `other` (both in
    /// [`meridian_weights`](Self::meridian_weights) order). Results are
    /// distinct up to isomorphism.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] if `pairing` is not a
    /// permutation of `0..3`.
    pub fn fillings(&self, other: &Self, pairing: [usize; 3]) -> Result<Vec<Triangulation>, TriangulationError> {
        let pairing = Perm::from_images(&pairing)?;
        let (ours, theirs) = (self.slot_lookup(), other.slot_lookup());
        let free = |lst: &Self| -> Vec<usize> {
            (0..4).filter(|&f| lst.tri.simplices()[lst.top].facet(f).is_none()).collect()
        };
        let (fa, fb) = (free(self), free(other));
        if fa.len() != 2 || fb.len() != 2 {
            return Err(TriangulationError::failed_precondition(
                "layered solid torus has lost its boundary",
            ));
        }
        let matches = |f: usize, perm: Perm| {
            (0..4).filter(|&x| x != f).tuple_combinations().all(|(u, v)| {
                ours(u, v).zip(theirs(perm.image(u), perm.image(v)))
                    .is_some_and(|(i, j)| pairing.image(i) == j)
            })
        };

        let mut base = self.tri.clone();
        let offset = base.insert_triangulation(&other.tri)?;
        let far = offset + other.top;
        let mut found: Vec<Triangulation> = Vec::new();
        for (g0, g1) in [(fb[0], fb[1]), (fb[1], fb[0])] {
            for p in Perm::all(4).filter(|p| p.image(fa[0]) == g0 && matches(fa[0], *p)) {
                for q in Perm::all(4).filter(|q| q.image(fa[1]) == g1 && matches(fa[1], *q)) {
                    let mut tri = base.clone();
                    tri.glue_raw(self.top, fa[0], far, p);
                    tri.glue_raw(self.top, fa[1], far, q);
                    if tri.is_valid() && !found.iter().any(|t| t.is_isomorphic_to(&tri)) {
                        found.push(tri);
                    }
                }
            }
        }
        Ok(found)
    }
}

/// The layered lens space `L(p, q)` with the fewest tetrahedra.
///
/// `L(1, 0)` is the one-tetrahedron 3-sphere and `L(0, 1)` is `S^2 × S^1`.
///
/// # Errors
///
/// Returns [`TriangulationError::InvalidArgument`] unless `gcd(p, q) = 1`.
///
/// # Examples
///
/// ```rust
/// use pachner::topology::layered::layered_lens_space;
///
/// let lens = layered_lens_space(8, 3).unwrap();
/// assert_eq!(lens.size(), 2);
/// assert_eq!(lens.count_vertices(), 1);
/// assert!(lens.homology(1).unwrap().is_cyclic_of_order(8));
/// ```
pub fn layered_lens_space(p: u64, q: u64) -> Result<Triangulation, TriangulationError> {
    if gcd(p, q) != 1 {
        return Err(TriangulationError::invalid_argument(format!(
            "L({p}, {q}) needs coprime parameters"
        )));
    }
    let tri = match p {
        0 => LayeredSolidTorus::new(1, 1)?.fold(2)?,
        1 => LayeredSolidTorus::new(1, 2)?.fold(3)?,
        2 => LayeredSolidTorus::new(1, 3)?.fold(4)?,
        _ => {
            let q = q % p;
            let inv = mod_inverse(q, p);
            let mut best: Option<Triangulation> = None;
            for r in [q, p - q, inv, p - inv].into_iter().filter(|&r| 2 * r < p).sorted().dedup() {
                let a = p - 2 * r;
                let candidate = LayeredSolidTorus::new(a, r)?.fold(a)?;
                if best.as_ref().is_none_or(|b| candidate.size() < b.size()) {
                    best = Some(candidate);
                }
            }
            best.ok_or_else(|| TriangulationError::unsolved(format!("no layering found for L({p}, {q})")))?
        }
    };
    tracing::debug!(p, q, size = tri.size(), "layered lens space built");
    Ok(tri)
}

fn cyclic_order(group: &AbelianGroup) -> u64 {
    if group.rank() > 0 {
        0
    } else {
        group.torsion().iter().product()
    }
}

impl Triangulation {
    /// Finds a boundary edge that is null-homologous, layering on the
    /// boundary until one appears, and returns its index.
    ///
    /// The triangulation must be 3-dimensional and valid with `H_1 = Z` and a
    /// single torus boundary component. The boundary is first minimised to one
    /// vertex; then, while every boundary edge has nonzero image in `H_1`, a
    /// tetrahedron is layered across the edge with the largest image,
    /// replacing it by the difference of the other two. Killing the returned
    /// edge leaves `H_1 = Z`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 3,
    /// [`TriangulationError::FailedPrecondition`] if the triangulation does not
    /// have the shape above, and [`TriangulationError::UnsolvedCase`] if the
    /// layering stops making progress.
    pub fn longitude_edge(&mut self) -> Result<usize, TriangulationError> {
        if self.dim() != 3 {
            return Err(TriangulationError::invalid_argument(
                "longitudes need dimension 3",
            ));
        }
        if !self.is_valid() || !self.homology(1)?.is_z() {
            return Err(TriangulationError::failed_precondition(
                "longitude search needs a valid triangulation with H1 = Z",
            ));
        }
        let torus = {
            let skel = self.skeleton();
            let boundary = skel.real_boundary();
            boundary.len() == 1
                && boundary[0]
                    .triangulation()
                    .is_some_and(|b| b.euler_char_tri() == 0 && b.is_orientable())
        };
        if !torus {
            return Err(TriangulationError::failed_precondition(
                "longitude search needs exactly one torus boundary component",
            ));
        }
        self.minimise_boundary()?;

        let mut previous = u64::MAX;
        loop {
            let mut orders = Vec::with_capacity(3);
            for e in boundary_component_edges(self, 0) {
                orders.push((cyclic_order(&self.homology_h1_killing_edge(e)?), e));
            }
            if let Some(&(_, e)) = orders.iter().find(|&&(order, _)| order == 0) {
                tracing::debug!(edge = e, size = self.size(), "longitude found");
                return Ok(e);
            }
            let Some(&(largest, e)) = orders.iter().max() else {
                return Err(TriangulationError::unsolved("boundary torus has no edges"));
            };
            if largest >= previous {
                return Err(TriangulationError::unsolved(
                    "layering towards the longitude stopped making progress",
                ));
            }
            previous = largest;
            tracing::trace!(edge = e, weight = largest, "layering towards the longitude");
            self.layer_on(e)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // LAYERED SOLID TORI
    // =========================================================================

    #[test]
    fn test_sizes_follow_the_euclidean_algorithm() {
        for (a, b, size) in [(1, 2, 1), (1, 1, 2), (1, 3, 2), (2, 3, 2), (3, 4, 3), (1, 5, 4), (3, 5, 3)] {
            let lst = LayeredSolidTorus::new(a, b).unwrap();
            assert_eq!(lst.triangulation().size(), size, "LST({a}, {b})");
            assert_eq!(lst.meridian_weights(), [a.min(b), a.max(b), a + b]);
        }
    }

    #[test]
    fn test_solid_tori_have_one_torus_boundary() {
        for (a, b) in [(1, 2), (1, 1), (2, 3), (3, 7)] {
            let lst = LayeredSolidTorus::new(a, b).unwrap();
            let tri = lst.triangulation();
            assert!(tri.is_valid());
            assert!(tri.is_orientable());
            assert_eq!(tri.count_vertices(), 1);
            assert!(tri.homology(1).unwrap().is_z());
            let skel = tri.skeleton();
            assert_eq!(skel.real_boundary().len(), 1);
            assert_eq!(skel.real_boundary()[0].size(), 2);
        }
    }

    #[test]
    fn test_weights_are_recorded_per_edge() {
        let lst = LayeredSolidTorus::new(1, 2).unwrap();
        assert_eq!(lst.weight(0, 1), Some(3));
        assert_eq!(lst.weight(3, 1), Some(2));
        assert_eq!(lst.weight(2, 3), None);
        assert_eq!(lst.boundary_pairs(), [(0, 3), (0, 2), (0, 1)]);
    }

    #[test]
    fn test_bad_weights_are_rejected() {
        assert!(LayeredSolidTorus::new(0, 1).is_err());
        assert!(LayeredSolidTorus::new(2, 4).is_err());
    }

    // =========================================================================
    // FOLDING
    // =========================================================================

    #[test]
    fn test_folding_rules() {
        for (a, b, weight, order) in [(1, 2, 1, 5), (1, 2, 2, 4), (1, 2, 3, 1), (2, 3, 2, 8), (2, 3, 3, 7), (1, 3, 4, 2), (3, 4, 7, 1)] {
            let tri = LayeredSolidTorus::new(a, b).unwrap().fold(weight).unwrap();
            assert!(tri.is_valid());
            assert!(tri.is_closed());
            assert_eq!(tri.count_vertices(), 1);
            let h1 = tri.homology(1).unwrap();
            assert!(h1.is_cyclic_of_order(order), "LST({a}, {b}) about {weight}: {h1}");
        }
        let s2xs1 = LayeredSolidTorus::new(1, 1).unwrap().fold(2).unwrap();
        assert!(s2xs1.homology(1).unwrap().is_z());
    }

    #[test]
    fn test_lens_spaces_are_minimal_layerings() {
        for (p, q, size) in [(1, 0, 1), (2, 1, 2), (3, 1, 2), (4, 1, 1), (5, 1, 2), (5, 2, 1), (7, 1, 4), (8, 3, 2)] {
            let tri = layered_lens_space(p, q).unwrap();
            assert_eq!(tri.size(), size, "L({p}, {q})");
            assert!(tri.is_orientable());
            assert!(tri.homology(1).unwrap().is_cyclic_of_order(p), "L({p}, {q})");
        }
        assert!(layered_lens_space(0, 1).unwrap().homology(1).unwrap().is_z());
        assert!(layered_lens_space(6, 2).is_err());
        assert!(layered_lens_space(0, 2).is_err());
    }

    #[test]
    fn test_inverse_residues() {
        assert_eq!(mod_inverse(3, 8), 3);
        assert_eq!(mod_inverse(2, 5), 3);
        assert_eq!(gcd(12, 18), 6);
    }

    // =========================================================================
    // FILLINGS AND LONGITUDES
    // =========================================================================

    #[test]
    fn test_fillings_depend_on_the_edge_matching() {
        let a = LayeredSolidTorus::new(1, 2).unwrap();
        let b = LayeredSolidTorus::new(1, 1).unwrap();
        for (pairing, order) in [([0, 1, 2], 1), ([0, 2, 1], 4), ([2, 0, 1], 5)] {
            let fillings = a.fillings(&b, pairing).unwrap();
            assert!(!fillings.is_empty(), "{pairing:?}");
            for tri in fillings {
                assert_eq!(tri.size(), 3);
                assert!(tri.is_closed());
                assert!(tri.homology(1).unwrap().is_cyclic_of_order(order), "{pairing:?}");
            }
        }
        assert!(a.fillings(&b, [0, 0, 1]).is_err());
    }

    #[test]
    fn test_longitude_of_a_solid_torus_is_its_meridian() {
        let mut tri = LayeredSolidTorus::new(2, 3).unwrap().into_triangulation();
        let e = tri.longitude_edge().unwrap();
        assert!(tri.is_valid());
        assert!(tri.homology_h1_killing_edge(e).unwrap().is_z());
        assert!(tri.homology(1).unwrap().is_z());
    }

    #[test]
    fn test_closed_manifolds_have_no_longitude() {
        let mut tri = layered_lens_space(5, 2).unwrap();
        assert!(matches!(
            tri.longitude_edge(),
            Err(TriangulationError::FailedPrecondition { .. })
        ));
    }
}
