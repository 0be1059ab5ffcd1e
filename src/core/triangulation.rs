//! The triangulation container.
//!
//! A [`Triangulation`] owns an ordered sequence of d-simplices whose facets are
//! glued in pairs by permutations. Simplices are addressed by index; indices are
//! always contiguous `0..size`. The container enforces gluing symmetry on every
//! edit and drops its cached [`Skeleton`] whenever the gluing graph changes.
//!
//! # Examples
//!
//! ```
//! use pachner::core::perm::Perm;
//! use pachner::core::triangulation::Triangulation;
//!
//! // Two tetrahedra glued along all four facets form a 3-sphere.
//! let mut tri = Triangulation::new(3);
//! tri.new_simplices(2);
//! for f in 0..4 {
//!     tri.join(0, f, 1, Perm::identity(4)).unwrap();
//! }
//! assert!(tri.is_closed());
//! assert_eq!(tri.count_vertices(), 4);
//! assert_eq!(tri.f_vector(), vec![4, 6, 4, 2]);
//! ```

use crate::core::error::TriangulationError;
use crate::core::perm::{MAX_PERM_DEGREE, Perm};
use crate::core::simplex::{Gluing, Simplex};
use crate::core::skeleton::{FaceLink, Skeleton};
use crate::core::traits::property_cache::PropertyCache;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Largest supported dimension.
pub const MAX_DIMENSION: usize = MAX_PERM_DEGREE - 1;

/// A d-dimensional triangulation built from facet-glued simplices.
#[derive(Serialize, Deserialize)]
#[serde(try_from = "TriangulationRepr", into = "TriangulationRepr")]
pub struct Triangulation {
    dim: usize,
    simplices: Vec<Simplex>,
    /// Bumped on every structural modification; starts at 1.
    generation: AtomicU64,
    skeleton: ArcSwapOption<Skeleton>,
    cached_generation: AtomicU64,
}

// =============================================================================
// CONSTRUCTION AND BASIC ACCESS
// =============================================================================

impl Triangulation {
    /// An empty triangulation of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim` is outside `1..=MAX_DIMENSION`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        assert!(
            (1..=MAX_DIMENSION).contains(&dim),
            "dimension {dim} outside 1..={MAX_DIMENSION}"
        );
        Self::from_parts(dim, Vec::new())
    }

    /// Fallible form of [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] for unsupported dimensions.
    pub fn try_new(dim: usize) -> Result<Self, TriangulationError> {
        if (1..=MAX_DIMENSION).contains(&dim) {
            Ok(Self::from_parts(dim, Vec::new()))
        } else {
            Err(TriangulationError::invalid_argument(format!(
                "dimension {dim} outside 1..={MAX_DIMENSION}"
            )))
        }
    }

    pub(crate) fn from_parts(dim: usize, simplices: Vec<Simplex>) -> Self {
        Self {
            dim,
            simplices,
            generation: AtomicU64::new(1),
            skeleton: ArcSwapOption::empty(),
            cached_generation: AtomicU64::new(0),
        }
    }

    /// `count` isolated simplices with empty descriptions.
    pub(crate) fn with_simplices(dim: usize, count: usize) -> Self {
        Self::from_parts(dim, (0..count).map(|_| Simplex::new(dim, "")).collect())
    }

    /// Dimension `d`.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of top-dimensional simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.simplices.len()
    }

    /// Whether there are no simplices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    /// All simplices in index order.
    #[must_use]
    pub fn simplices(&self) -> &[Simplex] {
        &self.simplices
    }

    /// Simplex `i`, if it exists.
    #[must_use]
    pub fn simplex(&self, i: usize) -> Option<&Simplex> {
        self.simplices.get(i)
    }

    /// Iterator over every glued facet as `(simplex, facet, gluing)`, each
    /// gluing reported from both sides.
    pub fn gluings(&self) -> impl Iterator<Item = (usize, usize, Gluing)> + '_ {
        self.simplices
            .iter()
            .enumerate()
            .flat_map(|(s, simplex)| simplex.gluings().map(move |(f, g)| (s, f, g)))
    }

    pub(crate) fn check_simplex(&self, s: usize) -> Result<(), TriangulationError> {
        if s < self.simplices.len() {
            Ok(())
        } else {
            Err(TriangulationError::SimplexOutOfRange {
                index: s,
                size: self.simplices.len(),
            })
        }
    }

    pub(crate) fn check_facet(&self, s: usize, f: usize) -> Result<(), TriangulationError> {
        self.check_simplex(s)?;
        if f <= self.dim {
            Ok(())
        } else {
            Err(TriangulationError::FacetOutOfRange {
                facet: f,
                dim: self.dim,
            })
        }
    }

    #[inline]
    fn bump_generation(&self) {
        // Relaxed is fine for an invalidation counter
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.invalidate();
    }
}

// =============================================================================
// EDITING
// =============================================================================

impl Triangulation {
    /// Appends an isolated simplex and returns its index.
    pub fn new_simplex(&mut self, description: impl Into<String>) -> usize {
        self.simplices.push(Simplex::new(self.dim, description));
        self.bump_generation();
        self.simplices.len() - 1
    }

    /// Appends `count` isolated simplices and returns their index range.
    pub fn new_simplices(&mut self, count: usize) -> Range<usize> {
        let start = self.simplices.len();
        self.simplices
            .extend((0..count).map(|_| Simplex::new(self.dim, "")));
        self.bump_generation();
        start..self.simplices.len()
    }

    /// Replaces the description of simplex `s`.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is out of range.
    pub fn set_description(
        &mut self,
        s: usize,
        description: impl Into<String>,
    ) -> Result<(), TriangulationError> {
        self.check_simplex(s)?;
        self.simplices[s].set_description(description);
        Ok(())
    }

    /// Glues facet `f` of simplex `s` to facet `perm(f)` of simplex `t`.
    ///
    /// Vertex `v` of `s` is identified with vertex `perm(v)` of `t`. Different
    /// facets of one simplex may be glued together; a facet glued to itself is
    /// rejected.
    ///
    /// # Errors
    ///
    /// - index errors for `s`, `t` or `f`;
    /// - [`TriangulationError::DimensionMismatch`] if `perm` has the wrong degree;
    /// - [`TriangulationError::SelfGluing`] if `t == s` and `perm(f) == f`;
    /// - [`TriangulationError::FacetAlreadyGlued`] if either facet is in use.
    pub fn join(&mut self, s: usize, f: usize, t: usize, perm: Perm) -> Result<(), TriangulationError> {
        self.check_facet(s, f)?;
        self.check_simplex(t)?;
        if perm.degree() != self.dim + 1 {
            return Err(TriangulationError::DimensionMismatch {
                expected: self.dim + 1,
                found: perm.degree(),
            });
        }
        let g = perm.image(f);
        if s == t && g == f {
            return Err(TriangulationError::SelfGluing { simplex: s, facet: f });
        }
        if self.simplices[s].facet(f).is_some() {
            return Err(TriangulationError::FacetAlreadyGlued { simplex: s, facet: f });
        }
        if self.simplices[t].facet(g).is_some() {
            return Err(TriangulationError::FacetAlreadyGlued { simplex: t, facet: g });
        }
        self.glue_raw(s, f, t, perm);
        Ok(())
    }

    /// Removes the gluing on facet `f` of simplex `s`, returning it.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` or `f` is out of range.
    pub fn unjoin(&mut self, s: usize, f: usize) -> Result<Option<Gluing>, TriangulationError> {
        self.check_facet(s, f)?;
        Ok(self.unglue_raw(s, f))
    }

    /// Unglues every facet of simplex `s`.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is out of range.
    pub fn isolate(&mut self, s: usize) -> Result<(), TriangulationError> {
        self.check_simplex(s)?;
        for f in 0..=self.dim {
            self.unglue_raw(s, f);
        }
        Ok(())
    }

    /// Removes simplex `s`, ungluing it first. Later simplices shift down by one.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is out of range.
    pub fn remove_simplex(&mut self, s: usize) -> Result<Simplex, TriangulationError> {
        self.check_simplex(s)?;
        self.isolate(s)?;
        let removed = self.simplices.remove(s);
        for simplex in &mut self.simplices {
            for slot in simplex.facets_mut() {
                if let Some(g) = slot
                    && g.simplex > s
                {
                    g.simplex -= 1;
                }
            }
        }
        self.bump_generation();
        Ok(removed)
    }

    /// Removes all simplices.
    pub fn remove_all_simplices(&mut self) {
        self.simplices.clear();
        self.bump_generation();
    }

    /// Removes a set of simplices in one pass, ungluing them first.
    ///
    /// Surviving simplices keep their relative order.
    pub(crate) fn remove_simplices(&mut self, doomed: &[usize]) {
        if doomed.is_empty() {
            return;
        }
        let mut remove = vec![false; self.simplices.len()];
        for &s in doomed {
            remove[s] = true;
            for f in 0..=self.dim {
                self.unglue_raw(s, f);
            }
        }
        let mut new_index = vec![usize::MAX; self.simplices.len()];
        let mut next = 0;
        for (s, &gone) in remove.iter().enumerate() {
            if !gone {
                new_index[s] = next;
                next += 1;
            }
        }
        let mut s = 0;
        self.simplices.retain(|_| {
            let keep = !remove[s];
            s += 1;
            keep
        });
        for simplex in &mut self.simplices {
            for g in simplex.facets_mut().iter_mut().flatten() {
                g.simplex = new_index[g.simplex];
            }
        }
        self.bump_generation();
    }

    /// Appends a copy of `other`'s simplices and gluings; returns the index
    /// offset of the copy.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::DimensionMismatch`] if the dimensions differ.
    pub fn insert_triangulation(&mut self, other: &Self) -> Result<usize, TriangulationError> {
        if other.dim != self.dim {
            return Err(TriangulationError::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        let offset = self.simplices.len();
        self.simplices.extend(other.simplices.iter().map(|simplex| {
            let mut copy = simplex.clone();
            for g in copy.facets_mut().iter_mut().flatten() {
                g.simplex += offset;
            }
            copy
        }));
        self.bump_generation();
        Ok(offset)
    }

    /// Exchanges the contents of two triangulations of the same dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::DimensionMismatch`] if the dimensions differ.
    pub fn swap(&mut self, other: &mut Self) -> Result<(), TriangulationError> {
        if other.dim != self.dim {
            return Err(TriangulationError::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        std::mem::swap(&mut self.simplices, &mut other.simplices);
        self.bump_generation();
        other.bump_generation();
        Ok(())
    }

    /// Takes over the simplices of `other`, which must have the same dimension.
    pub(crate) fn replace_simplices(&mut self, other: Self) {
        debug_assert_eq!(self.dim, other.dim, "replacing across dimensions");
        self.simplices = other.simplices;
        self.bump_generation();
    }

    /// Symmetric gluing without checks. Both slots must be free.
    pub(crate) fn glue_raw(&mut self, s: usize, f: usize, t: usize, perm: Perm) {
        let g = perm.image(f);
        debug_assert!(self.simplices[s].facet(f).is_none(), "facet {f} of {s} in use");
        debug_assert!(self.simplices[t].facet(g).is_none(), "facet {g} of {t} in use");
        debug_assert!(s != t || g != f, "facet {f} of {s} glued to itself");
        self.simplices[s].set_facet(f, Some(Gluing { simplex: t, perm }));
        self.simplices[t].set_facet(
            g,
            Some(Gluing {
                simplex: s,
                perm: perm.inverse(),
            }),
        );
        self.bump_generation();
    }

    /// Symmetric ungluing without range checks.
    pub(crate) fn unglue_raw(&mut self, s: usize, f: usize) -> Option<Gluing> {
        let gluing = self.simplices[s].facet(f)?;
        self.simplices[s].set_facet(f, None);
        self.simplices[gluing.simplex].set_facet(gluing.target_facet(f), None);
        self.bump_generation();
        Some(gluing)
    }

    /// Relabels the vertices of simplex `s` by `pi` (old vertex `v` becomes `pi(v)`).
    pub(crate) fn relabel_simplex(&mut self, s: usize, pi: Perm) {
        if pi.is_identity() {
            return;
        }
        let inverse = pi.inverse();
        let old: Vec<Option<Gluing>> = (0..=self.dim).map(|f| self.simplices[s].facet(f)).collect();
        for f in 0..=self.dim {
            self.simplices[s].set_facet(f, None);
        }
        for (f, slot) in old.into_iter().enumerate() {
            let Some(g) = slot else { continue };
            let new_f = pi.image(f);
            if g.simplex == s {
                let perm = pi.compose(g.perm).compose(inverse);
                self.simplices[s].set_facet(new_f, Some(Gluing { simplex: s, perm }));
            } else {
                let perm = g.perm.compose(inverse);
                self.simplices[s].set_facet(new_f, Some(Gluing { simplex: g.simplex, perm }));
                self.simplices[g.simplex].set_facet(
                    g.perm.image(f),
                    Some(Gluing {
                        simplex: s,
                        perm: perm.inverse(),
                    }),
                );
            }
        }
        self.bump_generation();
    }

    /// Checks gluing symmetry and permutation degrees.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] describing the first
    /// inconsistent facet.
    pub fn check_gluings(&self) -> Result<(), TriangulationError> {
        for (s, f, g) in self.gluings() {
            if g.perm.degree() != self.dim + 1 || g.simplex >= self.simplices.len() {
                return Err(TriangulationError::invalid_argument(format!(
                    "facet {f} of simplex {s} has a malformed gluing"
                )));
            }
            let back = self.simplices[g.simplex].facet(g.target_facet(f));
            let expected = Gluing {
                simplex: s,
                perm: g.perm.inverse(),
            };
            if back != Some(expected) || (g.simplex == s && g.target_facet(f) == f) {
                return Err(TriangulationError::invalid_argument(format!(
                    "facet {f} of simplex {s} is not glued symmetrically"
                )));
            }
        }
        Ok(())
    }

    /// Asserts gluing symmetry when the `debug-invariants` feature is enabled.
    #[inline]
    pub(crate) fn debug_check_invariants(&self) {
        #[cfg(feature = "debug-invariants")]
        if let Err(err) = self.check_gluings() {
            panic!("triangulation invariant violated: {err}");
        }
    }
}

// =============================================================================
// ORIENTATION AND COMPONENTS
// =============================================================================

impl Triangulation {
    /// Relabels simplices so that every gluing in an orientable component is
    /// odd. Non-orientable components are relabelled along a spanning tree.
    pub fn orient(&mut self) {
        let skeleton = self.skeleton();
        let transposition = Perm::transposition(self.dim + 1, self.dim - 1, self.dim);
        for s in 0..self.simplices.len() {
            if skeleton.orientation(s) < 0 {
                self.relabel_simplex(s, transposition);
            }
        }
    }

    /// Whether every gluing permutation is odd.
    #[must_use]
    pub fn is_oriented(&self) -> bool {
        self.gluings().all(|(_, _, g)| g.perm.sign() < 0)
    }

    /// Reverses the orientation of every simplex by swapping its last two vertices.
    pub fn reflect(&mut self) {
        let transposition = Perm::transposition(self.dim + 1, self.dim - 1, self.dim);
        for s in 0..self.simplices.len() {
            self.relabel_simplex(s, transposition);
        }
    }

    /// One triangulation per connected component, in component order.
    #[must_use]
    pub fn split_into_components(&self) -> Vec<Self> {
        let skeleton = self.skeleton();
        let mut position = vec![0; self.simplices.len()];
        for component in skeleton.components() {
            for (i, &s) in component.simplices().iter().enumerate() {
                position[s] = i;
            }
        }
        skeleton
            .components()
            .iter()
            .map(|component| {
                let simplices = component
                    .simplices()
                    .iter()
                    .map(|&s| {
                        let mut copy = self.simplices[s].clone();
                        for g in copy.facets_mut().iter_mut().flatten() {
                            g.simplex = position[g.simplex];
                        }
                        copy
                    })
                    .collect();
                Self::from_parts(self.dim, simplices)
            })
            .collect()
    }
}

// =============================================================================
// SKELETON QUERIES
// =============================================================================

impl Triangulation {
    /// The current skeleton snapshot.
    #[must_use]
    pub fn skeleton(&self) -> Arc<Skeleton> {
        self.cached_skeleton()
    }

    /// Number of `k`-faces; `k = d` counts simplices.
    #[must_use]
    pub fn count_faces(&self, k: usize) -> usize {
        if k == self.dim {
            self.size()
        } else {
            self.skeleton().count_faces(k)
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn count_vertices(&self) -> usize {
        self.count_faces(0)
    }

    /// Number of edges.
    #[must_use]
    pub fn count_edges(&self) -> usize {
        self.count_faces(1)
    }

    /// `[f_0, …, f_d]`.
    #[must_use]
    pub fn f_vector(&self) -> Vec<usize> {
        self.skeleton().f_vector()
    }

    /// Number of connected components.
    #[must_use]
    pub fn count_components(&self) -> usize {
        self.skeleton().components().len()
    }

    /// Whether there is at most one component.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.count_components() <= 1
    }

    /// Whether every component is orientable.
    #[must_use]
    pub fn is_orientable(&self) -> bool {
        self.skeleton().is_orientable()
    }

    /// Whether any facet is unglued.
    #[must_use]
    pub fn has_boundary_facets(&self) -> bool {
        self.simplices.iter().any(Simplex::has_boundary)
    }

    /// Number of unglued facets.
    #[must_use]
    pub fn count_boundary_facets(&self) -> usize {
        self.simplices
            .iter()
            .map(|s| (0..=self.dim).filter(|&f| s.facet(f).is_none()).count())
            .sum()
    }

    /// The link of the `k`-face `i` with its inclusion map.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist or `k > d - 2`.
    pub fn face_link(&self, k: usize, i: usize) -> Result<FaceLink, TriangulationError> {
        self.skeleton().link(self, k, i)
    }

    /// The link of vertex `v`.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex does not exist or `d < 2`.
    pub fn vertex_link(&self, v: usize) -> Result<FaceLink, TriangulationError> {
        self.face_link(0, v)
    }
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

impl PropertyCache for Triangulation {
    fn skeleton_slot(&self) -> &ArcSwapOption<Skeleton> {
        &self.skeleton
    }

    fn cached_generation(&self) -> &AtomicU64 {
        &self.cached_generation
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    fn build_skeleton(&self) -> Skeleton {
        Skeleton::build(self)
    }
}

impl Clone for Triangulation {
    fn clone(&self) -> Self {
        Self::from_parts(self.dim, self.simplices.clone())
    }
}

/// Identical triangulations: same dimension, descriptions and gluings.
impl PartialEq for Triangulation {
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim && self.simplices == other.simplices
    }
}

impl Eq for Triangulation {}

impl fmt::Debug for Triangulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triangulation")
            .field("dim", &self.dim)
            .field("simplices", &self.simplices)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Triangulation {
    /// One line per simplex: `index: adjacent(facet perm) …`, `boundary` for free facets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}-dimensional triangulation, {} simplices", self.dim, self.size())?;
        for (s, simplex) in self.simplices.iter().enumerate() {
            write!(f, "{s}:")?;
            for facet in 0..=self.dim {
                match simplex.facet(facet) {
                    Some(g) => write!(f, " {}({})", g.simplex, g.perm)?,
                    None => write!(f, " boundary")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serialized form: dimension and simplices only.
#[derive(Serialize, Deserialize)]
struct TriangulationRepr {
    dim: usize,
    simplices: Vec<Simplex>,
}

impl From<Triangulation> for TriangulationRepr {
    fn from(tri: Triangulation) -> Self {
        Self {
            dim: tri.dim,
            simplices: tri.simplices,
        }
    }
}

impl TryFrom<TriangulationRepr> for Triangulation {
    type Error = TriangulationError;

    fn try_from(repr: TriangulationRepr) -> Result<Self, Self::Error> {
        let tri = Self::try_new(repr.dim)?;
        if let Some(bad) = repr.simplices.iter().find(|s| s.dim() != repr.dim) {
            return Err(TriangulationError::DimensionMismatch {
                expected: repr.dim,
                found: bad.dim(),
            });
        }
        let tri = Self::from_parts(tri.dim, repr.simplices);
        tri.check_gluings()?;
        Ok(tri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(images: &[usize]) -> Perm {
        Perm::from_images(images).unwrap()
    }

    fn sphere(dim: usize) -> Triangulation {
        let mut tri = Triangulation::new(dim);
        tri.new_simplices(2);
        for f in 0..=dim {
            tri.join(0, f, 1, Perm::identity(dim + 1)).unwrap();
        }
        tri
    }

    // =========================================================================
    // JOIN / UNJOIN
    // =========================================================================

    #[test]
    fn test_join_is_symmetric() {
        let mut tri = Triangulation::new(3);
        tri.new_simplices(2);
        let perm = p(&[1, 2, 3, 0]);
        tri.join(0, 1, 1, perm).unwrap();
        let back = tri.simplex(1).unwrap().facet(2).unwrap();
        assert_eq!(back.simplex, 0);
        assert_eq!(back.perm, perm.inverse());
        assert!(tri.check_gluings().is_ok());
    }

    #[test]
    fn test_join_rejects_bad_requests() {
        let mut tri = Triangulation::new(3);
        tri.new_simplices(2);
        assert!(matches!(
            tri.join(0, 4, 1, Perm::identity(4)),
            Err(TriangulationError::FacetOutOfRange { facet: 4, dim: 3 })
        ));
        assert!(matches!(
            tri.join(0, 0, 5, Perm::identity(4)),
            Err(TriangulationError::SimplexOutOfRange { index: 5, size: 2 })
        ));
        assert!(matches!(
            tri.join(0, 0, 1, Perm::identity(3)),
            Err(TriangulationError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            tri.join(0, 2, 0, p(&[1, 0, 2, 3])),
            Err(TriangulationError::SelfGluing { simplex: 0, facet: 2 })
        ));
        tri.join(0, 0, 1, Perm::identity(4)).unwrap();
        assert!(matches!(
            tri.join(0, 0, 1, p(&[1, 0, 2, 3])),
            Err(TriangulationError::FacetAlreadyGlued { simplex: 0, facet: 0 })
        ));
    }

    #[test]
    fn test_unjoin_returns_previous_gluing() {
        let mut tri = sphere(2);
        let g = tri.unjoin(1, 2).unwrap().unwrap();
        assert_eq!(g.simplex, 0);
        assert!(tri.simplex(0).unwrap().facet(2).is_none());
        assert_eq!(tri.unjoin(1, 2).unwrap(), None);
        assert_eq!(tri.count_boundary_facets(), 2);
    }

    // =========================================================================
    // STRUCTURAL EDITS
    // =========================================================================

    #[test]
    fn test_remove_simplex_reindexes_neighbours() {
        let mut tri = Triangulation::new(2);
        tri.new_simplices(3);
        tri.join(1, 0, 2, Perm::identity(3)).unwrap();
        tri.join(0, 0, 2, p(&[1, 0, 2])).unwrap();
        tri.remove_simplex(0).unwrap();
        assert_eq!(tri.size(), 2);
        assert_eq!(tri.simplex(0).unwrap().adjacent_simplex(0), Some(1));
        assert_eq!(tri.simplex(1).unwrap().adjacent_simplex(0), Some(0));
        assert!(tri.simplex(1).unwrap().facet(1).is_none());
        assert!(tri.check_gluings().is_ok());
    }

    #[test]
    fn test_batch_removal_matches_single_removals() {
        let mut a = sphere(3);
        a.insert_triangulation(&sphere(3)).unwrap();
        let mut b = a.clone();
        a.remove_simplices(&[0, 1]);
        b.remove_simplex(1).unwrap();
        b.remove_simplex(0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, sphere(3));
    }

    #[test]
    fn test_insert_and_swap() {
        let mut tri = sphere(3);
        let offset = tri.insert_triangulation(&sphere(3)).unwrap();
        assert_eq!(offset, 2);
        assert_eq!(tri.count_components(), 2);
        assert!(tri.insert_triangulation(&sphere(2)).is_err());

        let mut other = Triangulation::new(3);
        tri.swap(&mut other).unwrap();
        assert!(tri.is_empty());
        assert_eq!(other.size(), 4);
    }

    #[test]
    fn test_equality_sees_descriptions() {
        let mut a = sphere(2);
        let b = sphere(2);
        assert_eq!(a, b);
        a.set_description(0, "apex").unwrap();
        assert_ne!(a, b);
    }

    // =========================================================================
    // ORIENTATION
    // =========================================================================

    #[test]
    fn test_orient_makes_every_gluing_odd() {
        let tri = sphere(3);
        assert!(!tri.is_oriented(), "identity gluings are even");
        let mut oriented = tri.clone();
        oriented.orient();
        assert!(oriented.is_oriented());
        assert_eq!(oriented.f_vector(), tri.f_vector());
    }

    #[test]
    fn test_reflect_preserves_orientedness() {
        let mut tri = sphere(4);
        tri.orient();
        tri.reflect();
        assert!(tri.is_oriented());
    }

    #[test]
    fn test_relabel_handles_self_gluings() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        tri.join(0, 0, 0, p(&[1, 0, 2, 3])).unwrap();
        tri.relabel_simplex(0, p(&[3, 1, 2, 0]));
        assert!(tri.check_gluings().is_ok());
        assert_eq!(tri.count_boundary_facets(), 2);
    }

    #[test]
    fn test_split_into_components_preserves_gluings() {
        let mut tri = sphere(2);
        tri.new_simplex("loose");
        tri.insert_triangulation(&sphere(2)).unwrap();
        let parts = tri.split_into_components();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], sphere(2));
        assert_eq!(parts[1].simplex(0).unwrap().description(), "loose");
        assert_eq!(parts[2], sphere(2));
    }

    // =========================================================================
    // SERIALIZATION
    // =========================================================================

    #[test]
    fn test_serde_round_trip_and_validation() {
        let tri = sphere(3);
        let json = serde_json::to_string(&tri).unwrap();
        let back: Triangulation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tri);
        assert_eq!(back.count_vertices(), 4);

        let mut half = tri.clone();
        half.simplices[1].set_facet(0, None);
        let json = serde_json::to_string(&half).unwrap();
        assert!(serde_json::from_str::<Triangulation>(&json).is_err());
    }
}
