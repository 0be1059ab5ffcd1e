//! Combinatorial isomorphisms between triangulations.
//!
//! An [`Isomorphism`] sends simplex `i` of the source to simplex
//! `simplex_image(i)` of the target and relabels its vertices by
//! `facet_perm(i)`. Applying it to a triangulation produces the relabelled copy;
//! [`Triangulation::find_isomorphism`] searches for one between two given
//! triangulations by fixing an image for one simplex per component and
//! propagating across gluings.

use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::simplex::{Gluing, Simplex};
use crate::core::triangulation::Triangulation;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A relabelling of simplices and of the vertices inside each simplex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Isomorphism {
    dim: usize,
    simplex_images: Vec<usize>,
    facet_perms: Vec<Perm>,
}

impl Isomorphism {
    /// Builds an isomorphism from explicit images.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] if the simplex images are
    /// not a permutation of `0..len` or a vertex permutation has the wrong degree.
    pub fn new(
        dim: usize,
        simplex_images: Vec<usize>,
        facet_perms: Vec<Perm>,
    ) -> Result<Self, TriangulationError> {
        let n = simplex_images.len();
        if facet_perms.len() != n {
            return Err(TriangulationError::invalid_argument(
                "simplex images and vertex permutations differ in length",
            ));
        }
        let mut seen = vec![false; n];
        for &img in &simplex_images {
            if img >= n || std::mem::replace(&mut seen[img], true) {
                return Err(TriangulationError::invalid_argument(format!(
                    "simplex images {simplex_images:?} are not a permutation"
                )));
            }
        }
        if let Some(bad) = facet_perms.iter().find(|p| p.degree() != dim + 1) {
            return Err(TriangulationError::DimensionMismatch {
                expected: dim + 1,
                found: bad.degree(),
            });
        }
        Ok(Self {
            dim,
            simplex_images,
            facet_perms,
        })
    }

    /// Builds an isomorphism whose images are known to be consistent.
    pub(crate) fn from_parts(dim: usize, simplex_images: Vec<usize>, facet_perms: Vec<Perm>) -> Self {
        debug_assert_eq!(simplex_images.len(), facet_perms.len());
        Self {
            dim,
            simplex_images,
            facet_perms,
        }
    }

    /// The identity on `size` simplices.
    #[must_use]
    pub fn identity(dim: usize, size: usize) -> Self {
        Self {
            dim,
            simplex_images: (0..size).collect(),
            facet_perms: vec![Perm::identity(dim + 1); size],
        }
    }

    /// A uniformly random isomorphism; with `even` every vertex permutation is even.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(dim: usize, size: usize, even: bool, rng: &mut R) -> Self {
        let mut simplex_images: Vec<usize> = (0..size).collect();
        simplex_images.shuffle(rng);
        let facet_perms = (0..size)
            .map(|_| {
                if even {
                    Perm::random_with_sign(dim + 1, 1, rng)
                } else {
                    Perm::random(dim + 1, rng)
                }
            })
            .collect();
        Self {
            dim,
            simplex_images,
            facet_perms,
        }
    }

    /// Dimension of the triangulations it acts on.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of source simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.simplex_images.len()
    }

    /// Target of source simplex `i`.
    #[must_use]
    pub fn simplex_image(&self, i: usize) -> usize {
        self.simplex_images[i]
    }

    /// Vertex relabelling of source simplex `i`.
    #[must_use]
    pub fn facet_perm(&self, i: usize) -> Perm {
        self.facet_perms[i]
    }

    /// Whether this is the identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.simplex_images.iter().enumerate().all(|(i, &j)| i == j)
            && self.facet_perms.iter().all(|p| p.is_identity())
    }

    /// The inverse isomorphism.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let n = self.size();
        let mut simplex_images = vec![0; n];
        let mut facet_perms = vec![Perm::identity(self.dim + 1); n];
        for i in 0..n {
            let j = self.simplex_images[i];
            simplex_images[j] = i;
            facet_perms[j] = self.facet_perms[i].inverse();
        }
        Self {
            dim: self.dim,
            simplex_images,
            facet_perms,
        }
    }

    /// `self ∘ first`: apply `first`, then `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sizes or dimensions differ.
    pub fn compose(&self, first: &Self) -> Result<Self, TriangulationError> {
        if self.size() != first.size() || self.dim != first.dim {
            return Err(TriangulationError::invalid_argument(
                "composed isomorphisms must act on the same triangulation shape",
            ));
        }
        let simplex_images = first
            .simplex_images
            .iter()
            .map(|&j| self.simplex_images[j])
            .collect();
        let facet_perms = first
            .simplex_images
            .iter()
            .zip(&first.facet_perms)
            .map(|(&j, &p)| self.facet_perms[j].compose(p))
            .collect();
        Ok(Self {
            dim: self.dim,
            simplex_images,
            facet_perms,
        })
    }

    /// The relabelled copy of `tri`.
    ///
    /// # Errors
    ///
    /// Returns an error if `tri` does not match the isomorphism's size or dimension.
    pub fn apply(&self, tri: &Triangulation) -> Result<Triangulation, TriangulationError> {
        if tri.dim() != self.dim {
            return Err(TriangulationError::DimensionMismatch {
                expected: self.dim,
                found: tri.dim(),
            });
        }
        if tri.size() != self.size() {
            return Err(TriangulationError::invalid_argument(format!(
                "isomorphism on {} simplices applied to {}",
                self.size(),
                tri.size()
            )));
        }
        let mut simplices: Vec<Simplex> = (0..tri.size())
            .map(|_| Simplex::new(self.dim, ""))
            .collect();
        for (s, simplex) in tri.simplices().iter().enumerate() {
            let image = self.simplex_images[s];
            let pi = self.facet_perms[s];
            simplices[image].set_description(simplex.description());
            for (f, g) in simplex.gluings() {
                let perm = self.facet_perms[g.simplex]
                    .compose(g.perm)
                    .compose(pi.inverse());
                simplices[image].set_facet(
                    pi.image(f),
                    Some(Gluing {
                        simplex: self.simplex_images[g.simplex],
                        perm,
                    }),
                );
            }
        }
        Ok(Triangulation::from_parts(self.dim, simplices))
    }

    /// Replaces `tri` by its relabelled copy.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn apply_in_place(&self, tri: &mut Triangulation) -> Result<(), TriangulationError> {
        let mut relabelled = self.apply(tri)?;
        tri.swap(&mut relabelled)
    }
}

// =============================================================================
// ISOMORPHISM SEARCH
// =============================================================================

struct Search<'a> {
    source: &'a Triangulation,
    target: &'a Triangulation,
    images: Vec<Option<(usize, Perm)>>,
    used: Vec<bool>,
    roots: Vec<usize>,
    found: Vec<Isomorphism>,
    find_all: bool,
}

impl Search<'_> {
    fn boundary_count(tri: &Triangulation, s: usize) -> usize {
        (0..=tri.dim())
            .filter(|&f| tri.simplices()[s].facet(f).is_none())
            .count()
    }

    /// Maps the component of `root` starting from `root -> (t, pi)`; on
    /// failure every assignment made here is undone.
    fn try_component(&mut self, root: usize, t: usize, pi: Perm) -> Option<Vec<usize>> {
        let mut assigned = vec![root];
        self.images[root] = Some((t, pi));
        self.used[t] = true;
        let mut queue = VecDeque::from([root]);
        let mut ok = true;
        'bfs: while let Some(s) = queue.pop_front() {
            let Some((ts, ps)) = self.images[s] else {
                continue;
            };
            for f in 0..=self.source.dim() {
                let src = self.source.simplices()[s].facet(f);
                let dst = self.target.simplices()[ts].facet(ps.image(f));
                match (src, dst) {
                    (None, None) => {}
                    (Some(g), Some(h)) => {
                        let wanted = (h.simplex, h.perm.compose(ps).compose(g.perm.inverse()));
                        match self.images[g.simplex] {
                            Some(existing) if existing == wanted => {}
                            Some(_) => {
                                ok = false;
                                break 'bfs;
                            }
                            None => {
                                if self.used[wanted.0]
                                    || Self::boundary_count(self.source, g.simplex)
                                        != Self::boundary_count(self.target, wanted.0)
                                {
                                    ok = false;
                                    break 'bfs;
                                }
                                self.images[g.simplex] = Some(wanted);
                                self.used[wanted.0] = true;
                                assigned.push(g.simplex);
                                queue.push_back(g.simplex);
                            }
                        }
                    }
                    _ => {
                        ok = false;
                        break 'bfs;
                    }
                }
            }
        }
        if ok {
            Some(assigned)
        } else {
            self.undo(&assigned);
            None
        }
    }

    fn undo(&mut self, assigned: &[usize]) {
        for &s in assigned {
            if let Some((t, _)) = self.images[s].take() {
                self.used[t] = false;
            }
        }
    }

    /// Returns `true` once the search can stop.
    fn run(&mut self, next_root: usize) -> bool {
        let Some(&root) = self.roots.get(next_root) else {
            let (simplex_images, facet_perms) = self
                .images
                .iter()
                .map(|img| img.unwrap_or((0, Perm::identity(self.source.dim() + 1))))
                .unzip();
            self.found.push(Isomorphism {
                dim: self.source.dim(),
                simplex_images,
                facet_perms,
            });
            return !self.find_all;
        };
        let n = self.source.dim() + 1;
        let root_boundary = Self::boundary_count(self.source, root);
        for t in 0..self.target.size() {
            if self.used[t] || Self::boundary_count(self.target, t) != root_boundary {
                continue;
            }
            for pi in Perm::all(n) {
                if let Some(assigned) = self.try_component(root, t, pi) {
                    if self.run(next_root + 1) {
                        return true;
                    }
                    self.undo(&assigned);
                }
            }
        }
        false
    }
}

impl Triangulation {
    fn isomorphism_search(&self, other: &Self, find_all: bool) -> Vec<Isomorphism> {
        if self.dim() != other.dim() || self.size() != other.size() {
            return Vec::new();
        }
        let ours = self.skeleton();
        let theirs = other.skeleton();
        let mut a: Vec<usize> = ours.components().iter().map(|c| c.size()).collect();
        let mut b: Vec<usize> = theirs.components().iter().map(|c| c.size()).collect();
        a.sort_unstable();
        b.sort_unstable();
        if a != b || ours.f_vector() != theirs.f_vector() {
            return Vec::new();
        }
        if self.is_empty() {
            return vec![Isomorphism::identity(self.dim(), 0)];
        }
        let mut search = Search {
            source: self,
            target: other,
            images: vec![None; self.size()],
            used: vec![false; other.size()],
            roots: ours.components().iter().map(|c| c.simplices()[0]).collect(),
            found: Vec::new(),
            find_all,
        };
        search.run(0);
        search.found
    }

    /// An isomorphism from `self` onto `other`, if one exists.
    #[must_use]
    pub fn find_isomorphism(&self, other: &Self) -> Option<Isomorphism> {
        self.isomorphism_search(other, false).into_iter().next()
    }

    /// Every isomorphism from `self` onto `other`.
    #[must_use]
    pub fn find_all_isomorphisms(&self, other: &Self) -> Vec<Isomorphism> {
        self.isomorphism_search(other, true)
    }

    /// Whether `self` and `other` are combinatorially isomorphic.
    #[must_use]
    pub fn is_isomorphic_to(&self, other: &Self) -> bool {
        self.find_isomorphism(other).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn lens_like() -> Triangulation {
        // Two tetrahedra with twisted gluings.
        let mut tri = Triangulation::new(3);
        tri.new_simplices(2);
        tri.join(0, 0, 1, Perm::from_images(&[1, 2, 3, 0]).unwrap())
            .unwrap();
        tri.join(0, 1, 1, Perm::from_images(&[0, 2, 1, 3]).unwrap())
            .unwrap();
        tri
    }

    #[test]
    fn test_inverse_undoes_apply() {
        let tri = lens_like();
        let mut rng = StdRng::seed_from_u64(7);
        let iso = Isomorphism::random(3, 2, false, &mut rng);
        let image = iso.apply(&tri).unwrap();
        let back = iso.inverse().apply(&image).unwrap();
        assert_eq!(back, tri);
        assert!(iso.inverse().compose(&iso).unwrap().is_identity());
    }

    #[test]
    fn test_search_recovers_random_relabellings() {
        let tri = lens_like();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            let iso = Isomorphism::random(3, 2, false, &mut rng);
            let image = iso.apply(&tri).unwrap();
            let found = tri.find_isomorphism(&image).expect("relabelled copy");
            assert_eq!(found.apply(&tri).unwrap(), image);
        }
    }

    #[test]
    fn test_automorphisms_of_a_single_simplex() {
        let mut tri = Triangulation::new(2);
        tri.new_simplex("");
        assert_eq!(tri.find_all_isomorphisms(&tri).len(), 6);
    }

    #[test]
    fn test_non_isomorphic_inputs_are_rejected() {
        let tri = lens_like();
        let mut other = Triangulation::new(3);
        other.new_simplices(2);
        other.join(0, 0, 1, Perm::identity(4)).unwrap();
        other.join(0, 1, 1, Perm::identity(4)).unwrap();
        assert!(!tri.is_isomorphic_to(&other));
        assert!(!tri.is_isomorphic_to(&Triangulation::new(3)));
    }

    #[test]
    fn test_components_are_matched_independently() {
        let mut a = lens_like();
        a.new_simplex("");
        let mut b = Triangulation::new(3);
        b.new_simplex("");
        b.insert_triangulation(&lens_like()).unwrap();
        let iso = a.find_isomorphism(&b).unwrap();
        assert_eq!(iso.simplex_image(2), 0);
    }

    #[test]
    fn test_new_validates_inputs() {
        assert!(Isomorphism::new(2, vec![0, 0], vec![Perm::identity(3); 2]).is_err());
        assert!(Isomorphism::new(2, vec![1, 0], vec![Perm::identity(4); 2]).is_err());
        assert!(Isomorphism::new(2, vec![1, 0], vec![Perm::identity(3); 2]).is_ok());
    }
}
