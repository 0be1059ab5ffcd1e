//! Top-dimensional simplices and their facet gluings.
//!
//! A [`Simplex`] only stores its `d + 1` facet slots and a free-form
//! description. It does not point back at its triangulation. Every query that
//! needs the surrounding complex (faces, links, components) goes through
//! [`Triangulation`](crate::core::triangulation::Triangulation) by index.

use crate::core::collections::SmallBuffer;
use crate::core::perm::Perm;
use serde::{Deserialize, Serialize};

/// Inline capacity for facet slots; dimensions up to 7 never allocate.
pub const INLINE_FACETS: usize = 8;

/// One side of a facet gluing: the neighbouring simplex and the vertex map.
///
/// If facet `f` of simplex `s` holds `Gluing { simplex: t, perm: p }`, then
/// vertex `v` of `s` is identified with vertex `p.image(v)` of `t` on that
/// facet, and facet `p.image(f)` of `t` holds `Gluing { simplex: s, perm: p⁻¹ }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gluing {
    /// Index of the neighbouring simplex.
    pub simplex: usize,
    /// Gluing permutation from this simplex's labels to the neighbour's.
    pub perm: Perm,
}

impl Gluing {
    /// Facet of the neighbour that receives facet `facet` of this simplex.
    #[inline]
    #[must_use]
    pub const fn target_facet(&self, facet: usize) -> usize {
        self.perm.image(facet)
    }
}

/// A d-simplex with its facet slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simplex {
    description: String,
    facets: SmallBuffer<Option<Gluing>, INLINE_FACETS>,
}

impl Simplex {
    pub(crate) fn new(dim: usize, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            facets: std::iter::repeat_n(None, dim + 1).collect(),
        }
    }

    /// Free-form label; participates in equality of triangulations.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Dimension of the simplex.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.facets.len() - 1
    }

    /// The gluing on facet `f`, if any.
    #[inline]
    #[must_use]
    pub fn facet(&self, f: usize) -> Option<Gluing> {
        self.facets.get(f).copied().flatten()
    }

    /// Neighbour across facet `f`.
    #[must_use]
    pub fn adjacent_simplex(&self, f: usize) -> Option<usize> {
        self.facet(f).map(|g| g.simplex)
    }

    /// Gluing permutation across facet `f`.
    #[must_use]
    pub fn adjacent_gluing(&self, f: usize) -> Option<Perm> {
        self.facet(f).map(|g| g.perm)
    }

    /// Facet of the neighbour glued to facet `f`.
    #[must_use]
    pub fn adjacent_facet(&self, f: usize) -> Option<usize> {
        self.facet(f).map(|g| g.target_facet(f))
    }

    /// Whether any facet is unglued.
    #[must_use]
    pub fn has_boundary(&self) -> bool {
        self.facets.iter().any(Option::is_none)
    }

    /// Iterator over `(facet, gluing)` for glued facets.
    pub fn gluings(&self) -> impl Iterator<Item = (usize, Gluing)> + '_ {
        self.facets
            .iter()
            .enumerate()
            .filter_map(|(f, g)| g.map(|g| (f, g)))
    }

    pub(crate) fn set_facet(&mut self, f: usize, gluing: Option<Gluing>) {
        self.facets[f] = gluing;
    }

    pub(crate) fn facets_mut(&mut self) -> &mut [Option<Gluing>] {
        &mut self.facets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_simplex_is_isolated() {
        let s = Simplex::new(3, "tet");
        assert_eq!(s.dim(), 3);
        assert_eq!(s.description(), "tet");
        assert!(s.has_boundary());
        assert_eq!(s.gluings().count(), 0);
        assert_eq!(s.facet(7), None, "out-of-range facets read as unglued");
    }

    #[test]
    fn test_target_facet_follows_permutation() {
        let g = Gluing {
            simplex: 4,
            perm: Perm::from_images(&[1, 0, 2]).unwrap(),
        };
        assert_eq!(g.target_facet(0), 1);
        assert_eq!(g.target_facet(2), 2);
    }
}
