//! Numbering of the k-dimensional subfaces of a d-simplex.
//!
//! Faces whose vertex count is at most half of the simplex's are numbered in
//! lexicographic order of their vertex sets. Larger faces are numbered as
//! complements: face `i` of dimension `k` consists of the vertices *not* in
//! face `i` of dimension `d - 1 - k`. In particular facet `i` is the facet
//! opposite vertex `i`, and in a pentachoron triangle `i` is opposite edge `i`.

use crate::core::collections::FastHashMap;
use crate::core::perm::Perm;
use itertools::Itertools;

/// The k-subfaces of a d-simplex with their vertex sets.
#[derive(Clone, Debug)]
pub struct FaceNumbering {
    dim: usize,
    subdim: usize,
    masks: Vec<u32>,
    lookup: FastHashMap<u32, usize>,
}

impl FaceNumbering {
    /// Numbering of the `subdim`-faces of a `dim`-simplex (`subdim ≤ dim`).
    #[must_use]
    pub fn new(dim: usize, subdim: usize) -> Self {
        let n = dim + 1;
        let masks: Vec<u32> = if n >= 2 * (subdim + 1) {
            lexicographic_masks(n, subdim + 1)
        } else {
            let full = (1_u32 << n) - 1;
            lexicographic_masks(n, dim - subdim)
                .into_iter()
                .map(|m| full & !m)
                .collect()
        };
        let lookup = masks.iter().enumerate().map(|(i, &m)| (m, i)).collect();
        Self {
            dim,
            subdim,
            masks,
            lookup,
        }
    }

    /// Dimension of the ambient simplex.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Dimension of the faces being numbered.
    #[must_use]
    pub const fn subdim(&self) -> usize {
        self.subdim
    }

    /// Number of `subdim`-faces, `C(d+1, subdim+1)`.
    #[must_use]
    pub fn count(&self) -> usize {
        self.masks.len()
    }

    /// Vertex bitmask of face `i`.
    #[must_use]
    pub fn mask(&self, i: usize) -> u32 {
        self.masks[i]
    }

    /// Vertices of face `i` in increasing order.
    pub fn vertices(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let mask = self.masks[i];
        (0..=self.dim).filter(move |v| mask & (1 << v) != 0)
    }

    /// Number of the face with the given vertex mask.
    ///
    /// # Panics
    ///
    /// Panics if `mask` does not have exactly `subdim + 1` bits among the
    /// simplex's vertices; callers only pass masks derived from permutations.
    #[must_use]
    pub fn face_number(&self, mask: u32) -> usize {
        self.lookup[&mask]
    }

    /// Number of the face spanned by images `0..=subdim` of `perm`.
    #[must_use]
    pub fn face_of(&self, perm: Perm) -> usize {
        self.face_number(head_mask(perm, self.subdim))
    }

    /// Canonical vertex ordering of face `i`: the face's vertices ascending,
    /// followed by the remaining vertices ascending.
    #[must_use]
    pub fn ordering(&self, i: usize) -> Perm {
        let head: Vec<usize> = self.vertices(i).collect();
        Perm::ordering(self.dim + 1, &head)
    }

    /// Whether face `i` contains vertex `v`.
    #[must_use]
    pub fn contains(&self, i: usize, v: usize) -> bool {
        self.masks[i] & (1 << v) != 0
    }
}

/// Bitmask of the images `0..=k` of `perm`.
#[inline]
#[must_use]
pub fn head_mask(perm: Perm, k: usize) -> u32 {
    (0..=k).fold(0, |m, i| m | (1 << perm.image(i)))
}

fn lexicographic_masks(n: usize, size: usize) -> Vec<u32> {
    (0..n)
        .combinations(size)
        .map(|c| c.iter().fold(0_u32, |m, &v| m | (1 << v)))
        .collect()
}
