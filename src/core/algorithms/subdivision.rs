//! Barycentric subdivision.
//!
//! Simplex `(s, π)` of the subdivision, for `π` a permutation of the vertices
//! of `s`, is the chain of faces `{π(0)} ⊂ {π(0), π(1)} ⊂ … ⊂ s`. Its vertex
//! `j` is the barycentre of `{π(0), …, π(j)}`, so facet `j < d` is shared with
//! `(s, π ∘ (j j+1))` and facet `d` lies on facet `π(d)` of `s`.

use crate::core::perm::{FACTORIALS, Perm};
use crate::core::triangulation::Triangulation;

/// Index of the subdivision simplex `(s, π)`.
pub(crate) fn chain_index(n: usize, s: usize, pi: Perm) -> usize {
    s * FACTORIALS[n] as usize + pi.index() as usize
}

/// Subdivision without the orientation relabelling; every gluing is the identity.
pub(crate) fn barycentric_raw(tri: &Triangulation) -> Triangulation {
    let dim = tri.dim();
    let n = dim + 1;
    let fact = FACTORIALS[n] as usize;
    let mut out = Triangulation::with_simplices(dim, tri.size() * fact);
    let id = Perm::identity(n);
    for (s, simplex) in tri.simplices().iter().enumerate() {
        for pi in Perm::all(n) {
            let a = chain_index(n, s, pi);
            for j in 0..dim {
                let b = chain_index(n, s, pi.compose(Perm::transposition(n, j, j + 1)));
                if out.simplices()[a].facet(j).is_none() {
                    out.glue_raw(a, j, b, id);
                }
            }
            if let Some(g) = simplex.facet(pi.image(dim)) {
                let b = chain_index(n, g.simplex, g.perm.compose(pi));
                if out.simplices()[a].facet(dim).is_none() {
                    out.glue_raw(a, dim, b, id);
                }
            }
        }
    }
    out
}

impl Triangulation {
    /// Replaces every simplex by its `(d+1)!` barycentric pieces.
    ///
    /// Pieces coming from odd chains have their last two vertices swapped,
    /// so an oriented triangulation stays oriented. Simplex `(s, π)` lands at
    /// index `s·(d+1)! + rank(π)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    ///
    /// let mut tri = Triangulation::new(2);
    /// tri.new_simplex("");
    /// tri.barycentric_subdivision();
    /// assert_eq!(tri.size(), 6);
    /// assert_eq!(tri.f_vector(), vec![7, 12, 6]);
    /// ```
    pub fn barycentric_subdivision(&mut self) {
        let dim = self.dim();
        let n = dim + 1;
        let mut out = barycentric_raw(self);
        if dim >= 1 {
            let swap = Perm::transposition(n, dim - 1, dim);
            for s in 0..self.size() {
                for pi in Perm::all(n).filter(|pi| pi.sign() < 0) {
                    out.relabel_simplex(chain_index(n, s, pi), swap);
                }
            }
        }
        tracing::debug!(before = self.size(), after = out.size(), "barycentric subdivision");
        self.replace_simplices(out);
        self.debug_check_invariants();
    }
}
