//! Edge collapse.
//!
//! Collapsing an edge `uv` flattens every simplex around it: in each star
//! simplex the facet opposite `u` is glued straight onto the facet opposite
//! `v`, and the star is removed. The move is the inverse of a 1-(d+1) Pachner
//! move when the star is a single subdivided simplex, and preserves the
//! PL type whenever the legality test passes.
//!
//! Legality follows the usual local conditions:
//! - the edge has no bad self-identification and joins two distinct
//!   vertices, at most one of them on the real boundary;
//! - the star simplices are distinct;
//! - a facet of a star simplex that contains the edge is only glued to another
//!   star simplex along a facet that also contains the edge;
//! - for each `1 ≤ k < d`, the `k`-faces through `u` that are merged with the
//!   matching `k`-faces through `v` form a forest (no two faces are merged
//!   twice, and no two boundary `(d-1)`-faces are merged with each other),
//!   with a consistent vertex correspondence on every merged pair.

use crate::core::collections::{DisjointSets, FastHashMap};
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::skeleton::FaceEmbedding;
use crate::core::triangulation::Triangulation;
use itertools::Itertools;
use std::collections::BTreeSet;

fn collapse_legal(tri: &Triangulation, e: usize) -> Option<Vec<FaceEmbedding>> {
    let dim = tri.dim();
    let skel = tri.skeleton();
    let edge = skel.face(1, e).ok()?;
    if edge.has_bad_identification() {
        return None;
    }
    let front = edge.front();
    let u = skel.simplex_vertex(front.simplex, front.vertices.image(0));
    let v = skel.simplex_vertex(front.simplex, front.vertices.image(1));
    if u == v || (skel.faces(0)[u].is_boundary() && skel.faces(0)[v].is_boundary()) {
        return None;
    }

    let embeddings = edge.embeddings().to_vec();
    let star: FastHashMap<usize, Perm> = embeddings
        .iter()
        .map(|emb| (emb.simplex, emb.vertices))
        .collect();
    if star.len() != embeddings.len() {
        return None;
    }
    for emb in &embeddings {
        for a in 0..2 {
            let Some(g) = tri.simplices()[emb.simplex].facet(emb.vertices.image(a)) else {
                continue;
            };
            if let Some(q) = star.get(&g.simplex) {
                let landing = g.perm.image(emb.vertices.image(a));
                if landing != q.image(0) && landing != q.image(1) {
                    return None;
                }
            }
        }
    }

    for k in 1..dim {
        let count = skel.count_faces(k);
        let boundary_node = count;
        let mut sets = DisjointSets::new(count + 1);
        if k + 1 == dim {
            for (i, face) in skel.faces(k).iter().enumerate() {
                if face.is_boundary() {
                    sets.union(i, boundary_node);
                }
            }
        }
        let numbering = skel.numbering(k);
        let mut maps: FastHashMap<(usize, usize), Perm> = FastHashMap::default();
        let mut pairs = BTreeSet::new();
        for emb in &embeddings {
            let (p0, p1) = (emb.vertices.image(0), emb.vertices.image(1));
            let others: Vec<usize> = (2..=dim).map(|i| emb.vertices.image(i)).collect();
            for sub in others.iter().copied().combinations(k) {
                let rest = sub.iter().fold(0_u32, |acc, &x| acc | (1 << x));
                let ja = numbering.face_number(rest | (1 << p0));
                let jb = numbering.face_number(rest | (1 << p1));
                let (mut a, mut b) = (
                    skel.simplex_face(k, emb.simplex, ja),
                    skel.simplex_face(k, emb.simplex, jb),
                );
                if a == b {
                    return None;
                }
                let pa = skel.simplex_face_mapping(k, emb.simplex, ja);
                let pb = skel.simplex_face_mapping(k, emb.simplex, jb);
                let images: Vec<usize> = (0..=k)
                    .map(|i| {
                        let x = pa.image(i);
                        pb.pre_image(if x == p0 { p1 } else { x })
                    })
                    .collect();
                let mut m = Perm::from_images(&images).ok()?;
                if a > b {
                    (a, b) = (b, a);
                    m = m.inverse();
                }
                if maps.insert((a, b), m).is_some_and(|old| old != m) {
                    return None;
                }
                pairs.insert((a, b));
            }
        }
        for (a, b) in pairs {
            if !sets.union(a, b) {
                return None;
            }
        }
    }
    Some(embeddings)
}

fn perform(tri: &mut Triangulation, embeddings: &[FaceEmbedding]) {
    let n = tri.dim() + 1;
    for emb in embeddings {
        let s = emb.simplex;
        let (x, y) = (emb.vertices.image(0), emb.vertices.image(1));
        let above = tri.unglue_raw(s, x);
        let below = tri.unglue_raw(s, y);
        for f in 0..n {
            tri.unglue_raw(s, f);
        }
        if let (Some(ga), Some(gb)) = (above, below) {
            let perm = gb
                .perm
                .compose(Perm::transposition(n, x, y))
                .compose(ga.perm.inverse());
            let fa = ga.perm.image(x);
            let fb = perm.image(fa);
            let free = tri.simplices()[ga.simplex].facet(fa).is_none()
                && tri.simplices()[gb.simplex].facet(fb).is_none();
            if free && (ga.simplex != gb.simplex || fa != fb) {
                tri.glue_raw(ga.simplex, fa, gb.simplex, perm);
            }
        }
    }
    let star: Vec<usize> = embeddings.iter().map(|emb| emb.simplex).collect();
    tri.remove_simplices(&star);
    tri.debug_check_invariants();
}

impl Triangulation {
    /// Whether edge `e` can be collapsed without changing the PL type.
    #[must_use]
    pub fn has_collapse_edge(&self, e: usize) -> bool {
        self.dim() >= 2 && collapse_legal(self, e).is_some()
    }

    /// Collapses edge `e` to a point, removing every simplex around it.
    ///
    /// Follows the `check`/`perform` convention of
    /// [`pachner`](Self::pachner).
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] in dimension 1, a face
    /// range error for a bad edge index, and
    /// [`TriangulationError::FailedPrecondition`] for an illegal collapse
    /// requested without `check`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    ///
    /// let mut tri = Triangulation::new(3);
    /// tri.new_simplices(2);
    /// for f in 0..4 {
    ///     tri.join(0, f, 1, Perm::identity(4)).unwrap();
    /// }
    /// tri.pachner(3, 0, true, true).unwrap();
    /// let e = (0..tri.count_edges())
    ///     .find(|&e| tri.has_collapse_edge(e))
    ///     .unwrap();
    /// assert!(tri.collapse_edge(e, true, true).unwrap());
    /// assert!(tri.is_valid());
    /// assert!(tri.homology(1).unwrap().is_trivial());
    /// ```
    pub fn collapse_edge(
        &mut self,
        e: usize,
        check: bool,
        perform_move: bool,
    ) -> Result<bool, TriangulationError> {
        if self.dim() < 2 {
            return Err(TriangulationError::invalid_argument(
                "edge collapse needs dimension at least 2",
            ));
        }
        self.skeleton().face(1, e)?;
        let Some(embeddings) = collapse_legal(self, e) else {
            if check {
                return Ok(false);
            }
            tracing::warn!(edge = e, "illegal edge collapse requested without check");
            return Err(TriangulationError::failed_precondition(format!(
                "edge {e} cannot be collapsed"
            )));
        };
        if perform_move {
            perform(self, &embeddings);
            tracing::debug!(edge = e, size = self.size(), "edge collapsed");
        }
        Ok(true)
    }
}
