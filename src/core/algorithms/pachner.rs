//! Pachner (bistellar) moves.
//!
//! A move on a `k`-face of a `d`-dimensional triangulation replaces the star
//! of the face (`d - k + 1` simplices) by the `k + 1` simplices that fill the
//! same `(d+1)`-simplex boundary the other way round:
//! - removed simplices = `d - k + 1`
//! - inserted simplices = `k + 1`
//! - size change = `2k - d`
//!
//! The move on a simplex (`k = d`) is the 1-(d+1) subdivision and is always
//! legal. For `k < d` the face must be interior, have no bad
//! self-identification, appear in `d - k + 1` distinct simplices, and its link
//! must be the boundary of a `(d-k)`-simplex. The last condition is checked on
//! vertex labels: the link vertices of the star fall into exactly `d - k + 1`
//! classes, every star simplex sees `d - k` distinct classes, and no two star
//! simplices see the same set.
//!
//! New simplex `a` (`0 ≤ a ≤ k`) carries every global label except face
//! vertex `a`, in increasing order; labels `0..=k` are the face's canonical
//! vertices and labels `k+1..=d+1` are the link classes.

use crate::core::collections::{DisjointSets, FastHashMap, SmallBuffer};
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::simplex::Gluing;
use crate::core::skeleton::FaceEmbedding;
use crate::core::triangulation::Triangulation;
use std::sync::OnceLock;

fn pachner_trace_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("PACHNER_TRACE_MOVES").is_some())
}

/// Pachner move descriptor.
///
/// # Examples
///
/// ```rust
/// use pachner::core::algorithms::pachner::PachnerKind;
///
/// let two_three = PachnerKind::new(2, 3);
/// assert_eq!(two_three.removed(), 2);
/// assert_eq!(two_three.inserted(), 3);
/// assert_eq!(two_three.inverse(), PachnerKind::new(1, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PachnerKind {
    /// Dimension of the face the move acts on.
    pub face_dim: usize,
    /// Dimension of the triangulation.
    pub dim: usize,
}

impl PachnerKind {
    /// Move on a `face_dim`-face in dimension `dim`.
    #[must_use]
    pub const fn new(face_dim: usize, dim: usize) -> Self {
        Self { face_dim, dim }
    }

    /// Number of simplices in the star that is removed.
    #[must_use]
    pub const fn removed(self) -> usize {
        self.dim - self.face_dim + 1
    }

    /// Number of simplices inserted.
    #[must_use]
    pub const fn inserted(self) -> usize {
        self.face_dim + 1
    }

    /// Net change in the number of simplices.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn size_change(self) -> isize {
        self.inserted() as isize - self.removed() as isize
    }

    /// The move that undoes this one: it acts on the new `(d-k)`-face.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self {
            face_dim: self.dim - self.face_dim,
            dim: self.dim,
        }
    }
}

/// Star of a face that admits a Pachner move.
struct Star {
    embeddings: Vec<FaceEmbedding>,
    /// `classes[i][b]`: link class of vertex `k + 1 + b` of embedding `i`.
    classes: Vec<SmallBuffer<usize, 16>>,
}

/// Link classes of the star of the `k`-face `i`, or `None` if the move is illegal.
fn legal_star(tri: &Triangulation, k: usize, i: usize) -> Option<Star> {
    let dim = tri.dim();
    if k == dim {
        return (i < tri.size()).then(|| Star {
            embeddings: vec![FaceEmbedding {
                simplex: i,
                face: 0,
                vertices: Perm::identity(dim + 1),
            }],
            classes: vec![SmallBuffer::new()],
        });
    }
    let skel = tri.skeleton();
    let face = skel.face(k, i).ok()?;
    if face.is_boundary() || face.has_bad_identification() || face.degree() != dim - k + 1 {
        return None;
    }
    let embeddings = face.embeddings().to_vec();
    let mut seen = vec![false; tri.size()];
    for e in &embeddings {
        if std::mem::replace(&mut seen[e.simplex], true) {
            return None;
        }
    }
    if k + 1 == dim {
        return Some(Star {
            embeddings,
            classes: vec![SmallBuffer::from_slice(&[0]), SmallBuffer::from_slice(&[1])],
        });
    }

    let m = dim - k;
    let numbering = skel.numbering(k);
    let position: FastHashMap<(usize, usize), usize> = embeddings
        .iter()
        .enumerate()
        .map(|(idx, e)| ((e.simplex, e.face), idx))
        .collect();
    let mut sets = DisjointSets::new(embeddings.len() * m);
    for (idx, e) in embeddings.iter().enumerate() {
        for a in 0..m {
            let g = tri.simplices()[e.simplex].facet(e.vertices.image(k + 1 + a))?;
            let across = g.perm.compose(e.vertices);
            let other = *position.get(&(g.simplex, numbering.face_of(across)))?;
            let other_vertices = embeddings[other].vertices;
            for b in (0..m).filter(|&b| b != a) {
                let img = g.perm.image(e.vertices.image(k + 1 + b));
                sets.union(idx * m + b, other * m + other_vertices.pre_image(img) - (k + 1));
            }
        }
    }
    if sets.count_sets() != m + 1 {
        return None;
    }
    let labels = sets.labels();
    let classes: Vec<SmallBuffer<usize, 16>> = (0..embeddings.len())
        .map(|idx| labels[idx * m..(idx + 1) * m].iter().copied().collect())
        .collect();
    let mut masks: Vec<u32> = Vec::with_capacity(classes.len());
    for row in &classes {
        let mask = row.iter().fold(0_u32, |acc, &c| acc | (1 << c));
        if mask.count_ones() as usize != m || masks.contains(&mask) {
            return None;
        }
        masks.push(mask);
    }
    Some(Star {
        embeddings,
        classes,
    })
}

/// Position of global label `x` among the labels of new simplex `a`.
const fn slot(a: usize, x: usize) -> usize {
    if x > a { x - 1 } else { x }
}

/// Global label at local vertex `u` of new simplex `a`.
const fn label(a: usize, u: usize) -> usize {
    if u >= a { u + 1 } else { u }
}

fn perform(tri: &mut Triangulation, k: usize, star: &Star) {
    let dim = tri.dim();
    let n = dim + 1;
    let m = dim - k;
    let simplices: Vec<usize> = star.embeddings.iter().map(|e| e.simplex).collect();
    let star_index: FastHashMap<usize, usize> =
        simplices.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    // glob[i][v]: global label of local vertex v of star simplex i.
    let mut glob: Vec<SmallBuffer<usize, 16>> = Vec::with_capacity(simplices.len());
    let mut omit = Vec::with_capacity(simplices.len());
    for (e, row) in star.embeddings.iter().zip(&star.classes) {
        let mut labels: SmallBuffer<usize, 16> = SmallBuffer::from_elem(0, n);
        for a in 0..=k {
            labels[e.vertices.image(a)] = a;
        }
        for (b, &c) in row.iter().enumerate() {
            labels[e.vertices.image(k + 1 + b)] = k + 1 + c;
        }
        let missing = (0..=m).find(|c| !row.contains(c)).unwrap_or(m);
        omit.push(k + 1 + missing);
        glob.push(labels);
    }

    let outer: Vec<(usize, usize, Gluing)> = star
        .embeddings
        .iter()
        .enumerate()
        .flat_map(|(i, e)| {
            let simplex = &tri.simplices()[e.simplex];
            (0..=k).filter_map(move |a| simplex.facet(e.vertices.image(a)).map(|g| (i, a, g)))
        })
        .collect();

    for &s in &simplices {
        for f in 0..n {
            tri.unglue_raw(s, f);
        }
    }
    let base = tri.new_simplices(k + 1).start;

    for a in 0..=k {
        for b in a + 1..=k {
            let images: SmallBuffer<usize, 16> = (0..n)
                .map(|u| {
                    let g = label(a, u);
                    if g == b { slot(b, a) } else { slot(b, g) }
                })
                .collect();
            tri.glue_raw(base + a, slot(a, b), base + b, Perm::from_images_unchecked(&images));
        }
    }

    for (i, a, g) in outer {
        let f = star.embeddings[i].vertices.image(a);
        let src = slot(a, omit[i]);
        if tri.simplices()[base + a].facet(src).is_some() {
            continue;
        }
        let local = |u: usize| glob[i].iter().position(|&x| x == label(a, u)).unwrap_or(0);
        let (target, images): (usize, SmallBuffer<usize, 16>) =
            if let Some(&i2) = star_index.get(&g.simplex) {
                let a2 = glob[i2][g.perm.image(f)];
                let images = (0..n)
                    .map(|u| {
                        if u == src {
                            slot(a2, omit[i2])
                        } else {
                            slot(a2, glob[i2][g.perm.image(local(u))])
                        }
                    })
                    .collect();
                (base + a2, images)
            } else {
                let images = (0..n)
                    .map(|u| {
                        if u == src {
                            g.perm.image(f)
                        } else {
                            g.perm.image(local(u))
                        }
                    })
                    .collect();
                (g.simplex, images)
            };
        tri.glue_raw(base + a, src, target, Perm::from_images_unchecked(&images));
    }

    tri.remove_simplices(&simplices);
    tri.debug_check_invariants();
}

impl Triangulation {
    /// Whether a Pachner move on the `k`-face `i` is legal.
    ///
    /// Never fails; out-of-range faces are simply illegal.
    #[must_use]
    pub fn has_pachner(&self, k: usize, i: usize) -> bool {
        k <= self.dim() && legal_star(self, k, i).is_some()
    }

    /// Performs a Pachner move on the `k`-face `i` (`k = d` for a simplex).
    ///
    /// With `check`, an illegal move returns `Ok(false)`; without it an
    /// illegal move is a [`TriangulationError::FailedPrecondition`]. With
    /// `perform = false` nothing is changed and the result reports legality.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist, or if the move is illegal
    /// and `check` is false.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    ///
    /// let mut tri = Triangulation::new(3);
    /// tri.new_simplex("");
    /// assert!(tri.pachner(3, 0, true, true).unwrap());
    /// assert_eq!(tri.size(), 4);
    /// assert!(tri.is_valid());
    /// ```
    pub fn pachner(
        &mut self,
        k: usize,
        i: usize,
        check: bool,
        perform_move: bool,
    ) -> Result<bool, TriangulationError> {
        if k > self.dim() {
            return Err(TriangulationError::invalid_argument(format!(
                "no {k}-faces in dimension {}",
                self.dim()
            )));
        }
        if k == self.dim() {
            self.check_simplex(i)?;
        } else {
            self.skeleton().face(k, i)?;
        }
        let Some(star) = legal_star(self, k, i) else {
            if check {
                return Ok(false);
            }
            tracing::warn!(k, face = i, "illegal Pachner move requested without check");
            return Err(TriangulationError::failed_precondition(format!(
                "Pachner move on {k}-face {i} is not legal"
            )));
        };
        if !perform_move {
            return Ok(true);
        }
        perform(self, k, &star);
        if pachner_trace_enabled() {
            tracing::debug!(k, face = i, size = self.size(), "Pachner move performed");
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(dim: usize) -> Triangulation {
        let mut tri = Triangulation::new(dim);
        tri.new_simplices(2);
        for f in 0..=dim {
            tri.join(0, f, 1, Perm::identity(dim + 1)).unwrap();
        }
        tri
    }

    // =========================================================================
    // DESCRIPTOR
    // =========================================================================

    #[test]
    fn test_kinds_and_inverses() {
        for dim in 2..=6 {
            for k in 0..=dim {
                let kind = PachnerKind::new(k, dim);
                assert_eq!(kind.inverse().inverse(), kind);
                assert_eq!(kind.size_change(), -kind.inverse().size_change());
                assert_eq!(kind.removed(), kind.inverse().inserted());
            }
        }
    }

    // =========================================================================
    // MOVES
    // =========================================================================

    #[test]
    fn test_one_to_n_then_back() {
        for dim in 2..=5 {
            let mut tri = sphere(dim);
            assert!(tri.pachner(dim, 0, true, true).unwrap());
            assert_eq!(tri.size(), dim + 2);
            tri.check_gluings().unwrap();
            assert_eq!(tri.count_vertices(), dim + 2);
            let v = (0..tri.count_vertices())
                .find(|&v| tri.has_pachner(0, v))
                .expect("the subdivision vertex admits the inverse move");
            assert!(tri.pachner(0, v, false, true).unwrap());
            assert_eq!(tri.size(), 2);
            assert!(tri.is_isomorphic_to(&sphere(dim)), "dimension {dim}");
        }
    }

    #[test]
    fn test_two_three_preserves_topology() {
        let mut tri = sphere(3);
        let chi = tri.euler_char_tri();
        let triangle = (0..tri.count_faces(2))
            .find(|&t| tri.has_pachner(2, t))
            .unwrap();
        assert!(tri.pachner(2, triangle, true, true).unwrap());
        assert_eq!(tri.size(), 3);
        assert!(tri.is_valid());
        assert!(tri.is_closed());
        assert!(tri.is_orientable());
        assert_eq!(tri.euler_char_tri(), chi);
        assert!(tri.homology(1).unwrap().is_trivial());
    }

    #[test]
    fn test_boundary_faces_are_illegal() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        for k in 0..3 {
            for i in 0..tri.count_faces(k) {
                assert!(!tri.has_pachner(k, i));
                assert!(!tri.pachner(k, i, true, true).unwrap());
            }
        }
        assert!(matches!(
            tri.pachner(1, 0, false, true),
            Err(TriangulationError::FailedPrecondition { .. })
        ));
        assert!(tri.pachner(1, 99, true, true).is_err());
        assert_eq!(tri.size(), 1);
    }

    #[test]
    fn test_dry_run_leaves_triangulation_alone() {
        let mut tri = sphere(4);
        let before = tri.clone();
        assert!(tri.pachner(4, 1, true, false).unwrap());
        assert_eq!(tri, before);
    }
}
