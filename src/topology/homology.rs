//! Integer homology of triangulations.
//!
//! The chain complex has one generator per `k`-face (`k < d`) and per simplex
//! (`k = d`). A face is oriented by the vertex order of its first embedding, so
//! the boundary coefficient of facet `i` of a face is `(-1)^i` times the sign
//! relating the two vertex orders. Groups are reported through
//! [`AbelianGroup`], with torsion in invariant-factor form.
//!
//! Boundary matrices are kept sparse. Reduction first eliminates every `±1`
//! pivot it can find, then runs a dense Smith normal form on what is left.
//! Arithmetic is checked `i128`; entries that outgrow it surface as
//! [`TriangulationError::UnsolvedCase`].

use crate::core::collections::{FastHashMap, FastHashSet};
use crate::core::error::TriangulationError;
use crate::core::skeleton::Skeleton;
use crate::core::triangulation::Triangulation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A finitely generated abelian group `Z^rank ⊕ Z_{t_1} ⊕ … ⊕ Z_{t_m}`.
///
/// Every torsion coefficient is at least 2 and divides the next one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbelianGroup {
    rank: usize,
    torsion: Vec<u64>,
}

impl AbelianGroup {
    /// The trivial group.
    #[must_use]
    pub const fn trivial() -> Self {
        Self {
            rank: 0,
            torsion: Vec::new(),
        }
    }

    /// `Z^rank`.
    #[must_use]
    pub const fn free(rank: usize) -> Self {
        Self {
            rank,
            torsion: Vec::new(),
        }
    }

    /// Builds a group from a free rank and arbitrary cyclic orders; the
    /// orders are normalised into invariant factors and zeros count as `Z`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::UnsolvedCase`] if an invariant factor
    /// does not fit in 64 bits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::topology::homology::AbelianGroup;
    ///
    /// let g = AbelianGroup::new(1, &[6, 4, 1]).unwrap();
    /// assert_eq!(g.rank(), 1);
    /// assert_eq!(g.torsion(), &[2, 12]);
    /// assert_eq!(g.to_string(), "Z + Z_2 + Z_12");
    /// ```
    pub fn new(rank: usize, orders: &[u64]) -> Result<Self, TriangulationError> {
        let zeros = orders.iter().filter(|&&o| o == 0).count();
        let diagonal: Vec<i128> = orders
            .iter()
            .filter(|&&o| o > 0)
            .map(|&o| i128::from(o))
            .collect();
        Ok(Self {
            rank: rank + zeros,
            torsion: invariant_factors(diagonal)?,
        })
    }

    /// Free rank.
    #[must_use]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Invariant factors of the torsion subgroup.
    #[must_use]
    pub fn torsion(&self) -> &[u64] {
        &self.torsion
    }

    /// Whether the group is trivial.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.rank == 0 && self.torsion.is_empty()
    }

    /// Whether the group is infinite cyclic.
    #[must_use]
    pub fn is_z(&self) -> bool {
        self.rank == 1 && self.torsion.is_empty()
    }

    /// Whether the group is `Z_n`, with `Z_1` the trivial group.
    #[must_use]
    pub fn is_cyclic_of_order(&self, n: u64) -> bool {
        self.rank == 0 && (self.torsion == [n] || (n == 1 && self.torsion.is_empty()))
    }
}

impl fmt::Display for AbelianGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_trivial() {
            return f.write_str("0");
        }
        let mut parts = Vec::new();
        match self.rank {
            0 => {}
            1 => parts.push("Z".to_string()),
            r => parts.push(format!("{r} Z")),
        }
        let mut i = 0;
        while i < self.torsion.len() {
            let t = self.torsion[i];
            let run = self.torsion[i..].iter().take_while(|&&x| x == t).count();
            if run == 1 {
                parts.push(format!("Z_{t}"));
            } else {
                parts.push(format!("{run} Z_{t}"));
            }
            i += run;
        }
        f.write_str(&parts.join(" + "))
    }
}

// =============================================================================
// SMITH NORMAL FORM
// =============================================================================

fn overflow() -> TriangulationError {
    TriangulationError::unsolved("homology coefficients overflow 128-bit integers")
}

const fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs()
}

/// Converts a diagonal of positive integers into invariant factors (> 1).
fn invariant_factors(mut diag: Vec<i128>) -> Result<Vec<u64>, TriangulationError> {
    diag.sort_unstable();
    for i in 0..diag.len() {
        for j in i + 1..diag.len() {
            let (a, b) = (diag[i], diag[j]);
            let g = gcd(a, b);
            if g == 0 {
                continue;
            }
            diag[i] = g;
            diag[j] = (a / g).checked_mul(b).ok_or_else(overflow)?;
        }
    }
    diag.into_iter()
        .filter(|&x| x > 1)
        .map(|x| u64::try_from(x).map_err(|_| overflow()))
        .collect()
}

/// Rank and nonzero diagonal (as invariant factors > 1) of an integer matrix.
pub(crate) fn smith_diagonal(
    mut m: Vec<Vec<i128>>,
) -> Result<(usize, Vec<u64>), TriangulationError> {
    let rows = m.len();
    let cols = m.first().map_or(0, Vec::len);
    let mut diag = Vec::new();
    let mut t = 0;
    while t < rows.min(cols) {
        // Smallest nonzero entry of the remaining block becomes the pivot.
        let mut pivot: Option<(usize, usize)> = None;
        for (i, row) in m.iter().enumerate().skip(t) {
            for (j, &x) in row.iter().enumerate().skip(t) {
                if x != 0 && pivot.is_none_or(|(pi, pj)| x.abs() < m[pi][pj].abs()) {
                    pivot = Some((i, j));
                }
            }
        }
        let Some((pi, pj)) = pivot else { break };
        m.swap(t, pi);
        for row in &mut m {
            row.swap(t, pj);
        }

        loop {
            let p = m[t][t];
            let mut dirty = false;
            for i in t + 1..rows {
                let q = m[i][t] / p;
                if q != 0 {
                    for j in t..cols {
                        let sub = q.checked_mul(m[t][j]).ok_or_else(overflow)?;
                        m[i][j] = m[i][j].checked_sub(sub).ok_or_else(overflow)?;
                    }
                }
                dirty |= m[i][t] != 0;
            }
            for j in t + 1..cols {
                let q = m[t][j] / p;
                if q != 0 {
                    for row in m.iter_mut().skip(t) {
                        let sub = q.checked_mul(row[t]).ok_or_else(overflow)?;
                        row[j] = row[j].checked_sub(sub).ok_or_else(overflow)?;
                    }
                }
                dirty |= m[t][j] != 0;
            }
            if !dirty {
                break;
            }
            // A remainder is smaller than the pivot: move it into place.
            let mut best = (t, t);
            for i in t..rows {
                if m[i][t] != 0 && m[i][t].abs() < m[best.0][best.1].abs() {
                    best = (i, t);
                }
            }
            for j in t..cols {
                if m[t][j] != 0 && m[t][j].abs() < m[best.0][best.1].abs() {
                    best = (t, j);
                }
            }
            m.swap(t, best.0);
            for row in &mut m {
                row.swap(t, best.1);
            }
        }
        diag.push(m[t][t].abs());
        t += 1;
    }
    let rank = diag.len();
    Ok((rank, invariant_factors(diag)?))
}

/// Integer matrix stored by rows.
#[derive(Clone, Debug, Default)]
pub(crate) struct SparseMatrix {
    rows: Vec<FastHashMap<usize, i128>>,
    cols: usize,
}

impl SparseMatrix {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![FastHashMap::default(); rows],
            cols,
        }
    }

    pub(crate) fn add(&mut self, row: usize, col: usize, value: i128) {
        let entry = self.rows[row].entry(col).or_insert(0);
        *entry += value;
        if *entry == 0 {
            self.rows[row].remove(&col);
        }
    }

    /// Appends a column with the given `(row, value)` entries.
    pub(crate) fn push_column(&mut self, entries: impl IntoIterator<Item = (usize, i128)>) {
        let col = self.cols;
        self.cols += 1;
        for (row, value) in entries {
            self.add(row, col, value);
        }
    }
}

/// Rank and invariant factors (> 1) of a sparse integer matrix.
///
/// A unit pivot is cleared from its column by row operations; its row is then
/// cleared by column operations that touch no other row, so both can be
/// dropped. Whatever has no unit entry left goes to [`smith_diagonal`].
pub(crate) fn sparse_smith(m: SparseMatrix) -> Result<(usize, Vec<u64>), TriangulationError> {
    let SparseMatrix { mut rows, cols } = m;
    let mut in_col: Vec<FastHashSet<usize>> = vec![FastHashSet::default(); cols];
    for (r, row) in rows.iter().enumerate() {
        for &c in row.keys() {
            in_col[c].insert(r);
        }
    }

    let mut rank = 0;
    let mut progress = true;
    while progress {
        progress = false;
        for r in 0..rows.len() {
            // Unit entry in the sparsest column keeps fill-in low.
            let Some((c, p)) = rows[r]
                .iter()
                .filter(|&(_, v)| v.abs() == 1)
                .map(|(&c, &v)| (c, v))
                .min_by_key(|&(c, _)| (in_col[c].len(), c))
            else {
                continue;
            };
            let pivot_row = std::mem::take(&mut rows[r]);
            for &j in pivot_row.keys() {
                in_col[j].remove(&r);
            }
            let others: Vec<usize> = in_col[c].iter().copied().collect();
            for o in others {
                let q = rows[o].get(&c).copied().unwrap_or(0) * p;
                for (&j, &v) in &pivot_row {
                    let old = rows[o].get(&j).copied().unwrap_or(0);
                    let value = old
                        .checked_sub(q.checked_mul(v).ok_or_else(overflow)?)
                        .ok_or_else(overflow)?;
                    if value == 0 {
                        rows[o].remove(&j);
                        in_col[j].remove(&o);
                    } else {
                        rows[o].insert(j, value);
                        in_col[j].insert(o);
                    }
                }
            }
            rank += 1;
            progress = true;
        }
    }

    let live_cols: Vec<usize> = (0..cols).filter(|&c| !in_col[c].is_empty()).collect();
    let dense: Vec<Vec<i128>> = rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            live_cols
                .iter()
                .map(|c| row.get(c).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    let (rest, torsion) = smith_diagonal(dense)?;
    Ok((rank + rest, torsion))
}

// =============================================================================
// BOUNDARY MATRICES
// =============================================================================

/// Sign of the permutation given by `images`, via inversion count.
fn sign_of(images: &[usize]) -> i128 {
    let mut inversions = 0;
    for i in 0..images.len() {
        for j in i + 1..images.len() {
            if images[i] > images[j] {
                inversions += 1;
            }
        }
    }
    if inversions % 2 == 0 { 1 } else { -1 }
}

/// Matrix of `∂_k : C_k → C_{k-1}` with one row per `(k-1)`-face.
pub(crate) fn boundary_matrix(skel: &Skeleton, k: usize) -> SparseMatrix {
    let dim = skel.dim();
    let rows = skel.count_faces(k - 1);
    let cols = skel.count_faces(k);
    let mut m = SparseMatrix::new(rows, cols);
    for c in 0..cols {
        // Ordered local vertices of the generator inside some simplex.
        let (simplex, vertices): (usize, Vec<usize>) = if k == dim {
            (c, (0..=dim).collect())
        } else {
            let front = skel.faces(k)[c].front();
            (
                front.simplex,
                (0..=k).map(|i| front.vertices.image(i)).collect(),
            )
        };
        for i in 0..=k {
            let mask = vertices
                .iter()
                .enumerate()
                .filter(|&(t, _)| t != i)
                .fold(0_u32, |acc, (_, &v)| acc | (1 << v));
            let j = skel.numbering(k - 1).face_number(mask);
            let emb = skel.simplex_face_embedding(k - 1, simplex, j);
            let order: Vec<usize> = vertices
                .iter()
                .enumerate()
                .filter(|&(t, _)| t != i)
                .map(|(_, &v)| emb.vertices.pre_image(v))
                .collect();
            let sign = if i % 2 == 0 { 1 } else { -1 };
            let row = skel.simplex_face(k - 1, simplex, j);
            m.add(row, c, sign * sign_of(&order));
        }
    }
    m
}

/// `H_k` of the cell complex described by `skel`.
pub(crate) fn cellular_homology(
    skel: &Skeleton,
    k: usize,
) -> Result<AbelianGroup, TriangulationError> {
    let dim = skel.dim();
    if k > dim || skel.size() == 0 {
        return Ok(AbelianGroup::trivial());
    }
    let n_k = skel.count_faces(k);
    let rank_out = if k == 0 {
        0
    } else {
        sparse_smith(boundary_matrix(skel, k))?.0
    };
    let (rank_in, torsion) = if k == dim {
        (0, Vec::new())
    } else {
        sparse_smith(boundary_matrix(skel, k + 1))?
    };
    Ok(AbelianGroup {
        rank: n_k - rank_out - rank_in,
        torsion,
    })
}

impl Triangulation {
    /// `H_k` of the triangulation as a cell complex.
    ///
    /// Ideal vertices are treated as points; see
    /// [`homology_manifold`](Self::homology_manifold) for the truncated version.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::UnsolvedCase`] if the computation overflows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let lens = standard::lens_space(8, 3).unwrap();
    /// assert!(lens.homology(1).unwrap().is_cyclic_of_order(8));
    /// ```
    pub fn homology(&self, k: usize) -> Result<AbelianGroup, TriangulationError> {
        let skel = self.skeleton();
        match skel.derived.homology.get(k) {
            Some(slot) => slot.get_or_init(|| cellular_homology(&skel, k)).clone(),
            None => Ok(AbelianGroup::trivial()),
        }
    }

    /// `H_k` of the underlying manifold with ideal and invalid vertices
    /// truncated.
    ///
    /// # Errors
    ///
    /// As for [`homology`](Self::homology).
    pub fn homology_manifold(&self, k: usize) -> Result<AbelianGroup, TriangulationError> {
        let skel = self.skeleton();
        let Some(slot) = skel.derived.manifold_homology.get(k) else {
            return Ok(AbelianGroup::trivial());
        };
        slot.get_or_init(|| {
            if self.has_nonstandard_vertices() {
                let mut truncated = self.clone();
                truncated.ideal_to_finite();
                truncated.homology(k)
            } else {
                cellular_homology(&skel, k)
            }
        })
        .clone()
    }

    /// `H_1` with the extra relation that edge `e` is null-homologous.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::FailedPrecondition`] unless `e` is a loop
    /// (a 1-cycle on its own), and the usual face range errors.
    pub fn homology_h1_killing_edge(&self, e: usize) -> Result<AbelianGroup, TriangulationError> {
        let skel = self.skeleton();
        if self.dim() < 2 {
            return Err(TriangulationError::invalid_argument(
                "edge relations need dimension at least 2",
            ));
        }
        let edge = skel.face(1, e)?;
        let front = edge.front();
        let a = skel.simplex_vertex(front.simplex, front.vertices.image(0));
        let b = skel.simplex_vertex(front.simplex, front.vertices.image(1));
        if a != b {
            return Err(TriangulationError::failed_precondition(format!(
                "edge {e} joins distinct vertices {a} and {b}"
            )));
        }
        let n_1 = skel.count_faces(1);
        let rank_out = sparse_smith(boundary_matrix(&skel, 1))?.0;
        let mut m = boundary_matrix(&skel, 2);
        m.push_column([(e, 1)]);
        let (rank_in, torsion) = sparse_smith(m)?;
        Ok(AbelianGroup {
            rank: n_1 - rank_out - rank_in,
            torsion,
        })
    }
}
