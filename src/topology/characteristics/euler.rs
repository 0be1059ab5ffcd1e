//! Euler characteristic of triangulations.
//!
//! Implements χ = Σ(-1)^k · `f_k` over the f-vector of face counts, and the
//! manifold variant in which every ideal or invalid vertex contributes the
//! Euler characteristic of its link instead of a point.
//!
//! # Examples
//!
//! ```rust
//! use pachner::prelude::*;
//! use pachner::topology::characteristics::euler::euler_characteristic;
//!
//! let mut tri = Triangulation::new(3);
//! tri.new_simplex("");
//! let counts = tri.f_vector_counts();
//! assert_eq!(counts.by_dim, vec![4, 6, 4, 1]);
//! assert_eq!(euler_characteristic(&counts), 1);
//! ```

use crate::core::triangulation::Triangulation;
use crate::topology::characteristics::validation::LinkType;

/// Counts of k-faces for all dimensions 0 ≤ k ≤ d.
///
/// `by_dim[k]` is the number of `k`-faces; `by_dim[d]` counts simplices. In
/// the topology literature this is the **f-vector**.
///
/// # Examples
///
/// ```rust
/// use pachner::topology::characteristics::euler::FVector;
///
/// let counts = FVector {
///     by_dim: vec![1, 3, 2],
/// };
/// assert_eq!(counts.count(1), 3);
/// assert_eq!(counts.count(5), 0);
/// assert_eq!(counts.dimension(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FVector {
    /// `by_dim[k]` = `f_k` = number of `k`-faces
    pub by_dim: Vec<usize>,
}

impl FVector {
    /// Number of `k`-faces, or 0 if `k` is out of range.
    #[must_use]
    #[inline]
    pub fn count(&self, k: usize) -> usize {
        self.by_dim.get(k).copied().unwrap_or(0)
    }

    /// Dimension of the triangulation the counts came from.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.by_dim.len().saturating_sub(1)
    }
}

/// χ = Σ(-1)^k · `f_k`.
///
/// # Examples
///
/// ```rust
/// use pachner::topology::characteristics::euler::{FVector, euler_characteristic};
///
/// // Two triangles glued into a torus: V=1, E=3, F=2.
/// let torus = FVector { by_dim: vec![1, 3, 2] };
/// assert_eq!(euler_characteristic(&torus), 0);
/// ```
#[must_use]
#[allow(clippy::cast_possible_wrap)] // Face counts won't exceed isize::MAX in practice
pub fn euler_characteristic(counts: &FVector) -> isize {
    counts
        .by_dim
        .iter()
        .enumerate()
        .map(|(k, &f_k)| {
            let sign = if k % 2 == 0 { 1 } else { -1 };
            sign * (f_k as isize)
        })
        .sum()
}

/// χ of the `d`-sphere: `1 + (-1)^d`.
#[must_use]
pub const fn sphere_euler_characteristic(d: usize) -> isize {
    if d % 2 == 0 { 2 } else { 0 }
}

impl Triangulation {
    /// The f-vector wrapped as [`FVector`].
    #[must_use]
    pub fn f_vector_counts(&self) -> FVector {
        FVector {
            by_dim: self.f_vector(),
        }
    }

    /// Euler characteristic of the triangulation as a cell complex.
    #[must_use]
    pub fn euler_char_tri(&self) -> isize {
        euler_characteristic(&self.f_vector_counts())
    }

    /// Euler characteristic of the compact manifold obtained by truncating
    /// ideal and invalid vertices.
    ///
    /// Each such vertex is replaced by its link, so it contributes
    /// `χ(link) - 1` on top of the cell count.
    #[must_use]
    pub fn euler_char_manifold(&self) -> isize {
        let mut chi = self.euler_char_tri();
        if self.dim() < 2 {
            return chi;
        }
        for (v, link_type) in self.vertex_link_types().iter().enumerate() {
            if matches!(link_type, LinkType::Ideal | LinkType::Invalid)
                && let Ok(link) = self.vertex_link(v)
            {
                chi += link.triangulation.euler_char_tri() - 1;
            }
        }
        chi
    }
}
