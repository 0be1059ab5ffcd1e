//! Truncation of ideal vertices and coning of real boundary.
//!
//! [`Triangulation::ideal_to_finite`] works on the raw barycentric
//! subdivision. A chain simplex whose first vertex is ideal or invalid is cut
//! by a hyperplane just above that vertex; the part that survives is a prism
//! over the opposite facet, split into `d` pieces `τ_1, …, τ_d` by the
//! staircase triangulation. Piece `τ_d` carries the new boundary facet.
//!
//! [`Triangulation::finite_to_ideal`] goes the other way: it attaches a cone
//! simplex to every unglued facet and glues neighbouring cones along the
//! boundary ridges, so each real boundary component collapses onto one
//! vertex.

use crate::core::algorithms::subdivision::barycentric_raw;
use crate::core::boundary::ridge_walk;
use crate::core::collections::{FastHashMap, SimplexFacet, SmallBuffer};
use crate::core::perm::{FACTORIALS, Perm};
use crate::core::traits::boundary_analysis::BoundaryAnalysis;
use crate::core::triangulation::Triangulation;
use crate::topology::characteristics::validation::LinkType;

impl Triangulation {
    /// Truncates every ideal or invalid vertex, turning its link into real
    /// boundary. Returns whether anything changed.
    ///
    /// The result is built from the barycentric subdivision, so even a single
    /// truncated vertex multiplies the size by roughly `(d+1)!`. Nothing
    /// happens in dimensions below 3 or when every vertex is standard.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let mut knot = standard::figure_eight();
    /// assert!(knot.is_ideal());
    /// assert!(knot.ideal_to_finite());
    /// assert!(!knot.is_ideal());
    /// assert_eq!(knot.count_boundary_components(), 1);
    /// ```
    pub fn ideal_to_finite(&mut self) -> bool {
        let dim = self.dim();
        if dim <= 2 {
            return false;
        }
        let types = self.vertex_link_types();
        let bad: Vec<bool> = types
            .iter()
            .map(|t| matches!(t, LinkType::Ideal | LinkType::Invalid))
            .collect();
        if !bad.contains(&true) {
            return false;
        }

        let n = dim + 1;
        let fact = FACTORIALS[n] as usize;
        let skel = self.skeleton();
        let raw = barycentric_raw(self);
        let chains: Vec<Perm> = Perm::all(n).collect();

        let truncated: Vec<bool> = (0..raw.size())
            .map(|a| bad[skel.simplex_vertex(a / fact, chains[a % fact].image(0))])
            .collect();
        let mut index = Vec::with_capacity(raw.size());
        let mut total = 0;
        for &cut in &truncated {
            index.push(total);
            total += if cut { dim } else { 1 };
        }

        let id = Perm::identity(n);
        let mut out = Triangulation::with_simplices(dim, total);
        let glue = |out: &mut Triangulation, x: usize, f: usize, y: usize| {
            if out.simplices()[x].facet(f).is_none() {
                out.glue_raw(x, f, y, id);
            }
        };
        for a in 0..raw.size() {
            for (f, g) in raw.simplices()[a].gluings() {
                let b = g.simplex;
                if !truncated[a] || f == 0 {
                    // The top facet of a truncated piece is carried by τ_1.
                    glue(&mut out, index[a], f, index[b]);
                    continue;
                }
                debug_assert!(truncated[b], "side facet leaves the truncated region");
                for k in (1..=dim).filter(|&k| k != f) {
                    let local = if f < k { f - 1 } else { f };
                    glue(&mut out, index[a] + k - 1, local, index[b] + k - 1);
                }
            }
            if truncated[a] {
                for k in 2..=dim {
                    glue(&mut out, index[a] + k - 1, k - 1, index[a] + k - 2);
                }
            }
        }

        let swap = Perm::transposition(n, dim - 1, dim);
        for (a, &cut) in truncated.iter().enumerate() {
            let sign = chains[a % fact].sign();
            if cut {
                for k in 1..=dim {
                    let o = if k % 2 == 1 { sign } else { -sign };
                    if o < 0 {
                        out.relabel_simplex(index[a] + k - 1, swap);
                    }
                }
            } else if sign < 0 {
                out.relabel_simplex(index[a], swap);
            }
        }

        tracing::debug!(
            truncated = bad.iter().filter(|&&b| b).count(),
            before = self.size(),
            after = out.size(),
            "ideal vertices truncated"
        );
        self.replace_simplices(out);
        self.debug_check_invariants();
        true
    }

    /// Cones every real boundary component to a single new vertex. Returns
    /// whether anything changed.
    ///
    /// Each unglued facet `(s, f)` receives a copy of `s` glued along `f`;
    /// the copy's vertex `f` is the cone point. Sphere boundary components
    /// become ordinary vertices and all others become ideal vertices.
    pub fn finite_to_ideal(&mut self) -> bool {
        let dim = self.dim();
        let facets = self.boundary_facets();
        if dim < 2 || facets.is_empty() {
            return false;
        }
        let n = dim + 1;

        let partners: Vec<(SimplexFacet, usize, SimplexFacet, Perm)> = facets
            .iter()
            .flat_map(|&(s, f)| {
                (0..n).filter(move |&v| v != f).map(move |v| ((s, f), v))
            })
            .map(|((s, f), v)| {
                let p = ridge_walk(self, s, f, v);
                let images: SmallBuffer<usize, 16> = (0..n)
                    .map(|x| {
                        if x == f {
                            p.facet
                        } else if x == v {
                            p.opposite
                        } else {
                            p.map.image(x)
                        }
                    })
                    .collect();
                ((s, f), v, (p.simplex, p.facet), Perm::from_images_unchecked(&images))
            })
            .collect();

        let first = self.new_simplices(facets.len()).start;
        let cone: FastHashMap<SimplexFacet, usize> = facets
            .iter()
            .enumerate()
            .map(|(i, &key)| (key, first + i))
            .collect();
        for (&(s, f), c) in facets.iter().zip(first..) {
            self.glue_raw(c, f, s, Perm::identity(n));
        }
        for (from, v, to, perm) in partners {
            let (c, c2) = (cone[&from], cone[&to]);
            if self.simplices()[c].facet(v).is_none()
                && self.simplices()[c2].facet(perm.image(v)).is_none()
                && (c != c2 || perm.image(v) != v)
            {
                self.glue_raw(c, v, c2, perm);
            }
        }
        tracing::debug!(cones = facets.len(), "real boundary coned off");
        self.debug_check_invariants();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::standard;

    // =========================================================================
    // IDEAL TO FINITE
    // =========================================================================

    #[test]
    fn test_figure_eight_truncation_has_torus_boundary() {
        let mut tri = standard::figure_eight();
        assert!(tri.ideal_to_finite());
        assert!(tri.is_valid());
        assert!(!tri.is_ideal());
        let skel = tri.skeleton();
        assert_eq!(skel.real_boundary().len(), 1);
        let boundary = skel.real_boundary()[0].triangulation().unwrap();
        assert_eq!(boundary.euler_char_tri(), 0);
        assert!(boundary.is_orientable());
        assert!(tri.homology(1).unwrap().is_z());
    }

    #[test]
    fn test_standard_vertices_are_left_alone() {
        let mut tri = standard::sphere_two_simplices(3);
        let before = tri.clone();
        assert!(!tri.ideal_to_finite());
        assert_eq!(tri, before);
    }

    // =========================================================================
    // FINITE TO IDEAL
    // =========================================================================

    #[test]
    fn test_coning_a_ball_gives_a_sphere() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        assert!(tri.finite_to_ideal());
        assert_eq!(tri.size(), 5);
        assert!(tri.is_closed());
        assert!(tri.is_valid());
        assert_eq!(tri.count_vertices(), 5);
        assert!(tri.homology(1).unwrap().is_trivial());
    }

    #[test]
    fn test_truncate_then_cone_restores_the_cusp() {
        let mut tri = standard::figure_eight();
        tri.ideal_to_finite();
        assert!(tri.finite_to_ideal());
        assert!(tri.is_valid());
        assert!(tri.is_closed());
        assert_eq!(
            tri.boundary_components()
                .iter()
                .filter(|c| !c.is_real())
                .count(),
            1
        );
        assert!(tri.homology_manifold(1).unwrap().is_z());
    }

    #[test]
    fn test_closed_triangulations_are_unchanged() {
        let mut tri = standard::sphere_two_simplices(4);
        assert!(!tri.finite_to_ideal());
        assert_eq!(tri.size(), 2);
    }
}
