//! Boundary moves in dimension 3: close-book, layering and boundary
//! minimisation.
//!
//! A boundary edge lies on two boundary triangles (possibly the same one
//! twice). Closing the book glues those two triangles together by folding
//! about the edge. Layering attaches a new tetrahedron across the edge, which
//! flips it to the opposite diagonal of the quadrilateral formed by the two
//! triangles.

use crate::core::boundary::ridge_walk;
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::traits::boundary_analysis::RidgePartner;
use crate::core::triangulation::Triangulation;
use crate::topology::characteristics::validation::LinkType;

/// A boundary edge seen from one of its boundary triangles.
#[derive(Clone, Copy, Debug)]
struct BoundaryEdge {
    simplex: usize,
    /// The unglued facet containing the edge.
    facet: usize,
    /// Endpoints of the edge in `simplex`.
    ends: (usize, usize),
    /// Third vertex of the boundary triangle.
    apex: usize,
}

impl BoundaryEdge {
    fn partner(self, tri: &Triangulation) -> RidgePartner {
        ridge_walk(tri, self.simplex, self.facet, self.apex)
    }

    /// Gluing that folds this triangle onto the partner triangle about the edge.
    fn fold(self, partner: &RidgePartner) -> Perm {
        let mut images = [0; 4];
        images[self.ends.0] = partner.map.image(self.ends.0);
        images[self.ends.1] = partner.map.image(self.ends.1);
        images[self.apex] = partner.opposite;
        images[self.facet] = partner.facet;
        Perm::from_images_unchecked(&images)
    }
}

fn require_dim3(tri: &Triangulation, what: &str) -> Result<(), TriangulationError> {
    if tri.dim() == 3 {
        Ok(())
    } else {
        Err(TriangulationError::invalid_argument(format!(
            "{what} needs dimension 3, not {}",
            tri.dim()
        )))
    }
}

/// Locates edge `e` on the real boundary.
fn boundary_edge(tri: &Triangulation, e: usize) -> Result<Option<BoundaryEdge>, TriangulationError> {
    let skel = tri.skeleton();
    let edge = skel.face(1, e)?;
    for emb in edge.embeddings() {
        let p = emb.vertices;
        for (facet, apex) in [(p.image(3), p.image(2)), (p.image(2), p.image(3))] {
            if tri.simplices()[emb.simplex].facet(facet).is_none() {
                return Ok(Some(BoundaryEdge {
                    simplex: emb.simplex,
                    facet,
                    ends: (p.image(0), p.image(1)),
                    apex,
                }));
            }
        }
    }
    Ok(None)
}

fn close_book_legal(tri: &Triangulation, e: usize) -> Result<Option<(BoundaryEdge, RidgePartner)>, TriangulationError> {
    let Some(b) = boundary_edge(tri, e)? else {
        return Ok(None);
    };
    let partner = b.partner(tri);
    if (partner.simplex, partner.facet) == (b.simplex, b.facet) {
        return Ok(None);
    }
    let skel = tri.skeleton();
    let apex0 = skel.simplex_vertex(b.simplex, b.apex);
    let apex1 = skel.simplex_vertex(partner.simplex, partner.opposite);
    if apex0 == apex1 {
        return Ok(None);
    }
    let links = tri.vertex_link_types();
    if links[apex0] != LinkType::Ball || links[apex1] != LinkType::Ball {
        return Ok(None);
    }
    let (x0, x1) = b.ends;
    let e1 = skel.simplex_edge(b.simplex, x0, b.apex);
    let e2 = skel.simplex_edge(b.simplex, x1, b.apex);
    let f1 = skel.simplex_edge(partner.simplex, partner.map.image(x0), partner.opposite);
    let f2 = skel.simplex_edge(partner.simplex, partner.map.image(x1), partner.opposite);
    if e1 == f1 || e2 == f2 || (e1 == e2 && f1 == f2) || (e1 == f2 && f1 == e2) {
        return Ok(None);
    }
    Ok(Some((b, partner)))
}

impl Triangulation {
    /// Closes the book about boundary edge `e`: the two boundary triangles on
    /// either side of `e` are glued together, folding about `e`.
    ///
    /// The move is legal when the two triangles are distinct, their third
    /// vertices are distinct with disc links, and the other edges of the two
    /// triangles are not already identified in a way the fold would
    /// contradict. It does not change the PL type.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 3, a
    /// face range error for a bad edge index, and
    /// [`TriangulationError::FailedPrecondition`] for an illegal move
    /// requested without `check`.
    pub fn close_book(
        &mut self,
        e: usize,
        check: bool,
        perform_move: bool,
    ) -> Result<bool, TriangulationError> {
        require_dim3(self, "close-book")?;
        let Some((b, partner)) = close_book_legal(self, e)? else {
            if check {
                return Ok(false);
            }
            tracing::warn!(edge = e, "illegal close-book requested without check");
            return Err(TriangulationError::failed_precondition(format!(
                "cannot close the book about edge {e}"
            )));
        };
        if perform_move {
            self.glue_raw(b.simplex, b.facet, partner.simplex, b.fold(&partner));
            self.debug_check_invariants();
        }
        Ok(true)
    }

    /// Layers a new tetrahedron across boundary edge `e` and returns its
    /// index.
    ///
    /// Edge `01` of the new tetrahedron lies along `e`; its facets 3 and 2
    /// cover the two boundary triangles, and facets 0 and 1 become boundary,
    /// meeting along the new edge `23`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 3, a
    /// face range error for a bad edge index, and
    /// [`TriangulationError::FailedPrecondition`] if `e` is not a boundary
    /// edge or lies twice on the same boundary triangle.
    pub fn layer_on(&mut self, e: usize) -> Result<usize, TriangulationError> {
        require_dim3(self, "layering")?;
        let b = boundary_edge(self, e)?.ok_or_else(|| {
            TriangulationError::failed_precondition(format!("edge {e} is not on the boundary"))
        })?;
        let partner = b.partner(self);
        if (partner.simplex, partner.facet) == (b.simplex, b.facet) {
            return Err(TriangulationError::failed_precondition(format!(
                "edge {e} meets a single boundary triangle twice"
            )));
        }
        Ok(layer_at(self, b, &partner))
    }

    /// Reduces every real boundary component to a single vertex (or to two
    /// triangles for a sphere) using close-book and layering moves. Returns
    /// whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 3,
    /// [`TriangulationError::FailedPrecondition`] on invalid triangulations,
    /// and [`TriangulationError::UnsolvedCase`] if some component cannot be
    /// reduced further.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    ///
    /// let mut ball = Triangulation::new(3);
    /// ball.new_simplex("");
    /// assert!(ball.minimise_boundary().unwrap());
    /// let skel = ball.skeleton();
    /// assert_eq!(skel.real_boundary()[0].size(), 2);
    /// ```
    pub fn minimise_boundary(&mut self) -> Result<bool, TriangulationError> {
        require_dim3(self, "boundary minimisation")?;
        if !self.is_valid() {
            return Err(TriangulationError::failed_precondition(
                "boundary minimisation needs a valid triangulation",
            ));
        }
        let mut changed = false;
        while let Some(edges) = non_minimal_component_edges(self) {
            if let Some(&e) = edges.iter().find(|&&e| matches!(close_book_legal(self, e), Ok(Some(_)))) {
                self.close_book(e, false, true)?;
                changed = true;
                continue;
            }
            if !layer_and_close(self, &edges)? {
                return Err(TriangulationError::unsolved(
                    "no close-book or layering reduces this boundary component",
                ));
            }
            changed = true;
        }
        if changed {
            tracing::debug!(size = self.size(), "boundary minimised");
        }
        Ok(changed)
    }
}

fn layer_at(tri: &mut Triangulation, b: BoundaryEdge, partner: &RidgePartner) -> usize {
    let top = tri.new_simplex("");
    let mut lower = [0; 4];
    lower[0] = b.ends.0;
    lower[1] = b.ends.1;
    lower[2] = b.apex;
    lower[3] = b.facet;
    tri.glue_raw(top, 3, b.simplex, Perm::from_images_unchecked(&lower));
    let upper = [
        partner.map.image(b.ends.0),
        partner.map.image(b.ends.1),
        partner.facet,
        partner.opposite,
    ];
    tri.glue_raw(top, 2, partner.simplex, Perm::from_images_unchecked(&upper));
    tri.debug_check_invariants();
    top
}

/// Edges of the first real boundary component that still has more than one
/// vertex and more than two triangles.
fn non_minimal_component_edges(tri: &Triangulation) -> Option<Vec<usize>> {
    let skel = tri.skeleton();
    let component = skel.real_boundary().iter().position(|c| {
        c.size() > 2 && c.triangulation().is_some_and(|b| b.count_vertices() > 1)
    })?;
    Some(boundary_component_edges(tri, component))
}

/// Distinct edges of real boundary component `component`, in increasing order.
pub(crate) fn boundary_component_edges(tri: &Triangulation, component: usize) -> Vec<usize> {
    let skel = tri.skeleton();
    let Some(c) = skel.real_boundary().get(component) else {
        return Vec::new();
    };
    let mut edges: Vec<usize> = c
        .facets()
        .iter()
        .flat_map(|&(s, f)| {
            let verts: Vec<usize> = (0..4).filter(|&x| x != f).collect();
            [(0, 1), (0, 2), (1, 2)].map(|(i, j)| skel.simplex_edge(s, verts[i], verts[j]))
        })
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Boundary triangle of `s` through its edge `e0 e1`, taking the lowest
/// numbered free facet.
fn free_facet_through(tri: &Triangulation, s: usize, e0: usize, e1: usize) -> Option<BoundaryEdge> {
    let facet = (0..4).find(|&x| x != e0 && x != e1 && tri.simplices()[s].facet(x).is_none())?;
    let apex = (0..4).find(|&x| x != e0 && x != e1 && x != facet)?;
    Some(BoundaryEdge {
        simplex: s,
        facet,
        ends: (e0, e1),
        apex,
    })
}

/// Layers across edge `e0 e1` of simplex `s`, seen from its lowest free
/// facet. Returns the new tetrahedron and the apex of that facet in `s`.
pub(crate) fn layer_across(
    tri: &mut Triangulation,
    s: usize,
    e0: usize,
    e1: usize,
) -> Result<(usize, usize), TriangulationError> {
    let b = free_facet_through(tri, s, e0, e1).ok_or_else(|| {
        TriangulationError::failed_precondition(format!("edge {e0}{e1} of simplex {s} is not on the boundary"))
    })?;
    let partner = b.partner(tri);
    if (partner.simplex, partner.facet) == (b.simplex, b.facet) {
        return Err(TriangulationError::failed_precondition(
            "cannot layer across an edge met twice by one triangle",
        ));
    }
    Ok((layer_at(tri, b, &partner), b.apex))
}

/// Folds the two boundary triangles on either side of edge `e0 e1` of `s`
/// onto each other, with no legality check.
pub(crate) fn fold_across(
    tri: &mut Triangulation,
    s: usize,
    e0: usize,
    e1: usize,
) -> Result<(), TriangulationError> {
    let b = free_facet_through(tri, s, e0, e1).ok_or_else(|| {
        TriangulationError::failed_precondition(format!("edge {e0}{e1} of simplex {s} is not on the boundary"))
    })?;
    let partner = b.partner(tri);
    if (partner.simplex, partner.facet) == (b.simplex, b.facet) {
        return Err(TriangulationError::failed_precondition(
            "cannot fold a triangle onto itself",
        ));
    }
    tri.glue_raw(b.simplex, b.facet, partner.simplex, b.fold(&partner));
    tri.debug_check_invariants();
    Ok(())
}

/// Layers on a boundary edge with distinct endpoints and closes the book on
/// the new edge, which merges those endpoints.
fn layer_and_close(tri: &mut Triangulation, edges: &[usize]) -> Result<bool, TriangulationError> {
    for &e in edges {
        let skel = tri.skeleton();
        let front = skel.faces(1)[e].front();
        let u = skel.simplex_vertex(front.simplex, front.vertices.image(0));
        let v = skel.simplex_vertex(front.simplex, front.vertices.image(1));
        if u == v {
            continue;
        }
        let Some(b) = boundary_edge(tri, e)? else {
            continue;
        };
        let partner = b.partner(tri);
        if (partner.simplex, partner.facet) == (b.simplex, b.facet) {
            continue;
        }
        let top = layer_at(tri, b, &partner);
        let flipped = tri.skeleton().simplex_edge(top, 2, 3);
        if tri.close_book(flipped, true, true)? {
            return Ok(true);
        }
        tri.remove_simplex(top)?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::standard;

    #[test]
    fn test_close_book_on_a_tetrahedron() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        let legal: Vec<usize> = (0..6)
            .filter(|&e| tri.close_book(e, true, false).unwrap())
            .collect();
        assert_eq!(legal.len(), 6);
        assert!(tri.close_book(legal[0], true, true).unwrap());
        assert_eq!(tri.count_boundary_facets(), 2);
        assert!(tri.is_valid());
        assert!(tri.homology(1).unwrap().is_trivial());
    }

    #[test]
    fn test_layering_adds_one_tetrahedron() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        let top = tri.layer_on(0).unwrap();
        assert_eq!(top, 1);
        assert_eq!(tri.size(), 2);
        assert_eq!(tri.count_boundary_facets(), 4);
        assert!(tri.is_valid());
        assert_eq!(tri.count_vertices(), 4);
    }

    #[test]
    fn test_interior_edges_cannot_be_layered() {
        let mut tri = standard::sphere_two_simplices(3);
        assert!(matches!(
            tri.layer_on(0),
            Err(TriangulationError::FailedPrecondition { .. })
        ));
        assert!(!tri.close_book(0, true, true).unwrap());
    }

    #[test]
    fn test_minimising_a_truncated_knot_complement() {
        let mut tri = standard::figure_eight();
        tri.ideal_to_finite();
        let h1 = tri.homology(1).unwrap();
        assert!(tri.minimise_boundary().unwrap());
        assert!(tri.is_valid());
        assert_eq!(tri.homology(1).unwrap(), h1);
        let skel = tri.skeleton();
        assert_eq!(skel.real_boundary().len(), 1);
        let boundary = skel.real_boundary()[0].triangulation().unwrap();
        assert_eq!(boundary.count_vertices(), 1);
        assert_eq!(boundary.size(), 2);
        assert!(!tri.minimise_boundary().unwrap());
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let mut tri = Triangulation::new(4);
        tri.new_simplex("");
        assert!(tri.minimise_boundary().is_err());
        assert!(tri.layer_on(0).is_err());
    }
}
