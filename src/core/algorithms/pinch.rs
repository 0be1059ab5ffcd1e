//! Pinching and snapping edges.
//!
//! Both moves open the facet of the edge's first embedding that is opposite
//! the last vertex and insert a small gadget: a ball whose two boundary
//! facets meet along the edge and whose interior identifies the edge's
//! endpoints. In dimension 3 the gadget has two tetrahedra; a loop edge is
//! drilled out (its vertex becomes ideal) while an edge with distinct
//! endpoints is contracted.
//!
//! The dimension 4 gadget starts from one pentachoron whose facets 0 and 1
//! face the host, capped on its other three facets by a second pentachoron
//! folded about a triangle. A 2-4 move across the tetrahedron they share
//! spreads this over four pentachora, so the two host-facing facets sit in
//! different simplices.

use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::triangulation::Triangulation;

/// Gluings of the pinched 3-ball as `(s, f, t, images)`. Facets 0 and 1 of
/// simplex 0 stay free.
const PINCH_GLUINGS: [(usize, usize, usize, [usize; 4]); 3] = [
    (0, 2, 1, [1, 2, 0, 3]),
    (0, 3, 1, [2, 3, 0, 1]),
    (1, 2, 1, [0, 1, 3, 2]),
];

fn pinch_gadget() -> Triangulation {
    let mut gadget = Triangulation::with_simplices(3, 2);
    for (s, f, t, images) in PINCH_GLUINGS {
        gadget.glue_raw(s, f, t, Perm::from_images_unchecked(&images));
    }
    gadget
}

/// Gluings of the snapped 4-ball. Facet 0 of simplex 0 and facet 1 of
/// simplex 1 stay free.
const SNAP_GLUINGS: [(usize, usize, usize, [usize; 5]); 9] = [
    (0, 1, 1, [1, 0, 2, 3, 4]),
    (0, 2, 2, [2, 1, 0, 3, 4]),
    (0, 3, 3, [3, 1, 2, 0, 4]),
    (0, 4, 3, [4, 0, 2, 1, 3]),
    (1, 2, 2, [0, 2, 1, 3, 4]),
    (1, 3, 3, [0, 3, 2, 1, 4]),
    (1, 4, 3, [0, 3, 2, 1, 4]),
    (2, 2, 2, [0, 1, 4, 3, 2]),
    (2, 3, 3, [0, 1, 3, 2, 4]),
];

fn snap_gadget() -> Triangulation {
    let mut gadget = Triangulation::with_simplices(4, 4);
    for (s, f, t, images) in SNAP_GLUINGS {
        gadget.glue_raw(s, f, t, Perm::from_images_unchecked(&images));
    }
    gadget
}

/// Opens the facet opposite `p[d]` in the first embedding of edge `e` and
/// attaches `gadget` there, through facet 0 of its simplex 0 and facet 1 of
/// its simplex `far`.
fn insert_gadget(
    tri: &mut Triangulation,
    e: usize,
    gadget: &Triangulation,
    far: usize,
) -> Result<(), TriangulationError> {
    let dim = tri.dim();
    let front = tri.skeleton().face(1, e)?.front();
    let s = front.simplex;
    let p: Vec<usize> = (0..=dim).map(|i| front.vertices.image(i)).collect();
    let opened = p[dim];
    let neighbour = tri.unglue_raw(s, opened);
    let offset = tri.insert_triangulation(gadget)?;

    // Gadget vertex order on its free facets: the opened vertex, the two
    // endpoints, then the remaining vertices.
    let mut side_a = vec![opened, p[0]];
    let mut side_b = vec![p[0], opened];
    for x in [p[2], p[1]].into_iter().chain(p[3..dim].iter().copied()) {
        side_a.push(x);
        side_b.push(x);
    }
    tri.glue_raw(offset, 0, s, Perm::from_images_unchecked(&side_a));
    if let Some(g) = neighbour {
        let images: Vec<usize> = side_b.iter().map(|&x| g.perm.image(x)).collect();
        tri.glue_raw(offset + far, 1, g.simplex, Perm::from_images_unchecked(&images));
    }
    tri.debug_check_invariants();
    Ok(())
}

impl Triangulation {
    /// Pinches edge `e` of a 3-dimensional triangulation, adding two
    /// tetrahedra.
    ///
    /// An edge with distinct endpoints is contracted and the PL type is kept.
    /// A loop edge is drilled: its vertex becomes ideal, with the edge's
    /// regular neighbourhood removed.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 3 and
    /// a face range error for a bad edge index.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// let mut sphere = standard::sphere_1tet_snapped();
    /// sphere.pinch_edge(1).unwrap();
    /// assert_eq!(sphere.size(), 3);
    /// assert!(sphere.is_valid());
    /// assert!(sphere.homology_manifold(1).unwrap().is_trivial());
    /// ```
    pub fn pinch_edge(&mut self, e: usize) -> Result<(), TriangulationError> {
        if self.dim() != 3 {
            return Err(TriangulationError::invalid_argument(format!(
                "pinching edges needs dimension 3, not {}",
                self.dim()
            )));
        }
        insert_gadget(self, e, &pinch_gadget(), 0)?;
        tracing::debug!(edge = e, size = self.size(), "edge pinched");
        Ok(())
    }

    /// Whether edge `e` of a 4-dimensional triangulation can be snapped:
    /// its endpoints are distinct and not both on the real boundary.
    #[must_use]
    pub fn has_snap_edge(&self, e: usize) -> bool {
        if self.dim() != 4 {
            return false;
        }
        let skel = self.skeleton();
        let Ok(edge) = skel.face(1, e) else {
            return false;
        };
        let front = edge.front();
        let u = skel.simplex_vertex(front.simplex, front.vertices.image(0));
        let v = skel.simplex_vertex(front.simplex, front.vertices.image(1));
        u != v && !(skel.faces(0)[u].is_boundary() && skel.faces(0)[v].is_boundary())
    }

    /// Snaps edge `e` of a 4-dimensional triangulation, identifying its
    /// endpoints by inserting four pentachora.
    ///
    /// Follows the `check`/`perform` convention of
    /// [`pachner`](Self::pachner).
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] outside dimension 4, a
    /// face range error for a bad edge index, and
    /// [`TriangulationError::FailedPrecondition`] for an illegal snap
    /// requested without `check`.
    pub fn snap_edge(
        &mut self,
        e: usize,
        check: bool,
        perform_move: bool,
    ) -> Result<bool, TriangulationError> {
        if self.dim() != 4 {
            return Err(TriangulationError::invalid_argument(format!(
                "snapping edges needs dimension 4, not {}",
                self.dim()
            )));
        }
        self.skeleton().face(1, e)?;
        if !self.has_snap_edge(e) {
            if check {
                return Ok(false);
            }
            tracing::warn!(edge = e, "illegal edge snap requested without check");
            return Err(TriangulationError::failed_precondition(format!(
                "edge {e} joins a vertex to itself or two boundary vertices"
            )));
        }
        if perform_move {
            insert_gadget(self, e, &snap_gadget(), 1)?;
            tracing::debug!(edge = e, size = self.size(), "edge snapped");
        }
        Ok(true)
    }
}
