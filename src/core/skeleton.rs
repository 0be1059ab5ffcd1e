//! Derived face structure of a triangulation.
//!
//! A [`Skeleton`] is an immutable snapshot computed from the facet gluings of a
//! [`Triangulation`]. It is built in one pass and cached behind an `Arc`; any
//! mutation of the triangulation drops the snapshot and the next query builds a
//! fresh one. Face, component and boundary indices are therefore only
//! meaningful for the snapshot they were read from.
//!
//! For each `0 ≤ k < d` the k-faces are the classes of `(simplex, k-subface)`
//! pairs under the identifications generated by facet gluings. Classes are
//! discovered by breadth-first search from the lowest `(simplex, subface)` pair
//! not yet seen, so the first embedding of every face is its lowest pair and
//! uses the canonical vertex ordering of [`FaceNumbering::ordering`].

use crate::core::boundary::{RealBoundary, real_boundary_components};
use crate::core::collections::SmallBuffer;
use crate::core::error::TriangulationError;
use crate::core::face_numbering::{FaceNumbering, head_mask};
use crate::core::perm::Perm;
use crate::core::triangulation::Triangulation;
use crate::topology::characteristics::validation::{BoundaryComponent, LinkType};
use crate::topology::homology::AbelianGroup;
use std::collections::VecDeque;
use std::sync::OnceLock;

const UNSEEN: (usize, usize) = (usize::MAX, usize::MAX);

/// One appearance of a face inside a top-dimensional simplex.
///
/// `vertices` maps the face's canonical vertices `0..=k` onto the simplex
/// vertices it occupies in this appearance. Images `k+1..=d` list the
/// remaining simplex vertices; for the first embedding they are ascending and
/// for every other embedding they are carried across the gluings that reached it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceEmbedding {
    /// Simplex containing this appearance.
    pub simplex: usize,
    /// Subface number of the appearance inside `simplex`.
    pub face: usize,
    /// Canonical-to-simplex vertex map.
    pub vertices: Perm,
}

/// A k-face of the triangulation, `0 ≤ k < d`.
#[derive(Clone, Debug)]
pub struct Face {
    subdim: usize,
    embeddings: Vec<FaceEmbedding>,
    boundary: bool,
    bad_identification: bool,
    component: usize,
}

impl Face {
    /// Dimension `k` of the face.
    #[must_use]
    pub const fn subdim(&self) -> usize {
        self.subdim
    }

    /// Number of embeddings.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.embeddings.len()
    }

    /// All embeddings in discovery order.
    #[must_use]
    pub fn embeddings(&self) -> &[FaceEmbedding] {
        &self.embeddings
    }

    /// The first embedding (lowest simplex, then lowest subface).
    #[must_use]
    pub fn front(&self) -> FaceEmbedding {
        self.embeddings[0]
    }

    /// Whether the face lies in an unglued facet.
    #[must_use]
    pub const fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Whether the face is identified with itself under a non-identity map.
    #[must_use]
    pub const fn has_bad_identification(&self) -> bool {
        self.bad_identification
    }

    /// Index of the connected component containing the face.
    #[must_use]
    pub const fn component(&self) -> usize {
        self.component
    }
}

/// A connected component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    simplices: Vec<usize>,
    orientable: bool,
    boundary_facets: usize,
}

impl Component {
    /// Simplices of the component in increasing order.
    #[must_use]
    pub fn simplices(&self) -> &[usize] {
        &self.simplices
    }

    /// Number of simplices.
    #[must_use]
    pub fn size(&self) -> usize {
        self.simplices.len()
    }

    /// Whether the component admits a consistent orientation.
    #[must_use]
    pub const fn is_orientable(&self) -> bool {
        self.orientable
    }

    /// Number of unglued facets.
    #[must_use]
    pub const fn count_boundary_facets(&self) -> usize {
        self.boundary_facets
    }
}

/// The link of a face together with its inclusion into the parent.
///
/// Simplex `i` of the link corresponds to embedding `i` of the face; link
/// vertex `a` of that simplex is parent vertex
/// `inclusion[i].vertices.image(k + 1 + a)` of `inclusion[i].simplex`.
#[derive(Clone, Debug)]
pub struct FaceLink {
    /// The link as a `(d - k - 1)`-dimensional triangulation.
    pub triangulation: Triangulation,
    /// Embedding of the face that produced each link simplex.
    pub inclusion: Vec<FaceEmbedding>,
}

/// Properties derived from a skeleton on first request.
#[derive(Debug, Default)]
pub(crate) struct DerivedProperties {
    pub(crate) link_types: Vec<OnceLock<Vec<LinkType>>>,
    pub(crate) valid: OnceLock<bool>,
    pub(crate) boundary_components: OnceLock<Vec<BoundaryComponent>>,
    pub(crate) homology: Vec<OnceLock<Result<AbelianGroup, TriangulationError>>>,
    pub(crate) manifold_homology: Vec<OnceLock<Result<AbelianGroup, TriangulationError>>>,
    pub(crate) iso_sig: OnceLock<String>,
}

/// Faces, components and real boundary of one triangulation state.
#[derive(Debug)]
pub struct Skeleton {
    dim: usize,
    size: usize,
    numberings: Vec<FaceNumbering>,
    faces: Vec<Vec<Face>>,
    locations: Vec<Vec<(usize, usize)>>,
    components: Vec<Component>,
    simplex_component: Vec<usize>,
    orientation: Vec<i8>,
    real_boundary: Vec<RealBoundary>,
    pub(crate) derived: DerivedProperties,
}

impl Skeleton {
    /// Computes the skeleton of `tri`.
    #[must_use]
    pub fn build(tri: &Triangulation) -> Self {
        let dim = tri.dim();
        let size = tri.size();

        let mut numberings = Vec::with_capacity(dim);
        let mut faces = Vec::with_capacity(dim);
        let mut locations = Vec::with_capacity(dim);
        for k in 0..dim {
            let numbering = FaceNumbering::new(dim, k);
            let (k_faces, k_locations) = build_faces(tri, &numbering);
            faces.push(k_faces);
            locations.push(k_locations);
            numberings.push(numbering);
        }

        let (components, simplex_component, orientation) = build_components(tri);
        for k_faces in &mut faces {
            for face in k_faces.iter_mut() {
                face.component = simplex_component[face.embeddings[0].simplex];
            }
        }

        let real_boundary = real_boundary_components(tri);

        let derived = DerivedProperties {
            link_types: (0..dim).map(|_| OnceLock::new()).collect(),
            homology: (0..=dim).map(|_| OnceLock::new()).collect(),
            manifold_homology: (0..=dim).map(|_| OnceLock::new()).collect(),
            ..DerivedProperties::default()
        };

        let skeleton = Self {
            dim,
            size,
            numberings,
            faces,
            locations,
            components,
            simplex_component,
            orientation,
            real_boundary,
            derived,
        };

        if std::env::var_os("PACHNER_DEBUG_SKELETON").is_some() {
            tracing::debug!(
                dim,
                size,
                f_vector = ?skeleton.f_vector(),
                components = skeleton.components.len(),
                "skeleton rebuilt"
            );
        }
        skeleton
    }

    /// Dimension of the triangulation.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of top-dimensional simplices at build time.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Numbering of the `k`-subfaces of a simplex.
    #[must_use]
    pub fn numbering(&self, k: usize) -> &FaceNumbering {
        &self.numberings[k]
    }

    /// Number of `k`-faces (`k < d`); `k = d` counts simplices.
    #[must_use]
    pub fn count_faces(&self, k: usize) -> usize {
        match k.cmp(&self.dim) {
            std::cmp::Ordering::Less => self.faces[k].len(),
            std::cmp::Ordering::Equal => self.size,
            std::cmp::Ordering::Greater => 0,
        }
    }

    /// `[f_0, …, f_d]`.
    #[must_use]
    pub fn f_vector(&self) -> Vec<usize> {
        (0..=self.dim).map(|k| self.count_faces(k)).collect()
    }

    /// All `k`-faces.
    #[must_use]
    pub fn faces(&self, k: usize) -> &[Face] {
        self.faces.get(k).map_or(&[], Vec::as_slice)
    }

    /// The `k`-face with index `i`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::FaceOutOfRange`] for bad `k` or `i`.
    pub fn face(&self, k: usize, i: usize) -> Result<&Face, TriangulationError> {
        self.faces
            .get(k)
            .and_then(|f| f.get(i))
            .ok_or(TriangulationError::FaceOutOfRange {
                subdim: k,
                index: i,
                count: self.count_faces(k),
            })
    }

    /// Index of the `k`-face that subface `j` of simplex `s` belongs to.
    #[must_use]
    pub fn simplex_face(&self, k: usize, s: usize, j: usize) -> usize {
        self.locations[k][s * self.numberings[k].count() + j].0
    }

    /// Embedding record for subface `j` of simplex `s`.
    #[must_use]
    pub fn simplex_face_embedding(&self, k: usize, s: usize, j: usize) -> FaceEmbedding {
        let (face, emb) = self.locations[k][s * self.numberings[k].count() + j];
        self.faces[k][face].embeddings[emb]
    }

    /// Canonical-to-simplex vertex map for subface `j` of simplex `s`.
    #[must_use]
    pub fn simplex_face_mapping(&self, k: usize, s: usize, j: usize) -> Perm {
        self.simplex_face_embedding(k, s, j).vertices
    }

    /// Vertex index of local vertex `v` of simplex `s`.
    #[must_use]
    pub fn simplex_vertex(&self, s: usize, v: usize) -> usize {
        self.simplex_face(0, s, v)
    }

    /// Edge index of the edge joining local vertices `a` and `b` of simplex `s`.
    #[must_use]
    pub fn simplex_edge(&self, s: usize, a: usize, b: usize) -> usize {
        let j = self.numberings[1].face_number((1 << a) | (1 << b));
        self.simplex_face(1, s, j)
    }

    /// Connected components.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component index of simplex `s`.
    #[must_use]
    pub fn simplex_component(&self, s: usize) -> usize {
        self.simplex_component[s]
    }

    /// Orientation sign (`±1`) chosen for simplex `s` by the component search.
    #[must_use]
    pub fn orientation(&self, s: usize) -> i32 {
        i32::from(self.orientation[s])
    }

    /// Whether every component is orientable.
    #[must_use]
    pub fn is_orientable(&self) -> bool {
        self.components.iter().all(Component::is_orientable)
    }

    /// Real boundary components, each a connected union of unglued facets.
    #[must_use]
    pub fn real_boundary(&self) -> &[RealBoundary] {
        &self.real_boundary
    }

    /// Builds the link of the `k`-face `i`, for `k ≤ d - 2`.
    ///
    /// # Errors
    ///
    /// Returns an error if the face does not exist or the link would be
    /// zero-dimensional.
    pub fn link(
        &self,
        tri: &Triangulation,
        k: usize,
        i: usize,
    ) -> Result<FaceLink, TriangulationError> {
        if k + 2 > self.dim {
            return Err(TriangulationError::invalid_argument(format!(
                "links of {k}-faces in dimension {} are not triangulations",
                self.dim
            )));
        }
        let face = self.face(k, i)?;
        let m = self.dim - k - 1;
        let count = self.numberings[k].count();
        let mut link = Triangulation::with_simplices(m, face.degree());

        let position = |s: usize, j: usize| self.locations[k][s * count + j].1;

        for (li, emb) in face.embeddings.iter().enumerate() {
            for a in 0..=m {
                if link.simplices()[li].facet(a).is_some() {
                    continue;
                }
                let f = emb.vertices.image(k + 1 + a);
                let Some(g) = tri.simplices()[emb.simplex].facet(f) else {
                    continue;
                };
                let across = g.perm.compose(emb.vertices);
                let target = position(g.simplex, self.numberings[k].face_of(across));
                let other = face.embeddings[target].vertices;
                let mut images: SmallBuffer<usize, 16> = SmallBuffer::new();
                for b in 0..=m {
                    let img = g.perm.image(emb.vertices.image(k + 1 + b));
                    images.push(other.pre_image(img) - (k + 1));
                }
                let sigma = Perm::from_images_unchecked(&images);
                if target == li && sigma.image(a) == a {
                    continue;
                }
                if link.simplices()[target].facet(sigma.image(a)).is_none() {
                    link.glue_raw(li, a, target, sigma);
                }
            }
        }

        Ok(FaceLink {
            triangulation: link,
            inclusion: face.embeddings.clone(),
        })
    }
}

fn build_faces(
    tri: &Triangulation,
    numbering: &FaceNumbering,
) -> (Vec<Face>, Vec<(usize, usize)>) {
    let k = numbering.subdim();
    let dim = tri.dim();
    let count = numbering.count();
    let simplices = tri.simplices();
    let mut locations = vec![UNSEEN; simplices.len() * count];
    let mut faces = Vec::new();
    let mut queue = VecDeque::new();

    for s0 in 0..simplices.len() {
        for j0 in 0..count {
            if locations[s0 * count + j0] != UNSEEN {
                continue;
            }
            let index = faces.len();
            let mut face = Face {
                subdim: k,
                embeddings: vec![FaceEmbedding {
                    simplex: s0,
                    face: j0,
                    vertices: numbering.ordering(j0),
                }],
                boundary: false,
                bad_identification: false,
                component: 0,
            };
            locations[s0 * count + j0] = (index, 0);
            queue.push_back(0_usize);

            while let Some(e) = queue.pop_front() {
                let FaceEmbedding {
                    simplex: s,
                    vertices: p,
                    ..
                } = face.embeddings[e];
                let head = head_mask(p, k);
                for f in 0..=dim {
                    if head & (1 << f) != 0 {
                        continue;
                    }
                    let Some(g) = simplices[s].facet(f) else {
                        face.boundary = true;
                        continue;
                    };
                    let q = g.perm.compose(p);
                    let jt = numbering.face_of(q);
                    let slot = g.simplex * count + jt;
                    match locations[slot] {
                        UNSEEN => {
                            locations[slot] = (index, face.embeddings.len());
                            queue.push_back(face.embeddings.len());
                            face.embeddings.push(FaceEmbedding {
                                simplex: g.simplex,
                                face: jt,
                                vertices: q,
                            });
                        }
                        (_, seen) => {
                            let r = face.embeddings[seen].vertices;
                            if (0..=k).any(|i| r.image(i) != q.image(i)) {
                                face.bad_identification = true;
                            }
                        }
                    }
                }
            }
            faces.push(face);
        }
    }
    (faces, locations)
}

fn build_components(tri: &Triangulation) -> (Vec<Component>, Vec<usize>, Vec<i8>) {
    let simplices = tri.simplices();
    let mut component_of = vec![usize::MAX; simplices.len()];
    let mut orientation = vec![0_i8; simplices.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for root in 0..simplices.len() {
        if component_of[root] != usize::MAX {
            continue;
        }
        let c = components.len();
        let mut component = Component {
            simplices: vec![root],
            orientable: true,
            boundary_facets: 0,
        };
        component_of[root] = c;
        orientation[root] = 1;
        stack.push(root);
        while let Some(s) = stack.pop() {
            for f in 0..=tri.dim() {
                let Some(g) = simplices[s].facet(f) else {
                    component.boundary_facets += 1;
                    continue;
                };
                let wanted = if g.perm.sign() < 0 {
                    orientation[s]
                } else {
                    -orientation[s]
                };
                if component_of[g.simplex] == usize::MAX {
                    component_of[g.simplex] = c;
                    orientation[g.simplex] = wanted;
                    component.simplices.push(g.simplex);
                    stack.push(g.simplex);
                } else if orientation[g.simplex] != wanted {
                    component.orientable = false;
                }
            }
        }
        component.simplices.sort_unstable();
        components.push(component);
    }
    (components, component_of, orientation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_simplex_sphere(dim: usize) -> Triangulation {
        let mut tri = Triangulation::new(dim);
        tri.new_simplices(2);
        for f in 0..=dim {
            tri.join(0, f, 1, Perm::identity(dim + 1)).unwrap();
        }
        tri
    }

    // =========================================================================
    // FACE CLASSES
    // =========================================================================

    #[test]
    fn test_two_tetrahedra_sphere_has_full_f_vector() {
        let tri = two_simplex_sphere(3);
        let sk = Skeleton::build(&tri);
        assert_eq!(sk.f_vector(), vec![4, 6, 4, 2]);
        assert!(sk.faces(1).iter().all(|e| e.degree() == 2));
        assert!(sk.faces(0).iter().all(|v| !v.is_boundary()));
    }

    #[test]
    fn test_every_subface_lands_in_exactly_one_class() {
        let tri = two_simplex_sphere(4);
        let sk = Skeleton::build(&tri);
        for k in 0..4 {
            let total: usize = sk.faces(k).iter().map(Face::degree).sum();
            assert_eq!(total, 2 * sk.numbering(k).count(), "k = {k}");
            for s in 0..2 {
                for j in 0..sk.numbering(k).count() {
                    let emb = sk.simplex_face_embedding(k, s, j);
                    assert_eq!((emb.simplex, emb.face), (s, j));
                }
            }
        }
    }

    #[test]
    fn test_snapped_tetrahedron_has_expected_vertices_and_edges() {
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        tri.join(0, 0, 0, Perm::from_images(&[1, 0, 2, 3]).unwrap())
            .unwrap();
        tri.join(0, 2, 0, Perm::from_images(&[0, 1, 3, 2]).unwrap())
            .unwrap();
        let sk = Skeleton::build(&tri);
        assert_eq!(sk.count_faces(0), 2);
        assert_eq!(sk.count_faces(1), 3);
        assert_eq!(sk.simplex_vertex(0, 0), sk.simplex_vertex(0, 1));
        assert_ne!(sk.simplex_vertex(0, 1), sk.simplex_vertex(0, 2));
        assert!(sk.faces(1).iter().all(|e| !e.has_bad_identification()));
    }

    #[test]
    fn test_reversed_edge_is_a_bad_identification() {
        // Facets 012 and 013 folded onto each other with 0 and 1 swapped.
        let mut tri = Triangulation::new(3);
        tri.new_simplex("");
        tri.join(0, 2, 0, Perm::from_images(&[1, 0, 3, 2]).unwrap())
            .unwrap();
        let sk = Skeleton::build(&tri);
        let e01 = sk.simplex_edge(0, 0, 1);
        assert!(sk.faces(1)[e01].has_bad_identification());
        let e23 = sk.simplex_edge(0, 2, 3);
        assert!(!sk.faces(1)[e23].has_bad_identification());
    }

    #[test]
    fn test_swapped_edges_in_two_triangles_stay_distinct() {
        let mut tri = Triangulation::new(2);
        tri.new_simplices(2);
        tri.join(0, 2, 1, Perm::identity(3)).unwrap();
        tri.join(0, 1, 1, Perm::from_images(&[1, 0, 2]).unwrap())
            .unwrap();
        let sk = Skeleton::build(&tri);
        assert_eq!(sk.count_faces(1), 4);
        assert!(sk.faces(1).iter().all(|e| !e.has_bad_identification()));
    }

    // =========================================================================
    // COMPONENTS AND LINKS
    // =========================================================================

    #[test]
    fn test_components_track_orientability_and_boundary() {
        let mut tri = two_simplex_sphere(3);
        tri.new_simplex("");
        let sk = Skeleton::build(&tri);
        assert_eq!(sk.components().len(), 2);
        assert_eq!(sk.components()[0].simplices(), &[0, 1]);
        assert!(sk.components()[0].is_orientable());
        assert_eq!(sk.components()[1].count_boundary_facets(), 4);
        assert_eq!(sk.simplex_component(2), 1);
    }

    #[test]
    fn test_vertex_link_of_two_tetrahedra_sphere_is_two_triangles() {
        let tri = two_simplex_sphere(3);
        let sk = Skeleton::build(&tri);
        let link = sk.link(&tri, 0, 0).unwrap();
        assert_eq!(link.triangulation.dim(), 2);
        assert_eq!(link.triangulation.size(), 2);
        assert!(link.triangulation.is_closed());
        assert_eq!(link.inclusion.len(), 2);
    }

    #[test]
    fn test_facet_links_are_rejected() {
        let tri = two_simplex_sphere(3);
        let sk = Skeleton::build(&tri);
        assert!(sk.link(&tri, 2, 0).is_err());
    }
}
