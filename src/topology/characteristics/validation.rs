//! Validity, link types and boundary components.
//!
//! In standard dimensions (2, 3 and 4) a face is valid when it has no bad
//! self-identification and its link has the expected type: a sphere or ball
//! for faces of dimension at least 1, and anything but [`LinkType::Invalid`]
//! for vertices, whose links may also be closed non-sphere manifolds (ideal
//! vertices). In higher dimensions only bad self-identifications are
//! detected.
//!
//! Link recognition is homological: a closed orientable 3-dimensional link
//! with trivial `H_1` is reported as a sphere.

use crate::core::error::TriangulationError;
use crate::core::skeleton::Skeleton;
use crate::core::triangulation::Triangulation;
use crate::topology::characteristics::euler::sphere_euler_characteristic;
use serde::{Deserialize, Serialize};

/// Highest dimension in which face links are classified.
pub const MAX_STANDARD_DIMENSION: usize = 4;

/// Topological type of a face link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// A sphere of the link's dimension.
    Sphere,
    /// A ball of the link's dimension.
    Ball,
    /// A closed manifold other than a sphere.
    Ideal,
    /// Anything else, or a face with a bad self-identification.
    Invalid,
}

/// One boundary component of a triangulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryComponent {
    /// Index into [`Skeleton::real_boundary`].
    Real(usize),
    /// A vertex whose link is a closed non-sphere manifold.
    Ideal {
        /// Vertex index.
        vertex: usize,
    },
    /// An invalid vertex away from the real boundary.
    InvalidVertex {
        /// Vertex index.
        vertex: usize,
    },
}

impl BoundaryComponent {
    /// Whether this is a real boundary component.
    #[must_use]
    pub const fn is_real(self) -> bool {
        matches!(self, Self::Real(_))
    }
}

/// Classifies a connected link triangulation of dimension at most 3.
///
/// Links of higher dimension are reported as spheres or balls according to
/// whether they have boundary.
#[must_use]
pub fn classify_link(link: &Triangulation) -> LinkType {
    let bounded = link.has_boundary_facets();
    let boundary_or = |closed: LinkType| if bounded { LinkType::Ball } else { closed };
    match link.dim() {
        0 | 1 => boundary_or(LinkType::Sphere),
        2 => {
            let chi = link.euler_char_tri();
            if !bounded {
                if chi == sphere_euler_characteristic(2) {
                    LinkType::Sphere
                } else {
                    LinkType::Ideal
                }
            } else if chi == 1 && link.skeleton().real_boundary().len() == 1 {
                LinkType::Ball
            } else {
                LinkType::Invalid
            }
        }
        3 => {
            if !link.is_valid() || link.is_ideal() {
                return LinkType::Invalid;
            }
            let orientable = link.is_orientable();
            let h1_trivial = link.homology(1).is_ok_and(|h| h.is_trivial());
            if !bounded {
                return if orientable && h1_trivial {
                    LinkType::Sphere
                } else {
                    LinkType::Ideal
                };
            }
            let skel = link.skeleton();
            let sphere_boundary = matches!(skel.real_boundary(), [only]
                if only.triangulation().is_some_and(|b| {
                    b.euler_char_tri() == sphere_euler_characteristic(2)
                }));
            if sphere_boundary && orientable && h1_trivial {
                LinkType::Ball
            } else {
                LinkType::Invalid
            }
        }
        _ => boundary_or(LinkType::Sphere),
    }
}

fn compute_link_types(tri: &Triangulation, skel: &Skeleton, k: usize) -> Vec<LinkType> {
    let dim = skel.dim();
    skel.faces(k)
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let plain = if face.is_boundary() {
                LinkType::Ball
            } else {
                LinkType::Sphere
            };
            if face.has_bad_identification() {
                LinkType::Invalid
            } else if k + 1 == dim || dim > MAX_STANDARD_DIMENSION {
                plain
            } else {
                skel.link(tri, k, i)
                    .map_or(LinkType::Invalid, |l| classify_link(&l.triangulation))
            }
        })
        .collect()
}

impl Triangulation {
    /// Link types of all `k`-faces (`k < d`).
    #[must_use]
    pub fn link_types(&self, k: usize) -> Vec<LinkType> {
        let skel = self.skeleton();
        skel.derived
            .link_types
            .get(k)
            .map(|slot| slot.get_or_init(|| compute_link_types(self, &skel, k)).clone())
            .unwrap_or_default()
    }

    /// Link types of all vertices.
    #[must_use]
    pub fn vertex_link_types(&self) -> Vec<LinkType> {
        self.link_types(0)
    }

    /// Link type of the `k`-face `i`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::FaceOutOfRange`] if the face does not exist.
    pub fn face_link_type(&self, k: usize, i: usize) -> Result<LinkType, TriangulationError> {
        self.skeleton().face(k, i)?;
        Ok(self.link_types(k)[i])
    }

    /// Whether the `k`-face `i` has a link of the wrong type.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::FaceOutOfRange`] if the face does not exist.
    pub fn has_bad_link(&self, k: usize, i: usize) -> Result<bool, TriangulationError> {
        let skel = self.skeleton();
        let face = skel.face(k, i)?;
        if face.has_bad_identification() {
            return Ok(false);
        }
        Ok(match self.link_types(k)[i] {
            LinkType::Invalid => true,
            LinkType::Ideal => k > 0,
            LinkType::Sphere | LinkType::Ball => false,
        })
    }

    /// Whether the `k`-face `i` is valid.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::FaceOutOfRange`] if the face does not exist.
    pub fn face_is_valid(&self, k: usize, i: usize) -> Result<bool, TriangulationError> {
        let bad_identification = self.skeleton().face(k, i)?.has_bad_identification();
        Ok(!bad_identification && !self.has_bad_link(k, i)?)
    }

    /// Whether every face is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let skel = self.skeleton();
        *skel.derived.valid.get_or_init(|| {
            (0..self.dim()).all(|k| {
                self.link_types(k)
                    .iter()
                    .all(|t| *t != LinkType::Invalid && (k == 0 || *t != LinkType::Ideal))
            })
        })
    }

    /// Whether some vertex is ideal.
    #[must_use]
    pub fn is_ideal(&self) -> bool {
        self.vertex_link_types().contains(&LinkType::Ideal)
    }

    /// Whether some vertex is ideal or invalid.
    #[must_use]
    pub fn has_nonstandard_vertices(&self) -> bool {
        self.vertex_link_types()
            .iter()
            .any(|t| matches!(t, LinkType::Ideal | LinkType::Invalid))
    }

    /// All boundary components: real ones first, then ideal and invalid
    /// vertices in vertex order.
    #[must_use]
    pub fn boundary_components(&self) -> Vec<BoundaryComponent> {
        let skel = self.skeleton();
        skel.derived
            .boundary_components
            .get_or_init(|| {
                let mut out: Vec<BoundaryComponent> = (0..skel.real_boundary().len())
                    .map(BoundaryComponent::Real)
                    .collect();
                if self.dim() >= 2 {
                    for (vertex, t) in self.vertex_link_types().into_iter().enumerate() {
                        match t {
                            LinkType::Ideal => out.push(BoundaryComponent::Ideal { vertex }),
                            LinkType::Invalid if !skel.faces(0)[vertex].is_boundary() => {
                                out.push(BoundaryComponent::InvalidVertex { vertex });
                            }
                            _ => {}
                        }
                    }
                }
                out
            })
            .clone()
    }

    /// Number of boundary components of every kind.
    #[must_use]
    pub fn count_boundary_components(&self) -> usize {
        self.boundary_components().len()
    }

    /// Whether there is no boundary at all, real, ideal or invalid.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.boundary_components().is_empty()
    }
}
