//! Real boundary of a triangulation.
//!
//! This module implements [`BoundaryAnalysis`] for [`Triangulation`] and builds
//! the real boundary components used by the skeleton. Each component is the
//! connected union of unglued facets, exposed as a `(d-1)`-dimensional
//! triangulation whose simplex `i` is the `i`-th facet reached by a
//! breadth-first walk rooted at the lowest unglued facet.

use crate::core::collections::{FastHashMap, SimplexFacet, SmallBuffer};
use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::traits::boundary_analysis::{BoundaryAnalysis, RidgePartner};
use crate::core::triangulation::Triangulation;
use std::collections::VecDeque;

impl BoundaryAnalysis for Triangulation {
    fn boundary_facets(&self) -> Vec<SimplexFacet> {
        self.simplices()
            .iter()
            .enumerate()
            .flat_map(|(s, simplex)| {
                (0..=self.dim())
                    .filter(move |&f| simplex.facet(f).is_none())
                    .map(move |f| (s, f))
            })
            .collect()
    }

    fn is_boundary_facet(&self, s: usize, f: usize) -> Result<bool, TriangulationError> {
        self.check_facet(s, f)?;
        Ok(self.simplices()[s].facet(f).is_none())
    }

    fn boundary_ridge_partner(
        &self,
        s: usize,
        f: usize,
        v: usize,
    ) -> Result<RidgePartner, TriangulationError> {
        self.check_facet(s, f)?;
        self.check_facet(s, v)?;
        if v == f {
            return Err(TriangulationError::invalid_argument(
                "a ridge omits a vertex other than the facet's own",
            ));
        }
        if self.simplices()[s].facet(f).is_some() {
            return Err(TriangulationError::failed_precondition(format!(
                "facet {f} of simplex {s} is not a boundary facet"
            )));
        }
        Ok(ridge_walk(self, s, f, v))
    }
}

/// Ridge walk without argument checks.
pub(crate) fn ridge_walk(tri: &Triangulation, s: usize, f: usize, v: usize) -> RidgePartner {
    let simplices = tri.simplices();
    let (mut simplex, mut facet, mut opposite) = (s, v, f);
    let mut map = Perm::identity(tri.dim() + 1);
    while let Some(g) = simplices[simplex].facet(facet) {
        simplex = g.simplex;
        (facet, opposite) = (g.perm.image(opposite), g.perm.image(facet));
        map = g.perm.compose(map);
    }
    RidgePartner {
        simplex,
        facet,
        opposite,
        map,
    }
}

/// One real boundary component.
#[derive(Clone, Debug)]
pub struct RealBoundary {
    facets: Vec<SimplexFacet>,
    triangulation: Option<Triangulation>,
}

impl RealBoundary {
    /// Unglued facets of the component, in walk order.
    #[must_use]
    pub fn facets(&self) -> &[SimplexFacet] {
        &self.facets
    }

    /// Number of facets.
    #[must_use]
    pub fn size(&self) -> usize {
        self.facets.len()
    }

    /// The component as a `(d-1)`-triangulation (`None` when `d = 1`).
    ///
    /// Vertex `c` of simplex `i` is the `c`-th smallest vertex of facet
    /// `facets()[i]` in the parent simplex.
    #[must_use]
    pub fn triangulation(&self) -> Option<&Triangulation> {
        self.triangulation.as_ref()
    }
}

/// Facet vertices of facet `f` of a `dim`-simplex, ascending.
pub(crate) fn facet_vertices(dim: usize, f: usize) -> SmallBuffer<usize, 16> {
    (0..=dim).filter(|&x| x != f).collect()
}

pub(crate) fn real_boundary_components(tri: &Triangulation) -> Vec<RealBoundary> {
    let dim = tri.dim();
    let mut index: FastHashMap<SimplexFacet, usize> = FastHashMap::default();
    let mut components = Vec::new();

    for (s, f) in tri.boundary_facets() {
        if index.contains_key(&(s, f)) {
            continue;
        }
        let mut facets = vec![(s, f)];
        index.insert((s, f), 0);
        if dim == 1 {
            components.push(RealBoundary {
                facets,
                triangulation: None,
            });
            continue;
        }

        let mut boundary = Triangulation::with_simplices(dim - 1, 1);
        let mut queue = VecDeque::from([(s, f)]);
        while let Some((s1, f1)) = queue.pop_front() {
            let i1 = index[&(s1, f1)];
            let local1 = facet_vertices(dim, f1);
            for a in 0..dim {
                if boundary.simplices()[i1].facet(a).is_some() {
                    continue;
                }
                let v = local1[a];
                let partner = ridge_walk(tri, s1, f1, v);
                let key = (partner.simplex, partner.facet);
                let i2 = match index.get(&key) {
                    Some(&i2) => i2,
                    None => {
                        let i2 = facets.len();
                        index.insert(key, i2);
                        facets.push(key);
                        boundary.new_simplex("");
                        queue.push_back(key);
                        i2
                    }
                };
                let local2 = facet_vertices(dim, partner.facet);
                let images: SmallBuffer<usize, 16> = local1
                    .iter()
                    .map(|&x| {
                        let y = if x == v {
                            partner.opposite
                        } else {
                            partner.map.image(x)
                        };
                        local2.iter().position(|&z| z == y).unwrap_or(0)
                    })
                    .collect();
                let perm = Perm::from_images_unchecked(&images);
                if (i1 != i2 || perm.image(a) != a)
                    && boundary.simplices()[i2].facet(perm.image(a)).is_none()
                {
                    boundary.glue_raw(i1, a, i2, perm);
                }
            }
        }
        components.push(RealBoundary {
            facets,
            triangulation: Some(boundary),
        });
    }
    components
}
