//! Integration tests for skeleta: face classes, components, links, boundary
//! components, orientation, and the skeleton cache.

use std::sync::Arc;

use pachner::prelude::*;
use pachner::triangulation::standard;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn binomial(n: usize, k: usize) -> usize {
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// Every (simplex, subface) pair appears in exactly one face class.
fn assert_faces_partition(tri: &Triangulation) {
    let skel = tri.skeleton();
    let d = tri.dim();
    for k in 0..d {
        let mut seen = FastHashSet::default();
        for face in skel.faces(k) {
            assert_eq!(face.subdim(), k);
            for emb in face.embeddings() {
                assert!(seen.insert((emb.simplex, emb.face)), "{k}-subface {emb:?} repeated");
            }
        }
        assert_eq!(seen.len(), tri.size() * binomial(d + 1, k + 1), "{k}-faces");
    }
}

/// Gluings are symmetric: the partner facet points straight back.
fn assert_gluings_symmetric(tri: &Triangulation) {
    for (s, f, g) in tri.gluings() {
        let back = tri.simplex(g.simplex).unwrap().facet(g.perm.image(f)).unwrap();
        assert_eq!(back.simplex, s);
        assert_eq!(back.perm, g.perm.inverse());
    }
}

// =============================================================================
// FACE CLASSES
// =============================================================================

#[test]
fn face_counts_of_standard_triangulations() {
    let cases: [(Triangulation, &[usize]); 6] = [
        (standard::sphere_two_simplices(3), &[4, 6, 4]),
        (standard::figure_eight(), &[1, 2, 4]),
        (standard::lens_space(8, 3).unwrap(), &[1, 3, 4]),
        (standard::sphere_1tet_snapped(), &[2, 3, 2]),
        (standard::torus(), &[1, 3]),
        (standard::simplex_boundary(4).unwrap(), &[6, 15, 20, 15]),
    ];
    for (tri, counts) in &cases {
        for (k, &count) in counts.iter().enumerate() {
            assert_eq!(tri.count_faces(k), count, "{}: {k}-faces", tri.iso_sig());
        }
        assert_faces_partition(tri);
        assert_gluings_symmetric(tri);
    }
}

#[test]
fn face_embeddings_follow_the_gluings() {
    let tri = standard::figure_eight();
    let skel = tri.skeleton();
    for edge in skel.faces(1) {
        assert_eq!(edge.degree(), 6);
        assert!(!edge.is_boundary());
        assert!(!edge.has_bad_identification());
    }
    assert_eq!(skel.faces(0)[0].degree(), 8);
    assert_eq!(skel.face(2, 4).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

// =============================================================================
// COMPONENTS AND BOUNDARY
// =============================================================================

#[test]
fn components_of_a_disjoint_union() {
    let mut tri = standard::lens_space(8, 3).unwrap();
    let offset = tri.insert_triangulation(&standard::sphere_two_simplices(3)).unwrap();
    assert_eq!(offset, 2);
    assert_eq!(tri.count_components(), 2);
    assert!(!tri.is_connected());

    let skel = tri.skeleton();
    assert_eq!(skel.components()[0].simplices(), &[0, 1]);
    assert_eq!(skel.components()[1].simplices(), &[2, 3]);
    assert_eq!(skel.simplex_component(3), 1);

    let parts = tri.split_into_components();
    assert_eq!(parts.len(), 2);
    assert!(parts[0].homology(1).unwrap().is_cyclic_of_order(8));
    assert!(parts[1].homology(1).unwrap().is_trivial());
}

#[test]
fn real_boundary_of_a_ball() {
    let ball = standard::ball(3);
    assert_eq!(ball.count_boundary_facets(), 4);
    assert_eq!(ball.boundary_facets().len(), 4);
    let skel = ball.skeleton();
    assert_eq!(skel.real_boundary().len(), 1);
    let sphere = skel.real_boundary()[0].triangulation().unwrap();
    assert_eq!(sphere.size(), 4);
    assert_eq!(sphere.euler_char_tri(), 2);
    assert_eq!(ball.boundary_components(), vec![BoundaryComponent::Real(0)]);
    assert!(!ball.is_closed());
}

#[test]
fn ideal_boundary_of_the_figure_eight() {
    let tri = standard::figure_eight();
    assert_eq!(tri.boundary_components(), vec![BoundaryComponent::Ideal { vertex: 0 }]);
    assert_eq!(tri.vertex_link_types(), vec![LinkType::Ideal]);
    let link = tri.vertex_link(0).unwrap();
    assert_eq!(link.triangulation.size(), 8);
    assert_eq!(link.inclusion.len(), 8);
    assert_eq!(link.triangulation.euler_char_tri(), 0);
    assert!(link.triangulation.is_orientable());
}

#[test]
fn edge_links_are_circles() {
    let tri = standard::lens_space(8, 3).unwrap();
    for e in 0..tri.count_edges() {
        let link = tri.face_link(1, e).unwrap().triangulation;
        assert_eq!(link.dim(), 1);
        assert!(!link.has_boundary_facets());
        assert!(link.is_connected());
    }
    assert!(tri.face_link(2, 0).is_err());
}

// =============================================================================
// ORIENTATION
// =============================================================================

#[test]
fn orient_makes_every_gluing_odd() {
    let mut rng = StdRng::seed_from_u64(7);
    for tri in [standard::lens_space(8, 3).unwrap(), standard::figure_eight(), standard::simplex_boundary(4).unwrap()] {
        let iso = Isomorphism::random(tri.dim(), tri.size(), false, &mut rng);
        let mut scrambled = iso.apply(&tri).unwrap();
        scrambled.orient();
        assert!(scrambled.is_oriented());
        assert!(scrambled.is_isomorphic_to(&tri));
        scrambled.reflect();
        assert!(scrambled.is_oriented());
    }
}

#[test]
fn non_orientable_triangulations_stay_unoriented() {
    let mut tri = standard::rp4();
    tri.orient();
    assert!(!tri.is_orientable());
    assert!(!tri.is_oriented());
}

// =============================================================================
// CACHE
// =============================================================================

#[test]
fn skeleton_is_shared_until_mutation() {
    let mut tri = standard::sphere_two_simplices(3);
    let first = tri.skeleton();
    assert!(Arc::ptr_eq(&first, &tri.skeleton()));
    assert!(tri.has_cached_skeleton());

    tri.unjoin(0, 0).unwrap();
    assert!(!tri.has_cached_skeleton());
    let second = tri.skeleton();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.real_boundary().len(), 1);

    // Clones rebuild their own snapshot.
    let copy = tri.clone();
    assert_eq!(copy.count_boundary_facets(), 2);
    assert!(!Arc::ptr_eq(&copy.skeleton(), &second));
}
