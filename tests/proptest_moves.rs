//! Property-based tests for local moves.
//!
//! This module uses proptest to verify that:
//! - Random sequences of legal Pachner moves preserve validity, orientability,
//!   connectedness, closedness, boundary components, Euler characteristic,
//!   and the first two homology groups
//! - Every 1-(d+1) and 2-(d) move can be undone by the inverse move
//! - Barycentric subdivision preserves homology
//!
//! Tests are generated per starting triangulation using macros to reduce duplication.

use pachner::prelude::*;
use pachner::triangulation::standard;
use proptest::prelude::*;

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Largest size a random walk may reach.
const SIZE_CAP: usize = 12;

#[derive(Debug, PartialEq, Eq)]
struct Invariants {
    valid: bool,
    orientable: bool,
    connected: bool,
    closed: bool,
    boundary_components: usize,
    euler: isize,
    h1: AbelianGroup,
    h2: Option<AbelianGroup>,
}

fn invariants(tri: &Triangulation) -> Invariants {
    Invariants {
        valid: tri.is_valid(),
        orientable: tri.is_orientable(),
        connected: tri.is_connected(),
        closed: tri.is_closed(),
        boundary_components: tri.count_boundary_components(),
        euler: tri.euler_char_tri(),
        h1: tri.homology(1).unwrap(),
        h2: (tri.dim() > 2).then(|| tri.homology(2).unwrap()),
    }
}

/// Every legal move `(k, face)` that keeps the size within [`SIZE_CAP`].
fn legal_moves(tri: &Triangulation) -> Vec<(usize, usize)> {
    let d = tri.dim();
    let mut moves = Vec::new();
    for k in 0..=d {
        if tri.size() + 2 * k > SIZE_CAP + d {
            continue;
        }
        let count = if k == d { tri.size() } else { tri.count_faces(k) };
        moves.extend((0..count).filter(|&i| tri.has_pachner(k, i)).map(|i| (k, i)));
    }
    moves
}

/// Applies one legal move per choice; returns the number of moves made.
fn random_walk(tri: &mut Triangulation, choices: &[u32]) -> usize {
    let mut made = 0;
    for &choice in choices {
        let moves = legal_moves(tri);
        if moves.is_empty() {
            break;
        }
        let (k, i) = moves[choice as usize % moves.len()];
        assert!(tri.pachner(k, i, false, true).unwrap());
        made += 1;
    }
    made
}

/// Whether some legal `k`-move turns `tri` into something isomorphic to `target`.
fn undone_by(tri: &Triangulation, k: usize, target: &str) -> bool {
    let count = if k == tri.dim() { tri.size() } else { tri.count_faces(k) };
    (0..count).filter(|&i| tri.has_pachner(k, i)).any(|i| {
        let mut copy = tri.clone();
        copy.pachner(k, i, true, true).unwrap() && copy.iso_sig() == target
    })
}

// =============================================================================
// TEST GENERATION MACROS
// =============================================================================

/// Macro to generate move property tests for a named starting triangulation
macro_rules! test_move_properties {
    ($name:ident, $build:expr, $cases:literal) => {
        pastey::paste! {
            proptest! {
                #![proptest_config(ProptestConfig::with_cases($cases))]

                /// Property: legal Pachner moves preserve the topological invariants
                #[test]
                fn [<prop_pachner_preserves_invariants_ $name>](
                    choices in prop::collection::vec(any::<u32>(), 1..6)
                ) {
                    let mut tri: Triangulation = $build;
                    let before = invariants(&tri);
                    random_walk(&mut tri, &choices);
                    tri.check_gluings().unwrap();
                    prop_assert_eq!(invariants(&tri), before);
                }

                /// Property: a 1-(d+1) move is undone by a (d+1)-1 move
                #[test]
                fn [<prop_simplex_move_round_trip_ $name>](s in any::<u32>()) {
                    let tri: Triangulation = $build;
                    let sig = tri.iso_sig();
                    let d = tri.dim();
                    let mut moved = tri.clone();
                    prop_assert!(moved.pachner(d, s as usize % tri.size(), true, true).unwrap());
                    prop_assert_eq!(moved.size(), tri.size() + d);
                    prop_assert_eq!(moved.count_vertices(), tri.count_vertices() + 1);
                    prop_assert!(undone_by(&moved, 0, &sig));
                }

                /// Property: a move on a facet is undone by a move on the new edge
                #[test]
                fn [<prop_facet_move_round_trip_ $name>](f in any::<u32>()) {
                    let tri: Triangulation = $build;
                    let d = tri.dim();
                    let facets = tri.count_faces(d - 1);
                    let legal: Vec<usize> = (0..facets).filter(|&i| tri.has_pachner(d - 1, i)).collect();
                    if legal.is_empty() {
                        // A lone simplex has no internal facets.
                        return Ok(());
                    }
                    let sig = tri.iso_sig();
                    let mut moved = tri.clone();
                    prop_assert!(moved.pachner(d - 1, legal[f as usize % legal.len()], true, true).unwrap());
                    prop_assert_eq!(moved.size(), tri.size() + d - 2);
                    prop_assert!(undone_by(&moved, 1, &sig));
                }
            }
        }
    };
}

test_move_properties!(lens_8_3, standard::lens_space(8, 3).unwrap(), 24);
test_move_properties!(figure_eight, standard::figure_eight(), 24);
test_move_properties!(torus, standard::torus(), 24);
test_move_properties!(klein_bottle, standard::klein_bottle(), 24);
test_move_properties!(sphere_4, standard::sphere_two_simplices(4), 8);
test_move_properties!(ball_3, standard::ball(3), 24);
test_move_properties!(
    solid_torus,
    LayeredSolidTorus::new(2, 3).unwrap().into_triangulation(),
    24
);
test_move_properties!(rp4, standard::rp4(), 8);

// =============================================================================
// DETERMINISTIC CHECKS
// =============================================================================

#[test]
fn illegal_moves_follow_the_check_contract() {
    let mut tri = standard::sphere_two_simplices(3);
    let before = tri.clone();
    // Edges of the two-simplex sphere have degree two.
    assert!(!tri.has_pachner(1, 0));
    assert!(!tri.pachner(1, 0, true, true).unwrap());
    let err = tri.pachner(1, 0, false, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    assert!(tri.pachner(3, 0, true, false).unwrap());
    assert_eq!(tri, before);
    assert_eq!(tri.pachner(4, 0, true, true).unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert_eq!(tri.pachner(1, 99, true, true).unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn collapsing_a_new_edge_restores_the_sphere() {
    let mut tri = standard::sphere_two_simplices(3);
    tri.pachner(3, 0, true, true).unwrap();
    let e = (0..tri.count_edges())
        .find(|&e| tri.has_collapse_edge(e))
        .expect("some edge of the stellar subdivision collapses");
    assert!(tri.collapse_edge(e, true, true).unwrap());
    assert!(tri.size() < 5);
    assert!(tri.is_valid() && tri.is_closed());
    assert!(tri.homology(1).unwrap().is_trivial());
    assert!(tri.homology(2).unwrap().is_trivial());
}

#[test]
fn barycentric_subdivision_preserves_homology() {
    let cases = [
        standard::lens_space(8, 3).unwrap(),
        standard::figure_eight(),
        standard::klein_bottle(),
        standard::torus(),
    ];
    for tri in &cases {
        let mut sub = tri.clone();
        sub.barycentric_subdivision();
        let factorial: usize = (1..=tri.dim() + 1).product();
        assert_eq!(sub.size(), tri.size() * factorial);
        assert!(sub.is_valid());
        assert_eq!(sub.is_orientable(), tri.is_orientable());
        for k in 1..tri.dim() {
            assert_eq!(sub.homology(k).unwrap(), tri.homology(k).unwrap(), "H{k}");
        }
    }
}

#[test]
fn truncating_and_coning_keeps_the_ideal_boundary() {
    let mut tri = standard::figure_eight();
    let links: Vec<isize> = ideal_link_eulers(&tri);
    assert!(tri.ideal_to_finite());
    assert!(!tri.is_ideal());
    assert!(tri.finite_to_ideal());
    assert!(tri.is_ideal());
    assert_eq!(ideal_link_eulers(&tri), links);
}

fn ideal_link_eulers(tri: &Triangulation) -> Vec<isize> {
    let mut eulers: Vec<isize> = tri
        .boundary_components()
        .into_iter()
        .filter_map(|c| match c {
            BoundaryComponent::Ideal { vertex } => {
                Some(tri.vertex_link(vertex).unwrap().triangulation.euler_char_tri())
            }
            _ => None,
        })
        .collect();
    eulers.sort_unstable();
    eulers
}
