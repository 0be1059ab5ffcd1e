//! Dehydration strings for closed, connected 3-manifold triangulations.
//!
//! A dehydration string is a compact lowercase encoding of a triangulation
//! with `n ≤ 25` tetrahedra and no boundary facets. The triangulation is first
//! relabelled breadth-first from tetrahedron 0 so that every tetrahedron is
//! reached through an identity gluing. Facets are then visited in order
//! (tetrahedron ascending, facet ascending), skipping facets already glued,
//! and the string holds
//!
//! - `2n` destination letters, one per visited facet. A destination equal to
//!   the number of tetrahedra created so far opens a new tetrahedron glued by
//!   the identity;
//! - `n + 1` permutation letters, the lexicographic index in `S₄` of each
//!   remaining gluing, in the same order.
//!
//! The length is therefore exactly `3n + 1`. Two triangulations with the same
//! dehydration are isomorphic, though isomorphic triangulations may dehydrate
//! differently depending on which tetrahedron is labelled 0.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::trace;

use crate::core::error::TriangulationError;
use crate::core::perm::Perm;
use crate::core::triangulation::Triangulation;

/// Largest number of tetrahedra a dehydration string can describe.
pub const MAX_DEHYDRATION_SIZE: usize = 25;

/// A string that is not a valid dehydration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DehydrationError {
    /// The length is not `3n + 1` for some `1 ≤ n ≤ 25`.
    #[error("Dehydration length {length} is not 3n + 1 for 1 <= n <= {MAX_DEHYDRATION_SIZE}")]
    BadLength {
        /// Length of the input.
        length: usize,
    },
    /// A character that is not a letter.
    #[error("Invalid character {character:?} at position {position}")]
    BadCharacter {
        /// The offending character.
        character: char,
        /// Position in the input.
        position: usize,
    },
    /// The letters decode but do not describe a closed triangulation.
    #[error("Inconsistent gluing at position {position}: {message}")]
    InconsistentGluing {
        /// Position of the letter that failed.
        position: usize,
        /// What went wrong.
        message: String,
    },
}

impl From<DehydrationError> for TriangulationError {
    fn from(err: DehydrationError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}

const fn letter(value: usize) -> char {
    (b'a' + value as u8) as char
}

impl Triangulation {
    /// Encodes this triangulation as a dehydration string.
    ///
    /// Returns `None` unless the triangulation is 3-dimensional, connected,
    /// has between 1 and 25 tetrahedra and no boundary facets. Ideal vertices
    /// are allowed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    /// use pachner::core::triangulation::Triangulation;
    ///
    /// let knot = standard::figure_eight();
    /// let code = knot.dehydrate().unwrap();
    /// assert_eq!(code.len(), 7);
    /// let back = Triangulation::rehydrate(&code).unwrap();
    /// assert!(back.is_isomorphic_to(&knot));
    /// ```
    #[must_use]
    pub fn dehydrate(&self) -> Option<String> {
        let n = self.size();
        if self.dim() != 3
            || n == 0
            || n > MAX_DEHYDRATION_SIZE
            || self.has_boundary_facets()
            || !self.is_connected()
        {
            return None;
        }

        // Breadth-first relabelling: canonical tetrahedron c is original
        // order[c], with canonical vertex i at original vertex labels[c][i].
        let mut canonical = vec![usize::MAX; n];
        let mut order = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        canonical[0] = 0;
        order.push(0);
        labels.push(Perm::identity(4));
        let mut queue = VecDeque::from([0_usize]);
        while let Some(c) = queue.pop_front() {
            let (orig, label) = (order[c], labels[c]);
            for f in 0..4 {
                let gluing = self.simplices()[orig].facet(label.image(f))?;
                if canonical[gluing.simplex] == usize::MAX {
                    canonical[gluing.simplex] = order.len();
                    queue.push_back(order.len());
                    order.push(gluing.simplex);
                    labels.push(gluing.perm.compose(label));
                }
            }
        }

        let mut dests = String::with_capacity(2 * n);
        let mut perms = String::with_capacity(n + 1);
        let mut created = 1;
        for c in 0..n {
            let (orig, label) = (order[c], labels[c]);
            for f in 0..4 {
                let gluing = self.simplices()[orig].facet(label.image(f))?;
                let dest = canonical[gluing.simplex];
                let local = labels[dest].inverse().compose(gluing.perm).compose(label);
                let dest_facet = local.image(f);
                if dest < c || (dest == c && dest_facet < f) {
                    continue;
                }
                if dest == created && local.is_identity() {
                    created += 1;
                    dests.push(letter(dest));
                } else {
                    dests.push(letter(dest));
                    perms.push(letter(local.index() as usize));
                }
            }
        }
        dests.push_str(&perms);
        trace!(size = n, code = %dests, "dehydrated triangulation");
        Some(dests)
    }

    /// Rebuilds a triangulation from a dehydration string.
    ///
    /// Uppercase letters are read as lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] if the string has the
    /// wrong length, contains a non-letter, or does not describe a closed
    /// connected triangulation.
    pub fn rehydrate(code: &str) -> Result<Self, TriangulationError> {
        Ok(decode(code)?)
    }
}

fn decode(code: &str) -> Result<Triangulation, DehydrationError> {
    let values = code
        .chars()
        .enumerate()
        .map(|(position, character)| {
            let lower = character.to_ascii_lowercase();
            if lower.is_ascii_lowercase() {
                Ok(usize::from(lower as u8 - b'a'))
            } else {
                Err(DehydrationError::BadCharacter {
                    character,
                    position,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let length = values.len();
    if length % 3 != 1 || !(4..=3 * MAX_DEHYDRATION_SIZE + 1).contains(&length) {
        return Err(DehydrationError::BadLength { length });
    }
    let n = (length - 1) / 3;
    let (dests, perms) = values.split_at(2 * n);

    let mut tri = Triangulation::with_simplices(3, n);
    let mut created = 1;
    let mut next_dest = 0;
    let mut next_perm = 0;
    for t in 0..n {
        if t >= created {
            return Err(DehydrationError::InconsistentGluing {
                position: next_dest,
                message: format!("tetrahedron {t} is never reached"),
            });
        }
        for f in 0..4 {
            if tri.simplices()[t].facet(f).is_some() {
                continue;
            }
            let position = next_dest;
            let dest = *dests.get(next_dest).ok_or_else(|| DehydrationError::InconsistentGluing {
                position,
                message: "too few destinations".to_owned(),
            })?;
            next_dest += 1;

            let perm = if dest == created {
                if created == n {
                    return Err(DehydrationError::InconsistentGluing {
                        position,
                        message: format!("no tetrahedron {dest} left to create"),
                    });
                }
                created += 1;
                Perm::identity(4)
            } else if dest < created {
                let position = 2 * n + next_perm;
                let index = *perms.get(next_perm).ok_or_else(|| DehydrationError::InconsistentGluing {
                    position,
                    message: "too few permutations".to_owned(),
                })?;
                next_perm += 1;
                Perm::from_index(4, index as u64).map_err(|err| DehydrationError::InconsistentGluing {
                    position,
                    message: err.to_string(),
                })?
            } else {
                return Err(DehydrationError::InconsistentGluing {
                    position,
                    message: format!("destination {dest} skips ahead of {created}"),
                });
            };

            let dest_facet = perm.image(f);
            if (dest == t && dest_facet == f) || tri.simplices()[dest].facet(dest_facet).is_some() {
                return Err(DehydrationError::InconsistentGluing {
                    position,
                    message: format!("facet {dest_facet} of tetrahedron {dest} is not free"),
                });
            }
            tri.glue_raw(t, f, dest, perm);
        }
    }

    if next_dest != dests.len() || next_perm != perms.len() {
        return Err(DehydrationError::InconsistentGluing {
            position: next_dest,
            message: "unused letters at the end".to_owned(),
        });
    }
    tri.debug_check_invariants();
    Ok(tri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::triangulation::standard;

    // =========================================================================
    // ROUND TRIPS
    // =========================================================================

    #[test]
    fn test_closed_and_ideal_triangulations_round_trip() {
        let cases = [
            standard::figure_eight(),
            standard::lens_space(8, 3).unwrap(),
            standard::sphere_1tet_snapped(),
            standard::sphere_two_simplices(3),
            standard::simplex_boundary(3).unwrap(),
        ];
        for tri in &cases {
            let code = tri.dehydrate().unwrap();
            assert_eq!(code.len(), 3 * tri.size() + 1);
            assert!(code.bytes().all(|b| b.is_ascii_lowercase()));
            let back = Triangulation::rehydrate(&code).unwrap();
            assert!(back.is_isomorphic_to(tri), "{code}");
            assert_eq!(back.iso_sig(), tri.iso_sig());
            assert_eq!(back.dehydrate().as_deref(), Some(code.as_str()));
        }
    }

    #[test]
    fn test_uppercase_is_accepted() {
        let code = standard::figure_eight().dehydrate().unwrap();
        let upper = Triangulation::rehydrate(&code.to_ascii_uppercase()).unwrap();
        assert!(upper.is_isomorphic_to(&standard::figure_eight()));
    }

    // =========================================================================
    // UNSUPPORTED INPUT
    // =========================================================================

    #[test]
    fn test_only_small_closed_connected_triangulations_dehydrate() {
        assert!(standard::ball(3).dehydrate().is_none());
        assert!(standard::torus().dehydrate().is_none());
        assert!(Triangulation::new(3).dehydrate().is_none());

        let mut two = standard::figure_eight();
        two.insert_triangulation(&standard::figure_eight()).unwrap();
        assert!(two.dehydrate().is_none());

        let mut big = standard::figure_eight();
        big.barycentric_subdivision();
        assert!(big.size() > MAX_DEHYDRATION_SIZE);
        assert!(big.dehydrate().is_none());
    }

    #[test]
    fn test_malformed_strings_are_rejected() {
        for code in ["", "abc", "abcde", "ab1d"] {
            let err = Triangulation::rehydrate(code).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{code:?}");
        }
        assert!(matches!(
            decode("ab1d"),
            Err(DehydrationError::BadCharacter { position: 2, .. })
        ));
        // The first facet of tetrahedron 0 cannot be glued to itself.
        assert!(matches!(
            decode("aaaa"),
            Err(DehydrationError::InconsistentGluing { .. })
        ));
        // A single tetrahedron cannot open a second one.
        assert!(matches!(
            decode("baaa"),
            Err(DehydrationError::InconsistentGluing { .. })
        ));
    }
}
