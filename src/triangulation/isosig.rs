//! Isomorphism signatures.
//!
//! A signature is a complete invariant of a triangulation up to combinatorial
//! isomorphism. Each connected component is walked breadth-first from every
//! possible starting simplex and vertex labelling; the walk records, facet by
//! facet, whether the facet is free, leads to a simplex not yet seen, or is
//! glued to one already seen (with its destination and gluing permutation).
//! The lexicographically smallest encoding over all starts is the component's
//! signature, and the sorted component signatures are concatenated.
//!
//! Layout of one component, in the 64-letter alphabet
//! [`ISO_SIG_ALPHABET`], with multi-letter values little-endian:
//!
//! - the size `m`: one letter if `m < 63`, otherwise the letter for 63, a
//!   letter giving the width `w` and `m` in `w` letters;
//! - the facet actions, three per letter (two bits each: free, new simplex,
//!   existing simplex);
//! - one destination per "existing" action, in `w` letters (1 if `m < 63`);
//! - one permutation index per "existing" action, in the fewest letters that
//!   hold `(d+1)! - 1`.

use thiserror::Error;

use crate::core::error::TriangulationError;
use crate::core::isomorphism::Isomorphism;
use crate::core::perm::{FACTORIALS, Perm};
use crate::core::triangulation::{MAX_DIMENSION, Triangulation};

/// The 64 letters of a signature, in value order.
pub const ISO_SIG_ALPHABET: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+-";

/// A malformed isomorphism signature.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum IsoSigError {
    /// A character outside [`ISO_SIG_ALPHABET`].
    #[error("Invalid character {character:?} at position {position}")]
    BadCharacter {
        /// The offending character.
        character: char,
        /// Position after removing whitespace.
        position: usize,
    },
    /// The signature ends in the middle of a component.
    #[error("Signature truncated at position {position}")]
    Truncated {
        /// Position after removing whitespace.
        position: usize,
    },
    /// The streams decode but do not describe a triangulation.
    #[error("Inconsistent gluing data: {message}")]
    InconsistentGluing {
        /// What went wrong.
        message: String,
    },
    /// The requested dimension is unsupported.
    #[error("Dimension {dim} is outside 1..={max}", max = MAX_DIMENSION)]
    UnsupportedDimension {
        /// Requested dimension.
        dim: usize,
    },
}

impl From<IsoSigError> for TriangulationError {
    fn from(err: IsoSigError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}

fn inconsistent(message: impl Into<String>) -> IsoSigError {
    IsoSigError::InconsistentGluing {
        message: message.into(),
    }
}

/// Letters needed for a permutation index of degree `n`.
fn perm_width(n: usize) -> usize {
    let mut width = 1;
    while 64_u64.saturating_pow(width as u32) < FACTORIALS[n] {
        width += 1;
    }
    width
}

fn push_value(out: &mut Vec<u8>, mut value: u64, width: usize) {
    for _ in 0..width {
        out.push(ISO_SIG_ALPHABET[(value & 63) as usize]);
        value >>= 6;
    }
}

fn letter_value(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a')),
        b'A'..=b'Z' => Some(u64::from(c - b'A') + 26),
        b'0'..=b'9' => Some(u64::from(c - b'0') + 52),
        b'+' => Some(62),
        b'-' => Some(63),
        _ => None,
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// One breadth-first walk of a component.
struct ComponentWalk {
    signature: Vec<u8>,
    /// Original simplices in canonical order.
    order: Vec<usize>,
    /// Original vertex labels to canonical labels, indexed like `order`.
    labels: Vec<Perm>,
}

/// Walks the component of `start`, which becomes simplex 0 with canonical
/// vertex `i` at its original vertex `start_perm[i]`.
fn walk(tri: &Triangulation, start: usize, start_perm: Perm) -> ComponentWalk {
    let n = tri.dim() + 1;
    let mut image: Vec<Option<usize>> = vec![None; tri.size()];
    let mut relabel = vec![Perm::identity(n); tri.size()];
    let mut order = vec![start];
    image[start] = Some(0);
    relabel[start] = start_perm.inverse();

    let mut actions = Vec::new();
    let mut dests = Vec::new();
    let mut perms = Vec::new();
    let mut next = 0;
    while next < order.len() {
        let src = order[next];
        let back = relabel[src].inverse();
        for facet in 0..n {
            let original = back.image(facet);
            let Some(g) = tri.simplices()[src].facet(original) else {
                actions.push(0_u8);
                continue;
            };
            match image[g.simplex] {
                Some(seen)
                    if seen < next
                        || (seen == next
                            && relabel[g.simplex].image(g.perm.image(original)) < facet) => {}
                None => {
                    image[g.simplex] = Some(order.len());
                    order.push(g.simplex);
                    relabel[g.simplex] = relabel[src].compose(g.perm.inverse());
                    actions.push(1);
                }
                Some(seen) => {
                    actions.push(2);
                    dests.push(seen as u64);
                    perms.push(relabel[g.simplex].compose(g.perm).compose(back).index());
                }
            }
        }
        next += 1;
    }

    let size = order.len();
    let mut signature = Vec::new();
    let width = if size < 63 {
        signature.push(ISO_SIG_ALPHABET[size]);
        1
    } else {
        let width = (usize::BITS - size.leading_zeros()).div_ceil(6) as usize;
        signature.push(ISO_SIG_ALPHABET[63]);
        signature.push(ISO_SIG_ALPHABET[width]);
        push_value(&mut signature, size as u64, width);
        width
    };
    for chunk in actions.chunks(3) {
        let packed = chunk
            .iter()
            .enumerate()
            .fold(0_usize, |acc, (i, &a)| acc | (usize::from(a) << (2 * i)));
        signature.push(ISO_SIG_ALPHABET[packed]);
    }
    for dest in dests {
        push_value(&mut signature, dest, width);
    }
    let perm_letters = perm_width(n);
    for perm in perms {
        push_value(&mut signature, perm, perm_letters);
    }

    let labels = order.iter().map(|&s| relabel[s]).collect();
    ComponentWalk {
        signature,
        order,
        labels,
    }
}

fn smallest_walk(tri: &Triangulation, simplices: &[usize]) -> Option<ComponentWalk> {
    let n = tri.dim() + 1;
    let mut best: Option<ComponentWalk> = None;
    for &start in simplices {
        for perm in Perm::all(n) {
            let candidate = walk(tri, start, perm);
            if best
                .as_ref()
                .is_none_or(|b| candidate.signature < b.signature)
            {
                best = Some(candidate);
            }
        }
    }
    best
}

impl Triangulation {
    /// The isomorphism signature.
    ///
    /// Two triangulations have the same signature exactly when they are
    /// combinatorially isomorphic. The result is cached with the skeleton.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::triangulation::standard;
    ///
    /// assert_eq!(standard::figure_eight().iso_sig(), "cPcbbbiht");
    /// ```
    #[must_use]
    pub fn iso_sig(&self) -> String {
        self.skeleton()
            .derived
            .iso_sig
            .get_or_init(|| self.iso_sig_detail().0)
            .clone()
    }

    /// The signature together with an isomorphism taking this triangulation
    /// onto the one that [`from_iso_sig`](Self::from_iso_sig) rebuilds.
    #[must_use]
    pub fn iso_sig_detail(&self) -> (String, Isomorphism) {
        let n = self.dim() + 1;
        if self.is_empty() {
            return (
                char::from(ISO_SIG_ALPHABET[0]).to_string(),
                Isomorphism::identity(self.dim(), 0),
            );
        }
        let skeleton = self.skeleton();
        let mut walks: Vec<ComponentWalk> = skeleton
            .components()
            .iter()
            .filter_map(|c| smallest_walk(self, c.simplices()))
            .collect();
        walks.sort_by(|a, b| a.signature.cmp(&b.signature));

        let mut signature = String::new();
        let mut images = vec![0; self.size()];
        let mut perms = vec![Perm::identity(n); self.size()];
        let mut offset = 0;
        for walk in &walks {
            signature.extend(walk.signature.iter().map(|&c| char::from(c)));
            for (i, (&s, &perm)) in walk.order.iter().zip(&walk.labels).enumerate() {
                images[s] = offset + i;
                perms[s] = perm;
            }
            offset += walk.order.len();
        }
        (signature, Isomorphism::from_parts(self.dim(), images, perms))
    }

    /// Relabels into the canonical form encoded by the signature.
    ///
    /// Returns whether anything moved.
    pub fn make_canonical(&mut self) -> bool {
        let (_, iso) = self.iso_sig_detail();
        if iso.is_identity() {
            return false;
        }
        match iso.apply(self) {
            Ok(canonical) => {
                let changed = canonical != *self;
                if changed {
                    self.replace_simplices(canonical);
                }
                changed
            }
            Err(_) => false,
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

struct Reader {
    letters: Vec<u8>,
    pos: usize,
}

impl Reader {
    fn remaining(&self) -> usize {
        self.letters.len() - self.pos
    }

    fn read(&mut self, width: usize) -> Result<u64, IsoSigError> {
        let mut value = 0_u64;
        for i in 0..width {
            let Some(&c) = self.letters.get(self.pos) else {
                return Err(IsoSigError::Truncated { position: self.pos });
            };
            let digit = letter_value(c).ok_or(IsoSigError::BadCharacter {
                character: char::from(c),
                position: self.pos,
            })?;
            value |= digit << (6 * i);
            self.pos += 1;
        }
        Ok(value)
    }
}

fn read_component(
    reader: &mut Reader,
    out: &mut Triangulation,
    size: usize,
    width: usize,
) -> Result<(), IsoSigError> {
    let n = out.dim() + 1;
    // Each action letter covers at most six facets.
    if size * n > 6 * reader.remaining() {
        return Err(IsoSigError::Truncated {
            position: reader.letters.len(),
        });
    }
    let mut actions = Vec::new();
    let mut facets = 0;
    let mut joins = 0;
    while facets < size * n {
        let packed = reader.read(1)?;
        for shift in [0, 2, 4] {
            if facets >= size * n {
                break;
            }
            let action = (packed >> shift) & 3;
            match action {
                0 => facets += 1,
                1 => facets += 2,
                2 => {
                    facets += 2;
                    joins += 1;
                }
                _ => return Err(inconsistent("unknown facet action")),
            }
            actions.push(action);
        }
    }
    if facets != size * n {
        return Err(inconsistent("facet actions overrun the component"));
    }
    let dests = (0..joins)
        .map(|_| reader.read(width))
        .collect::<Result<Vec<_>, _>>()?;
    let perm_letters = perm_width(n);
    let perms = (0..joins)
        .map(|_| reader.read(perm_letters))
        .collect::<Result<Vec<_>, _>>()?;

    let base = out.size();
    out.new_simplices(size);
    let id = Perm::identity(n);
    let mut actions = actions.into_iter();
    let mut joins = dests.into_iter().zip(perms);
    let mut created = 1;
    for simp in 0..size {
        if created <= simp {
            return Err(inconsistent("component is not connected"));
        }
        for facet in 0..n {
            if out.simplices()[base + simp].facet(facet).is_some() {
                continue;
            }
            match actions.next() {
                None => return Err(inconsistent("missing facet actions")),
                Some(0) => {}
                Some(1) => {
                    if created >= size {
                        return Err(inconsistent("more simplices than the header allows"));
                    }
                    out.glue_raw(base + simp, facet, base + created, id);
                    created += 1;
                }
                Some(_) => {
                    let Some((dest, index)) = joins.next() else {
                        return Err(inconsistent("missing gluing"));
                    };
                    let dest = usize::try_from(dest)
                        .ok()
                        .filter(|&d| d < created)
                        .ok_or_else(|| inconsistent(format!("destination {dest} not yet created")))?;
                    let perm = Perm::from_index(n, index).map_err(|e| inconsistent(e.to_string()))?;
                    let target = perm.image(facet);
                    if (dest == simp && target == facet)
                        || out.simplices()[base + dest].facet(target).is_some()
                    {
                        return Err(inconsistent(format!(
                            "facet {target} of simplex {dest} glued twice"
                        )));
                    }
                    out.glue_raw(base + simp, facet, base + dest, perm);
                }
            }
        }
    }
    if actions.next().is_some() {
        return Err(inconsistent("unused facet actions"));
    }
    if created != size {
        return Err(inconsistent("component is not connected"));
    }
    Ok(())
}

/// Rebuilds the canonical triangulation behind `sig`, reporting exactly what
/// is malformed. Whitespace is ignored.
///
/// # Errors
///
/// Returns an [`IsoSigError`] describing the first problem found.
pub fn decode_iso_sig(dim: usize, sig: &str) -> Result<Triangulation, IsoSigError> {
    if !(1..=MAX_DIMENSION).contains(&dim) {
        return Err(IsoSigError::UnsupportedDimension { dim });
    }
    let mut reader = Reader {
        letters: sig.bytes().filter(|c| !c.is_ascii_whitespace()).collect(),
        pos: 0,
    };
    let mut out = Triangulation::new(dim);
    while reader.remaining() > 0 {
        let mut size = reader.read(1)?;
        if size == 0 {
            continue;
        }
        let mut width = 1;
        if size == 63 {
            let w = reader.read(1)?;
            width = usize::try_from(w)
                .ok()
                .filter(|&w| (1..=10).contains(&w))
                .ok_or_else(|| inconsistent(format!("size width {w}")))?;
            size = reader.read(width)?;
        }
        let size = usize::try_from(size).map_err(|_| inconsistent("component too large"))?;
        read_component(&mut reader, &mut out, size, width)?;
    }
    Ok(out)
}

impl Triangulation {
    /// Rebuilds a `dim`-dimensional triangulation from its signature.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidArgument`] for a malformed
    /// signature; [`decode_iso_sig`] gives the detailed reason.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pachner::prelude::*;
    ///
    /// let rp4 = Triangulation::from_iso_sig(4, "eLMQcbcddcddaaaa8a8a8a8a8a").unwrap();
    /// assert_eq!(rp4.size(), 4);
    /// assert!(!rp4.is_orientable());
    /// assert!(Triangulation::from_iso_sig(3, "cPc!").is_err());
    /// ```
    pub fn from_iso_sig(dim: usize, sig: &str) -> Result<Self, TriangulationError> {
        let tri = decode_iso_sig(dim, sig)?;
        tracing::trace!(dim, size = tri.size(), "signature decoded");
        Ok(tri)
    }
}
