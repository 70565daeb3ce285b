//! Canonicalization of per-vertex influence candidates.
//!
//! The candidates are sorted by weight descending, then bone id ascending
//! (raw bytes), then bone index ascending. The first four are kept, rescaled
//! to sum to one, and padded with `(0, 0.0)` slots. A list whose kept weights
//! sum to zero becomes a single root influence at weight one.

use std::cmp::Ordering;

use crate::armature::Skeleton;

/// Slots per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// One bone's contribution to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub bone: usize,
    pub weight: f64,
}

impl Influence {
    pub const EMPTY: Influence = Influence {
        bone: 0,
        weight: 0.0,
    };

    pub fn new(bone: usize, weight: f64) -> Self {
        Self { bone, weight }
    }
}

/// Exactly four slots, sorted, summing to one.
pub type CanonicalInfluences = [Influence; MAX_INFLUENCES];

/// What happened while canonicalizing one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanonicalNotes {
    /// Nonzero candidates before capping.
    pub candidates: usize,
    /// The kept weights summed to zero and the root bone was substituted.
    pub root_fallback: bool,
}

impl CanonicalNotes {
    pub fn capped(&self) -> bool {
        self.candidates > MAX_INFLUENCES
    }
}

/// Total order used for canonical sorting.
pub fn canonical_order(skeleton: &Skeleton, a: &Influence, b: &Influence) -> Ordering {
    b.weight
        .total_cmp(&a.weight)
        .then_with(|| skeleton.ids[a.bone].as_bytes().cmp(skeleton.ids[b.bone].as_bytes()))
        .then_with(|| a.bone.cmp(&b.bone))
}

/// Reduce an arbitrary candidate list to four canonical slots.
///
/// Zero-weight candidates are dropped before sorting.
pub fn canonicalize(
    skeleton: &Skeleton,
    candidates: impl IntoIterator<Item = Influence>,
) -> (CanonicalInfluences, CanonicalNotes) {
    let mut list: Vec<Influence> = candidates.into_iter().filter(|i| i.weight != 0.0).collect();
    list.sort_by(|a, b| canonical_order(skeleton, a, b));

    let mut notes = CanonicalNotes {
        candidates: list.len(),
        root_fallback: false,
    };
    list.truncate(MAX_INFLUENCES);

    let mut total = 0.0;
    for influence in &list {
        total += influence.weight;
    }

    let mut slots = [Influence::EMPTY; MAX_INFLUENCES];
    if total == 0.0 {
        notes.root_fallback = true;
        slots[0] = Influence::new(skeleton.root, 1.0);
    } else {
        for (slot, influence) in slots.iter_mut().zip(&list) {
            *slot = Influence::new(influence.bone, influence.weight / total);
        }
    }
    (slots, notes)
}
