//! Per-vertex skin influence resolution.
//!
//! Weight sources are compiled into an ordered list of [`Layer`]s and folded
//! over a default table that binds every vertex to the root bone. The result
//! is canonicalized once per vertex into four sorted slots.

pub mod canonical;
pub mod layers;

use rayon::prelude::*;

use crate::advisory::{Advisory, AdvisoryCode};
use crate::armature::Skeleton;
use crate::error::ResolveError;
use crate::mesh::Mesh;
use crate::scene::Binding;

pub use canonical::{
    canonical_order, canonicalize, CanonicalInfluences, CanonicalNotes, Influence, MAX_INFLUENCES,
};
pub use layers::{build_layers, default_table, Candidates, Layer, ResolvedGradient};

/// Canonical influences for every vertex of one mesh, in vertex order.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceTable {
    pub influences: Vec<CanonicalInfluences>,
}

impl InfluenceTable {
    pub fn len(&self) -> usize {
        self.influences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    /// Joint indices as serialized. Bone counts are capped so every index fits.
    pub fn joints(&self) -> Vec<[u16; MAX_INFLUENCES]> {
        self.influences
            .iter()
            .map(|slots| slots.map(|i| i.bone as u16))
            .collect()
    }

    pub fn weights(&self) -> Vec<[f64; MAX_INFLUENCES]> {
        self.influences
            .iter()
            .map(|slots| slots.map(|i| i.weight))
            .collect()
    }
}

/// Resolved table plus the advisories raised while canonicalizing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInfluences {
    pub table: InfluenceTable,
    pub advisories: Vec<Advisory>,
}

/// Resolve a binding's weight sources against a tessellated mesh.
pub fn resolve_influences(
    binding: &Binding,
    mesh: &Mesh,
    skeleton: &Skeleton,
    parallel: bool,
) -> Result<ResolvedInfluences, ResolveError> {
    let layers = build_layers(binding, mesh, skeleton)?;
    let folded = layers
        .iter()
        .fold(default_table(skeleton, mesh.vertex_count()), |state, layer| {
            layer.apply(state, &mesh.positions)
        });

    let reduce = |candidates: &Candidates| {
        canonicalize(
            skeleton,
            candidates.iter().map(|(&bone, &weight)| Influence::new(bone, weight)),
        )
    };
    let canonical: Vec<(CanonicalInfluences, CanonicalNotes)> = if parallel {
        folded.par_iter().map(reduce).collect()
    } else {
        folded.iter().map(reduce).collect()
    };

    let mut advisories = Vec::new();
    let mut influences = Vec::with_capacity(canonical.len());
    for (vertex, (slots, notes)) in canonical.into_iter().enumerate() {
        if notes.capped() {
            advisories.push(Advisory::new(
                AdvisoryCode::W01,
                &mesh.id,
                format!(
                    "vertex {} has {} nonzero influences, kept {}",
                    vertex, notes.candidates, MAX_INFLUENCES
                ),
            ));
        }
        if notes.root_fallback {
            advisories.push(Advisory::new(
                AdvisoryCode::W03,
                &mesh.id,
                format!(
                    "vertex {} has zero total weight, bound to root {}",
                    vertex, skeleton.ids[skeleton.root]
                ),
            ));
        }
        influences.push(slots);
    }

    log::debug!(
        "Resolved influences for {} -> {}: {} vertices, {} layers, {} advisories",
        binding.mesh_id,
        binding.armature_id,
        influences.len(),
        layers.len(),
        advisories.len()
    );

    Ok(ResolvedInfluences {
        table: InfluenceTable { influences },
        advisories,
    })
}
