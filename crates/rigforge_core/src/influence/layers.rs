//! Weight-source layers.
//!
//! Each layer maps a per-vertex candidate table to a new table, replacing the
//! entries of the vertices it targets and passing every other vertex through.
//! Resolution is a left fold over the layers in their fixed order.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use rigforge_math::{DVec3, Interval};

use crate::armature::Skeleton;
use crate::error::ResolveError;
use crate::mesh::{Mesh, PrimitiveRange};
use crate::scene::{Axis, Binding, BoneWeight, Gradient};

/// Bone index to weight, for one vertex. Later entries for a bone win.
pub type Candidates = BTreeMap<usize, f64>;

/// A gradient with bone ids resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGradient {
    pub axis: Axis,
    pub range: Interval,
    pub from: Candidates,
    pub to: Candidates,
}

impl ResolvedGradient {
    /// Blend factor for a position, clamped to `[0, 1]`.
    pub fn factor(&self, p: DVec3) -> f64 {
        self.range.clamped_fraction(self.axis.component(p))
    }

    /// Write this gradient's bones into `out`, leaving other bones alone.
    ///
    /// Evaluated as `w_from * (1 - t) + w_to * t` for every bone in either set.
    pub fn blend_into(&self, p: DVec3, out: &mut Candidates) {
        let t = self.factor(p);
        let bones: BTreeSet<usize> = self.from.keys().chain(self.to.keys()).copied().collect();
        for bone in bones {
            let wf = self.from.get(&bone).copied().unwrap_or(0.0);
            let wt = self.to.get(&bone).copied().unwrap_or(0.0);
            out.insert(bone, wf * (1.0 - t) + wt * t);
        }
    }
}

/// One step of the resolution fold.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// The same weights for every vertex in the range.
    Uniform {
        vertices: Range<usize>,
        bones: Candidates,
    },
    /// Explicit weights per vertex (external tables and overrides).
    PerVertex { entries: BTreeMap<usize, Candidates> },
    /// Gradients over one primitive. The targeted vertices' lists are
    /// rebuilt from the gradients alone, applied in order.
    Gradient {
        vertices: Range<usize>,
        gradients: Vec<ResolvedGradient>,
    },
}

impl Layer {
    fn replacement(&self, vertex: usize, position: DVec3) -> Option<Candidates> {
        match self {
            Layer::Uniform { vertices, bones } => vertices.contains(&vertex).then(|| bones.clone()),
            Layer::PerVertex { entries } => entries.get(&vertex).cloned(),
            Layer::Gradient {
                vertices,
                gradients,
            } => vertices.contains(&vertex).then(|| {
                let mut out = Candidates::new();
                for gradient in gradients {
                    gradient.blend_into(position, &mut out);
                }
                out
            }),
        }
    }

    /// Produce the next table from the previous one.
    pub fn apply(&self, state: Vec<Candidates>, positions: &[DVec3]) -> Vec<Candidates> {
        state
            .into_iter()
            .enumerate()
            .map(|(v, current)| self.replacement(v, positions[v]).unwrap_or(current))
            .collect()
    }
}

/// Every vertex bound to the root at weight one.
pub fn default_table(skeleton: &Skeleton, vertex_count: usize) -> Vec<Candidates> {
    let root: Candidates = [(skeleton.root, 1.0)].into_iter().collect();
    vec![root; vertex_count]
}

fn resolve_bones(skeleton: &Skeleton, bones: &[BoneWeight]) -> Result<Candidates, ResolveError> {
    bones
        .iter()
        .map(|bw| Ok((skeleton.bone_index(&bw.bone_id)?, bw.weight)))
        .collect()
}

fn primitive<'m>(mesh: &'m Mesh, id: &str) -> Result<&'m PrimitiveRange, ResolveError> {
    mesh.primitive(id)
        .ok_or_else(|| ResolveError::UnknownPrimitive(id.to_string()))
}

/// Map a primitive-local vertex index to the merged mesh.
fn global_vertex(range: &PrimitiveRange, local: usize) -> Result<usize, ResolveError> {
    if local < range.vertex_count() {
        Ok(range.vertices.start + local)
    } else {
        Err(ResolveError::VertexOutOfRange {
            primitive: range.id.clone(),
            vertex: local,
            count: range.vertex_count(),
        })
    }
}

fn resolve_gradient(
    skeleton: &Skeleton,
    primitive_id: &str,
    gradient: &Gradient,
) -> Result<ResolvedGradient, ResolveError> {
    let [start, end] = gradient.range;
    if !(end > start) {
        return Err(ResolveError::EmptyGradientRange {
            primitive: primitive_id.to_string(),
            start,
            end,
        });
    }
    Ok(ResolvedGradient {
        axis: gradient.axis,
        range: Interval::new(start, end),
        from: resolve_bones(skeleton, &gradient.from)?,
        to: resolve_bones(skeleton, &gradient.to)?,
    })
}

/// Build the ordered layer list for a binding:
/// uniform weights, external tables, gradients, then overrides.
pub fn build_layers(
    binding: &Binding,
    mesh: &Mesh,
    skeleton: &Skeleton,
) -> Result<Vec<Layer>, ResolveError> {
    let mut uniform = Vec::new();
    for pw in &binding.weights {
        let range = primitive(mesh, &pw.primitive_id)?;
        uniform.push(Layer::Uniform {
            vertices: range.vertices.clone(),
            bones: resolve_bones(skeleton, &pw.bones)?,
        });
    }

    let mut external = Vec::new();
    // One gradient list per primitive, in first-declaration order.
    let mut gradients: Vec<(&str, Range<usize>, Vec<ResolvedGradient>)> = Vec::new();
    let mut overrides = Vec::new();
    for map in &binding.weight_maps {
        let range = primitive(mesh, &map.primitive_id)?;

        if let Some(table) = &map.external {
            if table.primitive_id != map.primitive_id {
                return Err(ResolveError::ExternalPrimitive {
                    expected: map.primitive_id.clone(),
                    actual: table.primitive_id.clone(),
                });
            }
            if table.vertex_count != range.vertex_count() {
                return Err(ResolveError::ExternalVertexCount {
                    primitive: map.primitive_id.clone(),
                    declared: table.vertex_count,
                    actual: range.vertex_count(),
                });
            }
            let mut entries = BTreeMap::new();
            for entry in &table.weights {
                entries.insert(
                    global_vertex(range, entry.vertex)?,
                    resolve_bones(skeleton, &entry.bones)?,
                );
            }
            external.push(Layer::PerVertex { entries });
        }

        if !map.gradients.is_empty() {
            let resolved = map
                .gradients
                .iter()
                .map(|g| resolve_gradient(skeleton, &map.primitive_id, g))
                .collect::<Result<Vec<_>, _>>()?;
            match gradients
                .iter_mut()
                .find(|(id, _, _)| *id == map.primitive_id)
            {
                Some((_, _, list)) => list.extend(resolved),
                None => gradients.push((map.primitive_id.as_str(), range.vertices.clone(), resolved)),
            }
        }

        if !map.overrides.is_empty() {
            let mut entries = BTreeMap::new();
            for ov in &map.overrides {
                let bones = resolve_bones(skeleton, &ov.bones)?;
                for &local in &ov.vertices {
                    entries.insert(global_vertex(range, local)?, bones.clone());
                }
            }
            overrides.push(Layer::PerVertex { entries });
        }
    }

    Ok(uniform
        .into_iter()
        .chain(external)
        .chain(
            gradients
                .into_iter()
                .map(|(_, vertices, gradients)| Layer::Gradient {
                    vertices,
                    gradients,
                }),
        )
        .chain(overrides)
        .collect())
}
