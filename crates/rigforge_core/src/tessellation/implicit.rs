//! Implicit surfaces: scalar fields sampled on a grid and extracted with
//! marching cubes.

use rigforge_math::{Aabb, DVec3, Interval};

use super::tables::{EDGE_TABLE, TRI_TABLE};
use crate::error::TessellationError;
use crate::mesh::{PrimitiveGeometry, SurfaceKey};
use crate::scene::{FieldOp, FieldOperator, ImplicitSurface, ResolvedTransform};

/// Corner pair for each of the 12 cube edges.
const EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Corner offsets `(dx, dy, dz)` for c0..c7.
const CORNER_OFFSETS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

/// Gradient magnitude below which the fallback normal is used.
const ZERO_GRADIENT: f64 = 1e-30;
const FALLBACK_NORMAL: DVec3 = DVec3::Y;

/// Field functions, one per versioned tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    MetaballSphere,
    MetaballCapsule,
    SdfSphere,
    SdfCapsule,
}

/// Closed registry of field tags.
const FIELD_REGISTRY: [(&str, FieldKind); 4] = [
    ("metaball_sphere@1", FieldKind::MetaballSphere),
    ("metaball_capsule@1", FieldKind::MetaballCapsule),
    ("sdf_sphere@1", FieldKind::SdfSphere),
    ("sdf_capsule@1", FieldKind::SdfCapsule),
];

impl FieldKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        FIELD_REGISTRY
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, kind)| *kind)
    }

    fn is_capsule(&self) -> bool {
        matches!(self, FieldKind::MetaballCapsule | FieldKind::SdfCapsule)
    }
}

/// A field operator with its tag and transform resolved.
#[derive(Debug, Clone)]
struct CompiledOp {
    kind: FieldKind,
    subtract: bool,
    radius: f64,
    height: f64,
    strength: f64,
    transform: Option<ResolvedTransform>,
}

impl CompiledOp {
    fn compile(op: &FieldOperator) -> Result<Self, TessellationError> {
        let kind = FieldKind::from_tag(&op.field)
            .ok_or_else(|| TessellationError::UnknownField(op.field.clone()))?;
        let height = match (kind.is_capsule(), op.height) {
            (true, Some(h)) => h,
            (true, None) => {
                return Err(TessellationError::MissingHeight {
                    field: op.field.clone(),
                })
            }
            (false, h) => h.unwrap_or(0.0),
        };
        Ok(Self {
            kind,
            subtract: op.op == FieldOp::Subtract,
            radius: op.radius,
            height,
            strength: op.strength,
            transform: op.transform.map(|t| t.resolve()),
        })
    }

    fn value(&self, p: DVec3) -> f64 {
        let local = match &self.transform {
            Some(t) => t.to_local(p),
            None => p,
        };
        let v = match self.kind {
            FieldKind::MetaballSphere => metaball(norm(local), self.radius, self.strength),
            FieldKind::MetaballCapsule => {
                metaball(capsule_distance(local, self.height), self.radius, self.strength)
            }
            FieldKind::SdfSphere => sdf_ramp(norm(local), self.radius, self.strength),
            FieldKind::SdfCapsule => {
                sdf_ramp(capsule_distance(local, self.height), self.radius, self.strength)
            }
        };
        if self.subtract {
            -v
        } else {
            v
        }
    }
}

fn norm(p: DVec3) -> f64 {
    (p.x * p.x + p.y * p.y + p.z * p.z).sqrt()
}

/// Distance from `p` to the Y-axis segment `[-h/2, h/2]`.
fn capsule_distance(p: DVec3, height: f64) -> f64 {
    let half_h = height / 2.0;
    let t = Interval::new(0.0, 1.0).clamp((p.y + half_h) / height);
    let qy = -half_h + t * height;
    norm(DVec3::new(p.x, p.y - qy, p.z))
}

/// `strength * (1 - r/R)^2` inside the radius, zero outside.
fn metaball(r: f64, radius: f64, strength: f64) -> f64 {
    if r < radius {
        let t = 1.0 - r / radius;
        strength * t * t
    } else {
        0.0
    }
}

/// Linear ramp over the signed distance `d = r - R`: full strength at
/// `d <= -R`, zero at `d >= R`.
fn sdf_ramp(r: f64, radius: f64, strength: f64) -> f64 {
    let d = r - radius;
    if d <= -radius {
        strength
    } else if d < radius {
        strength * (1.0 - d / radius) / 2.0
    } else {
        0.0
    }
}

/// Sum of all operators at `p`, in declaration order.
fn evaluate(ops: &[CompiledOp], p: DVec3) -> f64 {
    let mut total = 0.0;
    for op in ops {
        total += op.value(p);
    }
    total
}

/// `n` evenly spaced samples from `start` to `stop`, with `stop` exact.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / (n - 1) as f64;
    let mut samples: Vec<f64> = (0..n).map(|i| i as f64 * step + start).collect();
    if let Some(last) = samples.last_mut() {
        *last = stop;
    }
    samples
}

/// Sampling grid over the domain.
struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    zs: Vec<f64>,
}

impl Grid {
    fn point(&self, x: usize, y: usize, z: usize) -> DVec3 {
        DVec3::new(self.xs[x], self.ys[y], self.zs[z])
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.ys.len() + y) * self.xs.len() + x
    }

    /// Field values in z-outer, y-middle, x-inner order.
    fn sample(&self, ops: &[CompiledOp]) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.xs.len() * self.ys.len() * self.zs.len());
        for z in 0..self.zs.len() {
            for y in 0..self.ys.len() {
                for x in 0..self.xs.len() {
                    values.push(evaluate(ops, self.point(x, y, z)));
                }
            }
        }
        values
    }
}

/// Validate the grid and return its cell count.
pub fn cell_count(surface: &ImplicitSurface, max_cells: usize) -> Result<usize, TessellationError> {
    let g = surface.grid;
    if g.nx < 2 || g.ny < 2 || g.nz < 2 {
        return Err(TessellationError::GridTooSmall {
            nx: g.nx,
            ny: g.ny,
            nz: g.nz,
        });
    }
    let cells = (g.nx - 1)
        .checked_mul(g.ny - 1)
        .and_then(|c| c.checked_mul(g.nz - 1))
        .unwrap_or(usize::MAX);
    if cells > max_cells {
        return Err(TessellationError::TooManyCells {
            cells,
            limit: max_cells,
        });
    }
    Ok(cells)
}

/// Extract the isosurface of an implicit primitive in its own space.
///
/// Vertices are emitted per triangle without welding; an extraction that
/// crosses no cell returns empty geometry.
pub fn tessellate_implicit(
    surface: &ImplicitSurface,
    max_cells: usize,
) -> Result<PrimitiveGeometry, TessellationError> {
    let cells = cell_count(surface, max_cells)?;
    let (lo, hi) = (surface.domain.min, surface.domain.max);
    if (0..3).any(|a| !(lo[a] < hi[a])) {
        return Err(TessellationError::InvalidDomain);
    }

    let ops = surface
        .ops
        .iter()
        .map(CompiledOp::compile)
        .collect::<Result<Vec<_>, _>>()?;

    let g = surface.grid;
    let grid = Grid {
        xs: linspace(lo[0], hi[0], g.nx),
        ys: linspace(lo[1], hi[1], g.ny),
        zs: linspace(lo[2], hi[2], g.nz),
    };
    let field = grid.sample(&ops);
    let iso = surface.iso;

    let mut positions = Vec::new();
    for cz in 0..g.nz - 1 {
        for cy in 0..g.ny - 1 {
            for cx in 0..g.nx - 1 {
                let mut values = [0.0f64; 8];
                let mut corners = [DVec3::ZERO; 8];
                let mut case = 0usize;
                for (i, &(dx, dy, dz)) in CORNER_OFFSETS.iter().enumerate() {
                    values[i] = field[grid.index(cx + dx, cy + dy, cz + dz)];
                    corners[i] = grid.point(cx + dx, cy + dy, cz + dz);
                    if values[i] >= iso {
                        case |= 1 << i;
                    }
                }

                let edges = EDGE_TABLE[case];
                if edges == 0 {
                    continue;
                }

                let mut crossings = [DVec3::ZERO; 12];
                for (e, &(a, b)) in EDGE_CORNERS.iter().enumerate() {
                    if edges & (1 << e) == 0 {
                        continue;
                    }
                    let (va, vb) = (values[a], values[b]);
                    let t = if va == vb { 0.5 } else { (iso - va) / (vb - va) };
                    let (pa, pb) = (corners[a], corners[b]);
                    crossings[e] = DVec3::new(
                        pa.x + t * (pb.x - pa.x),
                        pa.y + t * (pb.y - pa.y),
                        pa.z + t * (pb.z - pa.z),
                    );
                }

                for tri in TRI_TABLE[case].chunks(3) {
                    if tri[0] < 0 {
                        break;
                    }
                    for &e in tri {
                        positions.push(crossings[e as usize]);
                    }
                }
            }
        }
    }

    if positions.is_empty() {
        log::debug!("Implicit surface over {} cells produced no triangles", cells);
        return Ok(PrimitiveGeometry::empty());
    }

    let domain = Aabb::from_points(DVec3::from_array(lo), DVec3::from_array(hi));
    let step = DVec3::new(
        (hi[0] - lo[0]) / (g.nx - 1) as f64,
        (hi[1] - lo[1]) / (g.ny - 1) as f64,
        (hi[2] - lo[2]) / (g.nz - 1) as f64,
    );
    let normals = positions
        .iter()
        .map(|&p| gradient_normal(&ops, &domain, step, p))
        .collect();

    let count = positions.len();
    let indices = (0..count as u32).collect();
    let keys = vec![SurfaceKey::Isosurface; count / 3];
    log::debug!(
        "Implicit surface over {} cells: {} triangles",
        cells,
        count / 3
    );
    Ok(PrimitiveGeometry::new(positions, normals, indices, keys))
}

/// Outward normal `-grad F` by central differences, with samples clamped
/// into the domain instead of falling back to one-sided differences.
fn gradient_normal(ops: &[CompiledOp], domain: &Aabb, step: DVec3, p: DVec3) -> DVec3 {
    let mut grad = DVec3::ZERO;
    for axis in 0..3 {
        let mut offset = DVec3::ZERO;
        offset[axis] = step[axis];
        let f_plus = evaluate(ops, domain.clamp_point(p + offset));
        let f_minus = evaluate(ops, domain.clamp_point(p - offset));
        grad[axis] = f_plus - f_minus;
    }

    let n = -grad;
    let magnitude = norm(n);
    if magnitude < ZERO_GRADIENT {
        FALLBACK_NORMAL
    } else {
        n / magnitude
    }
}
