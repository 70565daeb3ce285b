//! Fixed-topology shape recipes (profile `v0_1_default`).
//!
//! Every recipe emits vertices in a fixed face/ring/segment order and winds
//! triangles counter-clockwise seen from outside (right-handed, Y up).
//! The UV generators depend on these orders, so they are part of the profile.

use std::f64::consts::PI;

use rigforge_math::DVec3;

use crate::mesh::{PrimitiveGeometry, SurfaceKey};

pub const SPHERE_LAT: usize = 16;
pub const SPHERE_LON: usize = 32;
pub const CYLINDER_RADIAL: usize = 32;
pub const CAPSULE_RADIAL: usize = 32;
pub const CAPSULE_HEIGHT_ROWS: usize = 8;
pub const CAPSULE_HEMISPHERE_RINGS: usize = 8;

/// Accumulates one primitive's buffers while a recipe runs.
#[derive(Default)]
struct Builder {
    positions: Vec<DVec3>,
    normals: Vec<DVec3>,
    indices: Vec<u32>,
    keys: Vec<SurfaceKey>,
}

impl Builder {
    fn vertex(&mut self, position: DVec3, normal: DVec3) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        (self.positions.len() - 1) as u32
    }

    fn next_index(&self) -> u32 {
        self.positions.len() as u32
    }

    fn triangle(&mut self, a: u32, b: u32, c: u32, key: SurfaceKey) {
        self.indices.extend_from_slice(&[a, b, c]);
        self.keys.push(key);
    }

    /// Flat polygon: every corner gets the face normal, then the listed triangles.
    fn face(&mut self, corners: &[DVec3], normal: DVec3, tris: &[[u32; 3]], key: SurfaceKey) {
        let base = self.next_index();
        for &corner in corners {
            self.vertex(corner, normal);
        }
        for t in tris {
            self.triangle(base + t[0], base + t[1], base + t[2], key);
        }
    }

    fn finish(self) -> PrimitiveGeometry {
        PrimitiveGeometry::new(self.positions, self.normals, self.indices, self.keys)
    }
}

/// Box: 6 faces of 4 vertices, face order +X, -X, +Y, -Y, +Z, -Z.
pub fn tessellate_box(x: f64, y: f64, z: f64) -> PrimitiveGeometry {
    let hx = x / 2.0;
    let hy = y / 2.0;
    let hz = z / 2.0;
    let v = DVec3::new;

    let faces = [
        (
            [v(hx, -hy, -hz), v(hx, hy, -hz), v(hx, hy, hz), v(hx, -hy, hz)],
            DVec3::X,
            SurfaceKey::PosX,
        ),
        (
            [v(-hx, -hy, hz), v(-hx, hy, hz), v(-hx, hy, -hz), v(-hx, -hy, -hz)],
            DVec3::NEG_X,
            SurfaceKey::NegX,
        ),
        (
            [v(-hx, hy, -hz), v(-hx, hy, hz), v(hx, hy, hz), v(hx, hy, -hz)],
            DVec3::Y,
            SurfaceKey::PosY,
        ),
        (
            [v(-hx, -hy, hz), v(-hx, -hy, -hz), v(hx, -hy, -hz), v(hx, -hy, hz)],
            DVec3::NEG_Y,
            SurfaceKey::NegY,
        ),
        (
            [v(-hx, -hy, hz), v(hx, -hy, hz), v(hx, hy, hz), v(-hx, hy, hz)],
            DVec3::Z,
            SurfaceKey::PosZ,
        ),
        (
            [v(hx, -hy, -hz), v(-hx, -hy, -hz), v(-hx, hy, -hz), v(hx, hy, -hz)],
            DVec3::NEG_Z,
            SurfaceKey::NegZ,
        ),
    ];

    let mut b = Builder::default();
    for (corners, normal, key) in faces {
        b.face(&corners, normal, &[[0, 1, 2], [0, 2, 3]], key);
    }
    b.finish()
}

/// Wedge: right triangular prism extruded along Y, hypotenuse facing +X/+Z.
///
/// Faces -Z, -X, slope (4 vertices each), then -Y, +Y (3 each).
pub fn tessellate_wedge(x: f64, y: f64, z: f64) -> PrimitiveGeometry {
    let hx = x / 2.0;
    let hy = y / 2.0;
    let hz = z / 2.0;

    let v0 = DVec3::new(-hx, -hy, -hz);
    let v1 = DVec3::new(hx, -hy, -hz);
    let v2 = DVec3::new(-hx, -hy, hz);
    let v3 = DVec3::new(-hx, hy, -hz);
    let v4 = DVec3::new(hx, hy, -hz);
    let v5 = DVec3::new(-hx, hy, hz);

    let slope_len = (z * z + x * x).sqrt();
    let slope_normal = DVec3::new(z / slope_len, 0.0, x / slope_len);

    let mut b = Builder::default();
    b.face(
        &[v0, v1, v4, v3],
        DVec3::NEG_Z,
        &[[0, 2, 1], [0, 3, 2]],
        SurfaceKey::NegZ,
    );
    b.face(
        &[v0, v3, v5, v2],
        DVec3::NEG_X,
        &[[0, 2, 3], [0, 1, 2]],
        SurfaceKey::NegX,
    );
    b.face(
        &[v1, v2, v5, v4],
        slope_normal,
        &[[0, 2, 1], [0, 3, 2]],
        SurfaceKey::Slope,
    );
    b.face(&[v0, v1, v2], DVec3::NEG_Y, &[[0, 1, 2]], SurfaceKey::NegY);
    b.face(&[v3, v5, v4], DVec3::Y, &[[0, 1, 2]], SurfaceKey::PosY);
    b.finish()
}

/// Triangulate the band between two consecutive rings of `width + 1` vertices.
fn ring_band(b: &mut Builder, row_start: u32, width: usize, key: SurfaceKey) {
    let stride = width as u32 + 1;
    for seg in 0..width as u32 {
        let current = row_start + seg;
        let next_row = current + stride;
        b.triangle(current, current + 1, next_row, key);
        b.triangle(current + 1, next_row + 1, next_row, key);
    }
}

/// UV sphere: `(16 + 1) x (32 + 1)` vertices, seam duplicated at longitude 0/32.
pub fn tessellate_sphere(radius: f64) -> PrimitiveGeometry {
    let mut b = Builder::default();

    for lat in 0..=SPHERE_LAT {
        let theta = PI * lat as f64 / SPHERE_LAT as f64;
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for lon in 0..=SPHERE_LON {
            let phi = 2.0 * PI * lon as f64 / SPHERE_LON as f64;
            let n = DVec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());
            b.vertex(DVec3::new(radius * n.x, radius * n.y, radius * n.z), n);
        }
    }

    for lat in 0..SPHERE_LAT {
        let row_start = (lat * (SPHERE_LON + 1)) as u32;
        ring_band(&mut b, row_start, SPHERE_LON, SurfaceKey::Surface);
    }
    b.finish()
}

/// Cylinder along Y: top and bottom side rings, then top cap, then bottom cap.
pub fn tessellate_cylinder(radius: f64, height: f64) -> PrimitiveGeometry {
    let half_h = height / 2.0;
    let n = CYLINDER_RADIAL;
    let mut b = Builder::default();

    for row in 0..2 {
        let y = if row == 0 { half_h } else { -half_h };
        for seg in 0..=n {
            let angle = 2.0 * PI * seg as f64 / n as f64;
            let nx = angle.cos();
            let nz = angle.sin();
            b.vertex(
                DVec3::new(radius * nx, y, radius * nz),
                DVec3::new(nx, 0.0, nz),
            );
        }
    }
    ring_band(&mut b, 0, n, SurfaceKey::Side);

    for (y, normal, key) in [
        (half_h, DVec3::Y, SurfaceKey::TopCap),
        (-half_h, DVec3::NEG_Y, SurfaceKey::BottomCap),
    ] {
        let center = b.vertex(DVec3::new(0.0, y, 0.0), normal);
        let rim = b.next_index();
        for seg in 0..=n {
            let angle = 2.0 * PI * seg as f64 / n as f64;
            b.vertex(
                DVec3::new(radius * angle.cos(), y, radius * angle.sin()),
                normal,
            );
        }
        for seg in 0..n as u32 {
            if key == SurfaceKey::TopCap {
                b.triangle(center, rim + seg + 1, rim + seg, key);
            } else {
                b.triangle(center, rim + seg, rim + seg + 1, key);
            }
        }
    }
    b.finish()
}

/// Capsule along Y: top hemisphere rings 0..=8, cylinder rows 0..=8, bottom
/// hemisphere rings 1..=8. `height` is the length of the cylindrical section.
pub fn tessellate_capsule(radius: f64, height: f64) -> PrimitiveGeometry {
    let half_h = height / 2.0;
    let n = CAPSULE_RADIAL;
    let rings = CAPSULE_HEMISPHERE_RINGS;
    let rows = CAPSULE_HEIGHT_ROWS;
    let mut b = Builder::default();

    let hemisphere_ring = |b: &mut Builder, theta: f64, center_y: f64| {
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();
        let y = center_y + radius * cos_theta;
        for seg in 0..=n {
            let phi = 2.0 * PI * seg as f64 / n as f64;
            let nrm = DVec3::new(sin_theta * phi.cos(), cos_theta, sin_theta * phi.sin());
            b.vertex(DVec3::new(radius * nrm.x, y, radius * nrm.z), nrm);
        }
    };

    for ring in 0..=rings {
        let theta = (PI / 2.0) * ring as f64 / rings as f64;
        hemisphere_ring(&mut b, theta, half_h);
    }

    for row in 0..=rows {
        let y = half_h - height * row as f64 / rows as f64;
        for seg in 0..=n {
            let phi = 2.0 * PI * seg as f64 / n as f64;
            let nx = phi.cos();
            let nz = phi.sin();
            b.vertex(
                DVec3::new(radius * nx, y, radius * nz),
                DVec3::new(nx, 0.0, nz),
            );
        }
    }

    for ring in 1..=rings {
        let theta = (PI / 2.0) + (PI / 2.0) * ring as f64 / rings as f64;
        hemisphere_ring(&mut b, theta, -half_h);
    }

    // Band k joins row k and k+1. Bands 0..8 are top hemisphere, 8..17 the
    // cylinder (including the zero-height seam band at the top), the rest bottom.
    let total_rows = (rings + 1) + (rows + 1) + rings;
    for band in 0..total_rows - 1 {
        let key = if band < rings {
            SurfaceKey::TopHemisphere
        } else if band < rings + rows + 1 {
            SurfaceKey::Side
        } else {
            SurfaceKey::BottomHemisphere
        };
        ring_band(&mut b, (band * (n + 1)) as u32, n, key);
    }
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-degenerate triangle's geometric normal agrees with its vertex normals.
    fn assert_outward(geometry: &PrimitiveGeometry) {
        for tri in geometry.indices.chunks(3) {
            let p0 = geometry.positions[tri[0] as usize];
            let p1 = geometry.positions[tri[1] as usize];
            let p2 = geometry.positions[tri[2] as usize];
            let face = (p1 - p0).cross(p2 - p0);
            if face.length() < 1e-12 {
                continue;
            }
            let avg = geometry.normals[tri[0] as usize]
                + geometry.normals[tri[1] as usize]
                + geometry.normals[tri[2] as usize];
            assert!(face.dot(avg) > 0.0, "inward triangle {:?}", tri);
        }
    }

    /// For convex shapes with the origin strictly inside, face normals point away from it.
    fn assert_away_from_center(geometry: &PrimitiveGeometry) {
        for tri in geometry.indices.chunks(3) {
            let p0 = geometry.positions[tri[0] as usize];
            let p1 = geometry.positions[tri[1] as usize];
            let p2 = geometry.positions[tri[2] as usize];
            let face = (p1 - p0).cross(p2 - p0);
            if face.length() < 1e-12 {
                continue;
            }
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(face.dot(centroid) > 0.0, "inward triangle {:?}", tri);
        }
    }

    #[test]
    fn test_box_counts() {
        let g = tessellate_box(1.0, 1.0, 1.0);
        assert_eq!(g.vertex_count(), 24);
        assert_eq!(g.index_count(), 36);
        assert_eq!(g.surface_keys[0], SurfaceKey::PosX);
        assert_eq!(g.surface_keys[11], SurfaceKey::NegZ);
    }

    #[test]
    fn test_box_dimensions() {
        let g = tessellate_box(2.0, 4.0, 6.0);
        assert_eq!(g.bounds.min(), DVec3::new(-1.0, -2.0, -3.0));
        assert_eq!(g.bounds.max(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_wedge_counts_and_slope() {
        let g = tessellate_wedge(1.0, 2.0, 1.0);
        assert_eq!(g.vertex_count(), 18);
        assert_eq!(g.index_count(), 24);

        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert!((g.normals[8] - DVec3::new(s, 0.0, s)).length() < 1e-15);
        assert_eq!(g.surface_keys[4], SurfaceKey::Slope);
    }

    #[test]
    fn test_sphere_counts() {
        for radius in [0.01, 0.5, 3.0] {
            let g = tessellate_sphere(radius);
            assert_eq!(g.vertex_count(), 561);
            assert_eq!(g.index_count(), 3072);
        }
    }

    #[test]
    fn test_sphere_poles() {
        let g = tessellate_sphere(2.0);
        assert_eq!(g.positions[0], DVec3::new(0.0, 2.0, 0.0));
        assert!((g.positions[560].y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cylinder_counts_and_keys() {
        let g = tessellate_cylinder(0.5, 1.0);
        assert_eq!(g.vertex_count(), 134);
        assert_eq!(g.index_count(), 384);
        assert_eq!(g.surface_keys[0], SurfaceKey::Side);
        assert_eq!(g.surface_keys[64], SurfaceKey::TopCap);
        assert_eq!(g.surface_keys[127], SurfaceKey::BottomCap);
    }

    #[test]
    fn test_capsule_counts_and_extent() {
        let g = tessellate_capsule(0.25, 1.0);
        assert_eq!(g.vertex_count(), 858);
        assert_eq!(g.index_count(), 4800);
        assert!((g.bounds.max().y - 0.75).abs() < 1e-12);
        assert!((g.bounds.min().y + 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_capsule_band_keys() {
        let g = tessellate_capsule(0.25, 1.0);
        let per_band = 2 * CAPSULE_RADIAL;
        assert_eq!(g.surface_keys[0], SurfaceKey::TopHemisphere);
        assert_eq!(g.surface_keys[8 * per_band], SurfaceKey::Side);
        assert_eq!(g.surface_keys[16 * per_band], SurfaceKey::Side);
        assert_eq!(g.surface_keys[17 * per_band], SurfaceKey::BottomHemisphere);
    }

    #[test]
    fn test_winding_is_outward() {
        let shapes = [
            tessellate_box(1.0, 2.0, 3.0),
            tessellate_wedge(1.0, 1.0, 2.0),
            tessellate_sphere(1.0),
            tessellate_cylinder(0.5, 2.0),
            tessellate_capsule(0.3, 1.0),
        ];
        for g in &shapes {
            assert_outward(g);
        }
        // The wedge's slope passes through the origin, so it is left out here.
        for g in [&shapes[0], &shapes[2], &shapes[3], &shapes[4]] {
            assert_away_from_center(g);
        }
    }
}
