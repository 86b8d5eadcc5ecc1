//! Procedural mesh geometry for the demo scene.
//!
//! Meshes are GPU-agnostic; the viewport converts them into its own vertex
//! formats. Every generator produces counter-clockwise front faces, unit
//! normals and per-vertex tangents (xyz + handedness in w).

use std::f32::consts::{PI, TAU};

use facet_math::{Mat4, Vec3, Vec4};

/// A triangle mesh with a full tangent frame per vertex.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Unit vertex normals
    pub normals: Vec<Vec3>,

    /// Tangents along +u; w is the bitangent sign
    pub tangents: Vec<Vec4>,

    /// UV coordinates
    pub uvs: Vec<[f32; 2]>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl Mesh {
    /// UV sphere centred at the origin.
    ///
    /// The vertex layout matches the usual latitude/longitude construction:
    /// `(width_segments + 1) * (height_segments + 1)` vertices with a seam at
    /// u = 0, and degenerate pole triangles skipped. Tangents follow the
    /// direction of increasing u.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut mesh = Self::default();
        let mut grid = Vec::with_capacity(height_segments as usize + 1);

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let (sin_theta, cos_theta) = (v * PI).sin_cos();
            let mut row = Vec::with_capacity(width_segments as usize + 1);

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let (sin_phi, cos_phi) = (u * TAU).sin_cos();

                let normal = Vec3::new(-cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
                row.push(mesh.positions.len() as u32);
                mesh.positions.push(normal * radius);
                mesh.normals.push(normal);
                mesh.tangents.push(Vec4::new(sin_phi, 0.0, cos_phi, 1.0));
                mesh.uvs.push([u, 1.0 - v]);
            }
            grid.push(row);
        }

        for iy in 0..height_segments as usize {
            for ix in 0..width_segments as usize {
                let a = grid[iy][ix + 1];
                let b = grid[iy][ix];
                let c = grid[iy + 1][ix];
                let d = grid[iy + 1][ix + 1];

                if iy != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments as usize - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        mesh.compute_bounds();
        mesh
    }

    /// Axis-aligned box centred at the origin.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let faces = [
            (Vec3::new(h.x, 0.0, 0.0), Vec3::new(0.0, 0.0, -h.z), Vec3::new(0.0, h.y, 0.0)),
            (Vec3::new(-h.x, 0.0, 0.0), Vec3::new(0.0, 0.0, h.z), Vec3::new(0.0, h.y, 0.0)),
            (Vec3::new(0.0, h.y, 0.0), Vec3::new(h.x, 0.0, 0.0), Vec3::new(0.0, 0.0, -h.z)),
            (Vec3::new(0.0, -h.y, 0.0), Vec3::new(h.x, 0.0, 0.0), Vec3::new(0.0, 0.0, h.z)),
            (Vec3::new(0.0, 0.0, h.z), Vec3::new(h.x, 0.0, 0.0), Vec3::new(0.0, h.y, 0.0)),
            (Vec3::new(0.0, 0.0, -h.z), Vec3::new(-h.x, 0.0, 0.0), Vec3::new(0.0, h.y, 0.0)),
        ];

        let mut mesh = Self::default();
        for (center, u, v) in faces {
            mesh.push_quad(center, u, v);
        }
        mesh.compute_bounds();
        mesh
    }

    /// Flat rectangle in the XZ plane facing +Y.
    pub fn plane(width: f32, depth: f32) -> Self {
        let mut mesh = Self::default();
        mesh.push_quad(
            Vec3::ZERO,
            Vec3::new(width * 0.5, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -depth * 0.5),
        );
        mesh.compute_bounds();
        mesh
    }

    /// Add a quad spanning `center ± u ± v`, facing `u × v`.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3) {
        let normal = u.cross(v).normalize();
        let tangent = u.normalize().extend(1.0);
        let base = self.positions.len() as u32;

        let corners = [
            (center - u - v, [0.0, 1.0]),
            (center + u - v, [1.0, 1.0]),
            (center + u + v, [1.0, 0.0]),
            (center - u + v, [0.0, 0.0]),
        ];
        for (position, uv) in corners {
            self.positions.push(position);
            self.normals.push(normal);
            self.tangents.push(tangent);
            self.uvs.push(uv);
        }

        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Copy of the mesh with `transform` applied.
    ///
    /// Normals use the inverse transpose so non-uniform scales stay correct.
    pub fn transformed(&self, transform: Mat4) -> Self {
        let normal_matrix = transform.inverse().transpose();

        let mut mesh = Self {
            positions: self
                .positions
                .iter()
                .map(|p| transform.transform_point3(*p))
                .collect(),
            normals: self
                .normals
                .iter()
                .map(|n| normal_matrix.transform_vector3(*n).normalize_or_zero())
                .collect(),
            tangents: self
                .tangents
                .iter()
                .map(|t| {
                    transform
                        .transform_vector3(t.truncate())
                        .normalize_or_zero()
                        .extend(t.w)
                })
                .collect(),
            uvs: self.uvs.clone(),
            indices: self.indices.clone(),
            ..Default::default()
        };
        mesh.compute_bounds();
        mesh
    }

    /// Append another mesh, re-basing its indices.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.tangents.extend_from_slice(&other.tangents);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.compute_bounds();
    }

    /// Recompute the axis-aligned bounding box from positions.
    fn compute_bounds(&mut self) {
        if self.positions.is_empty() {
            self.bounds_min = Vec3::ZERO;
            self.bounds_max = Vec3::ZERO;
            return;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in &self.positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        self.bounds_min = min;
        self.bounds_max = max;
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        (self.bounds_min + self.bounds_max) * 0.5
    }

    /// Get the mesh size (diagonal length of bounding box).
    pub fn size(&self) -> f32 {
        (self.bounds_max - self.bounds_min).length()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Line segments of a square grid in the XZ plane.
#[derive(Clone, Debug)]
pub struct GridLines {
    /// Segment endpoints, two per line
    pub positions: Vec<Vec3>,
    /// Per-endpoint color as `0xRRGGBB`
    pub colors: Vec<u32>,
}

impl GridLines {
    /// Grid `size` wide with `divisions` cells per side, centred at the
    /// origin. The two center lines use `center_color`, the rest `line_color`.
    pub fn new(size: f32, divisions: u32, center_color: u32, line_color: u32) -> Self {
        let divisions = divisions.max(1);
        let half = size * 0.5;
        let step = size / divisions as f32;
        let center = divisions / 2;

        let mut positions = Vec::with_capacity((divisions as usize + 1) * 4);
        let mut colors = Vec::with_capacity(positions.capacity());

        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i == center && divisions % 2 == 0 {
                center_color
            } else {
                line_color
            };

            positions.extend_from_slice(&[
                Vec3::new(-half, 0.0, k),
                Vec3::new(half, 0.0, k),
                Vec3::new(k, 0.0, -half),
                Vec3::new(k, 0.0, half),
            ]);
            colors.extend_from_slice(&[color; 4]);
        }

        Self { positions, colors }
    }

    /// Number of line segments.
    pub fn line_count(&self) -> usize {
        self.positions.len() / 2
    }
}
