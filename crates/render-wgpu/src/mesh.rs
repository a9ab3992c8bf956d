use bloomwater_scene::Geometry;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
        ],
    };
}

/// CPU-side triangle list, counter-clockwise front faces.
#[derive(Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Tessellate a validated geometry.
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Plane { width, height } => plane(*width, *height),
            Geometry::Cuboid {
                width,
                height,
                depth,
            } => cuboid(Vec3::new(*width, *height, *depth)),
            Geometry::Sphere { radius, segments } => sphere(*radius, *segments),
            Geometry::TorusKnot {
                radius,
                tube,
                tubular_segments,
                radial_segments,
                p,
                q,
            } => torus_knot(
                *radius,
                *tube,
                *tubular_segments,
                *radial_segments,
                *p as f32,
                *q as f32,
            ),
            Geometry::Mesh {
                positions,
                normals,
                indices,
            } => explicit(positions, normals.as_deref(), indices),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let n = Vec3::Z;
    let vertices = vec![
        Vertex::new(Vec3::new(-hw, -hh, 0.0), n, Vec2::new(0.0, 1.0)),
        Vertex::new(Vec3::new(hw, -hh, 0.0), n, Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(hw, hh, 0.0), n, Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(-hw, hh, 0.0), n, Vec2::new(0.0, 0.0)),
    ];
    MeshData {
        vertices,
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

fn cuboid(size: Vec3) -> MeshData {
    let half = size * 0.5;
    // (normal, u axis, v axis) per face; u x v == normal.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let mut mesh = MeshData::default();
    for (normal, u, v) in faces {
        let base = mesh.vertices.len() as u32;
        for (su, sv) in [(-1.0_f32, -1.0_f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (normal + u * su + v * sv) * half;
            let uv = Vec2::new((su + 1.0) * 0.5, (1.0 - sv) * 0.5);
            mesh.vertices.push(Vertex::new(p, normal, uv));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    mesh
}

fn sphere(radius: f32, segments: u32) -> MeshData {
    let columns = segments;
    let rows = (segments / 2).max(2);
    let mut mesh = MeshData::default();
    for row in 0..=rows {
        let v = row as f32 / rows as f32;
        let theta = v * PI;
        for col in 0..=columns {
            let u = col as f32 / columns as f32;
            let phi = u * TAU;
            let normal = Vec3::new(
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            );
            mesh.vertices
                .push(Vertex::new(normal * radius, normal, Vec2::new(u, v)));
        }
    }
    let stride = columns + 1;
    for row in 0..rows {
        for col in 0..columns {
            let a = row * stride + col;
            let b = a + stride;
            if row != 0 {
                mesh.indices.extend_from_slice(&[a + 1, a, b + 1]);
            }
            if row != rows - 1 {
                mesh.indices.extend_from_slice(&[a, b, b + 1]);
            }
        }
    }
    mesh
}

fn knot_curve(u: f32, radius: f32, p: f32, q: f32) -> Vec3 {
    let qu = q / p * u;
    let r = radius * (2.0 + qu.cos()) * 0.5;
    Vec3::new(r * u.cos(), r * u.sin(), radius * qu.sin() * 0.5)
}

fn torus_knot(radius: f32, tube: f32, tubular: u32, radial: u32, p: f32, q: f32) -> MeshData {
    let mut mesh = MeshData::default();
    for i in 0..=tubular {
        let u = i as f32 / tubular as f32 * p * TAU;
        let p1 = knot_curve(u, radius, p, q);
        let p2 = knot_curve(u + 0.01, radius, p, q);
        let tangent = p2 - p1;
        let binormal = tangent.cross(p2 + p1);
        let normal = binormal.cross(tangent).normalize_or_zero();
        let binormal = binormal.normalize_or_zero();

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();
            let position = p1 + normal * cx + binormal * cy;
            mesh.vertices.push(Vertex::new(
                position,
                (position - p1).normalize_or_zero(),
                Vec2::new(i as f32 / tubular as f32, j as f32 / radial as f32),
            ));
        }
    }
    let stride = radial + 1;
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = stride * (j - 1) + (i - 1);
            let b = stride * j + (i - 1);
            let c = stride * j + i;
            let d = stride * (j - 1) + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

fn explicit(positions: &[[f32; 3]], normals: Option<&[[f32; 3]]>, indices: &[u32]) -> MeshData {
    let normals: Vec<Vec3> = match normals {
        Some(given) => given.iter().map(|n| Vec3::from(*n).normalize_or_zero()).collect(),
        None => smooth_normals(positions, indices),
    };
    let vertices = positions
        .iter()
        .zip(normals)
        .map(|(p, n)| Vertex::new(Vec3::from(*p), n, Vec2::ZERO))
        .collect();
    MeshData {
        vertices,
        indices: indices.to_vec(),
    }
}

/// Area-weighted vertex normals.
fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals.into_iter().map(|n| n.normalize_or(Vec3::Y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit_normals(mesh: &MeshData) {
        for v in &mesh.vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-3, "normal length {len}");
        }
    }

    fn assert_indices_in_range(mesh: &MeshData) {
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
        assert_eq!(mesh.indices.len() % 3, 0);
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = MeshData::from_geometry(&Geometry::plane(100.0, 100.0));
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(mesh.vertices[mesh.indices[i] as usize].position));
        assert!((b - a).cross(c - a).z > 0.0);
        assert_eq!(mesh.vertices[2].position, [50.0, 50.0, 0.0]);
    }

    #[test]
    fn cuboid_has_outward_faces() {
        let mesh = MeshData::from_geometry(&Geometry::Cuboid {
            width: 2.0,
            height: 4.0,
            depth: 6.0,
        });
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let face = (Vec3::from(b.position) - Vec3::from(a.position))
                .cross(Vec3::from(c.position) - Vec3::from(a.position));
            assert!(face.dot(Vec3::from(a.normal)) > 0.0);
        }
        let max_y = mesh.vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!(max_y, 2.0);
    }

    #[test]
    fn sphere_vertices_on_radius() {
        let mesh = MeshData::from_geometry(&Geometry::Sphere {
            radius: 3.0,
            segments: 16,
        });
        assert_eq!(mesh.vertices.len(), 17 * 9);
        assert_indices_in_range(&mesh);
        assert_unit_normals(&mesh);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.position).length() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn torus_knot_counts() {
        let mesh = MeshData::from_geometry(&Geometry::torus_knot(3.0, 1.0, 256, 32));
        assert_eq!(mesh.vertices.len(), 257 * 33);
        assert_eq!(mesh.triangle_count(), 256 * 32 * 2);
        assert_indices_in_range(&mesh);
        assert_unit_normals(&mesh);
    }

    #[test]
    fn explicit_mesh_computes_normals() {
        let mesh = MeshData::from_geometry(&Geometry::Mesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            normals: None,
            indices: vec![0, 1, 2],
        });
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }
}
