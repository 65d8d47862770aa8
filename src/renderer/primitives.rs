//! Procedural shapes. All of them use the left-handed convention with
//! clockwise front faces and 16-bit indices.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::vertex::{v, Vertex};
use crate::asset::{IndexData, MeshData};

const MAX_SUBDIVISIONS: u32 = 6;

fn mesh(vertices: Vec<Vertex>, indices: Vec<u32>) -> MeshData<Vertex> {
    debug_assert!(vertices.len() <= usize::from(u16::MAX) + 1);
    MeshData::new(
        vertices,
        IndexData::U16(indices.into_iter().map(|i| i as u16).collect()),
    )
}

/// Axis-aligned box centred at the origin. Each subdivision splits every
/// triangle into four.
pub fn box_mesh(width: f32, height: f32, depth: f32, subdivisions: u32) -> MeshData<Vertex> {
    let w = 0.5 * width;
    let h = 0.5 * height;
    let d = 0.5 * depth;

    let vertices = vec![
        // Front (-Z)
        v([-w, -h, -d], [0.0, 0.0, -1.0], [0.0, 1.0], [1.0, 0.0, 0.0]),
        v([-w, h, -d], [0.0, 0.0, -1.0], [0.0, 0.0], [1.0, 0.0, 0.0]),
        v([w, h, -d], [0.0, 0.0, -1.0], [1.0, 0.0], [1.0, 0.0, 0.0]),
        v([w, -h, -d], [0.0, 0.0, -1.0], [1.0, 1.0], [1.0, 0.0, 0.0]),
        // Back (+Z)
        v([-w, -h, d], [0.0, 0.0, 1.0], [1.0, 1.0], [-1.0, 0.0, 0.0]),
        v([w, -h, d], [0.0, 0.0, 1.0], [0.0, 1.0], [-1.0, 0.0, 0.0]),
        v([w, h, d], [0.0, 0.0, 1.0], [0.0, 0.0], [-1.0, 0.0, 0.0]),
        v([-w, h, d], [0.0, 0.0, 1.0], [1.0, 0.0], [-1.0, 0.0, 0.0]),
        // Top (+Y)
        v([-w, h, -d], [0.0, 1.0, 0.0], [0.0, 1.0], [1.0, 0.0, 0.0]),
        v([-w, h, d], [0.0, 1.0, 0.0], [0.0, 0.0], [1.0, 0.0, 0.0]),
        v([w, h, d], [0.0, 1.0, 0.0], [1.0, 0.0], [1.0, 0.0, 0.0]),
        v([w, h, -d], [0.0, 1.0, 0.0], [1.0, 1.0], [1.0, 0.0, 0.0]),
        // Bottom (-Y)
        v([-w, -h, -d], [0.0, -1.0, 0.0], [1.0, 1.0], [-1.0, 0.0, 0.0]),
        v([w, -h, -d], [0.0, -1.0, 0.0], [0.0, 1.0], [-1.0, 0.0, 0.0]),
        v([w, -h, d], [0.0, -1.0, 0.0], [0.0, 0.0], [-1.0, 0.0, 0.0]),
        v([-w, -h, d], [0.0, -1.0, 0.0], [1.0, 0.0], [-1.0, 0.0, 0.0]),
        // Left (-X)
        v([-w, -h, d], [-1.0, 0.0, 0.0], [0.0, 1.0], [0.0, 0.0, -1.0]),
        v([-w, h, d], [-1.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, -1.0]),
        v([-w, h, -d], [-1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, -1.0]),
        v([-w, -h, -d], [-1.0, 0.0, 0.0], [1.0, 1.0], [0.0, 0.0, -1.0]),
        // Right (+X)
        v([w, -h, -d], [1.0, 0.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
        v([w, h, -d], [1.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
        v([w, h, d], [1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
        v([w, -h, d], [1.0, 0.0, 0.0], [1.0, 1.0], [0.0, 0.0, 1.0]),
    ];

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let mut vertices = vertices;
    for _ in 0..subdivisions.min(MAX_SUBDIVISIONS) {
        (vertices, indices) = subdivide(&vertices, &indices);
    }

    mesh(vertices, indices)
}

fn midpoint(a: &Vertex, b: &Vertex) -> Vertex {
    let position = (Vec3::from(a.position) + Vec3::from(b.position)) * 0.5;
    let normal = (Vec3::from(a.normal) + Vec3::from(b.normal)).normalize_or_zero();
    let tangent = (Vec3::from(a.tangent) + Vec3::from(b.tangent)).normalize_or_zero();
    let uv = (Vec2::from(a.uv) + Vec2::from(b.uv)) * 0.5;

    v(position.into(), normal.into(), uv.into(), tangent.into())
}

//       v1
//       *
//      / \
//  m0 *---* m1
//    / \ / \
//   *---*---*
//  v0   m2   v2
fn subdivide(vertices: &[Vertex], indices: &[u32]) -> (Vec<Vertex>, Vec<u32>) {
    let triangle_count = indices.len() / 3;
    let mut out_vertices = Vec::with_capacity(triangle_count * 6);
    let mut out_indices = Vec::with_capacity(triangle_count * 12);

    for triangle in indices.chunks_exact(3) {
        let v0 = vertices[triangle[0] as usize];
        let v1 = vertices[triangle[1] as usize];
        let v2 = vertices[triangle[2] as usize];

        let m0 = midpoint(&v0, &v1);
        let m1 = midpoint(&v1, &v2);
        let m2 = midpoint(&v0, &v2);

        let base = out_vertices.len() as u32;
        out_vertices.extend_from_slice(&[v0, v1, v2, m0, m1, m2]);

        for local in [0, 3, 5, 3, 4, 5, 5, 4, 2, 3, 1, 4] {
            out_indices.push(base + local);
        }
    }

    (out_vertices, out_indices)
}

/// Flat `rows x columns` vertex grid in the XZ plane.
pub fn grid_mesh(width: f32, depth: f32, rows: u32, columns: u32) -> MeshData<Vertex> {
    let rows = rows.max(2);
    let columns = columns.max(2);

    let half_width = 0.5 * width;
    let half_depth = 0.5 * depth;
    let dx = width / (columns - 1) as f32;
    let dz = depth / (rows - 1) as f32;
    let du = 1.0 / (columns - 1) as f32;
    let dv = 1.0 / (rows - 1) as f32;

    let mut vertices = Vec::with_capacity((rows * columns) as usize);
    for i in 0..rows {
        let z = half_depth - i as f32 * dz;
        for j in 0..columns {
            let x = -half_width + j as f32 * dx;
            vertices.push(v(
                [x, 0.0, z],
                [0.0, 1.0, 0.0],
                [j as f32 * du, i as f32 * dv],
                [1.0, 0.0, 0.0],
            ));
        }
    }

    let mut indices = Vec::with_capacity(((rows - 1) * (columns - 1) * 6) as usize);
    for i in 0..rows - 1 {
        for j in 0..columns - 1 {
            indices.push(i * columns + j);
            indices.push(i * columns + j + 1);
            indices.push((i + 1) * columns + j);

            indices.push((i + 1) * columns + j);
            indices.push(i * columns + j + 1);
            indices.push((i + 1) * columns + j + 1);
        }
    }

    mesh(vertices, indices)
}

/// Screen-space quad in normalised device coordinates, top-left corner at
/// `(x, y)`.
pub fn quad_mesh(x: f32, y: f32, width: f32, height: f32, depth: f32) -> MeshData<Vertex> {
    let vertices = vec![
        v([x, y - height, depth], [0.0, 0.0, -1.0], [0.0, 1.0], [1.0, 0.0, 0.0]),
        v([x, y, depth], [0.0, 0.0, -1.0], [0.0, 0.0], [1.0, 0.0, 0.0]),
        v([x + width, y, depth], [0.0, 0.0, -1.0], [1.0, 0.0], [1.0, 0.0, 0.0]),
        v(
            [x + width, y - height, depth],
            [0.0, 0.0, -1.0],
            [1.0, 1.0],
            [1.0, 0.0, 0.0],
        ),
    ];

    mesh(vertices, vec![0, 1, 2, 0, 2, 3])
}

pub fn sphere_mesh(radius: f32, slices: u32, stacks: u32) -> MeshData<Vertex> {
    let slices = slices.max(3);
    let stacks = stacks.max(2);

    let mut vertices = Vec::new();
    vertices.push(v([0.0, radius, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0], [1.0, 0.0, 0.0]));

    let phi_step = PI / stacks as f32;
    let theta_step = 2.0 * PI / slices as f32;

    for ring in 1..stacks {
        let phi = ring as f32 * phi_step;
        for segment in 0..=slices {
            let theta = segment as f32 * theta_step;

            let position = Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let tangent = Vec3::new(
                -radius * phi.sin() * theta.sin(),
                0.0,
                radius * phi.sin() * theta.cos(),
            )
            .normalize_or_zero();

            vertices.push(v(
                position.into(),
                position.normalize_or_zero().into(),
                [theta / (2.0 * PI), phi / PI],
                tangent.into(),
            ));
        }
    }

    vertices.push(v([0.0, -radius, 0.0], [0.0, -1.0, 0.0], [0.0, 1.0], [1.0, 0.0, 0.0]));

    let mut indices = Vec::new();
    for i in 1..=slices {
        indices.extend_from_slice(&[0, i + 1, i]);
    }

    let base = 1;
    let ring_vertex_count = slices + 1;
    for ring in 0..stacks - 2 {
        for segment in 0..slices {
            let current = base + ring * ring_vertex_count + segment;
            let next = base + (ring + 1) * ring_vertex_count + segment;

            indices.extend_from_slice(&[current, current + 1, next]);
            indices.extend_from_slice(&[next, current + 1, next + 1]);
        }
    }

    let south_pole = vertices.len() as u32 - 1;
    let base = south_pole - ring_vertex_count;
    for i in 0..slices {
        indices.extend_from_slice(&[south_pole, base + i, base + i + 1]);
    }

    mesh(vertices, indices)
}

/// Truncated cone along +Y, centred at the origin, with both caps.
pub fn cylinder_mesh(
    bottom_radius: f32,
    top_radius: f32,
    height: f32,
    slices: u32,
    stacks: u32,
) -> MeshData<Vertex> {
    let slices = slices.max(3);
    let stacks = stacks.max(1);

    let stack_height = height / stacks as f32;
    let radius_step = (top_radius - bottom_radius) / stacks as f32;
    let d_theta = 2.0 * PI / slices as f32;

    let mut vertices = Vec::new();
    for ring in 0..=stacks {
        let y = -0.5 * height + ring as f32 * stack_height;
        let r = bottom_radius + ring as f32 * radius_step;

        for segment in 0..=slices {
            let (s, c) = (segment as f32 * d_theta).sin_cos();

            let tangent = Vec3::new(-s, 0.0, c);
            let dr = bottom_radius - top_radius;
            let bitangent = Vec3::new(dr * c, -height, dr * s);
            let normal = tangent.cross(bitangent).normalize_or_zero();

            vertices.push(v(
                [r * c, y, r * s],
                normal.into(),
                [
                    segment as f32 / slices as f32,
                    1.0 - ring as f32 / stacks as f32,
                ],
                tangent.into(),
            ));
        }
    }

    let ring_vertex_count = slices + 1;
    let mut indices = Vec::new();
    for ring in 0..stacks {
        for segment in 0..slices {
            let current = ring * ring_vertex_count + segment;
            let above = (ring + 1) * ring_vertex_count + segment;

            indices.extend_from_slice(&[current, above, above + 1]);
            indices.extend_from_slice(&[current, above + 1, current + 1]);
        }
    }

    cylinder_cap(&mut vertices, &mut indices, top_radius, height, slices, true);
    cylinder_cap(&mut vertices, &mut indices, bottom_radius, height, slices, false);

    mesh(vertices, indices)
}

fn cylinder_cap(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    radius: f32,
    height: f32,
    slices: u32,
    top: bool,
) {
    let base = vertices.len() as u32;
    let y = if top { 0.5 * height } else { -0.5 * height };
    let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let d_theta = 2.0 * PI / slices as f32;

    for segment in 0..=slices {
        let (s, c) = (segment as f32 * d_theta).sin_cos();
        let x = radius * c;
        let z = radius * s;
        vertices.push(v(
            [x, y, z],
            normal,
            [x / height + 0.5, z / height + 0.5],
            [1.0, 0.0, 0.0],
        ));
    }

    vertices.push(v([0.0, y, 0.0], normal, [0.5, 0.5], [1.0, 0.0, 0.0]));
    let center = vertices.len() as u32 - 1;

    for i in 0..slices {
        if top {
            indices.extend_from_slice(&[center, base + i + 1, base + i]);
        } else {
            indices.extend_from_slice(&[center, base + i, base + i + 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &MeshData<Vertex>, triangle: usize) -> Vec3 {
        let index = |n| mesh.indices.get(triangle * 3 + n).unwrap() as usize;
        let p0 = Vec3::from(mesh.vertices[index(0)].position);
        let p1 = Vec3::from(mesh.vertices[index(1)].position);
        let p2 = Vec3::from(mesh.vertices[index(2)].position);
        // Clockwise winding in a left-handed frame.
        (p1 - p0).cross(p2 - p0).normalize()
    }

    #[test]
    fn box_counts() {
        let cube = box_mesh(1.0, 1.0, 1.0, 0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
    }

    #[test]
    fn box_subdivision_quadruples_triangles() {
        let cube = box_mesh(1.5, 0.5, 1.5, 3);
        assert_eq!(cube.index_count(), 36 * 4 * 4 * 4);
    }

    #[test]
    fn box_faces_wind_clockwise_towards_their_normal() {
        let cube = box_mesh(1.0, 1.0, 1.0, 0);
        for triangle in 0..12 {
            let stored = Vec3::from(cube.vertices[cube.indices.get(triangle * 3).unwrap() as usize].normal);
            assert!(face_normal(&cube, triangle).abs_diff_eq(stored, 1e-5));
        }
    }

    #[test]
    fn grid_counts() {
        let grid = grid_mesh(20.0, 30.0, 60, 40);
        assert_eq!(grid.vertices.len(), 60 * 40);
        assert_eq!(grid.index_count(), 59 * 39 * 6);
        assert!(face_normal(&grid, 0).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn sphere_poles_and_surface() {
        let sphere = sphere_mesh(0.5, 20, 20);
        assert_eq!(sphere.vertices.len(), 2 + 19 * 21);
        assert_eq!(sphere.index_count(), (20 * 3 * 2 + 18 * 20 * 6) as u32);
        for vertex in &sphere.vertices {
            assert!((Vec3::from(vertex.position).length() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn cylinder_caps_face_outwards() {
        let cylinder = cylinder_mesh(0.5, 0.3, 3.0, 20, 20);
        let side_triangles = 20 * 20 * 2;
        let top_cap = side_triangles;
        let bottom_cap = side_triangles + 20;
        assert!(face_normal(&cylinder, top_cap).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(face_normal(&cylinder, bottom_cap).abs_diff_eq(-Vec3::Y, 1e-5));
    }

    #[test]
    fn quad_spans_requested_rectangle() {
        let quad = quad_mesh(0.0, 0.0, 1.0, 1.0, 0.0);
        assert_eq!(quad.index_count(), 6);
        assert_eq!(quad.vertices[0].position, [0.0, -1.0, 0.0]);
        assert_eq!(quad.vertices[2].position, [1.0, 0.0, 0.0]);
    }
}
