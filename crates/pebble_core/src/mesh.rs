//! Closed triangle mesh with half-edge adjacency.
//!
//! Half-edge `3 * f + k` runs from corner `k` to corner `(k + 1) % 3` of face `f`.
//! Every half-edge of a valid mesh has exactly one opposite, so the surface is a
//! closed, consistently oriented 2-manifold.

use crate::error::{ShapeError, ShapeResult};
use anyhow::{bail, Context, Result};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const AREA_EPSILON: f64 = 1e-300;

/// Plain serializable mesh description, as handed over by loaders and the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    opposite: Vec<usize>,
    normals: Vec<Vector3<f64>>,
    areas: Vec<f64>,
}

impl TriangleMesh {
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> ShapeResult<Self> {
        Self::build(positions, faces)
            .context("Mesh validation failed")
            .map_err(ShapeError::invalid_mesh)
    }

    pub fn from_data(data: &MeshData) -> ShapeResult<Self> {
        let positions = data
            .vertices
            .iter()
            .map(|[x, y, z]| Point3::new(*x, *y, *z))
            .collect();
        Self::new(positions, data.faces.clone())
    }

    fn build(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Result<Self> {
        if positions.is_empty() || faces.is_empty() {
            bail!("Mesh must have at least one vertex and one face.");
        }
        for (index, point) in positions.iter().enumerate() {
            if !point.coords.iter().all(|c| c.is_finite()) {
                bail!("Vertex {index} has a non-finite coordinate.");
            }
        }

        let vertex_count = positions.len();
        let mut normals = Vec::with_capacity(faces.len());
        let mut areas = Vec::with_capacity(faces.len());
        for (index, face) in faces.iter().enumerate() {
            for &v in face {
                if v as usize >= vertex_count {
                    bail!("Face {index} references vertex {v} but the mesh has {vertex_count} vertices.");
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                bail!("Face {index} repeats a vertex.");
            }
            let [a, b, c] = face.map(|v| positions[v as usize]);
            let cross = (b - a).cross(&(c - a));
            let norm = cross.norm();
            if norm <= AREA_EPSILON {
                bail!("Face {index} has zero area.");
            }
            normals.push(cross / norm);
            areas.push(0.5 * norm);
        }

        let mut directed: HashMap<(u32, u32), usize> = HashMap::with_capacity(faces.len() * 3);
        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let key = (face[k], face[(k + 1) % 3]);
                if directed.insert(key, 3 * f + k).is_some() {
                    bail!(
                        "Edge ({}, {}) is used twice in the same direction; the mesh is non-manifold or inconsistently oriented.",
                        key.0,
                        key.1
                    );
                }
            }
        }

        let mut opposite = vec![0usize; faces.len() * 3];
        for (&(from, to), &halfedge) in &directed {
            match directed.get(&(to, from)) {
                Some(&twin) => opposite[halfedge] = twin,
                None => bail!("Edge ({from}, {to}) has no opposite; the mesh is not closed."),
            }
        }

        Ok(Self {
            positions,
            faces,
            opposite,
            normals,
            areas,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn halfedge_count(&self) -> usize {
        self.faces.len() * 3
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn position(&self, vertex: u32) -> Point3<f64> {
        self.positions[vertex as usize]
    }

    pub fn face(&self, face: usize) -> [u32; 3] {
        self.faces[face]
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn face_corners(&self, face: usize) -> [Point3<f64>; 3] {
        self.faces[face].map(|v| self.positions[v as usize])
    }

    pub fn face_normal(&self, face: usize) -> Vector3<f64> {
        self.normals[face]
    }

    pub fn face_area(&self, face: usize) -> f64 {
        self.areas[face]
    }

    pub fn surface_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    pub fn halfedge(face: usize, corner: usize) -> usize {
        3 * face + corner
    }

    pub fn halfedge_face(halfedge: usize) -> usize {
        halfedge / 3
    }

    /// Source and target vertex of a half-edge.
    pub fn halfedge_vertices(&self, halfedge: usize) -> (u32, u32) {
        let face = self.faces[halfedge / 3];
        let k = halfedge % 3;
        (face[k], face[(k + 1) % 3])
    }

    pub fn opposite(&self, halfedge: usize) -> usize {
        self.opposite[halfedge]
    }

    /// Mean of the vertex positions.
    pub fn centroid(&self) -> Point3<f64> {
        let sum = self
            .positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.positions.len() as f64)
    }

    pub fn translated(&self, offset: Vector3<f64>) -> Self {
        let mut moved = self.clone();
        for p in &mut moved.positions {
            *p += offset;
        }
        moved
    }

    /// Copy of the mesh moved so that its centroid sits at the origin.
    pub fn centered(&self) -> Self {
        self.translated(-self.centroid().coords)
    }

    pub fn vertex_distance(&self, center: &Point3<f64>, vertex: u32) -> f64 {
        (self.positions[vertex as usize] - center).norm()
    }

    /// Distance from `center` to the closest point of the face.
    pub fn face_distance(&self, center: &Point3<f64>, face: usize) -> f64 {
        let [a, b, c] = self.face_corners(face);
        (closest_point_on_triangle(center, &a, &b, &c) - center).norm()
    }

    /// Closest and farthest distance from `center` to any point of the face.
    pub fn face_distance_range(&self, center: &Point3<f64>, face: usize) -> (f64, f64) {
        let far = self.faces[face]
            .iter()
            .map(|&v| self.vertex_distance(center, v))
            .fold(0.0, f64::max);
        (self.face_distance(center, face), far)
    }

    pub fn min_distance(&self, center: &Point3<f64>) -> f64 {
        (0..self.faces.len())
            .map(|f| self.face_distance(center, f))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_distance(&self, center: &Point3<f64>) -> f64 {
        self.positions
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0, f64::max)
    }
}

/// Closest point to `p` on triangle `abc`, by Voronoi region of the triangle.
pub fn closest_point_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
