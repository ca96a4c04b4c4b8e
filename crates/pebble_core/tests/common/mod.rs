//! Closed test meshes built through the public API.

#![allow(dead_code)]

use nalgebra::Point3;
use pebble_core::mesh::TriangleMesh;
use std::f64::consts::PI;

/// Axis-aligned box with the given half extents, centred at the origin.
pub fn cuboid(hx: f64, hy: f64, hz: f64) -> TriangleMesh {
    let positions = vec![
        Point3::new(-hx, -hy, -hz),
        Point3::new(hx, -hy, -hz),
        Point3::new(hx, hy, -hz),
        Point3::new(-hx, hy, -hz),
        Point3::new(-hx, -hy, hz),
        Point3::new(hx, -hy, hz),
        Point3::new(hx, hy, hz),
        Point3::new(-hx, hy, hz),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    TriangleMesh::new(positions, faces).expect("cuboid is closed")
}

/// Square pyramid with its apex on +z, centred on its vertex centroid.
pub fn pyramid(half_base: f64, height: f64) -> TriangleMesh {
    let positions = vec![
        Point3::new(-half_base, -half_base, 0.0),
        Point3::new(half_base, -half_base, 0.0),
        Point3::new(half_base, half_base, 0.0),
        Point3::new(-half_base, half_base, 0.0),
        Point3::new(0.0, 0.0, height),
    ];
    let faces = vec![[0, 2, 1], [0, 3, 2], [0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
    TriangleMesh::new(positions, faces).expect("pyramid is closed").centered()
}

/// Latitude/longitude sphere with poles on the z axis.
pub fn uv_sphere(radius: f64, rings: usize, segments: usize) -> TriangleMesh {
    let mut positions = vec![Point3::new(0.0, 0.0, radius)];
    for ring in 1..rings {
        let theta = PI * ring as f64 / rings as f64;
        for segment in 0..segments {
            let phi = 2.0 * PI * segment as f64 / segments as f64;
            positions.push(Point3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.sin() * phi.sin(),
                radius * theta.cos(),
            ));
        }
    }
    positions.push(Point3::new(0.0, 0.0, -radius));
    let south = (positions.len() - 1) as u32;
    let ring_start = |ring: usize| (1 + (ring - 1) * segments) as u32;
    let seg = segments as u32;

    let mut faces = Vec::new();
    for s in 0..seg {
        faces.push([0, ring_start(1) + s, ring_start(1) + (s + 1) % seg]);
    }
    for ring in 1..rings - 1 {
        let upper = ring_start(ring);
        let lower = ring_start(ring + 1);
        for s in 0..seg {
            let next = (s + 1) % seg;
            faces.push([upper + s, lower + s, lower + next]);
            faces.push([upper + s, lower + next, upper + next]);
        }
    }
    let last = ring_start(rings - 1);
    for s in 0..seg {
        faces.push([south, last + (s + 1) % seg, last + s]);
    }
    TriangleMesh::new(positions, faces).expect("uv sphere is closed")
}
