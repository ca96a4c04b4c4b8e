//! Region graph construction.
//!
//! Each face is sliced independently: starting from the region below its first
//! sphere, every region is closed by the arcs of the next sphere and those arcs
//! open the regions one level further out. Crossings on shared edges go through
//! the pending table, so faces can be built in any order and merged afterwards.

use crate::error::{ShapeError, ShapeResult};
use crate::intersect::{Arc, FaceSlicer};
use crate::mesh::TriangleMesh;
use crate::region::{CrossingKey, RegionGraph, RegionId, Role};
use crate::spheres::SphereSequence;
use crate::traits::Cancellation;
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

#[cfg(not(feature = "parallel"))]
const FACE_CHUNK: usize = 256;

/// Builds the region graph of the whole mesh and checks that every crossing
/// found its partner.
pub fn build_region_graph<C: Cancellation + ?Sized>(
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    cancel: &C,
) -> ShapeResult<RegionGraph> {
    debug!(
        faces = mesh.face_count(),
        levels = spheres.level_count(),
        "building region graph"
    );
    let graph = collect_faces(mesh, spheres, cancel)?;
    finish(graph, spheres)
}

#[cfg(feature = "parallel")]
fn collect_faces<C: Cancellation + ?Sized>(
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    cancel: &C,
) -> ShapeResult<RegionGraph> {
    use rayon::prelude::*;

    (0..mesh.face_count())
        .into_par_iter()
        .try_fold(RegionGraph::default, |mut graph, face| {
            add_face(&mut graph, mesh, spheres, face, cancel)?;
            Ok(graph)
        })
        .try_reduce(RegionGraph::default, |a, b| {
            if cancel.is_cancelled() {
                return Err(ShapeError::Cancelled);
            }
            Ok(a.merge(b, mesh))
        })
}

#[cfg(not(feature = "parallel"))]
fn collect_faces<C: Cancellation + ?Sized>(
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    cancel: &C,
) -> ShapeResult<RegionGraph> {
    let faces: Vec<usize> = (0..mesh.face_count()).collect();
    let mut graph = RegionGraph::default();
    for chunk in faces.chunks(FACE_CHUNK) {
        let part = build_faces(mesh, spheres, chunk, cancel)?;
        if cancel.is_cancelled() {
            return Err(ShapeError::Cancelled);
        }
        graph = graph.merge(part, mesh);
    }
    Ok(graph)
}

/// Builds the regions of `faces` only. The result usually has pending crossings
/// towards faces outside the set; merge partial graphs and call [`finish`].
pub fn build_faces<C: Cancellation + ?Sized>(
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    faces: &[usize],
    cancel: &C,
) -> ShapeResult<RegionGraph> {
    let mut graph = RegionGraph::default();
    for &face in faces {
        add_face(&mut graph, mesh, spheres, face, cancel)?;
    }
    Ok(graph)
}

/// Rejects a merged graph that still has unpaired or duplicated crossings.
pub fn finish(graph: RegionGraph, spheres: &SphereSequence) -> ShapeResult<RegionGraph> {
    let unmatched = graph.unmatched();
    if unmatched > 0 {
        warn!(
            unmatched,
            collisions = graph.collisions(),
            level_count = spheres.level_count(),
            "crossings left unpaired"
        );
        return Err(ShapeError::Degenerate {
            unmatched,
            center: spheres.center(),
            level_count: spheres.level_count(),
        });
    }
    Ok(graph)
}

struct Open {
    vertex: RegionId,
    arc: Arc,
}

fn add_face<C: Cancellation + ?Sized>(
    graph: &mut RegionGraph,
    mesh: &TriangleMesh,
    spheres: &SphereSequence,
    face: usize,
    cancel: &C,
) -> ShapeResult<()> {
    let slicer = FaceSlicer::new(mesh, face, spheres.center());
    let levels = spheres.face_levels(mesh, face);
    let mut ordinal = 0;
    let mut open = vec![Open {
        vertex: graph.add_vertex(*levels.start(), face, ordinal),
        arc: Arc::null(face),
    }];
    ordinal += 1;

    for sphere in levels {
        if cancel.is_cancelled() {
            return Err(ShapeError::Cancelled);
        }
        let arcs = slicer.arcs(sphere, spheres.radius(sphere));
        let mut next = Vec::new();

        for current in &open {
            let inner = current.arc.endpoints();
            let mut area = -current.arc.area;
            let mut ring: Vec<Point3<f64>> = Vec::with_capacity(9);
            if let Some((source, target)) = inner {
                ring.push(target.point);
                ring.push(source.point);
                graph.connect(mesh, CrossingKey::new(source.halfedge, sphere, Role::Source), current.vertex);
                graph.connect(mesh, CrossingKey::new(target.halfedge, sphere, Role::Target), current.vertex);
            }

            let mut consumed = [false; 3];
            let mut previous: Option<usize> = None;
            let mut first: Option<usize> = None;
            for (position, &corner) in current.arc.enclosed.iter().enumerate() {
                if consumed[corner] {
                    continue;
                }
                match arcs.iter().find(|arc| arc.encloses(corner)) {
                    Some(arc) => {
                        for &c in &arc.enclosed {
                            consumed[c] = true;
                        }
                        let vertex = graph.add_vertex(sphere + 1, face, ordinal);
                        ordinal += 1;
                        graph.add_level_edge(current.vertex, vertex, arc.clone());
                        area += arc.area;
                        if let Some((source, target)) = arc.endpoints() {
                            ring.push(source.point);
                            ring.push(target.point);
                            // The inner arc already registered a shared crossing.
                            if inner.map_or(true, |(s, _)| s.halfedge != source.halfedge) {
                                graph.connect(mesh, CrossingKey::new(source.halfedge, sphere, Role::Source), current.vertex);
                            }
                            if inner.map_or(true, |(_, t)| t.halfedge != target.halfedge) {
                                graph.connect(mesh, CrossingKey::new(target.halfedge, sphere, Role::Target), current.vertex);
                            }
                        }
                        next.push(Open {
                            vertex,
                            arc: arc.clone(),
                        });
                        previous = None;
                    }
                    None => {
                        ring.push(slicer.corner(corner));
                        if let Some(p) = previous {
                            graph.connect(
                                mesh,
                                CrossingKey::new(TriangleMesh::halfedge(face, p), sphere, Role::Both),
                                current.vertex,
                            );
                        }
                        if position == 0 {
                            first = Some(corner);
                        }
                        previous = Some(corner);
                    }
                }
            }
            if inner.is_none() {
                if let (Some(p), Some(f)) = (previous, first) {
                    if p != f {
                        graph.connect(
                            mesh,
                            CrossingKey::new(TriangleMesh::halfedge(face, p), sphere, Role::Both),
                            current.vertex,
                        );
                    }
                }
            }

            area += polygon_area(&ring, &slicer.normal());
            graph.add_area(current.vertex, area);
        }
        open = next;
    }
    Ok(())
}

/// Signed area of a planar polygon, positive when counter-clockwise about `normal`.
fn polygon_area(ring: &[Point3<f64>], normal: &Vector3<f64>) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let sum = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .fold(Vector3::zeros(), |acc, (p, q)| acc + p.coords.cross(&q.coords));
    0.5 * normal.dot(&sum)
}
