//! Per-face regions between consecutive spheres and the table that stitches
//! them across shared edges.

use crate::intersect::Arc;
use crate::mesh::TriangleMesh;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::trace;

pub type RegionId = usize;

/// How a region touches a half-edge at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// At the exit crossing of the arc bounding the region from inside.
    Source,
    /// At the enter crossing of that arc.
    Target,
    /// Along a stretch of the edge between two corners.
    Both,
}

impl Role {
    /// Role seen from the opposite half-edge, which runs the other way.
    pub fn opposite(self) -> Self {
        match self {
            Role::Source => Role::Target,
            Role::Target => Role::Source,
            Role::Both => Role::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrossingKey {
    pub halfedge: usize,
    pub level: usize,
    pub role: Role,
}

impl CrossingKey {
    pub fn new(halfedge: usize, level: usize, role: Role) -> Self {
        Self { halfedge, level, role }
    }

    fn partner(&self, mesh: &TriangleMesh) -> Self {
        Self {
            halfedge: mesh.opposite(self.halfedge),
            level: self.level,
            role: self.role.opposite(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionVertex {
    pub level: usize,
    pub area: f64,
    pub face: usize,
    /// Creation order within the face; `(face, ordinal)` is stable across partitions.
    pub ordinal: usize,
}

#[derive(Debug, Clone)]
pub enum RegionEdge {
    /// Two regions of neighbouring faces that are one piece of the same level set.
    Stitch { a: RegionId, b: RegionId },
    /// A region and the region beyond one of its arcs, one level further out.
    Level { from: RegionId, to: RegionId, arc: Arc },
}

#[derive(Debug, Clone, Default)]
pub struct RegionGraph {
    vertices: Vec<RegionVertex>,
    edges: Vec<RegionEdge>,
    pending: HashMap<CrossingKey, RegionId>,
    collisions: usize,
}

impl RegionGraph {
    pub fn vertices(&self) -> &[RegionVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[RegionEdge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn add_vertex(&mut self, level: usize, face: usize, ordinal: usize) -> RegionId {
        self.vertices.push(RegionVertex {
            level,
            area: 0.0,
            face,
            ordinal,
        });
        self.vertices.len() - 1
    }

    pub fn add_area(&mut self, vertex: RegionId, area: f64) {
        self.vertices[vertex].area += area;
    }

    pub fn add_level_edge(&mut self, from: RegionId, to: RegionId, arc: Arc) {
        self.edges.push(RegionEdge::Level { from, to, arc });
    }

    /// Records that `vertex` touches `key`. If the opposite side is already waiting,
    /// both are stitched together and the entry leaves the table.
    pub fn connect(&mut self, mesh: &TriangleMesh, key: CrossingKey, vertex: RegionId) {
        if let Some(other) = self.pending.remove(&key.partner(mesh)) {
            self.edges.push(RegionEdge::Stitch { a: other, b: vertex });
            return;
        }
        match self.pending.entry(key) {
            Entry::Occupied(_) => self.collisions += 1,
            Entry::Vacant(slot) => {
                slot.insert(vertex);
            }
        }
    }

    /// Appends `other`, renumbering its vertices, and pairs up the crossings
    /// both sides were waiting for.
    pub fn merge(mut self, other: RegionGraph, mesh: &TriangleMesh) -> RegionGraph {
        let offset = self.vertices.len();
        self.vertices.extend(other.vertices);
        self.edges.extend(other.edges.into_iter().map(|edge| match edge {
            RegionEdge::Stitch { a, b } => RegionEdge::Stitch {
                a: a + offset,
                b: b + offset,
            },
            RegionEdge::Level { from, to, arc } => RegionEdge::Level {
                from: from + offset,
                to: to + offset,
                arc,
            },
        }));
        self.collisions += other.collisions;
        let incoming = other.pending.len();
        let stitches = self.edges.len();
        for (key, vertex) in other.pending {
            self.connect(mesh, key, vertex + offset);
        }
        trace!(
            vertices = self.vertices.len(),
            incoming,
            stitched = self.edges.len() - stitches,
            pending = self.pending.len(),
            "region graphs merged"
        );
        self
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Crossings that never found a partner plus keys registered twice.
    pub fn unmatched(&self) -> usize {
        self.pending.len() + self.collisions
    }

    pub fn total_area(&self) -> f64 {
        self.vertices.iter().map(|v| v.area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{Arc, CrossingKey, RegionEdge, RegionGraph, Role};
    use crate::mesh::fixtures::tetrahedron;

    #[test]
    fn roles_swap_across_an_edge() {
        assert_eq!(Role::Source.opposite(), Role::Target);
        assert_eq!(Role::Target.opposite(), Role::Source);
        assert_eq!(Role::Both.opposite(), Role::Both);
    }

    #[test]
    fn partners_meet_in_either_order() {
        let mesh = tetrahedron();
        let h = 0;
        let twin = mesh.opposite(h);

        let mut graph = RegionGraph::default();
        let a = graph.add_vertex(2, 0, 0);
        let b = graph.add_vertex(2, twin / 3, 0);
        graph.connect(&mesh, CrossingKey::new(h, 2, Role::Source), a);
        assert_eq!(graph.pending_count(), 1);
        graph.connect(&mesh, CrossingKey::new(twin, 2, Role::Target), b);
        assert_eq!(graph.pending_count(), 0);
        assert!(matches!(graph.edges()[0], RegionEdge::Stitch { a: 0, b: 1 }));
    }

    #[test]
    fn other_levels_and_roles_do_not_pair() {
        let mesh = tetrahedron();
        let twin = mesh.opposite(4);
        let mut graph = RegionGraph::default();
        let a = graph.add_vertex(1, 1, 0);
        graph.connect(&mesh, CrossingKey::new(4, 1, Role::Both), a);
        graph.connect(&mesh, CrossingKey::new(twin, 2, Role::Both), a);
        graph.connect(&mesh, CrossingKey::new(twin, 1, Role::Source), a);
        assert_eq!(graph.pending_count(), 3);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn duplicate_keys_count_as_collisions() {
        let mesh = tetrahedron();
        let mut graph = RegionGraph::default();
        let a = graph.add_vertex(0, 0, 0);
        graph.connect(&mesh, CrossingKey::new(1, 0, Role::Both), a);
        graph.connect(&mesh, CrossingKey::new(1, 0, Role::Both), a);
        assert_eq!(graph.collisions(), 1);
        assert_eq!(graph.unmatched(), 2);
    }

    #[test]
    fn merge_renumbers_and_pairs_pending() {
        let mesh = tetrahedron();
        let twin = mesh.opposite(0);

        let mut left = RegionGraph::default();
        let l0 = left.add_vertex(0, 0, 0);
        let l1 = left.add_vertex(1, 0, 1);
        left.add_area(l0, 1.5);
        left.connect(&mesh, CrossingKey::new(0, 1, Role::Both), l1);

        let mut right = RegionGraph::default();
        let r0 = right.add_vertex(1, twin / 3, 0);
        right.add_area(r0, 0.5);
        right.connect(&mesh, CrossingKey::new(twin, 1, Role::Both), r0);

        let merged = left.merge(right, &mesh);
        assert_eq!(merged.vertex_count(), 3);
        assert_eq!(merged.unmatched(), 0);
        assert!((merged.total_area() - 2.0).abs() < 1e-15);
        assert!(matches!(merged.edges()[0], RegionEdge::Stitch { a: 1, b: 2 }));
    }

    #[test]
    fn merging_into_an_empty_graph_keeps_ids() {
        let mesh = tetrahedron();
        let mut part = RegionGraph::default();
        let a = part.add_vertex(0, 0, 0);
        let b = part.add_vertex(1, 0, 1);
        part.add_level_edge(a, b, Arc::null(0));
        part.connect(&mesh, CrossingKey::new(0, 1, Role::Both), b);

        let merged = RegionGraph::default()
            .merge(part.clone(), &mesh)
            .merge(RegionGraph::default(), &mesh);
        assert_eq!(merged.vertices(), part.vertices());
        assert!(matches!(merged.edges(), [RegionEdge::Level { from: 0, to: 1, .. }]));
        assert_eq!(merged.pending_count(), 1);
    }
}
