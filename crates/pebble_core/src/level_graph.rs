//! Connected level-set pieces and how they nest.
//!
//! Contracting the stitch edges of a [`RegionGraph`] leaves one vertex per
//! connected piece of each band between consecutive spheres. The remaining level
//! edges point outwards, from level `L` to `L + 1`, so the graph is a DAG.

use crate::intersect::Arc;
use crate::region::{RegionEdge, RegionGraph};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type LevelId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelVertex {
    pub level: usize,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelEdge {
    pub from: LevelId,
    pub to: LevelId,
    /// Every arc separating the two pieces.
    pub arcs: Vec<Arc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelGraph {
    vertices: Vec<LevelVertex>,
    edges: Vec<LevelEdge>,
    out_edges: Vec<Vec<EdgeId>>,
    in_edges: Vec<Vec<EdgeId>>,
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            Ordering::Less => self.parent[rx] = ry,
            Ordering::Greater => self.parent[ry] = rx,
            Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

impl LevelGraph {
    /// Contracts the stitch edges of a closed region graph.
    ///
    /// Vertex ids follow `(level, smallest (face, ordinal) of the piece)` so the
    /// result does not depend on the order faces were merged in.
    pub fn from_regions(regions: &RegionGraph) -> Self {
        let vertices = regions.vertices();
        let mut sets = DisjointSet::new(vertices.len());
        for edge in regions.edges() {
            if let RegionEdge::Stitch { a, b } = edge {
                sets.union(*a, *b);
            }
        }

        // Members of every piece, in canonical order.
        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for v in 0..vertices.len() {
            members.entry(sets.find(v)).or_default().push(v);
        }
        let mut pieces: Vec<Vec<usize>> = members.into_values().collect();
        for piece in &mut pieces {
            piece.sort_by_key(|&v| (vertices[v].face, vertices[v].ordinal));
        }
        pieces.sort_by_key(|piece| {
            let v = piece[0];
            (vertices[v].level, vertices[v].face, vertices[v].ordinal)
        });

        let mut component = vec![0; vertices.len()];
        let level_vertices: Vec<LevelVertex> = pieces
            .iter()
            .enumerate()
            .map(|(id, piece)| {
                for &v in piece {
                    component[v] = id;
                }
                LevelVertex {
                    level: vertices[piece[0]].level,
                    area: piece.iter().map(|&v| vertices[v].area).sum(),
                }
            })
            .collect();

        let mut crossings: BTreeMap<(LevelId, LevelId), Vec<Arc>> = BTreeMap::new();
        for edge in regions.edges() {
            if let RegionEdge::Level { from, to, arc } = edge {
                crossings
                    .entry((component[*from], component[*to]))
                    .or_default()
                    .push(arc.clone());
            }
        }
        let edges = crossings
            .into_iter()
            .map(|((from, to), mut arcs)| {
                arcs.sort_by_key(|arc| (arc.face, arc.enclosed.first().copied()));
                (from, to, arcs)
            })
            .collect();

        Self::from_parts(level_vertices, edges)
    }

    /// Assembles a graph from explicit vertices and `(from, to, arcs)` edges.
    /// Edges are kept sorted by endpoints. Vertex ids need not follow the
    /// levels; walks that must respect edge direction use [`Self::level_order`].
    pub fn from_parts(vertices: Vec<LevelVertex>, edges: Vec<(LevelId, LevelId, Vec<Arc>)>) -> Self {
        let mut edges: Vec<LevelEdge> = edges
            .into_iter()
            .map(|(from, to, arcs)| LevelEdge { from, to, arcs })
            .collect();
        edges.sort_by_key(|e| (e.from, e.to));

        let mut out_edges = vec![Vec::new(); vertices.len()];
        let mut in_edges = vec![Vec::new(); vertices.len()];
        for (id, edge) in edges.iter().enumerate() {
            out_edges[edge.from].push(id);
            in_edges[edge.to].push(id);
        }
        Self {
            vertices,
            edges,
            out_edges,
            in_edges,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> &[LevelVertex] {
        &self.vertices
    }

    pub fn vertex(&self, id: LevelId) -> &LevelVertex {
        &self.vertices[id]
    }

    pub fn edges(&self) -> &[LevelEdge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &LevelEdge {
        &self.edges[id]
    }

    pub fn out_edges(&self, vertex: LevelId) -> &[EdgeId] {
        &self.out_edges[vertex]
    }

    pub fn in_edges(&self, vertex: LevelId) -> &[EdgeId] {
        &self.in_edges[vertex]
    }

    /// Vertex ids sorted by level, ties by id. Every edge steps out one level,
    /// so this is a topological order.
    pub fn level_order(&self) -> Vec<LevelId> {
        let mut order: Vec<LevelId> = (0..self.vertices.len()).collect();
        order.sort_by_key(|&v| self.vertices[v].level);
        order
    }

    /// Vertices without incoming edges, in id order.
    pub fn roots(&self) -> impl Iterator<Item = LevelId> + '_ {
        (0..self.vertices.len()).filter(|&v| self.in_edges[v].is_empty())
    }

    /// Vertices without outgoing edges, in id order.
    pub fn leaves(&self) -> impl Iterator<Item = LevelId> + '_ {
        (0..self.vertices.len()).filter(|&v| self.out_edges[v].is_empty())
    }

    pub fn total_area(&self) -> f64 {
        self.vertices.iter().map(|v| v.area).sum()
    }
}
