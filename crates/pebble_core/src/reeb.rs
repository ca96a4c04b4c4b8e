//! Reachability filtering and contraction into a Reeb graph.
//!
//! Only edges that lie downstream of a STABLE edge and upstream of an UNSTABLE
//! edge survive. Runs of vertices with one surviving in-edge and one surviving
//! out-edge are then folded into single Reeb edges between junctions.

use crate::level_graph::{EdgeId, LevelGraph};
use crate::stability::StabilityMarks;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// The view of a directed acyclic graph the contraction needs.
pub trait Dag {
    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;
    fn edge_endpoints(&self, edge: usize) -> (usize, usize);
    fn out_edges(&self, node: usize) -> &[usize];
    fn in_edges(&self, node: usize) -> &[usize];
    fn base_level(&self, node: usize) -> usize;
}

impl Dag for LevelGraph {
    fn node_count(&self) -> usize {
        self.vertex_count()
    }

    fn edge_count(&self) -> usize {
        LevelGraph::edge_count(self)
    }

    fn edge_endpoints(&self, edge: usize) -> (usize, usize) {
        let e = self.edge(edge);
        (e.from, e.to)
    }

    fn out_edges(&self, node: usize) -> &[usize] {
        LevelGraph::out_edges(self, node)
    }

    fn in_edges(&self, node: usize) -> &[usize] {
        LevelGraph::in_edges(self, node)
    }

    fn base_level(&self, node: usize) -> usize {
        self.vertex(node).level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReebVertex {
    pub level: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReebEdge {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReebGraph {
    vertices: Vec<ReebVertex>,
    edges: Vec<ReebEdge>,
    #[serde(skip)]
    out_edges: Vec<Vec<usize>>,
    #[serde(skip)]
    in_edges: Vec<Vec<usize>>,
}

impl ReebGraph {
    /// Edges must already be in their final order.
    pub fn from_parts(vertices: Vec<ReebVertex>, edges: Vec<ReebEdge>) -> Self {
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

    pub fn vertices(&self) -> &[ReebVertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[ReebEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drawing height: termini are pushed half a level outwards.
    pub fn layout_level(&self, vertex: usize) -> f64 {
        let level = self.vertices[vertex].level as f64;
        if self.in_edges[vertex].is_empty() {
            level - 0.5
        } else if self.out_edges[vertex].is_empty() {
            level + 0.5
        } else {
            level
        }
    }
}

impl Dag for ReebGraph {
    fn node_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_endpoints(&self, edge: usize) -> (usize, usize) {
        let e = self.edges[edge];
        (e.from, e.to)
    }

    fn out_edges(&self, node: usize) -> &[usize] {
        &self.out_edges[node]
    }

    fn in_edges(&self, node: usize) -> &[usize] {
        &self.in_edges[node]
    }

    fn base_level(&self, node: usize) -> usize {
        self.vertices[node].level
    }
}

/// A Reeb graph and where its pieces came from.
#[derive(Debug, Clone, Default)]
pub struct Contraction {
    pub graph: ReebGraph,
    /// Source vertex of every Reeb vertex.
    pub junctions: Vec<usize>,
    /// Source edges of every Reeb edge, in flow order.
    pub chains: Vec<Vec<EdgeId>>,
}

/// Edges downstream of a STABLE edge and upstream of an UNSTABLE edge.
/// Marked edges count as their own neighbours.
pub fn accessible_edges<G: Dag + ?Sized>(graph: &G, marks: &StabilityMarks) -> Vec<bool> {
    let forward = sweep(graph, &marks.stable, true);
    let backward = sweep(graph, &marks.unstable, false);
    forward.iter().zip(&backward).map(|(f, b)| *f && *b).collect()
}

fn sweep<G: Dag + ?Sized>(graph: &G, seeds: &[EdgeId], downstream: bool) -> Vec<bool> {
    let mut reached = vec![false; graph.edge_count()];
    let mut stack: Vec<EdgeId> = Vec::new();
    for &e in seeds {
        if !reached[e] {
            reached[e] = true;
            stack.push(e);
        }
    }
    while let Some(e) = stack.pop() {
        let (from, to) = graph.edge_endpoints(e);
        let next = if downstream {
            graph.out_edges(to)
        } else {
            graph.in_edges(from)
        };
        for &n in next {
            if !reached[n] {
                reached[n] = true;
                stack.push(n);
            }
        }
    }
    reached
}

/// Folds every run of (1, 1) vertices of the `accessible` subgraph into one edge.
pub fn contract<G: Dag + ?Sized>(graph: &G, accessible: &[bool]) -> Contraction {
    let n = graph.node_count();
    let filter = |edges: &[usize]| -> Vec<usize> { edges.iter().copied().filter(|&e| accessible[e]).collect() };
    let outs: Vec<Vec<usize>> = (0..n).map(|v| filter(graph.out_edges(v))).collect();
    let ins: Vec<Vec<usize>> = (0..n).map(|v| filter(graph.in_edges(v))).collect();
    let junction: Vec<bool> = (0..n)
        .map(|v| {
            let (i, o) = (ins[v].len(), outs[v].len());
            (i > 0 || o > 0) && !(i == 1 && o == 1)
        })
        .collect();

    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();
    // First forward edge -> (from, to, chain).
    let mut found: BTreeMap<EdgeId, (usize, usize, Vec<EdgeId>)> = BTreeMap::new();
    for root in (0..n).filter(|&v| junction[v] && ins[v].is_empty()) {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        queue.push_back(root);
        while let Some(j) = queue.pop_front() {
            for &start in &outs[j] {
                let mut chain = vec![start];
                let mut v = graph.edge_endpoints(start).1;
                while !junction[v] {
                    let e = outs[v][0];
                    chain.push(e);
                    v = graph.edge_endpoints(e).1;
                }
                found.entry(start).or_insert((j, v, chain));
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
            for &start in &ins[j] {
                let mut chain = vec![start];
                let mut v = graph.edge_endpoints(start).0;
                while !junction[v] {
                    let e = ins[v][0];
                    chain.push(e);
                    v = graph.edge_endpoints(e).0;
                }
                chain.reverse();
                found.entry(chain[0]).or_insert((v, j, chain));
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }
    }

    let junctions: Vec<usize> = (0..n).filter(|&v| junction[v]).collect();
    let mut reeb_id = vec![usize::MAX; n];
    for (id, &v) in junctions.iter().enumerate() {
        reeb_id[v] = id;
    }
    let vertices = junctions
        .iter()
        .map(|&v| ReebVertex {
            level: graph.base_level(v),
        })
        .collect();

    let mut runs: Vec<(usize, usize, EdgeId, Vec<EdgeId>)> = found
        .into_iter()
        .map(|(first, (from, to, chain))| (reeb_id[from], reeb_id[to], first, chain))
        .collect();
    runs.sort_by_key(|&(from, to, first, _)| (from, to, first));
    let edges = runs.iter().map(|&(from, to, _, _)| ReebEdge { from, to }).collect();
    let chains = runs.into_iter().map(|(_, _, _, chain)| chain).collect();

    Contraction {
        graph: ReebGraph::from_parts(vertices, edges),
        junctions,
        chains,
    }
}

/// Filters `graph` by the marks and contracts what is left.
pub fn reeb_graph(graph: &LevelGraph, marks: &StabilityMarks) -> Contraction {
    let accessible = accessible_edges(graph, marks);
    contract(graph, &accessible)
}
