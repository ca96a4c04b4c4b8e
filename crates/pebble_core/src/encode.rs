//! Canonical strings for comparing results across runs.

use crate::level_graph::{EdgeId, LevelGraph};
use crate::reeb::{accessible_edges, Contraction, ReebGraph};
use crate::stability::StabilityMarks;
use std::collections::BTreeSet;
use tracing::warn;

/// `"{vertex count}|{from>to,...}"` with edges in sorted order.
pub fn reeb_code(graph: &ReebGraph) -> String {
    let mut pairs: Vec<(usize, usize)> = graph.edges().iter().map(|e| (e.from, e.to)).collect();
    pairs.sort_unstable();
    let edges: Vec<String> = pairs.iter().map(|(a, b)| format!("{a}>{b}")).collect();
    format!("{}|{}", graph.vertices().len(), edges.join(","))
}

/// Branch labels per level-graph edge. Stable branches are numbered from 1 in
/// the order of their STABLE edges; unstable branches likewise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorseLabels {
    pub stable: Vec<Option<usize>>,
    pub unstable: Vec<Option<usize>>,
}

/// Pushes stable labels forward and unstable labels backward through the
/// accessible edges, visiting vertices by level. Where several labels meet, an edge inherits the label of
/// the nearest neighbouring edge, measured between arc endpoints.
pub fn morse_labels(graph: &LevelGraph, marks: &StabilityMarks) -> MorseLabels {
    let accessible = accessible_edges(graph, marks);
    let m = graph.edge_count();

    let mut stable = vec![None; m];
    for (k, &e) in marks.stable.iter().enumerate() {
        stable[e] = Some(k + 1);
    }
    let order = graph.level_order();
    for &v in &order {
        let incoming: Vec<EdgeId> = graph.in_edges(v).iter().copied().filter(|&e| stable[e].is_some()).collect();
        for &e in graph.out_edges(v) {
            if accessible[e] && !marks.is_stable(e) {
                stable[e] = resolve(graph, e, &incoming, &stable);
            }
        }
    }

    let mut unstable = vec![None; m];
    for (k, &e) in marks.unstable.iter().enumerate() {
        unstable[e] = Some(k + 1);
    }
    for &v in order.iter().rev() {
        let outgoing: Vec<EdgeId> = graph.out_edges(v).iter().copied().filter(|&e| unstable[e].is_some()).collect();
        for &e in graph.in_edges(v) {
            if accessible[e] && !marks.is_unstable(e) {
                unstable[e] = resolve(graph, e, &outgoing, &unstable);
            }
        }
    }

    MorseLabels { stable, unstable }
}

fn resolve(graph: &LevelGraph, edge: EdgeId, neighbours: &[EdgeId], labels: &[Option<usize>]) -> Option<usize> {
    let distinct: BTreeSet<usize> = neighbours.iter().filter_map(|&n| labels[n]).collect();
    if distinct.len() <= 1 {
        return distinct.first().copied();
    }
    neighbours
        .iter()
        .filter_map(|&n| labels[n].map(|label| (edge_distance(graph, edge, n), label)))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, label)| label)
}

/// Smallest distance between the arc anchors of two edges; infinite without arcs.
fn edge_distance(graph: &LevelGraph, a: EdgeId, b: EdgeId) -> f64 {
    let anchors = |e: EdgeId| -> Vec<_> { graph.edge(e).arcs.iter().flat_map(|arc| arc.anchor_points()).collect() };
    let (pa, pb) = (anchors(a), anchors(b));
    pa.iter()
        .flat_map(|p| pb.iter().map(move |q| (p - q).norm()))
        .fold(f64::INFINITY, f64::min)
}

/// `"S{S}U{U}:H(s1,s2;u1,u2),..."` over the saddles of the Reeb graph, or `None`
/// when a junction branches more than twice or a label cannot be resolved.
pub fn morse_code(graph: &LevelGraph, marks: &StabilityMarks, reeb: &Contraction) -> Option<String> {
    let labels = morse_labels(graph, marks);
    let rg = &reeb.graph;
    let mut ins = vec![Vec::new(); rg.vertices().len()];
    let mut outs = vec![Vec::new(); rg.vertices().len()];
    for (id, edge) in rg.edges().iter().enumerate() {
        outs[edge.from].push(id);
        ins[edge.to].push(id);
    }

    let mut saddles = Vec::new();
    for v in 0..rg.vertices().len() {
        let (in_count, out_count) = (ins[v].len(), outs[v].len());
        if in_count > 2 || out_count > 2 {
            warn!(vertex = v, in_count, out_count, "junction with more than two branches");
            return None;
        }
        if in_count != 2 && out_count != 2 {
            continue;
        }
        // Level-graph edges touching the junction: last edges of incoming
        // chains and first edges of outgoing ones.
        let arriving: Vec<EdgeId> = ins[v].iter().filter_map(|&r| reeb.chains[r].last().copied()).collect();
        let leaving: Vec<EdgeId> = outs[v].iter().filter_map(|&r| reeb.chains[r].first().copied()).collect();
        let adjacent: Vec<EdgeId> = arriving.iter().chain(&leaving).copied().collect();

        let Some(stable) = label_pair(&arriving, &adjacent, &labels.stable) else {
            warn!(vertex = v, "stable labels of saddle are unresolved");
            return None;
        };
        let Some(unstable) = label_pair(&leaving, &adjacent, &labels.unstable) else {
            warn!(vertex = v, "unstable labels of saddle are unresolved");
            return None;
        };
        saddles.push((stable, unstable));
    }
    saddles.sort_unstable();

    let saddles: Vec<String> = saddles
        .iter()
        .map(|((s1, s2), (u1, u2))| format!("H({s1},{s2};{u1},{u2})"))
        .collect();
    Some(format!(
        "S{}U{}:{}",
        marks.stable.len(),
        marks.unstable.len(),
        saddles.join(",")
    ))
}

/// Two labels from a branching side, or the single label around the junction
/// repeated when that side does not branch.
fn label_pair(branching: &[EdgeId], adjacent: &[EdgeId], labels: &[Option<usize>]) -> Option<(usize, usize)> {
    if let [a, b] = branching {
        let (x, y) = (labels[*a]?, labels[*b]?);
        return Some((x.min(y), x.max(y)));
    }
    let distinct: BTreeSet<usize> = adjacent.iter().filter_map(|&e| labels[e]).collect();
    match distinct.len() {
        1 => distinct.first().map(|&l| (l, l)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{morse_code, morse_labels, reeb_code};
    use crate::intersect::{Arc, Circle};
    use crate::level_graph::{LevelGraph, LevelVertex};
    use crate::reeb::{reeb_graph, ReebGraph};
    use crate::stability::StabilityMarks;
    use nalgebra::{Point3, Vector3};

    fn disc_at(x: f64) -> Arc {
        let mut arc = Arc::null(0);
        arc.circle = Some(Circle {
            center: Point3::new(x, 0.0, 0.0),
            radius: 0.1,
            normal: Vector3::z(),
        });
        arc
    }

    fn graph(levels: &[usize], edges: Vec<(usize, usize, Vec<Arc>)>) -> LevelGraph {
        let vertices = levels.iter().map(|&level| LevelVertex { level, area: 1.0 }).collect();
        LevelGraph::from_parts(vertices, edges)
    }

    fn marks(stable: &[usize], unstable: &[usize]) -> StabilityMarks {
        StabilityMarks {
            stable: stable.to_vec(),
            unstable: unstable.to_vec(),
        }
    }

    #[test]
    fn empty_reeb_graph_code() {
        assert_eq!(reeb_code(&ReebGraph::default()), "0|");
    }

    #[test]
    fn chain_has_no_saddles() {
        let g = graph(&[0, 1, 2], vec![(0, 1, vec![]), (1, 2, vec![])]);
        let m = marks(&[0], &[1]);
        let reeb = reeb_graph(&g, &m);
        assert_eq!(reeb_code(&reeb.graph), "2|0>1");
        assert_eq!(morse_code(&g, &m, &reeb).as_deref(), Some("S1U1:"));
    }

    #[test]
    fn two_lobes_meet_in_one_saddle() {
        // 0 -> 2 <- 1, 2 -> 3
        let g = graph(
            &[0, 0, 1, 2],
            vec![(0, 2, vec![disc_at(0.0)]), (1, 2, vec![disc_at(4.0)]), (2, 3, vec![disc_at(1.0)])],
        );
        let m = marks(&[0, 1], &[2]);
        let labels = morse_labels(&g, &m);
        assert_eq!(labels.stable, vec![Some(1), Some(2), Some(1)]);
        assert_eq!(labels.unstable, vec![Some(1), Some(1), Some(1)]);
        let reeb = reeb_graph(&g, &m);
        assert_eq!(reeb_code(&reeb.graph), "4|0>2,1>2,2>3");
        assert_eq!(morse_code(&g, &m, &reeb).as_deref(), Some("S2U1:H(1,2;1,1)"));
    }

    #[test]
    fn nearest_branch_wins_and_ties_go_low() {
        let g = graph(
            &[0, 0, 1, 2],
            vec![(0, 2, vec![disc_at(5.0)]), (1, 2, vec![disc_at(0.0)]), (2, 3, vec![disc_at(1.0)])],
        );
        let labels = morse_labels(&g, &marks(&[0, 1], &[2]));
        assert_eq!(labels.stable[2], Some(2));

        let bare = graph(&[0, 0, 1, 2], vec![(0, 2, vec![]), (1, 2, vec![]), (2, 3, vec![])]);
        let labels = morse_labels(&bare, &marks(&[0, 1], &[2]));
        assert_eq!(labels.stable[2], Some(1));
    }

    #[test]
    fn labels_follow_levels_not_vertex_ids() {
        // Vertex ids run against the levels: 3, 4 -> 2 -> 1 -> 0.
        let g = graph(
            &[3, 2, 1, 0, 0],
            vec![
                (1, 0, vec![disc_at(1.0)]),
                (2, 1, vec![disc_at(1.0)]),
                (3, 2, vec![disc_at(0.0)]),
                (4, 2, vec![disc_at(4.0)]),
            ],
        );
        let m = marks(&[2, 3], &[0]);
        let labels = morse_labels(&g, &m);
        assert_eq!(labels.stable, vec![Some(1), Some(1), Some(1), Some(2)]);
        assert_eq!(labels.unstable, vec![Some(1); 4]);
        let reeb = reeb_graph(&g, &m);
        assert_eq!(morse_code(&g, &m, &reeb).as_deref(), Some("S2U1:H(1,2;1,1)"));
    }

    #[test]
    fn saddles_are_listed_in_order() {
        // Two saddles: {0, 1} meet at 3, then {3, 2} meet at 5.
        let g = graph(
            &[0, 0, 1, 1, 2, 2, 3],
            vec![
                (0, 3, vec![disc_at(0.0)]),
                (1, 3, vec![disc_at(3.0)]),
                (2, 4, vec![disc_at(9.0)]),
                (3, 5, vec![disc_at(0.5)]),
                (4, 5, vec![disc_at(9.0)]),
                (5, 6, vec![disc_at(0.5)]),
            ],
        );
        let m = marks(&[0, 1, 2], &[5]);
        let reeb = reeb_graph(&g, &m);
        assert_eq!(morse_code(&g, &m, &reeb).as_deref(), Some("S3U1:H(1,2;1,1),H(1,3;1,1)"));
    }

    #[test]
    fn triple_branching_is_unresolvable() {
        let g = graph(
            &[0, 0, 0, 1, 2],
            vec![(0, 3, vec![]), (1, 3, vec![]), (2, 3, vec![]), (3, 4, vec![])],
        );
        let m = marks(&[0, 1, 2], &[3]);
        let reeb = reeb_graph(&g, &m);
        assert_eq!(reeb.graph.vertices().len(), 5);
        assert_eq!(morse_code(&g, &m, &reeb), None);
    }
}
