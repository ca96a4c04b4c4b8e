//! Result reports handed to a [`Saver`] and two ready-made sinks.

use crate::aggregate::{Aggregation, SuPair, SuSummary};
use crate::level_graph::LevelGraph;
use crate::params::CenterSphereGenerator;
use crate::reeb::ReebGraph;
use crate::stability::{StabilityAnalysis, StabilityMarks};
use crate::traits::Saver;
use serde::Serialize;

/// One level graph analysed with one area ratio.
#[derive(Debug, Clone, Copy)]
pub struct LevelGraphReport<'a> {
    pub center: [f64; 3],
    pub level_count: usize,
    pub area_ratio: f64,
    pub graph: &'a LevelGraph,
    pub analysis: &'a StabilityAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuReport {
    pub generator: CenterSphereGenerator,
    pub level_count: usize,
    pub area_ratio: f64,
    pub aggregation: Aggregation,
    pub summary: SuSummary,
    /// Per-center pairs the summary was reduced from.
    pub pairs: Vec<SuPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReebReport {
    pub center: [f64; 3],
    pub level_count: usize,
    pub area_ratio: f64,
    pub code: String,
    pub graph: ReebGraph,
    /// Drawing height of every Reeb vertex.
    pub layout_levels: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MorseReport {
    pub center: [f64; 3],
    pub level_count: usize,
    pub area_ratio: f64,
    pub code: String,
}

/// Owned copy of a [`LevelGraphReport`], small enough to ship to a UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelGraphRecord {
    pub center: [f64; 3],
    pub level_count: usize,
    pub area_ratio: f64,
    pub levels: Vec<usize>,
    pub areas: Vec<f64>,
    pub edges: Vec<(usize, usize)>,
    pub marks: StabilityMarks,
    pub su: SuPair,
}

impl From<&LevelGraphReport<'_>> for LevelGraphRecord {
    fn from(report: &LevelGraphReport<'_>) -> Self {
        Self {
            center: report.center,
            level_count: report.level_count,
            area_ratio: report.area_ratio,
            levels: report.graph.vertices().iter().map(|v| v.level).collect(),
            areas: report.graph.vertices().iter().map(|v| v.area).collect(),
            edges: report.graph.edges().iter().map(|e| (e.from, e.to)).collect(),
            marks: report.analysis.marks.clone(),
            su: report.analysis.su(),
        }
    }
}

/// Keeps everything in memory, grouped by file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingSaver {
    pub files: Vec<String>,
    pub level_graphs: Vec<LevelGraphRecord>,
    pub su: Vec<SuReport>,
    pub reeb: Vec<ReebReport>,
    pub morse: Vec<MorseReport>,
}

impl RecordingSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the saver and returns what it held.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl Saver for RecordingSaver {
    fn begin_file(&mut self, name: &str) {
        self.files.push(name.to_owned());
    }

    fn level_graph(&mut self, report: &LevelGraphReport<'_>) {
        self.level_graphs.push(report.into());
    }

    fn su(&mut self, report: &SuReport) {
        self.su.push(report.clone());
    }

    fn reeb(&mut self, report: &ReebReport) {
        self.reeb.push(report.clone());
    }

    fn morse(&mut self, report: &MorseReport) {
        self.morse.push(report.clone());
    }
}

#[derive(Debug, Clone)]
enum Buffered {
    File(String),
    LevelGraph {
        center: [f64; 3],
        level_count: usize,
        area_ratio: f64,
        graph: LevelGraph,
        analysis: StabilityAnalysis,
    },
    Su(SuReport),
    Reeb(ReebReport),
    Morse(MorseReport),
}

/// Holds reports back until the run that produced them has succeeded, then
/// hands them on in the order they arrived.
#[derive(Debug, Clone, Default)]
pub struct BufferedSaver {
    reports: Vec<Buffered>,
}

impl BufferedSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn clear(&mut self) {
        self.reports.clear();
    }

    /// Passes every held report to `saver` and empties the buffer.
    pub fn replay<S: Saver + ?Sized>(&mut self, saver: &mut S) {
        for report in self.reports.drain(..) {
            match report {
                Buffered::File(name) => saver.begin_file(&name),
                Buffered::LevelGraph {
                    center,
                    level_count,
                    area_ratio,
                    graph,
                    analysis,
                } => saver.level_graph(&LevelGraphReport {
                    center,
                    level_count,
                    area_ratio,
                    graph: &graph,
                    analysis: &analysis,
                }),
                Buffered::Su(report) => saver.su(&report),
                Buffered::Reeb(report) => saver.reeb(&report),
                Buffered::Morse(report) => saver.morse(&report),
            }
        }
    }
}

impl Saver for BufferedSaver {
    fn begin_file(&mut self, name: &str) {
        self.reports.push(Buffered::File(name.to_owned()));
    }

    fn level_graph(&mut self, report: &LevelGraphReport<'_>) {
        self.reports.push(Buffered::LevelGraph {
            center: report.center,
            level_count: report.level_count,
            area_ratio: report.area_ratio,
            graph: report.graph.clone(),
            analysis: report.analysis.clone(),
        });
    }

    fn su(&mut self, report: &SuReport) {
        self.reports.push(Buffered::Su(report.clone()));
    }

    fn reeb(&mut self, report: &ReebReport) {
        self.reports.push(Buffered::Reeb(report.clone()));
    }

    fn morse(&mut self, report: &MorseReport) {
        self.reports.push(Buffered::Morse(report.clone()));
    }
}

/// Discards every result.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSaver;

impl Saver for NullSaver {}

impl<S: Saver + ?Sized> Saver for &mut S {
    fn begin_file(&mut self, name: &str) {
        (**self).begin_file(name)
    }

    fn level_graph(&mut self, report: &LevelGraphReport<'_>) {
        (**self).level_graph(report)
    }

    fn su(&mut self, report: &SuReport) {
        (**self).su(report)
    }

    fn reeb(&mut self, report: &ReebReport) {
        (**self).reeb(report)
    }

    fn morse(&mut self, report: &MorseReport) {
        (**self).morse(report)
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferedSaver, LevelGraphReport, RecordingSaver, SuReport};
    use crate::aggregate::{Aggregation, SuPair, SuSummary};
    use crate::level_graph::{LevelGraph, LevelVertex};
    use crate::params::CenterSphereGenerator;
    use crate::stability::analyze;
    use crate::traits::Saver;

    fn two_levels() -> LevelGraph {
        let vertices = vec![LevelVertex { level: 0, area: 1.0 }, LevelVertex { level: 1, area: 1.0 }];
        LevelGraph::from_parts(vertices, vec![(0, 1, Vec::new())])
    }

    fn su_report() -> SuReport {
        SuReport {
            generator: CenterSphereGenerator {
                offset: [0.0; 3],
                ratio: 0.0,
                count: 1,
            },
            level_count: 1,
            area_ratio: 0.01,
            aggregation: Aggregation::First,
            summary: SuSummary::from(SuPair::new(1, 1)),
            pairs: vec![SuPair::new(1, 1)],
        }
    }

    #[test]
    fn buffered_reports_are_replayed_in_order() {
        let graph = two_levels();
        let analysis = analyze(&graph, 0.01);
        let mut buffer = BufferedSaver::new();
        buffer.begin_file("pyramid");
        buffer.level_graph(&LevelGraphReport {
            center: [0.0; 3],
            level_count: 1,
            area_ratio: 0.01,
            graph: &graph,
            analysis: &analysis,
        });
        buffer.su(&su_report());
        assert_eq!(buffer.len(), 3);

        let mut saver = RecordingSaver::new();
        buffer.replay(&mut saver);
        assert!(buffer.is_empty());
        assert_eq!(saver.files, vec!["pyramid"]);
        assert_eq!(saver.level_graphs.len(), 1);
        assert_eq!(saver.level_graphs[0].edges, vec![(0, 1)]);
        assert_eq!(saver.level_graphs[0].su, analysis.su());
        assert_eq!(saver.su, vec![su_report()]);
    }

    #[test]
    fn cleared_buffer_replays_nothing() {
        let mut buffer = BufferedSaver::new();
        buffer.su(&su_report());
        buffer.clear();
        let mut saver = RecordingSaver::new();
        buffer.replay(&mut saver);
        assert!(saver.su.is_empty());
    }
}
