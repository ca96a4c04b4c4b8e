//! Parameter sweep.
//!
//! One step is one (center, level count) configuration: its level graph is
//! built once and analysed for every nested area ratio. When the last center of
//! a generator is done, the per-center counts are aggregated.
//!
//! Reports are held back until the whole sweep has succeeded. A sweep that is
//! cancelled or fails hands nothing to its [`Saver`].

use crate::aggregate::SuPair;
use crate::builder::build_region_graph;
use crate::encode::{morse_code, reeb_code};
use crate::error::{ShapeError, ShapeResult};
use crate::level_graph::LevelGraph;
use crate::measure::enclosed_volume;
use crate::mesh::TriangleMesh;
use crate::params::Parameters;
use crate::reeb::reeb_graph;
use crate::saver::{BufferedSaver, LevelGraphReport, MorseReport, ReebReport, SuReport};
use crate::spheres::SphereSequence;
use crate::stability::analyze;
use crate::traits::{Cancellation, Saver};
use nalgebra::Point3;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepProgress {
    pub done: bool,
    pub completed: usize,
    pub total: usize,
    /// Generator and center of the next step, or of the last one once done.
    pub generator_index: usize,
    pub center_index: usize,
}

#[derive(Debug, Clone, Copy)]
struct PlannedStep {
    generator: usize,
    center_index: usize,
    center: Point3<f64>,
    level: usize,
    closes_generator: bool,
}

/// Sweep state without the mesh, so callers decide who owns the mesh.
#[derive(Debug, Clone)]
pub struct Sweep {
    parameters: Parameters,
    plan: Vec<PlannedStep>,
    next: usize,
    failed: bool,
    /// `[generator][level count][area ratio]` -> one pair per center.
    pairs: Vec<Vec<Vec<Vec<SuPair>>>>,
}

impl Sweep {
    /// Plans every configuration. `mesh` must already be centered on its
    /// centroid, since generator offsets are relative to it.
    pub fn new(mesh: &TriangleMesh, parameters: Parameters) -> ShapeResult<Self> {
        parameters.validate()?;
        let volume = enclosed_volume(mesh);

        let mut plan = Vec::new();
        let mut pairs = Vec::with_capacity(parameters.centers.len());
        for (generator, params) in parameters.centers.iter().enumerate() {
            let centers = params.generator.centers(volume);
            for (center_index, center) in centers.iter().enumerate() {
                for level in 0..params.level_counts.len() {
                    plan.push(PlannedStep {
                        generator,
                        center_index,
                        center: *center,
                        level,
                        closes_generator: false,
                    });
                }
            }
            if let Some(last) = plan.last_mut() {
                if last.generator == generator {
                    last.closes_generator = true;
                }
            }
            pairs.push(
                params
                    .level_counts
                    .iter()
                    .map(|l| vec![Vec::with_capacity(centers.len()); l.area_ratios.len()])
                    .collect(),
            );
        }

        Ok(Self {
            parameters,
            plan,
            next: 0,
            failed: false,
            pairs,
        })
    }

    pub fn is_done(&self) -> bool {
        self.failed || self.next >= self.plan.len()
    }

    pub fn total_steps(&self) -> usize {
        self.plan.len()
    }

    pub fn progress(&self) -> SweepProgress {
        let current = self
            .plan
            .get(self.next)
            .or_else(|| self.plan.last())
            .map_or((0, 0), |s| (s.generator, s.center_index));
        SweepProgress {
            done: self.is_done(),
            completed: self.next,
            total: self.plan.len(),
            generator_index: current.0,
            center_index: current.1,
        }
    }

    /// Runs the next configuration. An error ends the sweep.
    pub fn step<S, C>(&mut self, mesh: &TriangleMesh, saver: &mut S, cancel: &C) -> ShapeResult<()>
    where
        S: Saver + ?Sized,
        C: Cancellation + ?Sized,
    {
        let Some(step) = self.plan.get(self.next).copied() else {
            return Ok(());
        };
        let result = self.run_step(mesh, step, saver, cancel);
        match &result {
            Ok(()) => {
                self.next += 1;
                if step.closes_generator {
                    self.flush(step.generator, saver);
                }
            }
            Err(err) => {
                if !err.is_cancelled() {
                    warn!(
                        generator = step.generator,
                        center = step.center_index,
                        error = %err,
                        "sweep configuration failed"
                    );
                }
                self.failed = true;
            }
        }
        result
    }

    fn run_step<S, C>(&mut self, mesh: &TriangleMesh, step: PlannedStep, saver: &mut S, cancel: &C) -> ShapeResult<()>
    where
        S: Saver + ?Sized,
        C: Cancellation + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(ShapeError::Cancelled);
        }
        let params = &self.parameters.centers[step.generator];
        let levels = &params.level_counts[step.level];
        let spheres = SphereSequence::new(mesh, step.center, levels.level_count)?;
        let regions = build_region_graph(mesh, &spheres, cancel)?;
        let graph = LevelGraph::from_regions(&regions);
        debug!(
            level_count = levels.level_count,
            regions = regions.vertex_count(),
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "level graph built"
        );

        let center = [step.center.x, step.center.y, step.center.z];
        for (r, ratio) in levels.area_ratios.iter().enumerate() {
            let analysis = analyze(&graph, ratio.area_ratio);
            let su = analysis.su();
            debug!(area_ratio = ratio.area_ratio, stable = su.stable, unstable = su.unstable, "stability");
            self.pairs[step.generator][step.level][r].push(su);
            saver.level_graph(&LevelGraphReport {
                center,
                level_count: levels.level_count,
                area_ratio: ratio.area_ratio,
                graph: &graph,
                analysis: &analysis,
            });

            if params.generator.count == 1 {
                let reeb = reeb_graph(&graph, &analysis.marks);
                let layout_levels = (0..reeb.graph.vertices().len())
                    .map(|v| reeb.graph.layout_level(v))
                    .collect();
                saver.reeb(&ReebReport {
                    center,
                    level_count: levels.level_count,
                    area_ratio: ratio.area_ratio,
                    code: reeb_code(&reeb.graph),
                    graph: reeb.graph.clone(),
                    layout_levels,
                });
                if let Some(code) = morse_code(&graph, &analysis.marks, &reeb) {
                    saver.morse(&MorseReport {
                        center,
                        level_count: levels.level_count,
                        area_ratio: ratio.area_ratio,
                        code,
                    });
                }
            }
        }
        Ok(())
    }

    fn flush<S: Saver + ?Sized>(&mut self, generator: usize, saver: &mut S) {
        let params = &self.parameters.centers[generator];
        for (l, levels) in params.level_counts.iter().enumerate() {
            for (r, ratio) in levels.area_ratios.iter().enumerate() {
                let pairs = std::mem::take(&mut self.pairs[generator][l][r]);
                for &aggregation in &ratio.aggregations {
                    let Some(summary) = aggregation.reduce(&pairs) else {
                        continue;
                    };
                    saver.su(&SuReport {
                        generator: params.generator,
                        level_count: levels.level_count,
                        area_ratio: ratio.area_ratio,
                        aggregation,
                        summary,
                        pairs: pairs.clone(),
                    });
                }
            }
        }
    }
}

/// Stepped driver that owns its mesh and sink, for callers that interleave
/// the sweep with other work. The sink only sees results once the last step
/// has run.
pub struct SweepRunner<S: Saver> {
    mesh: TriangleMesh,
    sweep: Sweep,
    pending: BufferedSaver,
    saver: S,
}

impl<S: Saver> SweepRunner<S> {
    pub fn new(mesh: &TriangleMesh, parameters: Parameters, saver: S) -> ShapeResult<Self> {
        let mesh = mesh.centered();
        let sweep = Sweep::new(&mesh, parameters)?;
        info!(
            faces = mesh.face_count(),
            steps = sweep.total_steps(),
            "sweep planned"
        );
        Ok(Self {
            mesh,
            sweep,
            pending: BufferedSaver::new(),
            saver,
        })
    }

    pub fn is_done(&self) -> bool {
        self.sweep.is_done()
    }

    pub fn run_steps<C: Cancellation + ?Sized>(&mut self, count: usize, cancel: &C) -> ShapeResult<SweepProgress> {
        for _ in 0..count {
            if self.sweep.is_done() {
                break;
            }
            if let Err(err) = self.sweep.step(&self.mesh, &mut self.pending, cancel) {
                self.pending.clear();
                return Err(err);
            }
        }
        if self.sweep.is_done() && !self.pending.is_empty() {
            self.pending.replay(&mut self.saver);
        }
        Ok(self.sweep.progress())
    }

    pub fn progress(&self) -> SweepProgress {
        self.sweep.progress()
    }

    pub fn saver(&self) -> &S {
        &self.saver
    }

    pub fn saver_mut(&mut self) -> &mut S {
        &mut self.saver
    }

    pub fn into_saver(self) -> S {
        self.saver
    }
}

/// Runs every configuration of `parameters` on `mesh`. `saver` receives the
/// results only if every configuration succeeds.
pub fn run_sweep<S, C>(mesh: &TriangleMesh, parameters: &Parameters, saver: &mut S, cancel: &C) -> ShapeResult<()>
where
    S: Saver + ?Sized,
    C: Cancellation + ?Sized,
{
    let mesh = mesh.centered();
    let mut sweep = Sweep::new(&mesh, parameters.clone())?;
    info!(faces = mesh.face_count(), steps = sweep.total_steps(), "sweep started");
    let mut pending = BufferedSaver::new();
    while !sweep.is_done() {
        sweep.step(&mesh, &mut pending, cancel)?;
    }
    info!(steps = sweep.total_steps(), reports = pending.len(), "sweep finished");
    pending.replay(saver);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run_sweep, SweepRunner};
    use crate::aggregate::Aggregation;
    use crate::cancel::{CancelFlag, Never};
    use crate::error::ShapeError;
    use crate::mesh::fixtures::{pyramid, uv_sphere};
    use crate::params::{CenterSphereGenerator, ParameterRow, Parameters};
    use crate::saver::RecordingSaver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rows(rows: &[(usize, f64, usize, f64, Aggregation)]) -> Parameters {
        let mut parameters = Parameters::empty();
        for &(count, ratio, level_count, area_ratio, aggregation) in rows {
            parameters.insert(&ParameterRow {
                generator: CenterSphereGenerator {
                    offset: [0.0; 3],
                    ratio,
                    count,
                },
                level_count,
                area_ratio,
                aggregation,
            });
        }
        parameters
    }

    #[test]
    fn single_center_reports_everything() {
        let mesh = pyramid(0.5, 4.0);
        let parameters = rows(&[
            (1, 0.0, 1, 0.01, Aggregation::First),
            (1, 0.0, 4, 0.01, Aggregation::First),
            (1, 0.0, 4, 0.05, Aggregation::Average),
        ]);
        let mut saver = RecordingSaver::new();
        run_sweep(&mesh, &parameters, &mut saver, &Never).expect("sweep");
        assert_eq!(saver.level_graphs.len(), 3);
        assert_eq!(saver.reeb.len(), 3);
        assert_eq!(saver.su.len(), parameters.total_count());
        for report in &saver.su {
            assert_eq!(report.pairs.len(), 1);
        }
    }

    #[test]
    fn several_centers_are_aggregated_without_reeb_graphs() {
        let mesh = uv_sphere(1.0, 8, 12);
        let parameters = rows(&[
            (3, 0.01, 3, 0.01, Aggregation::Average),
            (3, 0.01, 3, 0.01, Aggregation::SMax),
        ]);
        let mut saver = RecordingSaver::new();
        run_sweep(&mesh, &parameters, &mut saver, &Never).expect("sweep");
        assert_eq!(saver.level_graphs.len(), 3);
        assert!(saver.reeb.is_empty());
        assert!(saver.morse.is_empty());
        assert_eq!(saver.su.len(), 2);
        assert!(saver.su.iter().all(|r| r.pairs.len() == 3));
    }

    #[test]
    fn runner_steps_through_the_plan() {
        let mesh = uv_sphere(1.0, 8, 12);
        let parameters = rows(&[(2, 0.01, 2, 0.02, Aggregation::First), (2, 0.01, 3, 0.02, Aggregation::First)]);
        let mut runner = SweepRunner::new(&mesh, parameters, RecordingSaver::new()).expect("runner");
        assert_eq!(runner.progress().total, 4);
        let progress = runner.run_steps(3, &Never).expect("steps");
        assert_eq!(progress.completed, 3);
        assert!(!progress.done);
        assert_eq!(progress.center_index, 1);
        assert!(runner.saver().level_graphs.is_empty());
        let progress = runner.run_steps(10, &Never).expect("steps");
        assert!(progress.done);
        assert!(runner.is_done());
        let saver = runner.into_saver();
        assert_eq!(saver.level_graphs.len(), 4);
        assert_eq!(saver.su.len(), 2);
    }

    #[test]
    fn cancellation_stops_the_sweep() {
        let mesh = uv_sphere(1.0, 6, 8);
        let flag = CancelFlag::new();
        flag.cancel();
        let mut saver = RecordingSaver::new();
        let err = run_sweep(&mesh, &Parameters::default(), &mut saver, &flag).expect_err("cancelled");
        assert!(matches!(err, ShapeError::Cancelled));
        assert!(saver.su.is_empty());
    }

    #[test]
    fn cancelled_sweep_leaves_no_partial_output() {
        // One level touches at most two bands per face, so the pyramid's first
        // configuration polls far fewer than 40 times and the second one far more.
        let mesh = pyramid(0.5, 4.0);
        let parameters = rows(&[(1, 0.0, 1, 0.01, Aggregation::First), (1, 0.0, 200, 0.01, Aggregation::First)]);
        let polls = AtomicUsize::new(0);
        let cancel = || polls.fetch_add(1, Ordering::Relaxed) >= 40;
        let mut saver = RecordingSaver::new();
        let err = run_sweep(&mesh, &parameters, &mut saver, &cancel).expect_err("cancelled");
        assert!(matches!(err, ShapeError::Cancelled), "unexpected error: {err}");
        assert!(polls.load(Ordering::Relaxed) > 40);
        assert!(saver.level_graphs.is_empty());
        assert!(saver.reeb.is_empty());
        assert!(saver.su.is_empty());
    }

    #[test]
    fn failed_runner_discards_finished_steps() {
        let mesh = uv_sphere(1.0, 8, 12);
        let parameters = rows(&[(2, 0.01, 2, 0.02, Aggregation::First)]);
        let mut runner = SweepRunner::new(&mesh, parameters, RecordingSaver::new()).expect("runner");
        runner.run_steps(1, &Never).expect("first step");
        let flag = CancelFlag::new();
        flag.cancel();
        let err = runner.run_steps(1, &flag).expect_err("cancelled");
        assert!(matches!(err, ShapeError::Cancelled));
        assert!(runner.is_done());
        runner.run_steps(1, &Never).expect("nothing left to run");
        let saver = runner.into_saver();
        assert!(saver.level_graphs.is_empty());
        assert!(saver.su.is_empty());
    }
}
