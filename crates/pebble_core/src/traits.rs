use crate::saver::{LevelGraphReport, MorseReport, ReebReport, SuReport};

/// Polled between units of work. Returning `true` makes the running stage stop
/// with [`ShapeError::Cancelled`](crate::error::ShapeError::Cancelled).
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<F> Cancellation for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Receives the results of a sweep as they are produced.
/// Every method defaults to doing nothing, so a sink only overrides what it keeps.
pub trait Saver {
    /// Called once before the first result of a mesh.
    fn begin_file(&mut self, _name: &str) {}

    /// One level graph analysed with one area ratio.
    fn level_graph(&mut self, _report: &LevelGraphReport<'_>) {}

    /// Aggregated counts of one generator, level count, area ratio and aggregation.
    fn su(&mut self, _report: &SuReport) {}

    fn reeb(&mut self, _report: &ReebReport) {}

    fn morse(&mut self, _report: &MorseReport) {}
}
