//! Runs one parameter sweep over many meshes.
//!
//! Every file gets its own status. A file that fails, times out or cannot be
//! read is marked and the batch moves on; only the outer cancellation stops it.
//! Only files that finish are announced to the [`Saver`].

use crate::cancel::Deadline;
use crate::error::{ShapeError, ShapeResult};
use crate::mesh::{MeshData, TriangleMesh};
use crate::params::Parameters;
use crate::saver::BufferedSaver;
use crate::sweep::run_sweep;
use crate::traits::{Cancellation, Saver};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Wall-clock budget per file in seconds. `None`, and any value too large
    /// for a [`Duration`], means unlimited.
    pub deadline_secs: Option<f64>,
}

impl BatchSettings {
    fn limit(&self) -> Option<Duration> {
        self.deadline_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub name: String,
    pub mesh: MeshData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Waiting,
    Running,
    Ok,
    Error(String),
}

impl FileStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, FileStatus::Ok | FileStatus::Error(_))
    }
}

/// Sweeps `files` in order, reporting status changes through `on_status`.
///
/// Returns the final status of every file, or [`ShapeError::Cancelled`] when
/// `cancel` trips. Files not reached by then keep [`FileStatus::Waiting`] in
/// the last reported state.
pub fn run_batch<S, C, F>(
    files: &[BatchFile],
    parameters: &Parameters,
    settings: &BatchSettings,
    saver: &mut S,
    cancel: &C,
    mut on_status: F,
) -> ShapeResult<Vec<FileStatus>>
where
    S: Saver + ?Sized,
    C: Cancellation + ?Sized,
    F: FnMut(usize, &FileStatus),
{
    parameters.validate()?;
    let mut statuses = vec![FileStatus::Waiting; files.len()];
    for (index, status) in statuses.iter().enumerate() {
        on_status(index, status);
    }

    for (index, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(completed = index, total = files.len(), "batch cancelled");
            return Err(ShapeError::Cancelled);
        }
        statuses[index] = FileStatus::Running;
        on_status(index, &statuses[index]);

        let deadline = Deadline::new(cancel, settings.limit());
        let mut pending = BufferedSaver::new();
        let outcome = TriangleMesh::from_data(&file.mesh)
            .and_then(|mesh| run_sweep(&mesh, parameters, &mut pending, &deadline));
        statuses[index] = match outcome {
            Ok(()) => {
                saver.begin_file(&file.name);
                pending.replay(&mut *saver);
                info!(file = %file.name, elapsed_ms = deadline.elapsed().as_millis() as u64, "file finished");
                FileStatus::Ok
            }
            Err(ShapeError::Cancelled) if cancel.is_cancelled() => {
                info!(completed = index, total = files.len(), "batch cancelled");
                return Err(ShapeError::Cancelled);
            }
            Err(ShapeError::Cancelled) => {
                let secs = settings.deadline_secs.unwrap_or_default();
                warn!(file = %file.name, secs, "file timed out");
                FileStatus::Error(format!("Timed out after {secs} s."))
            }
            Err(err) => {
                warn!(file = %file.name, error = %err, "file failed");
                FileStatus::Error(err.to_string())
            }
        };
        on_status(index, &statuses[index]);
    }

    let failed = statuses.iter().filter(|s| matches!(s, FileStatus::Error(_))).count();
    info!(files = files.len(), failed, "batch finished");
    Ok(statuses)
}
