//! Browser bindings for `pebble_core`.

mod mesh;
mod sweep_runner;

pub use mesh::{measure_mesh, parse_parameter_rows};
pub use sweep_runner::WasmSweepRunner;
