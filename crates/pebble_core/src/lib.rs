pub mod aggregate;
pub mod batch;
pub mod builder;
pub mod cancel;
pub mod encode;
pub mod error;
pub mod intersect;
pub mod level_graph;
pub mod measure;
pub mod mesh;
pub mod params;
pub mod reeb;
pub mod region;
pub mod saver;
pub mod spheres;
pub mod stability;
pub mod sweep;
/// The `pebble_core` crate computes level-set shape descriptors of closed triangle meshes.
/// Concentric spheres around an interior center cut the surface into bands; the bands
/// form a level graph whose stable and unstable regions are counted and contracted.
///
/// Key components:
/// - **Geometry**: `mesh` (half-edge adjacency), `spheres` (radii), `intersect` (per-face arcs).
/// - **Graphs**: `region` and `builder` (parallel per-face build and merge), `level_graph`, `reeb`.
/// - **Analysis**: `stability` (S/U counts), `encode` (Reeb and Morse codes), `aggregate`.
/// - **Driving**: `params`, `sweep` (stepped runner), `batch`, with `traits::Saver` receiving results.
pub mod traits;
