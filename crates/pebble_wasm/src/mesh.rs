//! Mesh input and one-shot measurement bindings.

use js_sys::{Float64Array, Uint32Array};
use pebble_core::measure::MeshMeasurements;
use pebble_core::mesh::{MeshData, TriangleMesh};
use pebble_core::params::Parameters;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn mesh_from_js(mesh_val: JsValue) -> Result<TriangleMesh, JsValue> {
    let data: MeshData =
        from_value(mesh_val).map_err(|e| JsValue::from_str(&format!("Invalid mesh data: {}", e)))?;
    TriangleMesh::from_data(&data).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Flat buffers straight from a three.js style geometry: `xyz` triples and
/// triangle index triples.
fn mesh_from_buffers(positions: &Float64Array, indices: &Uint32Array) -> Result<TriangleMesh, JsValue> {
    let positions = positions.to_vec();
    let indices = indices.to_vec();
    if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
        return Err(JsValue::from_str("Buffer lengths must be multiples of 3"));
    }
    let data = MeshData {
        vertices: positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
        faces: indices.chunks_exact(3).map(|f| [f[0], f[1], f[2]]).collect(),
    };
    TriangleMesh::from_data(&data).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn measure_mesh(positions: &Float64Array, indices: &Uint32Array) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let mesh = mesh_from_buffers(positions, indices)?;
    let measurements = MeshMeasurements::of(&mesh);

    to_value(&measurements).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Parses `id;volume%;count;levels;area%;aggregation` rows into a parameter tree.
#[wasm_bindgen]
pub fn parse_parameter_rows(text: &str) -> Result<JsValue, JsValue> {
    let parameters = Parameters::parse_rows(text).map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_value(&parameters).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
