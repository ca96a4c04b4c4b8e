//! Stepped parameter sweep runner.

use crate::mesh::mesh_from_js;
use pebble_core::cancel::Never;
use pebble_core::params::Parameters;
use pebble_core::saver::RecordingSaver;
use pebble_core::sweep::SweepRunner;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// WASM-exported runner for a parameter sweep.
/// Each batch processes whole (center, level count) configurations, so the UI can
/// report progress between them.
#[wasm_bindgen]
pub struct WasmSweepRunner {
    runner: Option<SweepRunner<RecordingSaver>>,
}

#[wasm_bindgen]
impl WasmSweepRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(mesh_val: JsValue, parameters_val: JsValue) -> Result<WasmSweepRunner, JsValue> {
        console_error_panic_hook::set_once();

        let mesh = mesh_from_js(mesh_val)?;
        let parameters: Parameters = from_value(parameters_val)
            .map_err(|e| JsValue::from_str(&format!("Invalid sweep parameters: {}", e)))?;

        let runner = SweepRunner::new(&mesh, parameters, RecordingSaver::new())
            .map_err(|e| JsValue::from_str(&format!("Sweep init failed: {}", e)))?;

        Ok(WasmSweepRunner { runner: Some(runner) })
    }

    pub fn is_done(&self) -> bool {
        self.runner.as_ref().map_or(true, |runner| runner.is_done())
    }

    /// Run a batch of configurations and return progress.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let progress = runner
            .run_steps(batch_size as usize, &Never)
            .map_err(|e| JsValue::from_str(&format!("Sweep step failed: {}", e)))?;

        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        to_value(&runner.progress()).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Takes the results collected so far. Empty until the last step has run,
    /// and after a failed step.
    pub fn drain_results(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let results = runner.saver_mut().take();

        to_value(&results).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get every remaining result and release the runner.
    pub fn get_result(&mut self) -> Result<JsValue, JsValue> {
        let runner = self
            .runner
            .take()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;

        let results = runner.into_saver();

        to_value(&results).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
