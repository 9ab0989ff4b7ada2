//! Hugging Face `transformers` text-generation pipeline, embedded with PyO3.
//!
//! Requires a Python environment with `transformers` (and a torch backend)
//! importable by the embedded interpreter.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::local_pipeline::TextGenerator;
use crate::error::{LlmError, Result};

/// A loaded `transformers.pipeline("text-generation", model=...)`
pub struct HfPipeline {
    pipeline: Py<PyAny>,
}

impl HfPipeline {
    /// Import transformers and build the pipeline. Downloads the model on
    /// first use, so this can take a long time.
    pub fn load(model: &str) -> Result<Self> {
        Python::with_gil(|py| -> PyResult<Self> {
            let transformers = py.import("transformers")?;

            let kwargs = PyDict::new(py);
            kwargs.set_item("model", model)?;
            let pipeline =
                transformers.call_method("pipeline", ("text-generation",), Some(&kwargs))?;

            Ok(Self {
                pipeline: pipeline.unbind(),
            })
        })
        .map_err(|e| LlmError::Pipeline(format!("Failed to load {}: {}", model, e)))
    }
}

impl TextGenerator for HfPipeline {
    fn generate(&self, prompt: &str, max_length: u32, truncation: bool) -> Result<String> {
        Python::with_gil(|py| -> PyResult<String> {
            let kwargs = PyDict::new(py);
            kwargs.set_item("max_length", max_length)?;
            kwargs.set_item("truncation", truncation)?;

            // [{"generated_text": "..."}]
            let output = self.pipeline.bind(py).call((prompt,), Some(&kwargs))?;
            output.get_item(0)?.get_item("generated_text")?.extract()
        })
        .map_err(|e| LlmError::Pipeline(e.to_string()))
    }
}
