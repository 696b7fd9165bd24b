//! Kokoro TTS backend using PyO3 to embed Python.
//!
//! Drives the `kokoro_onnx` package: the model is loaded once and every chunk
//! goes through `Kokoro.create`, which returns a numpy sample array and the
//! sample rate.

use super::{RawAudio, SpeechEngine};
use crate::error::SynthesisError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;
use std::sync::Arc;

/// Kokoro backend holding the loaded Python model object.
pub struct KokoroBackend {
    model: Arc<Py<PyAny>>,
    speed: f32,
    lang: String,
}

impl KokoroBackend {
    /// Load the model.
    ///
    /// # Arguments
    /// * `model` - Path to the Kokoro ONNX model
    /// * `voices` - Path to the voices bundle
    /// * `cpu_only` - Replace the inference session with a CPU-only one
    pub fn new(model: &Path, voices: &Path, speed: f32, lang: &str, cpu_only: bool) -> Result<Self> {
        if !model.exists() {
            anyhow::bail!("Kokoro model not found: {}", model.display());
        }
        if !voices.exists() {
            anyhow::bail!("Kokoro voices file not found: {}", voices.display());
        }

        pyo3::prepare_freethreaded_python();

        let model_path = model.to_string_lossy().into_owned();
        let voices_path = voices.to_string_lossy().into_owned();

        let model = Python::with_gil(|py| -> PyResult<Py<PyAny>> {
            let kokoro_class = py.import("kokoro_onnx")?.getattr("Kokoro")?;
            let kokoro = kokoro_class.call1((model_path.as_str(), voices_path.as_str()))?;

            if cpu_only {
                let ort = py.import("onnxruntime")?;
                let kwargs = PyDict::new(py);
                kwargs.set_item("providers", vec!["CPUExecutionProvider"])?;
                let session =
                    ort.call_method("InferenceSession", (model_path.as_str(),), Some(&kwargs))?;
                kokoro.setattr("sess", session)?;
            }

            Ok(kokoro.unbind())
        })
        .context("Failed to load Kokoro (is the kokoro_onnx Python package installed?)")?;

        log::info!("Kokoro model loaded from {}", model_path);

        Ok(Self {
            model: Arc::new(model),
            speed,
            lang: lang.to_string(),
        })
    }

    fn generate_sync(
        model: &Py<PyAny>,
        text: &str,
        voice: &str,
        speed: f32,
        lang: &str,
    ) -> PyResult<RawAudio> {
        Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            kwargs.set_item("voice", voice)?;
            kwargs.set_item("speed", speed)?;
            kwargs.set_item("lang", lang)?;

            let result = model.bind(py).call_method("create", (text,), Some(&kwargs))?;
            let (samples, sample_rate): (Bound<'_, PyAny>, u32) = result.extract()?;

            // numpy array -> list of floats
            let samples: Vec<f32> = samples.call_method0("tolist")?.extract()?;

            Ok(RawAudio {
                samples,
                sample_rate,
            })
        })
    }
}

#[async_trait]
impl SpeechEngine for KokoroBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<RawAudio, SynthesisError> {
        // Clone data for the blocking task
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        let voice = voice.to_string();
        let speed = self.speed;
        let lang = self.lang.clone();

        // Run in a blocking task to not block the tokio runtime
        tokio::task::spawn_blocking(move || {
            Self::generate_sync(&model, &text, &voice, speed, &lang)
                .map_err(|e| SynthesisError::Engine(e.to_string()))
        })
        .await
        .map_err(|e| SynthesisError::Engine(format!("Task join error: {}", e)))?
    }

    fn name(&self) -> &str {
        "kokoro"
    }
}
