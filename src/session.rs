//! 检测会话 (Detection session)
//!
//! Owns the lazily-built engine, label table and renderer. Replaces the
//! original's nullable global detector handle with explicit state: `init`
//! is idempotent and everything downstream fails cleanly until it ran.

use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, RgbImage};

use crate::download::{DownloadProgress, FileDownloadManager};
use crate::engine::{InferenceEngine, OrtEngine};
use crate::labels::LabelTable;
use crate::models::{RegionConfig, RegionPostprocessor, YoloVersion};
use crate::render::Renderer;
use crate::Detection;

const FONT_URL: &str = "https://ultralytics.com/assets/Arial.ttf";

/// Outcome of one detect-and-render pass.
#[derive(Debug, Clone, Copy)]
pub struct DetectReport {
    pub detections: usize,
    pub elapsed_ms: u128,
}

pub struct YoloSession {
    version: YoloVersion,
    model: Option<String>,
    postprocessor: RegionPostprocessor,
    engine: Option<Box<dyn InferenceEngine>>,
    labels: Option<LabelTable>,
    renderer: Option<Renderer>,
}

impl YoloSession {
    /// `model` is a path or URL to a converted ONNX model. Nothing is
    /// loaded or downloaded until `init`.
    pub fn new(version: YoloVersion, model: Option<String>, conf_threshold: f32) -> Self {
        Self {
            version,
            model,
            postprocessor: RegionPostprocessor::new(RegionConfig { conf_threshold }),
            engine: None,
            labels: None,
            renderer: None,
        }
    }

    /// Builds a session from pre-constructed parts (embedding a custom
    /// engine, headless rendering in tests).
    pub fn with_parts(
        engine: Box<dyn InferenceEngine>,
        labels: LabelTable,
        renderer: Option<Renderer>,
        conf_threshold: f32,
    ) -> Self {
        Self {
            version: YoloVersion::V3,
            model: None,
            postprocessor: RegionPostprocessor::new(RegionConfig { conf_threshold }),
            engine: Some(engine),
            labels: Some(labels),
            renderer,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub fn conf_threshold(&self) -> f32 {
        self.postprocessor.conf_threshold()
    }

    /// Downloads labels, font and (when given as a URL) the model, then
    /// builds the engine. A second call is a no-op.
    pub fn init(&mut self, mut progress: impl FnMut(&DownloadProgress)) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }

        let model = self.model.clone().ok_or_else(|| {
            anyhow!(
                "no model supplied; convert the darknet release to ONNX first \
                 (weights: {}, cfg: {}) and pass it with --model",
                self.version.weights_url(),
                self.version.cfg_url()
            )
        })?;

        let mut manager = FileDownloadManager::new();
        manager.add_file(self.version.labels_url(), self.version.folder_name());
        manager.add_file(FONT_URL, "fonts");
        let model_is_url = model.starts_with("http://") || model.starts_with("https://");
        if model_is_url {
            manager.add_file(&model, self.version.folder_name());
        }
        let paths = manager.download(&mut progress)?;

        let labels = LabelTable::from_file(&paths[0])?;
        let font_bytes = std::fs::read(&paths[1])
            .with_context(|| format!("failed to read font {}", paths[1].display()))?;
        let renderer = Renderer::new(font_bytes)?;

        let model_path = if model_is_url {
            paths[2].clone()
        } else {
            std::path::PathBuf::from(&model)
        };
        let engine = OrtEngine::load(&model_path, self.version.input_size())?;

        self.labels = Some(labels);
        self.renderer = Some(renderer);
        self.engine = Some(Box::new(engine));
        Ok(())
    }

    /// One forward pass plus post-processing. Boxes are decoded against
    /// the dimensions of `image` itself, never a stale pair.
    pub fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| anyhow!("session not initialized"))?;
        let labels = self
            .labels
            .as_ref()
            .ok_or_else(|| anyhow!("session not initialized"))?;

        let outputs = engine.forward(image)?;
        let detections =
            self.postprocessor
                .postprocess(&outputs, image.width(), image.height(), labels)?;
        Ok(detections)
    }

    /// Detects and draws in place, reporting count and wall time.
    pub fn detect_and_render(&mut self, image: &mut RgbImage) -> Result<DetectReport> {
        let start = Instant::now();
        let frame = DynamicImage::ImageRgb8(image.clone());
        let detections = self.detect(&frame)?;

        if let Some(renderer) = &self.renderer {
            let labels = self.labels.as_ref().expect("initialized with renderer");
            renderer.draw(image, &detections, labels)?;
        }

        Ok(DetectReport {
            detections: detections.len(),
            elapsed_ms: start.elapsed().as_millis(),
        })
    }
}
