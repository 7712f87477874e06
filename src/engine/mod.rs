/// 推理引擎接口
///
/// The forward pass lives entirely inside the inference library; the rest
/// of the crate only sees `LayerOutput` tensors through this boundary.
pub mod ort_backend;

use anyhow::Result;
use image::DynamicImage;
use ndarray::Array2;

pub use ort_backend::OrtEngine;

/// Declared layout of an output layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Darknet Region layout: rows are candidates, columns are
    /// [cx, cy, w, h, objectness, class scores..], coordinates normalized
    /// to the image dimensions.
    Region,
    /// Anything the post-processor does not understand.
    Unknown(String),
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Region => write!(f, "Region"),
            LayerKind::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Raw result of one output layer for one forward pass.
///
/// The tensor is read-only from the post-processor's point of view and is
/// only meaningful together with the dimensions of the image that produced
/// it (the caller must pass both to the post-processor atomically).
#[derive(Debug, Clone)]
pub struct LayerOutput {
    pub name: String,
    pub kind: LayerKind,
    pub tensor: Array2<f32>,
}

/// The in-process boundary to the deep-learning library.
///
/// `Send` so a session owning an engine can move to a worker thread.
pub trait InferenceEngine: Send {
    /// Network input size (width, height).
    fn input_size(&self) -> (u32, u32);

    /// Runs one forward pass and returns one tensor per output layer,
    /// in layer-iteration order.
    fn forward(&mut self, image: &DynamicImage) -> Result<Vec<LayerOutput>>;
}
