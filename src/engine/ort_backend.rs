// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime 推理后端
//
// Mirrors the original OpenCV DNN usage: resize to the network input,
// scale 1/255, RGB channel order, then read every unconnected output
// layer after one forward pass.

use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array, Array2, Axis, IxDyn};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};

use super::{InferenceEngine, LayerKind, LayerOutput};

pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    width: u32,
    height: u32,
}

impl OrtEngine {
    /// Builds a CPU session from an ONNX model file.
    ///
    /// `input_size` is the fixed network input (the darknet YOLOv3 family
    /// uses 416x416); boxes come back normalized, so the original image
    /// dimensions stay with the caller.
    pub fn load(model: &Path, input_size: (u32, u32)) -> Result<Self> {
        // build ort engine
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .with_intra_threads(4)
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .commit_from_file(model)
            .with_context(|| format!("failed to load model {}", model.display()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .context("model has no inputs")?;
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        if output_names.is_empty() {
            anyhow::bail!("model has no outputs");
        }

        Ok(Self {
            session,
            input_name,
            output_names,
            width: input_size.0,
            height: input_size.1,
        })
    }

    /// 图片 → NCHW f32 张量 (1/255 缩放, 直接 resize, 无 letterbox)
    fn blob_from_image(&self, image: &DynamicImage) -> Array<f32, IxDyn> {
        let resized = image.resize_exact(
            self.width,
            self.height,
            image::imageops::FilterType::Triangle,
        );
        let rgb = resized.to_rgb8();

        let mut blob =
            Array::zeros((1, 3, self.height as usize, self.width as usize)).into_dyn();
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            blob[[0, 0, y as usize, x as usize]] = (r as f32) / 255.0;
            blob[[0, 1, y as usize, x as usize]] = (g as f32) / 255.0;
            blob[[0, 2, y as usize, x as usize]] = (b as f32) / 255.0;
        }
        blob
    }

    /// Squeezes leading batch dimensions of size 1 and classifies the
    /// layout: a 2D tensor wide enough for box + objectness + classes is
    /// Region, everything else is Unknown (rejected downstream).
    fn to_layer_output(name: &str, tensor: Array<f32, IxDyn>) -> LayerOutput {
        let mut t = tensor;
        while t.ndim() > 2 && t.shape()[0] == 1 {
            t = t.index_axis(Axis(0), 0).to_owned();
        }

        if t.ndim() == 2 && t.shape()[1] >= 6 {
            let tensor = t
                .into_dimensionality::<ndarray::Ix2>()
                .expect("checked 2D shape");
            LayerOutput {
                name: name.to_string(),
                kind: LayerKind::Region,
                tensor,
            }
        } else {
            let shape = format!("shape {:?}", t.shape());
            let flat = t.len();
            let tensor = Array2::from_shape_vec((1, flat), t.into_iter().collect())
                .expect("flatten to one row");
            LayerOutput {
                name: name.to_string(),
                kind: LayerKind::Unknown(shape),
                tensor,
            }
        }
    }
}

impl InferenceEngine for OrtEngine {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn forward(&mut self, image: &DynamicImage) -> Result<Vec<LayerOutput>> {
        let blob = self.blob_from_image(image);

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(blob.view())?])?;

        let mut layers = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let raw = outputs[name.as_str()]
                .try_extract_array::<f32>()
                .with_context(|| format!("output '{}' is not an f32 tensor", name))?
                .to_owned();
            layers.push(Self::to_layer_output(name, raw));
        }
        Ok(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squeeze_region_layout() {
        let t = Array::zeros((1, 507, 85)).into_dyn();
        let out = OrtEngine::to_layer_output("yolo_16", t);
        assert_eq!(out.kind, LayerKind::Region);
        assert_eq!(out.tensor.shape(), &[507, 85]);
    }

    #[test]
    fn test_non_region_layout_flagged_unknown() {
        let t = Array::zeros((1, 255, 13, 13)).into_dyn();
        let out = OrtEngine::to_layer_output("conv_81", t);
        assert!(matches!(out.kind, LayerKind::Unknown(_)));
    }

    #[test]
    fn test_narrow_tensor_flagged_unknown() {
        // 4 columns cannot hold box + objectness + classes
        let t = Array::zeros((10, 4)).into_dyn();
        let out = OrtEngine::to_layer_output("boxes", t);
        assert!(matches!(out.kind, LayerKind::Unknown(_)));
    }
}
