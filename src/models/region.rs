// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Region 后处理模块
//
// Decodes the darknet Region output layout (YOLOv3 family): each row is one
// candidate, columns are [cx, cy, w, h, objectness, class scores..], box
// coordinates normalized to the image dimensions. No NMS is applied here:
// the pass reproduces the reference behavior, so overlapping boxes for one
// physical object are all emitted.

use ndarray::Axis;

use crate::engine::{LayerKind, LayerOutput};
use crate::error::DetectError;
use crate::labels::LabelTable;
use crate::{Detection, Rect};

/// Column index of the first class score.
const CLASS_OFFSET: usize = 5;
/// Box + objectness + at least one class.
const MIN_COLS: usize = CLASS_OFFSET + 1;

/// Region 后处理配置
#[derive(Debug, Clone, Copy)]
pub struct RegionConfig {
    pub conf_threshold: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
        }
    }
}

/// Region 后处理器
///
/// Pure function of its inputs; no shared state, safe to run concurrently
/// on independent frames.
pub struct RegionPostprocessor {
    config: RegionConfig,
}

impl RegionPostprocessor {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    pub fn conf_threshold(&self) -> f32 {
        self.config.conf_threshold
    }

    pub fn set_conf_threshold(&mut self, val: f32) {
        self.config.conf_threshold = val;
    }

    /// 后处理主函数
    ///
    /// Consumes the raw output tensors of one forward pass and the pixel
    /// dimensions of the image that produced them (the pair must come from
    /// the same frame, or the decoded boxes are meaningless). Detections
    /// are ordered by layer-iteration order, then row order.
    pub fn postprocess(
        &self,
        outputs: &[LayerOutput],
        image_width: u32,
        image_height: u32,
        labels: &LabelTable,
    ) -> Result<Vec<Detection>, DetectError> {
        let mut detections = Vec::new();
        for layer in outputs {
            self.decode_layer(layer, image_width, image_height, labels, &mut detections)?;
        }
        Ok(detections)
    }

    fn decode_layer(
        &self,
        layer: &LayerOutput,
        image_width: u32,
        image_height: u32,
        labels: &LabelTable,
        detections: &mut Vec<Detection>,
    ) -> Result<(), DetectError> {
        if layer.kind != LayerKind::Region {
            return Err(DetectError::UnsupportedLayerKind(layer.kind.to_string()));
        }

        let cols = layer.tensor.ncols();
        if cols < MIN_COLS {
            return Err(DetectError::MalformedTensor {
                layer: layer.name.clone(),
                cols,
                min: MIN_COLS,
            });
        }

        let w_img = image_width as f32;
        let h_img = image_height as f32;

        for row in layer.tensor.axis_iter(Axis(0)) {
            // argmax over the class scores; ties go to the lowest index
            let (class_id, &confidence) = row
                .slice(ndarray::s![CLASS_OFFSET..])
                .into_iter()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
                .expect("at least one class column");

            if confidence <= self.config.conf_threshold {
                continue;
            }

            // every accepted class id must resolve to a label
            labels.get(class_id)?;

            // decode in f32, truncate per field
            let cx = row[0] * w_img;
            let cy = row[1] * h_img;
            let w = row[2] * w_img;
            let h = row[3] * h_img;
            let rect = Rect::new(
                (cx - w / 2.0) as i32,
                (cy - h / 2.0) as i32,
                w as i32,
                h as i32,
            );

            detections.push(Detection::new(class_id, confidence, rect));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn region_layer(name: &str, rows: &[Vec<f32>]) -> LayerOutput {
        let cols = rows[0].len();
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        LayerOutput {
            name: name.to_string(),
            kind: LayerKind::Region,
            tensor: Array2::from_shape_vec((rows.len(), cols), flat).unwrap(),
        }
    }

    fn labels3() -> LabelTable {
        LabelTable::parse("person\nbicycle\ncar")
    }

    #[test]
    fn test_single_row_argmax() {
        // class scores [0.1, 0.9, 0.2] -> class 1
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.1, 0.9, 0.2]],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id(), 1);
        assert_eq!(dets[0].confidence(), 0.9);
    }

    #[test]
    fn test_below_threshold_emits_nothing() {
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.1, 0.4, 0.2]],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_score_equal_to_threshold_excluded() {
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.5, 0.0, 0.0]],
        );
        let pp = RegionPostprocessor::new(RegionConfig { conf_threshold: 0.5 });
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_box_decode_truncates_per_field() {
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.0, 0.95, 0.0]],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        let rect = dets[0].rect();
        // 416*0.5 - (416*0.2)/2 = 166.4, 416*0.5 - (416*0.1)/2 = 187.2
        assert_eq!(rect.left(), 166);
        assert_eq!(rect.top(), 187);
        assert_eq!(rect.width(), 83);
        assert_eq!(rect.height(), 41);
    }

    #[test]
    fn test_equal_scores_across_rows_not_merged() {
        let layer = region_layer(
            "yolo_16",
            &[
                vec![0.25, 0.25, 0.1, 0.1, 0.0, 0.8, 0.0, 0.0],
                vec![0.75, 0.75, 0.1, 0.1, 0.0, 0.0, 0.0, 0.8],
            ],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id(), 0);
        assert_eq!(dets[1].class_id(), 2);
        assert_ne!(dets[0].rect(), dets[1].rect());
    }

    #[test]
    fn test_tie_goes_to_lowest_class_index() {
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.7, 0.7, 0.1]],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp.postprocess(&[layer], 416, 416, &labels3()).unwrap();
        assert_eq!(dets[0].class_id(), 0);
    }

    #[test]
    fn test_unsupported_layer_kind() {
        let mut layer = region_layer(
            "conv_81",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.1, 0.9, 0.2]],
        );
        layer.kind = LayerKind::Unknown("shape [1, 255, 13, 13]".to_string());
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let err = pp
            .postprocess(&[layer], 416, 416, &labels3())
            .unwrap_err();
        assert!(matches!(err, DetectError::UnsupportedLayerKind(_)));
    }

    #[test]
    fn test_malformed_tensor_rejected() {
        let layer = region_layer("yolo_16", &[vec![0.5, 0.5, 0.2, 0.1, 0.0]]);
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let err = pp
            .postprocess(&[layer], 416, 416, &labels3())
            .unwrap_err();
        assert!(matches!(
            err,
            DetectError::MalformedTensor { cols: 5, min: 6, .. }
        ));
    }

    #[test]
    fn test_missing_label_entry() {
        // class scores reach beyond the two loaded labels
        let layer = region_layer(
            "yolo_16",
            &[vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.1, 0.1, 0.9]],
        );
        let labels = LabelTable::parse("person\nbicycle");
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let err = pp.postprocess(&[layer], 416, 416, &labels).unwrap_err();
        assert_eq!(
            err,
            DetectError::EmptyLabelTable {
                class_id: 2,
                len: 2
            }
        );
    }

    #[test]
    fn test_layer_then_row_ordering() {
        let layer_a = region_layer(
            "yolo_16",
            &[
                vec![0.1, 0.1, 0.1, 0.1, 0.0, 0.9, 0.0, 0.0],
                vec![0.2, 0.2, 0.1, 0.1, 0.0, 0.0, 0.9, 0.0],
            ],
        );
        let layer_b = region_layer(
            "yolo_32",
            &[vec![0.3, 0.3, 0.1, 0.1, 0.0, 0.0, 0.0, 0.9]],
        );
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let dets = pp
            .postprocess(&[layer_a, layer_b], 416, 416, &labels3())
            .unwrap();
        let ids: Vec<usize> = dets.iter().map(|d| d.class_id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let rows = vec![
            vec![0.25, 0.25, 0.1, 0.1, 0.0, 0.8, 0.1, 0.0],
            vec![0.5, 0.5, 0.2, 0.1, 0.0, 0.0, 0.95, 0.0],
            vec![0.75, 0.75, 0.3, 0.3, 0.0, 0.1, 0.1, 0.6],
        ];
        let pp = RegionPostprocessor::new(RegionConfig::default());
        let a = pp
            .postprocess(&[region_layer("yolo_16", &rows)], 640, 480, &labels3())
            .unwrap();
        let b = pp
            .postprocess(&[region_layer("yolo_16", &rows)], 640, 480, &labels3())
            .unwrap();
        assert_eq!(a, b);
    }
}
