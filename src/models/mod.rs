// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 模型目录与后处理
//
// region.rs holds the Region-layout post-processor; this module maps the
// YOLOv3 family members to their published artifacts and defaults.

use clap::ValueEnum;

pub mod region;

pub use region::{RegionConfig, RegionPostprocessor};

/// YOLOv3 family member (the original darknet releases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YoloVersion {
    V3,
    V3Spp,
    V3Tiny,
}

impl YoloVersion {
    /// Published darknet weights for this version.
    pub fn weights_url(&self) -> &'static str {
        match self {
            YoloVersion::V3 => "https://pjreddie.com/media/files/yolov3.weights",
            YoloVersion::V3Spp => "https://pjreddie.com/media/files/yolov3-spp.weights",
            YoloVersion::V3Tiny => "https://pjreddie.com/media/files/yolov3-tiny.weights",
        }
    }

    /// Published darknet network config for this version.
    pub fn cfg_url(&self) -> &'static str {
        match self {
            YoloVersion::V3 => "https://github.com/pjreddie/darknet/raw/master/cfg/yolov3.cfg",
            YoloVersion::V3Spp => {
                "https://github.com/pjreddie/darknet/raw/master/cfg/yolov3-spp.cfg"
            }
            YoloVersion::V3Tiny => {
                "https://github.com/pjreddie/darknet/raw/master/cfg/yolov3-tiny.cfg"
            }
        }
    }

    /// COCO class names, shared by the whole family.
    pub fn labels_url(&self) -> &'static str {
        "https://github.com/pjreddie/darknet/raw/master/data/coco.names"
    }

    /// Fixed network input size.
    pub fn input_size(&self) -> (u32, u32) {
        (416, 416)
    }

    /// 获取模型推荐的置信度阈值
    pub fn default_conf_threshold(&self) -> f32 {
        0.5
    }

    /// Cache subfolder for downloaded artifacts.
    pub fn folder_name(&self) -> &'static str {
        match self {
            YoloVersion::V3 => "yolo_v3",
            YoloVersion::V3Spp => "yolo_v3_spp",
            YoloVersion::V3Tiny => "yolo_v3_tiny",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_defaults() {
        assert_eq!(YoloVersion::V3Tiny.input_size(), (416, 416));
        assert_eq!(YoloVersion::V3.default_conf_threshold(), 0.5);
        assert!(YoloVersion::V3Spp.weights_url().contains("spp"));
    }
}
