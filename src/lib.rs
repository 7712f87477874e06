// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // CLI 配置参数
pub mod download; // 模型文件下载管理
pub mod engine; // 推理引擎接口 (ONNX Runtime)
pub mod error;
pub mod gate; // 单槽准入控制 + 后台检测线程
pub mod labels;
pub mod models; // 模型目录与 Region 后处理
pub mod render; // 检测框渲染
pub mod session; // 检测会话 (延迟初始化)
pub mod source; // 帧输入源

pub use crate::config::Args;
pub use crate::download::{DownloadProgress, FileDownloadManager};
pub use crate::engine::{InferenceEngine, LayerKind, LayerOutput};
pub use crate::error::DetectError;
pub use crate::gate::{BusyGate, DetectWorker};
pub use crate::labels::LabelTable;
pub use crate::models::{RegionConfig, RegionPostprocessor, YoloVersion};
pub use crate::session::{DetectReport, YoloSession};

pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}

/// An axis-aligned rectangle in pixel coordinates.
///
/// Coordinates may be negative: boxes near the image border can decode
/// to a top-left corner outside the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

/// One detected object: class id, class score and pixel-space box.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    class_id: usize,
    confidence: f32,
    rect: Rect,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, rect: Rect) -> Self {
        Self {
            class_id,
            confidence,
            rect,
        }
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}
