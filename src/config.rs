use std::path::PathBuf;

use clap::Parser;

use crate::models::YoloVersion;

/// YOLOv3 检测命令行参数
#[derive(Parser, Clone, Debug)]
#[command(about = "YOLOv3 region detection over images and frame sequences")]
pub struct Args {
    /// ONNX model: local path or URL (downloaded and cached).
    #[arg(long)]
    pub model: Option<String>,

    /// YOLOv3 family member; sets input size and artifact URLs.
    #[arg(long, value_enum, default_value = "v3-tiny")]
    pub version: YoloVersion,

    /// Image files to detect on, or a single directory of frames.
    #[arg(long, required = true, num_args = 1..)]
    pub source: Vec<PathBuf>,

    /// Confidence threshold in (0, 1).
    #[arg(long, default_value_t = 0.5)]
    pub conf: f32,

    /// Directory annotated frames are written to.
    #[arg(long, default_value = "runs")]
    pub output: PathBuf,

    /// Print per-stage timings.
    #[arg(long)]
    pub profile: bool,
}
