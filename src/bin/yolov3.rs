/// YOLOv3 检测入口
///
/// 流程:
/// 1. 延迟初始化会话 (按需下载标签/字体/模型, 带进度)
/// 2. 静态图片: 同步检测并渲染
/// 3. 帧目录: 后台检测线程 + 单槽准入 (忙时丢帧)
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use yolov3_rs::download::DownloadProgress;
use yolov3_rs::gate::DetectWorker;
use yolov3_rs::source::{FrameSource, ImageDirSource, StaticImages};
use yolov3_rs::{gen_time_string, Args, YoloSession};

fn main() -> Result<()> {
    let args = Args::parse();
    if !(args.conf > 0.0 && args.conf < 1.0) {
        bail!("--conf must be in (0, 1), got {}", args.conf);
    }

    let mut session = YoloSession::new(args.version, args.model.clone(), args.conf);

    println!("Please wait...");
    let mut last_percent = u64::MAX;
    session.init(|p: &DownloadProgress| match p.total {
        Some(total) if total > 0 => {
            let percent = p.received * 100 / total;
            if percent != last_percent {
                last_percent = percent;
                println!(
                    "{} of {} bytes downloaded ({}%)",
                    p.received, total, percent
                );
            }
        }
        _ => {
            if p.received % (1024 * 1024) < 64 * 1024 {
                println!("{} bytes downloaded.", p.received);
            }
        }
    })?;
    println!("✅ 检测模型加载成功 ({:?}, conf {})", args.version, args.conf);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let is_frame_dir = args.source.len() == 1 && args.source[0].is_dir();
    if is_frame_dir {
        run_frame_sequence(session, &args.source[0], &args.output, args.profile)
    } else {
        run_static_images(session, &args.source, &args.output, args.profile)
    }
}

fn run_static_images(
    mut session: YoloSession,
    paths: &[PathBuf],
    output: &PathBuf,
    profile: bool,
) -> Result<()> {
    let mut source = StaticImages::new(paths.to_vec());
    let mut index = 0usize;
    while let Some(frame) = source.next_frame() {
        let mut image = frame.to_rgb8();
        let report = session.detect_and_render(&mut image)?;
        println!("Detected in {} milliseconds.", report.elapsed_ms);
        if profile {
            println!("[Frame {}]: {} boxes", index, report.detections);
        }
        save_annotated(&image, output)?;
        index += 1;
    }
    Ok(())
}

fn run_frame_sequence(
    session: YoloSession,
    dir: &PathBuf,
    output: &PathBuf,
    profile: bool,
) -> Result<()> {
    let mut source = ImageDirSource::open(dir)?;
    println!("🔍 帧序列检测启动: {} ({} 帧)", dir.display(), source.remaining());

    let worker = DetectWorker::spawn(session);
    let mut offered = 0u64;
    let mut saved = 0u64;
    while let Some(frame) = source.next_frame() {
        if worker.offer(frame.to_rgb8()) {
            offered += 1;
        }
        // drain completed passes without blocking the feed loop
        for outcome in worker.results().try_iter() {
            saved += drain_one(outcome, output, profile)?;
        }
    }

    let dropped = worker.dropped();
    for outcome in worker.finish().try_iter() {
        saved += drain_one(outcome, output, profile)?;
    }

    println!(
        "✅ 处理完成: {} 帧检测, {} 帧丢弃, {} 帧保存",
        offered, dropped, saved
    );
    Ok(())
}

fn drain_one(
    outcome: Result<yolov3_rs::gate::WorkerResult>,
    output: &PathBuf,
    profile: bool,
) -> Result<u64> {
    match outcome {
        Ok(result) => {
            println!("Detected in {} milliseconds.", result.report.elapsed_ms);
            if profile {
                println!("[Worker]: {} boxes", result.report.detections);
            }
            save_annotated(&result.image, output)?;
            Ok(1)
        }
        Err(e) => {
            eprintln!("❌ 检测失败: {e:#}");
            Ok(0)
        }
    }
}

fn save_annotated(image: &image::RgbImage, output: &PathBuf) -> Result<()> {
    let path = output.join(format!("det_{}.png", gen_time_string("")));
    image
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    Ok(())
}
