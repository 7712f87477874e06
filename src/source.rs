//! 帧输入源 (Frame sources)
//!
//! Capability interfaces picked at composition time: a static image list
//! for one-shot detection, a sorted frame directory standing in for the
//! camera/video pipeline. Camera capture itself is an external
//! collaborator; anything that yields frames can implement `FrameSource`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;

/// A pull-based frame supplier. `None` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<DynamicImage>;
}

/// Explicit list of image files, decoded one by one.
pub struct StaticImages {
    paths: VecDeque<PathBuf>,
}

impl StaticImages {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for StaticImages {
    fn next_frame(&mut self) -> Option<DynamicImage> {
        while let Some(path) = self.paths.pop_front() {
            match image::open(&path) {
                Ok(img) => return Some(img),
                Err(e) => {
                    eprintln!("⚠️ 无法解码 {}: {}", path.display(), e);
                }
            }
        }
        None
    }
}

/// Frame sequence from a directory, sorted by file name. Stands in for a
/// live capture source when replaying recorded frames.
pub struct ImageDirSource {
    inner: StaticImages,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && is_image_path(p))
            .collect();
        paths.sort();
        Ok(Self {
            inner: StaticImages::new(paths),
        })
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Option<DynamicImage> {
        self.inner.next_frame()
    }
}

fn is_image_path(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png" | "bmp" | "webp")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("frames/000001.JPG")));
        assert!(is_image_path(Path::new("dog416.png")));
        assert!(!is_image_path(Path::new("labels/coco.names")));
        assert!(!is_image_path(Path::new("model.onnx")));
    }

    #[test]
    fn test_static_images_skips_unreadable() {
        let mut src = StaticImages::new(vec![PathBuf::from("/definitely/not/here.png")]);
        assert!(src.next_frame().is_none());
    }

    #[test]
    fn test_dir_source_sorted_order() {
        let root = std::env::temp_dir().join(format!("yolo-src-test-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        // two tiny valid frames, written out of order
        let img = image::RgbImage::new(2, 2);
        img.save(root.join("b.png")).unwrap();
        img.save(root.join("a.png")).unwrap();
        std::fs::write(root.join("notes.txt"), "ignored").unwrap();

        let mut src = ImageDirSource::open(&root).unwrap();
        assert_eq!(src.remaining(), 2);
        assert!(src.next_frame().is_some());
        assert!(src.next_frame().is_some());
        assert!(src.next_frame().is_none());

        std::fs::remove_dir_all(&root).ok();
    }
}
