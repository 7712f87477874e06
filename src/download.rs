//! 模型文件下载管理 (File download manager)
//!
//! Fetches model artifacts (labels, fonts, converted models) over HTTP,
//! reports progress through a callback and caches everything under the
//! user cache directory. Already-cached files are never re-downloaded.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Progress of one in-flight download. `total` is `None` when the server
/// does not send a Content-Length.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub url: String,
    pub received: u64,
    pub total: Option<u64>,
}

struct ManagedFile {
    url: String,
    local: PathBuf,
}

pub struct FileDownloadManager {
    root: PathBuf,
    files: Vec<ManagedFile>,
}

impl FileDownloadManager {
    /// Cache root: `<user cache dir>/yolov3-rs`.
    pub fn new() -> Self {
        let base = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::with_root(base.join("yolov3-rs"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            files: Vec::new(),
        }
    }

    /// Queues a file; the local name is the last segment of the URL.
    pub fn add_file(&mut self, url: &str, folder: &str) {
        let name = Self::file_name(url);
        let local = self.root.join(folder).join(name);
        self.files.push(ManagedFile {
            url: url.to_string(),
            local,
        });
    }

    /// Local path the i-th queued file will land at.
    pub fn local_path(&self, index: usize) -> &Path {
        &self.files[index].local
    }

    /// Downloads every queued file that is not cached yet, invoking
    /// `progress` as bytes arrive. Returns the local paths in queue order.
    pub fn download(&self, mut progress: impl FnMut(&DownloadProgress)) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.files.len());
        for file in &self.files {
            if !file.local.exists() {
                Self::fetch(&file.url, &file.local, &mut progress)?;
            }
            paths.push(file.local.clone());
        }
        Ok(paths)
    }

    fn fetch(url: &str, dest: &Path, progress: &mut impl FnMut(&DownloadProgress)) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let resp = ureq::get(url)
            .call()
            .with_context(|| format!("failed to fetch {}", url))?;
        let total: Option<u64> = resp
            .header("Content-Length")
            .and_then(|v| v.parse().ok());

        // stream into a .part file, rename on completion
        let part = dest.with_file_name(format!("{}.part", Self::file_name(url)));
        let mut out = File::create(&part)
            .with_context(|| format!("failed to create {}", part.display()))?;
        let mut reader = resp.into_reader();
        let mut buf = [0u8; 64 * 1024];
        let mut received: u64 = 0;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            received += n as u64;
            progress(&DownloadProgress {
                url: url.to_string(),
                received,
                total,
            });
        }
        out.flush()?;
        drop(out);
        fs::rename(&part, dest)
            .with_context(|| format!("failed to move {} into place", part.display()))?;
        Ok(())
    }

    fn file_name(url: &str) -> &str {
        url.rsplit('/').next().unwrap_or(url)
    }
}

impl Default for FileDownloadManager {
    fn default() -> Self {
        Self::new()
    }
}
