//! Per-run scratch directory.
//!
//! Every intermediate file of a run lives in one [`TempDir`] that is
//! removed when the workspace drops, on success and failure alike.
//! Artifacts worth keeping are moved out first.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use adreel_media::{move_into, MediaResult};
use adreel_models::RunId;

pub struct RunWorkspace {
    dir: TempDir,
    output_dir: PathBuf,
}

impl RunWorkspace {
    /// Create `work_root/adreel-<short id>-XXXX` and reserve `output_root/<run id>`.
    pub fn create(run_id: &RunId, work_root: &Path, output_root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(work_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("adreel-{}-", run_id.short()))
            .tempdir_in(work_root)?;
        debug!(path = %dir.path().display(), "Created run workspace");

        Ok(Self {
            dir,
            output_dir: output_root.join(run_id.as_str()),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn raw_clip_path(&self, order: usize) -> PathBuf {
        self.path().join(format!("segment_{:02}_raw.mp4", order))
    }

    pub fn assembled_path(&self) -> PathBuf {
        self.path().join("assembled.mp4")
    }

    pub fn voiceover_path(&self) -> PathBuf {
        self.path().join("voiceover.mp3")
    }

    pub fn final_path(&self) -> PathBuf {
        self.path().join("final.mp4")
    }

    pub fn poster_path(&self) -> PathBuf {
        self.path().join("poster.jpg")
    }

    /// Move `path` into the run's output directory, returning the new path.
    pub async fn keep(&self, path: &Path) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        move_into(path, &self.output_dir).await
    }

    /// Like [`keep`](Self::keep) but for artifacts that may be absent.
    pub async fn keep_if_present(&self, path: Option<&Path>) -> Option<PathBuf> {
        let path = path?;
        if !path.exists() {
            return None;
        }
        match self.keep(path).await {
            Ok(kept) => Some(kept),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to keep artifact: {}", e);
                None
            }
        }
    }
}
