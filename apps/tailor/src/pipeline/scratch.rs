//! Scratch projects: a throwaway copy of a CV template project owned by the one
//! record being processed.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Copies `src` into `dst` recursively. `dst` must not exist yet.
async fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dst).await?;
    let mut entries = tokio::fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let target = dst.join(entry.file_name());
        if entry.file_type().await?.is_dir() {
            Box::pin(copy_dir(&entry.path(), &target)).await?;
        } else {
            tokio::fs::copy(entry.path(), &target).await?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct ScratchProject {
    root: PathBuf,
}

impl ScratchProject {
    /// Copies `template_project` to `root`, removing a stale copy left there by
    /// an earlier failed run.
    pub async fn create(template_project: &Path, root: PathBuf) -> std::io::Result<Self> {
        if tokio::fs::try_exists(&root).await? {
            debug!("Removing stale scratch project {}", root.display());
            tokio::fs::remove_dir_all(&root).await?;
        }
        copy_dir(template_project, &root).await?;
        info!("Scratch project ready at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deletes the scratch copy. Failure to delete is logged, not raised.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!("Could not remove scratch project {}: {e}", self.root.display());
        }
    }

    /// Keeps the scratch copy on disk for inspection and returns its path.
    pub fn retain(self) -> PathBuf {
        self.root
    }
}
