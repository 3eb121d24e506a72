use anyhow::{Context, Result, bail};
use log::debug;
use std::{
    fs,
    future::Future,
    io::Write,
    path::{Component, Path, PathBuf},
};

/// On-disk attachment store keyed by file id.
///
/// An existing file is trusted as-is: there is no size or checksum check, the
/// identifier is the only key. Entries are never removed, so the directory
/// can be reused by later runs.
#[derive(Debug, Clone)]
pub struct AttachmentCache {
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    /// Downloaded and written, with the number of bytes stored.
    Fetched(usize),
}

impl AttachmentCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, file_id: &str) -> Result<PathBuf> {
        let relative = Path::new(file_id);
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if file_id.is_empty() || !is_plain {
            bail!("refusing to cache file with unsafe id {:?}", file_id);
        }

        Ok(self.root.join(relative))
    }

    /// Make sure the attachment `file_id` is on disk, calling `fetch` only
    /// when it is not.
    pub async fn ensure_cached<F, Fut>(&self, file_id: &str, fetch: F) -> Result<CacheOutcome>
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let path = self.path_for(file_id)?;

        if path.exists() {
            debug!("using cached file {}", file_id);
            return Ok(CacheOutcome::Hit);
        }

        debug!("downloading file {}", file_id);
        let content = fetch(file_id).await?;

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        // Written beside the destination and renamed into place so that an
        // interrupted write never leaves a partial entry behind.
        let mut file = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        file.write_all(&content)
            .with_context(|| format!("Failed to write file {}", file_id))?;
        file.persist(&path)
            .with_context(|| format!("Failed to store file {}", path.display()))?;

        Ok(CacheOutcome::Fetched(content.len()))
    }
}
