//! Where asset bytes come from.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Async byte source for assets addressed by a relative path or URL.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Reads assets from the local filesystem, relative to a root directory.
#[derive(Clone, Debug)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetSource for FileSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        log::debug!("Reading {}", full.display());
        std::fs::read(&full).with_context(|| format!("Failed to read {}", full.display()))
    }
}
