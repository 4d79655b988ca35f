//! On-disk copies of fetched pages, kept for later re-parsing.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::app::Result;
use crate::fetcher::Request;

#[derive(Debug, Clone)]
pub struct RawArchive {
    dir: PathBuf,
}

impl RawArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `html` as `<label>_<descriptor>_<unix seconds>.html`.
    pub fn save(&self, request: &Request, html: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let (label, descriptor) = request.archive_name();
        let path = self
            .dir
            .join(format!("{}_{}_{}.html", label, descriptor, Utc::now().timestamp()));
        fs::write(&path, html)?;

        tracing::debug!("Archived {} to {}", request.query(), path.display());
        Ok(path)
    }
}
