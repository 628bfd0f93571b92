//! Handing finished workbooks to the host environment

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::export::ExportedFile;

/// Receives exported files
pub trait Delivery {
    /// Deliver `file` and return where it ended up
    fn deliver(&self, file: &ExportedFile) -> Result<PathBuf>;
}

/// Writes exported files into a directory, creating it when needed
#[derive(Debug, Clone)]
pub struct DirectoryDelivery {
    dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Delivery for DirectoryDelivery {
    fn deliver(&self, file: &ExportedFile) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(safe_filename(&file.filename));
        fs::write(&path, &file.bytes)?;
        info!(path = %path.display(), size = file.bytes.len(), "delivered workbook");
        Ok(path)
    }
}

/// Teacher names end up in filenames and may contain path separators
fn safe_filename(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
