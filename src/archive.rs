//! Read and update entries inside a `.nupkg` archive (a plain zip).
//!
//! Zip archives cannot be edited in place, so replacing an entry writes a
//! fresh archive next to the original (raw-copying every other entry
//! without recompression) and atomically persists it over the old file.

use crate::error::Result;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub struct PackageArchive {
    path: PathBuf,
}

impl PackageArchive {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored name of the entry matching `entry_path` case-insensitively,
    /// or `None` when the archive carries no such entry. Package authors
    /// are inconsistent about casing (`tools/chocolateyInstall.ps1` vs
    /// `tools/chocolateyinstall.ps1`), so exact lookups are not enough.
    pub fn find_entry(&self, entry_path: &str) -> Result<Option<String>> {
        let archive = ZipArchive::new(File::open(&self.path)?)?;
        Ok(archive
            .file_names()
            .find(|name| name.eq_ignore_ascii_case(entry_path))
            .map(str::to_string))
    }

    /// Read one entry as UTF-8 text, by its exact stored name.
    pub fn read_text(&self, entry_name: &str) -> Result<String> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;
        let mut entry = archive.by_name(entry_name)?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Replace one entry's content, keeping every other entry intact.
    pub fn replace_text(&self, entry_name: &str, content: &str) -> Result<()> {
        let mut archive = ZipArchive::new(File::open(&self.path)?)?;

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = NamedTempFile::new_in(parent)?;
        let mut writer = ZipWriter::new(staging.as_file_mut());

        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.name() == entry_name {
                writer.start_file(entry_name, SimpleFileOptions::default())?;
                writer.write_all(content.as_bytes())?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }

        writer.finish()?;
        staging.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(path = %self.path.display(), entry = entry_name, "archive entry rewritten");
        Ok(())
    }
}
