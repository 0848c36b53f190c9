//! Progress notification surface.
//!
//! The core never formats user-facing text; it reports milestones through a
//! [`Reporter`] and the binary decides how to present them. Every method has
//! a no-op default so the core stays usable with no subscriber attached.

use crate::error::StoreError;

pub trait Reporter: Send + Sync {
    /// A package has been resolved and its mirroring is starting.
    fn caching_package(&self, _name: &str) {}

    /// A file transfer is about to begin.
    fn downloading(&self, _file_name: &str) {}

    /// A download was skipped because the file already exists on disk.
    fn skipped(&self, _file_name: &str) {}

    /// A download failed; the referencing URL is left live in the script.
    fn download_failed(&self, _url: &str, _error: &StoreError) {}
}

/// Reporter that ignores every event.
pub struct NullReporter;

impl Reporter for NullReporter {}
