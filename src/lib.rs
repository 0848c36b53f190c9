//! Offline mirror for Chocolatey packages.
//!
//! Downloads a package, its transitive dependencies, and every file its
//! install script references, then rewrites the script so repeated installs
//! use the local copies instead of the network. URLs may carry `${name}`
//! template variables with several alternative values; every combination is
//! cached under a distinct name and the rewritten script keeps the
//! templated path so the right variant is still picked at install time.

pub mod api;
pub mod archive;
pub mod cacher;
pub mod download;
pub mod error;
pub mod events;
pub mod rewrite;
pub mod variables;

pub use api::{ChocoApi, PackageDescriptor, Registry};
pub use cacher::PackageCacher;
pub use error::{Result, StoreError};
pub use events::{NullReporter, Reporter};
pub use variables::Variable;
