use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid variable declaration: {0}")]
    InvalidVariable(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
