//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("MANIFEST/{0}")]
    ManifestError(String),

    #[error("EMBED/{0}")]
    EmbedError(String),
}
