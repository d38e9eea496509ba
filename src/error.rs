// Construction errors. Rendering degrades to "missing visual"; these never escape the public API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("path data must start with a move-to segment")]
    MissingMoveTo,
    #[error("non-finite coordinate in {0} geometry")]
    NonFiniteCoordinate(&'static str),
    #[error("unknown reference: {0}")]
    UnknownReference(String),
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
    #[error("failed to decode image: {0}")]
    ImageDecode(String),
    #[error("failed to read image file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RenderError>;
