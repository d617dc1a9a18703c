use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to render")]
    Empty,

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}
