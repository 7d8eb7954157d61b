use thiserror::Error;

/// Errors raised while preparing or rendering a figure.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Input data that cannot be laid out (empty or single-node trees, ragged matrices, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The number of leaves found in the link coordinates disagrees with the leaf labels.
    #[error("internal error, label numbers {expected} and {actual} must be equal")]
    LeafCountMismatch { expected: usize, actual: usize },

    /// A per-leaf color map does not cover exactly the leaf labels.
    #[error("color map has {actual} entries but the tree has {expected} leaves")]
    ColorMapMismatch { expected: usize, actual: usize },

    #[error("no entry for label '{0}'")]
    MissingLabel(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("unknown colormap '{0}'")]
    UnknownColormap(String),

    #[error("cannot parse color '{0}'")]
    InvalidColor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot encode image: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, PlotError>;
