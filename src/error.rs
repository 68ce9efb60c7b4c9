//! Error types for the label analysis pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for label_palette operations
pub type Result<T> = std::result::Result<T, LabelError>;

#[derive(Error, Debug)]
pub enum LabelError {
    /// Image file could not be opened or decoded
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Image does not carry exactly three color channels
    #[error("expected a 3-channel RGB image, got {channels} channel(s)")]
    Format { channels: u8 },

    /// Image or pixel list has nothing to cluster
    #[error("image contains no pixels")]
    EmptyImage,

    #[error("invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// A color profile references a beer id absent from the record set
    #[error("no beer record for bid {bid}")]
    MissingRecord { bid: String },

    /// The persisted palette file could not be decoded
    #[error("palette file {path} is corrupted: {source}")]
    CorruptPalette {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Colorspace conversion received a non-finite channel
    #[error("cannot convert color {color:?} to YUV")]
    Transform { color: [f32; 3] },

    /// No reference entry lies within the search threshold
    #[error("color {color:?} is farther than the search threshold from every reference color")]
    Unclassified { color: [f32; 3] },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Beer records or color profiles could not be parsed
    #[error("invalid data in {path}: {source}")]
    Data {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
}

impl LabelError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Errors that only affect a single beer or color and should not stop a batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LabelError::ImageLoad { .. }
                | LabelError::Format { .. }
                | LabelError::EmptyImage
                | LabelError::MissingRecord { .. }
                | LabelError::Transform { .. }
                | LabelError::Unclassified { .. }
                | LabelError::Fetch { .. }
        )
    }
}
