use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or reading a [`super::MiniImage`].
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The manifest is missing or a row does not match `filename,label`.
    #[error("failed to parse manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("manifest {} has no rows", path.display())]
    EmptyManifest { path: PathBuf },

    /// The image at `root_dir/label/filename` could not be opened or decoded.
    #[error("failed to decode image {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// `position + offset` fell outside the manifest.
    #[error("row {index} is out of range for a manifest of {len} rows")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("label {0:?} has no class code")]
    UnknownLabel(String),

    /// `way` was 0, so there is no class offset to draw from.
    #[error("way subset is empty, nothing to sample")]
    EmptyWaySubset,
}

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;
