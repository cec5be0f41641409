//! Error types shared by the converters and the batch runner.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::BatchReport;

/// Failure of a single shard (or mask task) conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing input: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read array archive {}: {source}", path.display())]
    Npz {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read point cloud {}: {source}", path.display())]
    PointCloud {
        path: PathBuf,
        #[source]
        source: las::Error,
    },

    #[error("failed to write image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl ConvertError {
    /// Wrap an I/O error, mapping `NotFound` to [`ConvertError::MissingInput`].
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConvertError::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            ConvertError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        ConvertError::SchemaViolation(msg.into())
    }
}

/// Returns a [`ConvertError::SchemaViolation`] from the enclosing function when the
/// condition does not hold.
macro_rules! ensure_schema {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::ConvertError::schema(format!($($arg)+)));
        }
    };
}
pub(crate) use ensure_schema;

/// All failures of a batch run, tagged with the id of the unit that produced them.
#[derive(Debug)]
pub struct BatchError {
    pub failures: Vec<(String, ConvertError)>,
    pub report: BatchReport,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} units failed",
            self.failures.len(),
            self.report.total()
        )?;
        for (id, err) in &self.failures {
            write!(f, "\n  {}: {}", id, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

impl BatchError {
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(id, _)| id.as_str())
    }
}

/// Failure of a whole tool run: either discovery/setup or the batch itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("setup failed: {0}")]
    Setup(#[from] ConvertError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}
