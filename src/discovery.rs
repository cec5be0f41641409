//! Shard discovery: list the immediate subdirectories of a dataset root.

use log::warn;
use std::fs;
use std::path::Path;

use crate::error::ConvertError;
use crate::types::{ShardStatus, PROCESSED_MARKER};

/// What marks a shard directory as already handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// A `processed` marker file, written by the sparse converters.
    ProcessedMarker,
    /// A `videos` directory, created by the video materializer.
    VideosDir,
}

impl Sentinel {
    pub fn file_name(self) -> &'static str {
        match self {
            Sentinel::ProcessedMarker => PROCESSED_MARKER,
            Sentinel::VideosDir => "videos",
        }
    }

    pub fn is_present(self, shard_dir: &Path) -> bool {
        shard_dir.join(self.file_name()).exists()
    }
}

/// Names of the immediate subdirectories of `root`, in directory-listing order.
///
/// With `filter_processed` set, shards whose sentinel exists are left out.
pub fn find_shard_names(
    root: &Path,
    filter_processed: bool,
    sentinel: Sentinel,
) -> Result<Vec<String>, ConvertError> {
    let entries = fs::read_dir(root).map_err(|e| ConvertError::io(root, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io(root, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 directory name: {:?}", path);
            continue;
        };
        if filter_processed && sentinel.is_present(&path) {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// Read a shard's status back from its marker file.
pub fn shard_status(shard_dir: &Path) -> ShardStatus {
    if Sentinel::ProcessedMarker.is_present(shard_dir) {
        ShardStatus::Processed
    } else {
        ShardStatus::Unprocessed
    }
}
