//! End-to-end runs of each tool over a dataset root: discovery, then the batch.

use log::info;
use std::path::Path;

use crate::batch::run_batch;
use crate::config::{BatchOptions, LixelConfig};
use crate::discovery::{find_shard_names, Sentinel};
use crate::error::{ConvertError, PipelineError};
use crate::types::{BatchReport, Shard};
use crate::{active_gauss, lixel, masks, videos};

fn discover(
    input_root: &Path,
    output_root: &Path,
    filter_processed: bool,
    sentinel: Sentinel,
) -> Result<Vec<Shard>, ConvertError> {
    let names = find_shard_names(input_root, filter_processed, sentinel)?;
    info!("Found {} shards to process in {}", names.len(), input_root.display());
    Ok(names
        .iter()
        .map(|name| Shard::new(name, input_root, output_root))
        .collect())
}

/// Convert every unprocessed active-gauss shard under `input_root`.
pub fn convert_active_gauss_dir(
    input_root: &Path,
    output_root: &Path,
    filter_processed: bool,
    options: &BatchOptions,
) -> Result<BatchReport, PipelineError> {
    let shards = discover(input_root, output_root, filter_processed, Sentinel::ProcessedMarker)?;
    Ok(run_batch(&shards, options, "ActiveGauss", active_gauss::convert_shard)?)
}

/// Convert every unprocessed lixel-l1 shard under `input_root`.
pub fn convert_lixel_dir(
    input_root: &Path,
    output_root: &Path,
    filter_processed: bool,
    config: &LixelConfig,
    options: &BatchOptions,
) -> Result<BatchReport, PipelineError> {
    let shards = discover(input_root, output_root, filter_processed, Sentinel::ProcessedMarker)?;
    Ok(run_batch(&shards, options, "Lixel", |shard| {
        lixel::convert_shard(shard, config)
    })?)
}

/// Build the per-direction video trees of every shard that has none yet.
pub fn materialize_videos_dir(
    root: &Path,
    filter_processed: bool,
    options: &BatchOptions,
) -> Result<BatchReport, PipelineError> {
    let shards = discover(root, root, filter_processed, Sentinel::VideosDir)?;
    Ok(run_batch(&shards, options, "Videos", |shard| {
        videos::materialize_videos(&shard.input_dir).map(|_| ())
    })?)
}

/// Rasterize the annotations of every shard under `root` into masks.
///
/// All shards are scanned; `filter_processed` skips individual masks that exist.
pub fn generate_masks_dir(
    root: &Path,
    filter_processed: bool,
    options: &BatchOptions,
) -> Result<BatchReport, PipelineError> {
    let shards = discover(root, root, false, Sentinel::ProcessedMarker)?;
    let mut tasks = Vec::new();
    for shard in &shards {
        tasks.extend(masks::generate_tasks(&shard.input_dir, filter_processed)?);
    }
    info!("Generated {} mask tasks", tasks.len());
    Ok(run_batch(&tasks, options, "Masks", masks::annotation_to_mask)?)
}
