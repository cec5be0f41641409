//! Capture shard to COLMAP converter
//!
//! This library converts active-gauss and lixel-l1 dataset shards into the COLMAP
//! sparse text layout used by Gaussian-splat trainers, running one conversion per
//! shard on a bounded worker pool.

pub mod active_gauss;
pub mod batch;
pub mod config;
pub mod discovery;
pub mod error;
pub mod lixel;
pub mod masks;
pub mod pipeline;
pub mod sparse;
pub mod types;
pub mod utils;
pub mod videos;

// Re-export commonly used types and functions
pub use batch::{run_batch, BatchUnit};
pub use config::{ActiveGaussArgs, BatchOptions, LixelArgs, LixelConfig, LixelTreeArgs};
pub use discovery::{find_shard_names, shard_status, Sentinel};
pub use error::{BatchError, ConvertError, PipelineError};
pub use pipeline::{
    convert_active_gauss_dir, convert_lixel_dir, generate_masks_dir, materialize_videos_dir,
};
pub use types::{
    BatchReport, CameraIntrinsics, MaskTask, Point, Pose, Shard, ShardStatus, UnitOutcome,
};
