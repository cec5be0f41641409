use clap::{Args, Parser};

/// Default lixel-l1 image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1920;
/// Default lixel-l1 image width in pixels.
pub const DEFAULT_WIDTH: u32 = 1920;

/// Options shared by every tool that runs over a batch of shards.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Skip shards that were already processed
    #[arg(
        long = "filt_processed",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub filt_processed: bool,

    /// Number of worker threads (0 uses all available cores)
    #[arg(long = "workers", default_value_t = 0)]
    pub workers: usize,

    /// Stop starting new shards once one has failed
    #[arg(long = "fail_fast")]
    pub fail_fast: bool,
}

impl BatchArgs {
    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            workers: self.workers,
            fail_fast: self.fail_fast,
        }
    }
}

/// Convert active-gauss shards into COLMAP sparse text layout.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ActiveGaussArgs {
    /// Directory containing active-gauss shard directories
    #[arg(long = "active_gauss_dir", default_value = "data/active_gauss")]
    pub active_gauss_dir: String,

    /// Directory receiving one COLMAP directory per shard
    #[arg(long = "output_dir", default_value = "data/colmap")]
    pub output_dir: String,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Convert lixel-l1 shards into COLMAP sparse text layout.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct LixelArgs {
    /// Directory containing lixel-l1 shard directories
    #[arg(long = "lixel_l1_dir", default_value = "data/lixel_l1")]
    pub lixel_l1_dir: String,

    /// Directory receiving one COLMAP directory per shard
    #[arg(long = "output_dir", default_value = "data/colmap")]
    pub output_dir: String,

    /// Height of the reconstructed images
    #[arg(long = "height", default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Width of the reconstructed images
    #[arg(long = "width", default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    #[command(flatten)]
    pub batch: BatchArgs,
}

impl LixelArgs {
    pub fn lixel_config(&self) -> LixelConfig {
        LixelConfig {
            width: self.width,
            height: self.height,
        }
    }
}

/// Tools that work in place on the lixel-l1 tree (videos, masks).
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct LixelTreeArgs {
    /// Directory containing lixel-l1 shard directories
    #[arg(long = "lixel_l1_dir", default_value = "data/lixel_l1")]
    pub lixel_l1_dir: String,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Image resolution for lixel-l1 shards, whose descriptor carries no size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LixelConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for LixelConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Worker pool settings for a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Pool size; `0` uses the available parallelism.
    pub workers: usize,
    /// Skip not-yet-started units after the first failure.
    pub fail_fast: bool,
}
