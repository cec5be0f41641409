use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use shard2colmap::{generate_masks_dir, LixelTreeArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = LixelTreeArgs::parse();

    let root = PathBuf::from(&args.lixel_l1_dir);
    if !root.exists() {
        error!("The specified lixel_l1_dir does not exist: {}", args.lixel_l1_dir);
        return ExitCode::FAILURE;
    }

    info!("Rasterizing annotations into masks...");

    match generate_masks_dir(&root, args.batch.filt_processed, &args.batch.options()) {
        Ok(report) => {
            info!("Wrote {} masks.", report.total());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to generate masks: {}", e);
            ExitCode::FAILURE
        }
    }
}
