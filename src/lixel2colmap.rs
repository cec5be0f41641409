use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use shard2colmap::{convert_lixel_dir, LixelArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = LixelArgs::parse();

    let input_dir = PathBuf::from(&args.lixel_l1_dir);
    if !input_dir.exists() {
        error!("The specified lixel_l1_dir does not exist: {}", args.lixel_l1_dir);
        return ExitCode::FAILURE;
    }

    let config = args.lixel_config();
    info!(
        "Starting the lixel-l1 conversion process ({}x{} images)...",
        config.width, config.height
    );

    match convert_lixel_dir(
        &input_dir,
        &PathBuf::from(&args.output_dir),
        args.batch.filt_processed,
        &config,
        &args.batch.options(),
    ) {
        Ok(_) => {
            info!("Conversion process completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to process dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
