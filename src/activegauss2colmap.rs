use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use shard2colmap::{convert_active_gauss_dir, ActiveGaussArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = ActiveGaussArgs::parse();

    let input_dir = PathBuf::from(&args.active_gauss_dir);
    if !input_dir.exists() {
        error!(
            "The specified active_gauss_dir does not exist: {}",
            args.active_gauss_dir
        );
        return ExitCode::FAILURE;
    }

    info!("Starting the active-gauss conversion process...");

    match convert_active_gauss_dir(
        &input_dir,
        &PathBuf::from(&args.output_dir),
        args.batch.filt_processed,
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
