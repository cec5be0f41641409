//! lixel-l1 shards: reconstructed images, per-direction masks, an `l3i.json` pose
//! descriptor and a colored LiDAR map.

use las::Read as _;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::LixelConfig;
use crate::error::{ensure_schema, ConvertError};
use crate::sparse::SparseDir;
use crate::types::{
    CameraIntrinsics, LixelDescriptor, LixelImageRecord, Point, Pose, Shard, VIDEO_DIRECTIONS,
};
use crate::utils::{
    create_dir_all, merge_files_into, read_json, replace_dir_with_copy, write_processed_marker,
};

pub const DESCRIPTOR_FILE: &str = "l3i.json";
pub const POINT_CLOUD_FILE: &str = "color_map_online_instan360_sfm_opt.las";

/// Merge `videos/0..6/masks` into `masks_dir`; later directions overwrite earlier
/// ones on name collisions.
pub fn merge_masks(shard_input: &Path, masks_dir: &Path) -> Result<usize, ConvertError> {
    let mut merged = 0;
    for direction in 0..VIDEO_DIRECTIONS {
        let source = shard_input
            .join("videos")
            .join(direction.to_string())
            .join("masks");
        merged += merge_files_into(&source, masks_dir)?;
    }
    Ok(merged)
}

pub fn intrinsics(descriptor: &LixelDescriptor, config: &LixelConfig) -> CameraIntrinsics {
    CameraIntrinsics {
        width: config.width,
        height: config.height,
        fx: descriptor.camera.fx_,
        fy: descriptor.camera.fy_,
        cx: descriptor.camera.cx_,
        cy: descriptor.camera.cy_,
    }
}

/// Keep the records whose mask exists, numbering them contiguously from 0 in
/// descriptor order.
pub fn retained_poses<F>(records: &[LixelImageRecord], has_mask: F) -> Vec<Pose>
where
    F: Fn(&str) -> bool,
{
    records
        .iter()
        .filter(|record| {
            let keep = has_mask(&record.name);
            if !keep {
                warn!("No mask for {}, skipping its pose", record.name);
            }
            keep
        })
        .enumerate()
        .map(|(index, record)| Pose {
            index,
            qw: record.qw,
            qx: record.qx,
            qy: record.qy,
            qz: record.qz,
            tx: record.tx,
            ty: record.ty,
            tz: record.tz,
            image_name: record.name.clone(),
        })
        .collect()
}

/// Read positions and 8-bit colors from a LAS file.
pub fn read_point_cloud(path: &Path) -> Result<Vec<Point>, ConvertError> {
    let las_err = |source| ConvertError::PointCloud {
        path: path.to_path_buf(),
        source,
    };
    if !path.exists() {
        return Err(ConvertError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut reader = las::Reader::from_path(path).map_err(las_err)?;
    let mut points = Vec::with_capacity(reader.header().number_of_points() as usize);
    for (id, point) in reader.points().enumerate() {
        let point = point.map_err(las_err)?;
        let color = point
            .color
            .ok_or_else(|| ConvertError::schema(format!("point {} of {} has no color", id, path.display())))?;
        ensure_schema!(
            color.red <= 255 && color.green <= 255 && color.blue <= 255,
            "colors should be in range [0, 255], point {} has ({}, {}, {})",
            id,
            color.red,
            color.green,
            color.blue
        );
        points.push(Point {
            position: [point.x, point.y, point.z],
            color: [color.red as u8, color.green as u8, color.blue as u8],
        });
    }
    Ok(points)
}

fn lidar_map_dir(shard: &Shard) -> PathBuf {
    shard.input_dir.join("lidar_map")
}

/// Convert one lixel-l1 shard.
///
/// The whole LiDAR map is written even when poses are dropped for missing masks.
pub fn convert_shard(shard: &Shard, config: &LixelConfig) -> Result<(), ConvertError> {
    create_dir_all(&shard.output_dir)?;

    let copied = replace_dir_with_copy(
        &shard.input_dir.join("reconstruct").join("images"),
        &shard.output_dir.join("images"),
    )?;
    info!("Copied {} images for {}", copied, shard.name);

    let masks_dir = shard.output_dir.join("masks");
    let merged = merge_masks(&shard.input_dir, &masks_dir)?;
    info!("Merged {} masks for {}", merged, shard.name);

    let descriptor: LixelDescriptor = read_json(&lidar_map_dir(shard).join(DESCRIPTOR_FILE))?;
    let poses = retained_poses(&descriptor.images_data, |name| masks_dir.join(name).exists());
    let points = read_point_cloud(&lidar_map_dir(shard).join(POINT_CLOUD_FILE))?;

    let sparse = SparseDir::create(&shard.sparse_dir())?;
    sparse.write_cameras(&intrinsics(&descriptor, config))?;
    sparse.write_images(&poses)?;
    sparse.write_points(&points)?;

    write_processed_marker(&shard.input_dir)?;
    info!(
        "Converted {}: {} of {} frames kept, {} points",
        shard.name,
        poses.len(),
        descriptor.images_data.len(),
        points.len()
    );
    Ok(())
}
