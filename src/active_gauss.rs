//! active-gauss shards: `gaussians_data/{rgb/, params.npz, transforms.json}`.

use log::info;
use npyz::npz::NpzArchive;
use npyz::DType;
use std::path::{Path, PathBuf};

use crate::error::{ensure_schema, ConvertError};
use crate::sparse::SparseDir;
use crate::types::{GaussTransforms, Point, Pose, Shard};
use crate::utils::{
    create_dir_all, read_json, replace_dir_with_copy, widen_f32, write_processed_marker,
};

pub const CAM_TRANS: &str = "cam_trans";
pub const CAM_UNNORM_ROTS: &str = "cam_unnorm_rots";
pub const MEANS_3D: &str = "means3D";
pub const RGB_COLORS: &str = "rgb_colors";

/// Element width of an archived array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Float32,
    Float64,
}

/// A dense row-major float array read from the archive.
///
/// Float32 data is held widened through [`widen_f32`], and values derived from it
/// are rounded back with [`Array::round`].
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
    pub precision: Precision,
}

impl Array {
    /// Round a value computed from this array to the array's element width.
    pub fn round(&self, value: f64) -> f64 {
        match self.precision {
            Precision::Float32 => widen_f32(value as f32),
            Precision::Float64 => value,
        }
    }

    /// Per-frame vectors stored as `[1, C, N]` or `[C, N]`, returned as N rows of C.
    pub fn frame_columns(&self, name: &str, components: usize) -> Result<Vec<Vec<f64>>, ConvertError> {
        let frames = match self.shape.as_slice() {
            [batch, c, n] if *batch >= 1 && *c == components => *n,
            [c, n] if *c == components => *n,
            other => {
                return Err(ConvertError::schema(format!(
                    "{} must have shape [1, {}, N], got {:?}",
                    name, components, other
                )))
            }
        };
        // Only the first batch entry is used
        let data = &self.data[..components * frames];
        Ok((0..frames)
            .map(|i| (0..components).map(|c| data[c * frames + i]).collect())
            .collect())
    }

    /// Per-point vectors stored as `[M, 3]`.
    pub fn rows3(&self, name: &str) -> Result<Vec<[f64; 3]>, ConvertError> {
        ensure_schema!(
            self.shape.len() == 2 && self.shape[1] == 3,
            "{} must have shape [M, 3], got {:?}",
            name,
            self.shape
        );
        Ok(self
            .data
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect())
    }
}

/// The four named arrays of `params.npz`.
#[derive(Debug, Clone)]
pub struct GaussParams {
    pub cam_trans: Array,
    pub cam_unnorm_rots: Array,
    pub means3d: Array,
    pub rgb_colors: Array,
}

/// Load the arrays this converter needs from a `.npz` archive.
pub fn load_params(path: &Path) -> Result<GaussParams, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let npz_err = |source| ConvertError::Npz {
        path: path.to_path_buf(),
        source,
    };
    let mut archive = NpzArchive::open(path).map_err(npz_err)?;
    let mut read = |name: &str| -> Result<Array, ConvertError> {
        let npy = archive
            .by_name(name)
            .map_err(npz_err)?
            .ok_or_else(|| ConvertError::schema(format!("{} is missing array {}", path.display(), name)))?;
        let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
        let type_str = match npy.dtype() {
            DType::Plain(ts) => ts.to_string(),
            other => {
                return Err(ConvertError::schema(format!(
                    "{} has unsupported dtype {:?}",
                    name, other
                )))
            }
        };
        let (data, precision) = if type_str.ends_with("f8") {
            (npy.into_vec::<f64>().map_err(npz_err)?, Precision::Float64)
        } else if type_str.ends_with("f4") {
            let data = npy.into_vec::<f32>().map_err(npz_err)?;
            (data.into_iter().map(widen_f32).collect(), Precision::Float32)
        } else {
            return Err(ConvertError::schema(format!(
                "{} must be float32 or float64, got {}",
                name, type_str
            )));
        };
        ensure_schema!(
            data.len() == shape.iter().product::<usize>(),
            "{} holds {} values for shape {:?}",
            name,
            data.len(),
            shape
        );
        Ok(Array {
            shape,
            data,
            precision,
        })
    };
    Ok(GaussParams {
        cam_trans: read(CAM_TRANS)?,
        cam_unnorm_rots: read(CAM_UNNORM_ROTS)?,
        means3d: read(MEANS_3D)?,
        rgb_colors: read(RGB_COLORS)?,
    })
}

/// Frame name for the i-th rendered image.
pub fn frame_image_name(index: usize) -> String {
    format!("{:04}.png", index)
}

/// Pair translations with normalized rotations, one pose per frame.
pub fn build_poses(params: &GaussParams) -> Result<Vec<Pose>, ConvertError> {
    let translations = params.cam_trans.frame_columns(CAM_TRANS, 3)?;
    let rotations = params.cam_unnorm_rots.frame_columns(CAM_UNNORM_ROTS, 4)?;
    ensure_schema!(
        translations.len() == rotations.len(),
        "{} has {} frames but {} has {}",
        CAM_TRANS,
        translations.len(),
        CAM_UNNORM_ROTS,
        rotations.len()
    );

    translations
        .iter()
        .zip(&rotations)
        .enumerate()
        .map(|(index, (t, r))| {
            let norm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
            ensure_schema!(
                norm > 0.0 && norm.is_finite(),
                "rotation of frame {} cannot be normalized",
                index
            );
            let unit = |v: f64| params.cam_unnorm_rots.round(v / norm);
            Ok(Pose {
                index,
                qw: unit(r[0]),
                qx: unit(r[1]),
                qy: unit(r[2]),
                qz: unit(r[3]),
                tx: t[0],
                ty: t[1],
                tz: t[2],
                image_name: frame_image_name(index),
            })
        })
        .collect()
}

/// Scale a [0, 1] color channel to [0, 255], clipping first and truncating.
pub fn scale_channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Zip Gaussian means with their colors.
pub fn build_points(params: &GaussParams) -> Result<Vec<Point>, ConvertError> {
    let positions = params.means3d.rows3(MEANS_3D)?;
    let colors = params.rgb_colors.rows3(RGB_COLORS)?;
    ensure_schema!(
        positions.len() == colors.len(),
        "{} and {} are not the same length ({} vs {})",
        MEANS_3D,
        RGB_COLORS,
        positions.len(),
        colors.len()
    );
    Ok(positions
        .into_iter()
        .zip(colors)
        .map(|(position, rgb)| Point {
            position,
            color: rgb.map(scale_channel),
        })
        .collect())
}

fn gaussians_dir(shard: &Shard) -> PathBuf {
    shard.input_dir.join("gaussians_data")
}

/// Convert one active-gauss shard. The processed marker is written last, only after
/// every artifact has been produced.
pub fn convert_shard(shard: &Shard) -> Result<(), ConvertError> {
    let input_dir = gaussians_dir(shard);
    create_dir_all(&shard.output_dir)?;

    let copied = replace_dir_with_copy(&input_dir.join("rgb"), &shard.output_dir.join("images"))?;
    info!("Copied {} images for {}", copied, shard.name);

    let params = load_params(&input_dir.join("params.npz"))?;
    let transforms: GaussTransforms = read_json(&input_dir.join("transforms.json"))?;

    // Validate everything before the first sparse file is touched
    let poses = build_poses(&params)?;
    let points = build_points(&params)?;

    let sparse = SparseDir::create(&shard.sparse_dir())?;
    sparse.write_cameras(&transforms.intrinsics())?;
    sparse.write_images(&poses)?;
    sparse.write_points(&points)?;

    write_processed_marker(&shard.input_dir)?;
    info!(
        "Converted {}: {} frames, {} points",
        shard.name,
        poses.len(),
        points.len()
    );
    Ok(())
}
