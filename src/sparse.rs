//! Writers for the COLMAP sparse text layout (`cameras.txt`, `images.txt`,
//! `points3D.txt`).

use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::types::{CameraIntrinsics, Point, Pose};
use crate::utils::{create_dir_all, format_float};

pub const CAMERAS_FILE: &str = "cameras.txt";
pub const IMAGES_FILE: &str = "images.txt";
pub const POINTS_FILE: &str = "points3D.txt";

/// Single pinhole camera line, id 1, without a trailing newline.
pub fn write_cameras<W: Write>(out: &mut W, camera: &CameraIntrinsics) -> std::io::Result<()> {
    write!(
        out,
        "1 PINHOLE {} {} {} {} {} {}",
        camera.width,
        camera.height,
        format_float(camera.fx),
        format_float(camera.fy),
        format_float(camera.cx),
        format_float(camera.cy)
    )
}

/// One pose line followed by an empty line (no 2D points are recorded).
pub fn write_images<W: Write>(out: &mut W, poses: &[Pose]) -> std::io::Result<()> {
    for pose in poses {
        writeln!(
            out,
            "{} {} {} {} {} {} {} {} 1 {}\n",
            pose.index,
            format_float(pose.qw),
            format_float(pose.qx),
            format_float(pose.qy),
            format_float(pose.qz),
            format_float(pose.tx),
            format_float(pose.ty),
            format_float(pose.tz),
            pose.image_name
        )?;
    }
    Ok(())
}

/// Tab separated points, enumerated from 0.
pub fn write_points<W: Write>(out: &mut W, points: &[Point]) -> std::io::Result<()> {
    for (id, point) in points.iter().enumerate() {
        let [x, y, z] = point.position;
        let [r, g, b] = point.color;
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            id,
            format_float(x),
            format_float(y),
            format_float(z),
            r,
            g,
            b
        )?;
    }
    Ok(())
}

/// Output location of one shard's `sparse/0` directory.
#[derive(Debug, Clone)]
pub struct SparseDir {
    dir: PathBuf,
}

impl SparseDir {
    pub fn create(dir: &Path) -> Result<Self, ConvertError> {
        create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn write_cameras(&self, camera: &CameraIntrinsics) -> Result<PathBuf, ConvertError> {
        self.write_with(CAMERAS_FILE, |w| write_cameras(w, camera))
    }

    pub fn write_images(&self, poses: &[Pose]) -> Result<PathBuf, ConvertError> {
        self.write_with(IMAGES_FILE, |w| write_images(w, poses))
    }

    pub fn write_points(&self, points: &[Point]) -> Result<PathBuf, ConvertError> {
        self.write_with(POINTS_FILE, |w| write_points(w, points))
    }

    fn write_with<F>(&self, file_name: &str, write: F) -> Result<PathBuf, ConvertError>
    where
        F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    {
        let path = self.path(file_name);
        let file = File::create(&path).map_err(|e| ConvertError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ConvertError::io(&path, e))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}
