use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the sentinel file marking a shard as converted.
pub const PROCESSED_MARKER: &str = "processed";

/// Number of camera directions (and numbered video directories) a lixel-l1 shard has.
pub const VIDEO_DIRECTIONS: usize = 6;

// One capture session, processed as an atomic unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub name: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Shard {
    pub fn new(name: &str, input_root: &Path, output_root: &Path) -> Self {
        Self {
            name: name.to_string(),
            input_dir: input_root.join(name),
            output_dir: output_root.join(name),
        }
    }

    pub fn marker_path(&self) -> PathBuf {
        self.input_dir.join(PROCESSED_MARKER)
    }

    pub fn sparse_dir(&self) -> PathBuf {
        self.output_dir.join("sparse").join("0")
    }
}

/// Application-level state of a shard.
///
/// `Unprocessed` and `Processed` are read back from the marker file; `Failed` only
/// exists for the duration of a batch run, since a failed conversion never writes
/// the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardStatus {
    Unprocessed,
    Processed,
    Failed,
}

// Outcome of one unit of work inside a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl UnitOutcome {
    pub fn shard_status(self) -> ShardStatus {
        match self {
            UnitOutcome::Succeeded => ShardStatus::Processed,
            UnitOutcome::Failed => ShardStatus::Failed,
            UnitOutcome::Cancelled => ShardStatus::Unprocessed,
        }
    }
}

/// Per-unit outcomes of a batch run, in completion order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(String, UnitOutcome)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, outcome: UnitOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn status_of(&self, id: &str) -> Option<ShardStatus> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, o)| o.shard_status())
    }

    pub fn print_summary(&self) {
        log::info!("=== Processing Summary ===");
        log::info!("Total units: {}", self.total());
        log::info!("Succeeded: {}", self.count(UnitOutcome::Succeeded));
        log::info!("Failed: {}", self.count(UnitOutcome::Failed));
        let cancelled = self.count(UnitOutcome::Cancelled);
        if cancelled > 0 {
            log::warn!("Cancelled after an earlier failure: {}", cancelled);
        }
    }
}

/// Pinhole camera intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Per-frame extrinsics as written to `images.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub index: usize,
    pub qw: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub image_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: [f64; 3],
    pub color: [u8; 3],
}

// active-gauss `transforms.json`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GaussTransforms {
    pub w: u32,
    pub h: u32,
    pub fl_x: f64,
    pub fl_y: f64,
    pub cx: f64,
    pub cy: f64,
}

impl GaussTransforms {
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics {
            width: self.w,
            height: self.h,
            fx: self.fl_x,
            fy: self.fl_y,
            cx: self.cx,
            cy: self.cy,
        }
    }
}

// lixel-l1 `l3i.json`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LixelDescriptor {
    pub camera: LixelCamera,
    pub images_data: Vec<LixelImageRecord>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LixelCamera {
    pub fx_: f64,
    pub fy_: f64,
    pub cx_: f64,
    pub cy_: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LixelImageRecord {
    pub name: String,
    pub qw: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
}

// The Shape struct representing annotated polygons
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shape {
    #[serde(default)]
    pub label: String,
    pub points: Vec<(f64, f64)>,
    #[serde(default)]
    pub shape_type: Option<String>,
}

// The ImageAnnotation struct representing the annotation information of an image
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotation {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub flags: Option<HashMap<String, bool>>,
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub image_path: Option<String>,
    pub image_height: u32,
    pub image_width: u32,
}

/// One annotation file to rasterize into one mask image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTask {
    pub annotation_path: PathBuf,
    pub mask_path: PathBuf,
}
