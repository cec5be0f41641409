//! Rasterize polygon annotations of the lixel-l1 video directories into binary masks.

use image::{GrayImage, Luma};
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::ConvertError;
use crate::types::{ImageAnnotation, MaskTask, VIDEO_DIRECTIONS};
use crate::utils::{create_dir_all, read_json};

pub const MASK_VALUE: u8 = 255;

// Polygon coordinates are clamped here so edge arithmetic cannot overflow
const COORD_LIMIT: f64 = i32::MAX as f64;

/// Collect the annotation → mask tasks of one shard.
///
/// A task is produced for every base name in `videos/<i>/images` that has both a
/// `.jpg` image and a `.json` annotation, unless `filter_processed` is set and the
/// mask already exists. Shards without a `videos` directory yield no tasks.
pub fn generate_tasks(shard_dir: &Path, filter_processed: bool) -> Result<Vec<MaskTask>, ConvertError> {
    let videos_dir = shard_dir.join("videos");
    let mut tasks = Vec::new();
    if !videos_dir.exists() {
        return Ok(tasks);
    }
    for direction in 0..VIDEO_DIRECTIONS {
        let video_dir = videos_dir.join(direction.to_string());
        let annotations_dir = video_dir.join("images");
        let masks_dir = video_dir.join("masks");
        create_dir_all(&masks_dir)?;

        let entries = fs::read_dir(&annotations_dir).map_err(|e| ConvertError::io(&annotations_dir, e))?;
        let mut base_names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConvertError::io(&annotations_dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                base_names.insert(name.split('.').next().unwrap_or_default().to_string());
            }
        }

        for base in base_names {
            let image_path = annotations_dir.join(format!("{}.jpg", base));
            let annotation_path = annotations_dir.join(format!("{}.json", base));
            let mask_path = masks_dir.join(format!("{}.jpg", base));
            if !image_path.exists() || !annotation_path.exists() {
                continue;
            }
            if filter_processed && mask_path.exists() {
                debug!("Mask {} already exists", mask_path.display());
                continue;
            }
            tasks.push(MaskTask {
                annotation_path,
                mask_path,
            });
        }
    }
    Ok(tasks)
}

/// Fill every shape of the annotation with [`MASK_VALUE`] on a black canvas.
pub fn rasterize(annotation: &ImageAnnotation) -> GrayImage {
    let mut mask = GrayImage::new(annotation.image_width, annotation.image_height);
    for shape in &annotation.shapes {
        // Pixel coordinates are truncated toward zero
        let polygon: Vec<(i64, i64)> = shape
            .points
            .iter()
            .map(|&(x, y)| {
                (
                    x.clamp(-COORD_LIMIT, COORD_LIMIT) as i64,
                    y.clamp(-COORD_LIMIT, COORD_LIMIT) as i64,
                )
            })
            .collect();
        fill_polygon(&mut mask, &polygon, MASK_VALUE);
    }
    mask
}

/// Even-odd scanline fill with the polygon outline included.
pub fn fill_polygon(image: &mut GrayImage, polygon: &[(i64, i64)], value: u8) {
    let (width, height) = (image.width() as i64, image.height() as i64);
    if polygon.is_empty() || width == 0 || height == 0 {
        return;
    }
    let mut put = |x: i64, y: i64| {
        if (0..width).contains(&x) && (0..height).contains(&y) {
            image.put_pixel(x as u32, y as u32, Luma([value]));
        }
    };

    let y_min = polygon.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let y_max = polygon.iter().map(|p| p.1).max().unwrap_or(-1).min(height - 1);
    let edges: Vec<((i64, i64), (i64, i64))> = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(&a, &b)| (a, b))
        .collect();

    let mut crossings = Vec::new();
    for y in y_min..=y_max {
        crossings.clear();
        for &((x0, y0), (x1, y1)) in &edges {
            // Half-open in y so shared vertices are counted once
            if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                let t = (y - y0) as f64 / (y1 - y0) as f64;
                crossings.push(x0 as f64 + t * (x1 - x0) as f64);
            }
        }
        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            let start = pair[0].ceil() as i64;
            let end = pair[1].floor() as i64;
            for x in start.max(0)..=end.min(width - 1) {
                put(x, y);
            }
        }
    }

    for &(a, b) in &edges {
        if let Some((a, b)) = clip_segment(a, b, width, height) {
            draw_line(a, b, &mut put);
        }
    }
}

/// Liang-Barsky clip of a segment to the canvas. Segments already inside are
/// returned unchanged.
fn clip_segment(
    (x0, y0): (i64, i64),
    (x1, y1): (i64, i64),
    width: i64,
    height: i64,
) -> Option<((i64, i64), (i64, i64))> {
    let (fx, fy) = (x0 as f64, y0 as f64);
    let (dx, dy) = ((x1 - x0) as f64, (y1 - y0) as f64);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let bounds = [
        (-dx, fx),
        (dx, (width - 1) as f64 - fx),
        (-dy, fy),
        (dy, (height - 1) as f64 - fy),
    ];
    for (p, q) in bounds {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| ((fx + t * dx).round() as i64, (fy + t * dy).round() as i64);
    Some((at(t0), at(t1)))
}

fn draw_line<F: FnMut(i64, i64)>((x0, y0): (i64, i64), (x1, y1): (i64, i64), put: &mut F) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    loop {
        put(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Rasterize one annotation file and save the mask next to its siblings.
pub fn annotation_to_mask(task: &MaskTask) -> Result<(), ConvertError> {
    let annotation: ImageAnnotation = read_json(&task.annotation_path)?;
    let mask = rasterize(&annotation);
    mask.save(&task.mask_path).map_err(|source| ConvertError::Image {
        path: task.mask_path.clone(),
        source,
    })
}
