#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How `write_npz` stores its arrays: `numpy.savez` writes float64 into a stored
/// zip, `numpy.savez_compressed` of a torch export writes float32 deflated.
#[derive(Clone, Copy)]
pub enum NpzLayout {
    StoredF8,
    DeflatedF4,
}

/// Encode a float array as a version 1.0 `.npy` payload.
pub fn npy_bytes(shape: &[usize], data: &[f64], float32: bool) -> Vec<u8> {
    let dims = match shape {
        [single] => format!("({},)", single),
        _ => format!(
            "({})",
            shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        if float32 { "<f4" } else { "<f8" },
        dims
    );
    // magic (6) + version (2) + header length (2) + header + '\n' is 64-aligned
    while (10 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for &value in data {
        if float32 {
            bytes.extend_from_slice(&(value as f32).to_le_bytes());
        } else {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

pub fn write_npz(path: &Path, arrays: &[(&str, Vec<usize>, Vec<f64>)], layout: NpzLayout) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let (method, float32) = match layout {
        NpzLayout::StoredF8 => (zip::CompressionMethod::Stored, false),
        NpzLayout::DeflatedF4 => (zip::CompressionMethod::Deflated, true),
    };
    let options = zip::write::SimpleFileOptions::default().compression_method(method);
    for (name, shape, data) in arrays {
        zip.start_file(format!("{}.npy", name), options).unwrap();
        zip.write_all(&npy_bytes(shape, data, float32)).unwrap();
    }
    zip.finish().unwrap();
}

/// Row-major `[1, C, N]` layout of per-frame vectors.
pub fn frames_to_columns(frames: &[Vec<f64>]) -> Vec<f64> {
    let components = frames.first().map_or(0, |f| f.len());
    (0..components)
        .flat_map(|c| frames.iter().map(move |f| f[c]))
        .collect()
}

pub struct GaussFixture {
    pub translations: Vec<Vec<f64>>,
    pub rotations: Vec<Vec<f64>>,
    pub means: Vec<[f64; 3]>,
    pub colors: Vec<[f64; 3]>,
    pub layout: NpzLayout,
}

impl Default for GaussFixture {
    fn default() -> Self {
        Self {
            translations: vec![
                vec![0.5, -1.25, 2.0],
                vec![0.1, 0.2, 0.3],
                vec![-7.0, 8.5, 1e-3],
            ],
            rotations: vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.5, 0.5, 0.5, 0.5],
                vec![0.0, 0.0, 0.0, 1.0],
            ],
            means: vec![[1.0, 2.0, 3.0], [0.25, -0.5, 4.75]],
            colors: vec![[1.0, 0.0, 0.5], [0.2, 0.4, 0.6]],
            layout: NpzLayout::StoredF8,
        }
    }
}

/// Lay out an active-gauss shard under `root/<name>`.
pub fn write_gauss_shard(root: &Path, name: &str, fixture: &GaussFixture) -> PathBuf {
    let shard = root.join(name);
    let data = shard.join("gaussians_data");
    let rgb = data.join("rgb");
    fs::create_dir_all(&rgb).unwrap();
    for i in 0..fixture.translations.len() {
        fs::write(rgb.join(format!("{:04}.png", i)), format!("image {}", i)).unwrap();
    }

    let frames = fixture.translations.len();
    let rot_frames = fixture.rotations.len();
    write_npz(
        &data.join("params.npz"),
        &[
            ("cam_trans", vec![1, 3, frames], frames_to_columns(&fixture.translations)),
            (
                "cam_unnorm_rots",
                vec![1, 4, rot_frames],
                frames_to_columns(&fixture.rotations),
            ),
            (
                "means3D",
                vec![fixture.means.len(), 3],
                fixture.means.iter().flatten().copied().collect(),
            ),
            (
                "rgb_colors",
                vec![fixture.colors.len(), 3],
                fixture.colors.iter().flatten().copied().collect(),
            ),
        ],
        fixture.layout,
    );
    fs::write(
        data.join("transforms.json"),
        r#"{"w": 640, "h": 480, "fl_x": 500.0, "fl_y": 501.5, "cx": 320.0, "cy": 240.0, "frames": []}"#,
    )
    .unwrap();
    shard
}

/// Write a point format 2 (RGB) LAS file.
pub fn write_las(path: &Path, points: &[([f64; 3], [u16; 3])]) {
    use las::Write as _;

    let mut builder = las::Builder::from((1, 2));
    builder.point_format = las::point::Format::new(2).unwrap();
    let header = builder.into_header().unwrap();
    let mut writer = las::Writer::from_path(path, header).unwrap();
    for ([x, y, z], [r, g, b]) in points {
        writer
            .write(las::Point {
                x: *x,
                y: *y,
                z: *z,
                color: Some(las::Color::new(*r, *g, *b)),
                ..Default::default()
            })
            .unwrap();
    }
    writer.close().unwrap();
}

/// Lay out a lixel-l1 shard with five pose records named `frame_<i>.jpg`; masks
/// exist only for the records listed in `masked`.
pub fn write_lixel_shard(root: &Path, name: &str, masked: &[usize], colors: &[[u16; 3]]) -> PathBuf {
    let shard = root.join(name);
    let images = shard.join("reconstruct").join("images");
    fs::create_dir_all(&images).unwrap();
    for i in 0..5 {
        fs::write(images.join(format!("frame_{}.jpg", i)), b"jpg").unwrap();
    }
    for direction in 0..6 {
        fs::create_dir_all(shard.join("videos").join(direction.to_string()).join("masks")).unwrap();
    }
    for &i in masked {
        let dir = shard.join("videos").join((i % 6).to_string()).join("masks");
        fs::write(dir.join(format!("frame_{}.jpg", i)), b"mask").unwrap();
    }

    let lidar = shard.join("lidar_map");
    fs::create_dir_all(&lidar).unwrap();
    let records: Vec<String> = (0..5)
        .map(|i| {
            format!(
                r#"{{"name": "frame_{i}.jpg", "qw": 1.0, "qx": 0.0, "qy": 0.0, "qz": 0.0, "tx": {i}.5, "ty": 0.0, "tz": -1.0}}"#
            )
        })
        .collect();
    fs::write(
        lidar.join("l3i.json"),
        format!(
            r#"{{"camera": {{"fx_": 800.0, "fy_": 801.0, "cx_": 960.0, "cy_": 959.5}}, "images_data": [{}]}}"#,
            records.join(", ")
        ),
    )
    .unwrap();

    let points: Vec<([f64; 3], [u16; 3])> = colors
        .iter()
        .enumerate()
        .map(|(i, c)| ([i as f64, 1.5, -3.25], *c))
        .collect();
    write_las(&lidar.join("color_map_online_instan360_sfm_opt.las"), &points);
    shard
}

/// Non-blank lines of a text file.
pub fn content_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}
