use indicatif::{ProgressBar, ProgressStyle};
use jwalk::{Parallelism, WalkDir};
use log::debug;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::types::PROCESSED_MARKER;

/// Read and parse a JSON file directly from a buffered file stream.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConvertError> {
    let file = fs::File::open(path).map_err(|e| ConvertError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConvertError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
            label
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Build a rayon pool with `workers` threads; `0` means one per available core.
pub fn create_thread_pool(workers: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("shard-worker-{}", i))
        .build()
}

pub fn create_dir_all(path: &Path) -> Result<(), ConvertError> {
    fs::create_dir_all(path).map_err(|e| ConvertError::io(path, e))
}

/// Replace `dst` with a recursive copy of `src`.
///
/// Overwrite contract: any existing `dst` tree is deleted first, so files that only
/// exist in a previous output do not survive a re-run.
///
/// The walk is serial: this runs on batch workers, and jwalk's default rayon pool
/// gives up when every thread of the calling pool is busy.
pub fn replace_dir_with_copy(src: &Path, dst: &Path) -> Result<usize, ConvertError> {
    if !src.is_dir() {
        return Err(ConvertError::MissingInput {
            path: src.to_path_buf(),
        });
    }
    if dst.exists() {
        debug!("Removing existing directory {}", dst.display());
        fs::remove_dir_all(dst).map_err(|e| ConvertError::io(dst, e))?;
    }
    create_dir_all(dst)?;

    let mut copied = 0;
    let walker = WalkDir::new(src)
        .skip_hidden(false)
        .sort(true)
        .parallelism(Parallelism::Serial);
    for entry in walker {
        let entry = entry.map_err(|e| ConvertError::Io {
            path: src.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
        let path = entry.path();
        let relative = match path.strip_prefix(src) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => continue,
        };
        let target = dst.join(&relative);
        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else {
            fs::copy(&path, &target).map_err(|e| ConvertError::io(&path, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy the regular files of `src` (non-recursive) into `dst`.
///
/// Merge contract: `dst` is created if missing and kept otherwise; a file with the
/// same name is overwritten, so the last source merged wins.
pub fn merge_files_into(src: &Path, dst: &Path) -> Result<usize, ConvertError> {
    create_dir_all(dst)?;
    let entries = fs::read_dir(src).map_err(|e| ConvertError::io(src, e))?;
    let mut copied = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io(src, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        fs::copy(&path, dst.join(entry.file_name())).map_err(|e| ConvertError::io(&path, e))?;
        copied += 1;
    }
    Ok(copied)
}

/// Write `contents` to `path` via a sibling temporary file and a rename, so readers
/// never observe a partially written file.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), ConvertError> {
    let tmp_path = tmp_sibling(path);
    let mut file = fs::File::create(&tmp_path).map_err(|e| ConvertError::io(&tmp_path, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| ConvertError::io(&tmp_path, e))?;
    drop(file);
    fs::rename(&tmp_path, path).map_err(|e| ConvertError::io(path, e))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the `processed` marker into `shard_dir` with a human readable timestamp.
pub fn write_processed_marker(shard_dir: &Path) -> Result<PathBuf, ConvertError> {
    let path = shard_dir.join(PROCESSED_MARKER);
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    write_atomically(&path, format!("Processed at {}", stamp).as_bytes())?;
    Ok(path)
}

/// Format a float the way the sparse text files expect: shortest round-trip digits,
/// with `.0` appended to integral values.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Widen a float32 to the f64 nearest its shortest decimal form, so [`format_float`]
/// prints the float32 digits (`0.1`, not `0.10000000149011612`).
pub fn widen_f32(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}
