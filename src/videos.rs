//! Split a lixel-l1 shard's flat `reconstruct/images` into per-direction
//! `videos/<direction>/{images,masks}` trees of links.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::utils::create_dir_all;

/// Camera direction token of a reconstructed image named `<a>_<b>_<direction>.<ext>`.
pub fn direction_of(file_name: &str) -> Result<&str, ConvertError> {
    let stem = file_name.split('.').next().unwrap_or_default();
    let tokens: Vec<&str> = stem.split('_').collect();
    match tokens.as_slice() {
        [_, _, direction] if !direction.is_empty() => Ok(*direction),
        _ => Err(ConvertError::schema(format!(
            "image name {} does not look like <frame>_<time>_<direction>",
            file_name
        ))),
    }
}

#[cfg(unix)]
fn link(target: &Path, link_path: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

// Hard links need the resolved source rather than a relative target
#[cfg(not(unix))]
fn link(target: &Path, link_path: &Path) -> std::io::Result<()> {
    let resolved = link_path
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf());
    fs::hard_link(resolved, link_path)
}

/// Materialize the video directories of one shard and return the number of links
/// created. Existing links are replaced.
pub fn materialize_videos(shard_dir: &Path) -> Result<usize, ConvertError> {
    let images_dir = shard_dir.join("reconstruct").join("images");
    let videos_dir = shard_dir.join("videos");
    let entries = fs::read_dir(&images_dir).map_err(|e| ConvertError::io(&images_dir, e))?;

    let mut linked = 0;
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io(&images_dir, e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let direction = direction_of(name)?;

        let direction_dir = videos_dir.join(direction);
        let images_out = direction_dir.join("images");
        create_dir_all(&images_out)?;
        create_dir_all(&direction_dir.join("masks"))?;

        // videos/<direction>/images -> ../../../reconstruct/images/<name>
        let target: PathBuf = ["..", "..", "..", "reconstruct", "images", name]
            .iter()
            .collect();
        let link_path = images_out.join(name);
        if fs::symlink_metadata(&link_path).is_ok() {
            fs::remove_file(&link_path).map_err(|e| ConvertError::io(&link_path, e))?;
        }
        link(&target, &link_path).map_err(|e| ConvertError::io(&link_path, e))?;
        linked += 1;
    }
    info!("Linked {} images under {}", linked, videos_dir.display());
    Ok(linked)
}
