use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use shard2colmap::config::BatchOptions;
use shard2colmap::{
    find_shard_names, generate_masks_dir, masks, materialize_videos_dir, run_batch, videos,
    ConvertError, MaskTask, Sentinel, Shard, ShardStatus, UnitOutcome,
};

fn shards(root: &Path, names: &[&str]) -> Vec<Shard> {
    names.iter().map(|n| Shard::new(n, root, root)).collect()
}

#[test]
fn test_find_shard_names_filters_processed() {
    let root = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::create_dir(root.path().join(name)).unwrap();
    }
    fs::write(root.path().join("b/processed"), "Processed at 2024-01-01 00:00:00").unwrap();
    fs::write(root.path().join("not_a_dir.txt"), "").unwrap();

    let mut filtered = find_shard_names(root.path(), true, Sentinel::ProcessedMarker).unwrap();
    filtered.sort();
    let mut all = find_shard_names(root.path(), false, Sentinel::ProcessedMarker).unwrap();
    all.sort();

    assert_eq!(filtered, vec!["a", "c"]);
    assert_eq!(all, vec!["a", "b", "c"]);
}

#[test]
fn test_find_shard_names_with_videos_sentinel() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("a/videos")).unwrap();
    fs::create_dir_all(root.path().join("b")).unwrap();
    fs::write(root.path().join("b/processed"), "").unwrap();

    let names = find_shard_names(root.path(), true, Sentinel::VideosDir).unwrap();

    assert_eq!(names, vec!["b"]);
}

#[test]
fn test_find_shard_names_missing_root() {
    let root = tempfile::tempdir().unwrap();
    let err = find_shard_names(&root.path().join("nope"), true, Sentinel::ProcessedMarker);
    assert!(matches!(err, Err(ConvertError::MissingInput { .. })));
}

#[test]
fn test_run_batch_collects_every_failure() {
    let root = tempfile::tempdir().unwrap();
    let units = shards(root.path(), &["ok0", "bad1", "ok2", "bad3", "ok4"]);
    let calls = AtomicUsize::new(0);

    let err = run_batch(&units, &BatchOptions::default(), "Test", |shard| {
        calls.fetch_add(1, Ordering::SeqCst);
        if shard.name.starts_with("bad") {
            Err(ConvertError::schema(format!("{} is broken", shard.name)))
        } else {
            Ok(())
        }
    })
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    let mut failed: Vec<_> = err.failed_ids().collect();
    failed.sort();
    assert_eq!(failed, vec!["bad1", "bad3"]);
    assert_eq!(err.report.total(), 5);
    assert_eq!(err.report.count(UnitOutcome::Succeeded), 3);
    assert_eq!(err.report.status_of("bad1"), Some(ShardStatus::Failed));
    assert_eq!(err.report.status_of("ok2"), Some(ShardStatus::Processed));
}

#[test]
fn test_run_batch_success_report() {
    let root = tempfile::tempdir().unwrap();
    let units = shards(root.path(), &["a", "b", "c"]);
    let options = BatchOptions {
        workers: 2,
        fail_fast: false,
    };

    let report = run_batch(&units, &options, "Test", |_| Ok(())).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.count(UnitOutcome::Succeeded), 3);
}

#[test]
fn test_run_batch_empty() {
    let units: Vec<Shard> = Vec::new();
    let report = run_batch(&units, &BatchOptions::default(), "Test", |_| Ok(())).unwrap();
    assert_eq!(report.total(), 0);
}

#[test]
fn test_run_batch_catches_panics() {
    let root = tempfile::tempdir().unwrap();
    let units = shards(root.path(), &["fine", "explodes"]);

    let err = run_batch(&units, &BatchOptions::default(), "Test", |shard| {
        if shard.name == "explodes" {
            panic!("boom");
        }
        Ok(())
    })
    .unwrap_err();

    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].0, "explodes");
    assert!(matches!(&err.failures[0].1, ConvertError::Panicked(msg) if msg == "boom"));
    assert_eq!(err.report.status_of("fine"), Some(ShardStatus::Processed));
}

#[test]
fn test_run_batch_fail_fast_accounts_for_every_unit() {
    let root = tempfile::tempdir().unwrap();
    let names: Vec<String> = (0..20).map(|i| format!("s{:02}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let units = shards(root.path(), &name_refs);
    let started = AtomicUsize::new(0);
    let options = BatchOptions {
        workers: 1,
        fail_fast: true,
    };

    let err = run_batch(&units, &options, "Test", |_| {
        started.fetch_add(1, Ordering::SeqCst);
        Err(ConvertError::schema("always fails"))
    })
    .unwrap_err();

    let report = &err.report;
    assert_eq!(report.total(), 20);
    assert_eq!(report.count(UnitOutcome::Failed), err.failures.len());
    assert_eq!(
        report.count(UnitOutcome::Failed) + report.count(UnitOutcome::Cancelled),
        20
    );
    assert_eq!(started.load(Ordering::SeqCst), err.failures.len());
    assert!(!err.failures.is_empty());
}

fn write_annotation(path: &Path, width: u32, height: u32) {
    fs::write(
        path,
        format!(
            r#"{{"version": "5.0.1", "flags": {{}}, "shapes": [{{"label": "car", "points": [[2.0, 2.0], [20.5, 2.0], [20.5, 14.9], [2.0, 14.9]], "group_id": null, "shape_type": "polygon"}}], "imagePath": "a.jpg", "imageData": null, "imageHeight": {}, "imageWidth": {}}}"#,
            height, width
        ),
    )
    .unwrap();
}

fn make_video_dirs(shard: &Path) {
    for direction in 0..6 {
        fs::create_dir_all(shard.join(format!("videos/{}/images", direction))).unwrap();
    }
}

#[test]
fn test_generate_mask_tasks() {
    let root = tempfile::tempdir().unwrap();
    let shard = root.path().join("site");
    make_video_dirs(&shard);
    let images = shard.join("videos/1/images");
    fs::write(images.join("a.jpg"), b"jpg").unwrap();
    write_annotation(&images.join("a.json"), 8, 6);
    fs::write(images.join("b.jpg"), b"jpg").unwrap();
    write_annotation(&shard.join("videos/2/images/c.json"), 8, 6);

    let tasks = masks::generate_tasks(&shard, true).unwrap();

    assert_eq!(
        tasks,
        vec![MaskTask {
            annotation_path: images.join("a.json"),
            mask_path: shard.join("videos/1/masks/a.jpg"),
        }]
    );
    for direction in 0..6 {
        assert!(shard.join(format!("videos/{}/masks", direction)).is_dir());
    }

    fs::write(shard.join("videos/1/masks/a.jpg"), b"old").unwrap();
    assert!(masks::generate_tasks(&shard, true).unwrap().is_empty());
    assert_eq!(masks::generate_tasks(&shard, false).unwrap().len(), 1);
}

#[test]
fn test_generate_mask_tasks_without_videos() {
    let root = tempfile::tempdir().unwrap();
    assert!(masks::generate_tasks(root.path(), true).unwrap().is_empty());
}

#[test]
fn test_generate_masks_dir_writes_images() {
    let root = tempfile::tempdir().unwrap();
    let shard = root.path().join("site");
    make_video_dirs(&shard);
    let images = shard.join("videos/3/images");
    fs::write(images.join("a.jpg"), b"jpg").unwrap();
    write_annotation(&images.join("a.json"), 32, 24);

    let report = generate_masks_dir(root.path(), true, &BatchOptions::default()).unwrap();

    assert_eq!(report.total(), 1);
    let mask = image::open(shard.join("videos/3/masks/a.jpg")).unwrap().to_luma8();
    assert_eq!(mask.dimensions(), (32, 24));
    // JPEG is lossy, so only check well inside and well outside the polygon
    assert!(mask.get_pixel(10, 8)[0] > 200);
    assert!(mask.get_pixel(28, 20)[0] < 60);
}

#[cfg(unix)]
#[test]
fn test_materialize_videos_links_by_direction() {
    let root = tempfile::tempdir().unwrap();
    let shard = root.path().join("site");
    let images = shard.join("reconstruct/images");
    fs::create_dir_all(&images).unwrap();
    fs::write(images.join("000001_1700000000_0.jpg"), b"front").unwrap();
    fs::write(images.join("000001_1700000000_4.jpg"), b"back").unwrap();
    fs::write(images.join("000002_1700000001_4.jpg"), b"back2").unwrap();

    let linked = videos::materialize_videos(&shard).unwrap();

    assert_eq!(linked, 3);
    let link = shard.join("videos/4/images/000002_1700000001_4.jpg");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&link).unwrap(), b"back2");
    assert!(shard.join("videos/0/masks").is_dir());
    assert!(shard.join("videos/4/masks").is_dir());
    assert!(!shard.join("videos/1").exists());

    // Running again replaces the links instead of failing
    assert_eq!(videos::materialize_videos(&shard).unwrap(), 3);
}

#[test]
fn test_materialize_videos_dir_skips_existing() {
    let root = tempfile::tempdir().unwrap();
    let done = root.path().join("done");
    fs::create_dir_all(done.join("videos")).unwrap();
    let todo = root.path().join("todo/reconstruct/images");
    fs::create_dir_all(&todo).unwrap();
    fs::write(todo.join("1_2_3.jpg"), b"x").unwrap();

    let report = materialize_videos_dir(root.path(), true, &BatchOptions::default()).unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(report.status_of("todo"), Some(ShardStatus::Processed));
    assert!(root.path().join("todo/videos/3/images").is_dir());
}

#[test]
fn test_materialize_videos_rejects_bad_names() {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("reconstruct/images");
    fs::create_dir_all(&images).unwrap();
    fs::write(images.join("unexpected.jpg"), b"x").unwrap();

    let err = videos::materialize_videos(root.path()).unwrap_err();

    assert!(matches!(err, ConvertError::SchemaViolation(_)));
}
