//! End-to-end batch runs on the CPU rasterizer with tiny OBJ fixtures.

use std::{
    fs,
    path::{Path, PathBuf},
};

use orbitviews::{
    gfx::{lighting::LightingRig, rendering::SoftwareRenderer},
    manifest::{self, AssetManifest},
    pipeline::{completion, PosePolicy, RandomQueryPolicy},
    BatchDriver, BatchOptions, PolicyKind, RenderSettings,
};

/// A 4 x 2 x 1 box away from the origin, so normalization has work to do.
const BOX_OBJ: &str = "\
v 2 2 2
v 6 2 2
v 6 4 2
v 2 4 2
v 2 2 3
v 6 2 3
v 6 4 3
v 2 4 3
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 2 3 7
f 2 7 6
f 3 4 8
f 3 8 7
f 4 1 5
f 4 5 8
";

/// One triangle whose corners coincide.
const DEGENERATE_OBJ: &str = "v 1 1 1\nv 1 1 1\nv 1 1 1\nf 1 2 3\n";

fn settings() -> RenderSettings {
    RenderSettings {
        resolution: 16,
        samples: 1,
        denoise: false,
        ..RenderSettings::default()
    }
}

fn driver(policy: PolicyKind) -> BatchDriver {
    let settings = settings();
    BatchDriver::new(
        Box::new(SoftwareRenderer::new()),
        policy.build(&settings),
        settings,
    )
}

fn write_asset(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn view_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn renders_seven_numbered_views() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("box", write_asset(assets.path(), "box.obj", BOX_OBJ));

    let report = driver(PolicyKind::FixedOffset).run(&manifest, &BatchOptions::new(out.path()));

    assert_eq!(report.rendered, vec!["box"]);
    let dir = out.path().join("box");
    assert_eq!(
        view_names(&dir),
        vec!["000.png", "001.png", "002.png", "003.png", "004.png", "005.png", "006.png"]
    );
    let image = image::open(dir.join("000.png")).unwrap();
    assert_eq!((image.width(), image.height()), (16, 16));
    assert!(image.color().has_alpha());
}

#[test]
fn second_run_renders_nothing() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("a", write_asset(assets.path(), "a.obj", BOX_OBJ));
    manifest.insert("b", write_asset(assets.path(), "b.obj", BOX_OBJ));
    let options = BatchOptions::new(out.path());

    let first = driver(PolicyKind::FixedOffset).run(&manifest, &options);
    assert_eq!(first.rendered, vec!["a", "b"]);

    let second = driver(PolicyKind::FixedOffset).run(&manifest, &options);
    assert!(second.rendered.is_empty());
    assert_eq!(second.skipped, vec!["a", "b"]);
}

#[test]
fn missing_asset_does_not_stop_the_batch() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("uid-1", write_asset(assets.path(), "one.obj", BOX_OBJ));
    manifest.insert("uid-2", assets.path().join("gone.obj"));
    manifest.insert("uid-3", write_asset(assets.path(), "three.obj", BOX_OBJ));

    let report = driver(PolicyKind::FixedOffset).run(&manifest, &BatchOptions::new(out.path()));

    assert_eq!(report.rendered, vec!["uid-1", "uid-3"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "uid-2");
    assert!(completion::is_complete(&out.path().join("uid-1")));
    assert!(completion::is_complete(&out.path().join("uid-3")));
    assert!(!out.path().join("uid-2").exists());
}

#[test]
fn degenerate_asset_leaves_no_directory() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("flat", write_asset(assets.path(), "flat.obj", DEGENERATE_OBJ));
    manifest.insert("ok", write_asset(assets.path(), "ok.obj", BOX_OBJ));

    let report = driver(PolicyKind::FixedOffset).run(&manifest, &BatchOptions::new(out.path()));

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "flat");
    assert!(report.failed[0].1.contains("degenerate"));
    assert!(!out.path().join("flat").exists());
    assert_eq!(report.rendered, vec!["ok"]);
}

#[test]
fn six_views_are_rerendered_seven_are_skipped() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("partial", write_asset(assets.path(), "p.obj", BOX_OBJ));
    manifest.insert("done", write_asset(assets.path(), "d.obj", BOX_OBJ));

    for (uid, count) in [("partial", 6), ("done", 7)] {
        let dir = out.path().join(uid);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            fs::write(dir.join(format!("{i:03}.png")), b"placeholder").unwrap();
        }
    }

    let report = driver(PolicyKind::FixedOffset).run(&manifest, &BatchOptions::new(out.path()));

    assert_eq!(report.rendered, vec!["partial"]);
    assert_eq!(report.skipped, vec!["done"]);
    // Skipped outputs are not inspected or rewritten.
    assert_eq!(fs::read(out.path().join("done/000.png")).unwrap(), b"placeholder");
    assert!(image::open(out.path().join("partial/005.png")).is_ok());
}

#[test]
fn slice_selects_sorted_range() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    for uid in ["c", "a", "d", "b"] {
        manifest.insert(uid, write_asset(assets.path(), &format!("{uid}.obj"), BOX_OBJ));
    }
    let options = BatchOptions {
        start: 1,
        end: Some(3),
        ..BatchOptions::new(out.path())
    };

    let report = driver(PolicyKind::FixedOffset).run(&manifest, &options);
    assert_eq!(report.rendered, vec!["b", "c"]);
    assert_eq!(report.processed(), 2);

    let past_end = BatchOptions {
        start: 10,
        end: Some(20),
        ..BatchOptions::new(out.path())
    };
    assert_eq!(driver(PolicyKind::FixedOffset).run(&manifest, &past_end).processed(), 0);
}

#[test]
fn random_query_views_are_reproducible() {
    let assets = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("box", write_asset(assets.path(), "box.obj", BOX_OBJ));

    let render = |seed: u64| {
        let out = tempfile::tempdir().unwrap();
        let options = BatchOptions {
            seed,
            ..BatchOptions::new(out.path())
        };
        let report = driver(PolicyKind::RandomQuery).run(&manifest, &options);
        assert_eq!(report.rendered, vec!["box"]);
        (0..7)
            .map(|i| fs::read(out.path().join(format!("box/{i:03}.png"))).unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(render(5), render(5));
}

#[test]
fn random_query_plan_depends_on_uid_seed() {
    use orbitviews::pipeline::driver::uid_seed;
    use rand::{rngs::StdRng, SeedableRng};

    let policy = RandomQueryPolicy::default();
    let plan = |uid: &str| policy.plan(1.0, &mut StdRng::seed_from_u64(uid_seed(uid, 0)));
    assert_eq!(plan("x"), plan("x"));
    assert_ne!(plan("x"), plan("y"));
}

#[test]
fn camera_light_preset_renders() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("box", write_asset(assets.path(), "box.obj", BOX_OBJ));

    let settings = RenderSettings {
        lighting: LightingRig::CameraLight,
        ..settings()
    };
    let mut driver = BatchDriver::new(
        Box::new(SoftwareRenderer::new()),
        PolicyKind::FixedOffset.build(&settings),
        settings,
    );
    let report = driver.run(&manifest, &BatchOptions::new(out.path()));
    assert_eq!(report.rendered, vec!["box"]);

    // The box covers part of the condition view and leaves the corners clear.
    let image = image::open(out.path().join("box/000.png")).unwrap().to_rgba8();
    assert_eq!(image.get_pixel(0, 0)[3], 0);
    assert!(image.pixels().any(|p| p[3] == 255));
}

#[test]
fn index_files_follow_the_output_root() {
    let assets = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manifest = AssetManifest::default();
    manifest.insert("b", write_asset(assets.path(), "b.obj", BOX_OBJ));
    manifest.insert("a", write_asset(assets.path(), "a.obj", BOX_OBJ));
    driver(PolicyKind::FixedOffset).run(&manifest, &BatchOptions::new(out.path()));
    fs::create_dir(out.path().join("unfinished")).unwrap();

    let annotation = assets.path().join("annotation.json");
    manifest::write_annotation(&annotation, &completion::scan_complete(out.path()).unwrap())
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&annotation).unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({ "all": ["a", "b"] }));

    let list = assets.path().join("uids.json");
    manifest::write_uid_list(&list, &completion::list_uid_dirs(out.path()).unwrap()).unwrap();
    let uids: Vec<String> = serde_json::from_str(&fs::read_to_string(&list).unwrap()).unwrap();
    assert_eq!(uids, vec!["a", "b", "unfinished"]);
}
