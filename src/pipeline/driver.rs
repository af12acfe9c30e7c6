//! Batch driver
//!
//! Walks a slice of the sorted manifest and runs import, normalization, pose
//! planning, composition and orbit rendering for every uid. Each uid is
//! isolated: an error or panic is logged with the uid and the batch moves on.

use std::{
    any::Any,
    fs,
    ops::Range,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::{
    config::{RenderSettings, TARGET_SIZE},
    error::PipelineError,
    gfx::{rendering::Renderer, scene::normalize_objects},
    import::import_asset,
    manifest::AssetManifest,
    pipeline::{
        completion::is_complete, compositor::compose_scene, orbit::render_orbit, poses::PosePolicy,
    },
};

/// Which part of the manifest to render and where.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub output_root: PathBuf,
    /// First index (inclusive) into the sorted manifest.
    pub start: usize,
    /// Last index (exclusive); `None` means the end of the manifest.
    pub end: Option<usize>,
    /// Base seed mixed into every uid's seed.
    pub seed: u64,
}

impl BatchOptions {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            start: 0,
            end: None,
            seed: 0,
        }
    }
}

/// What happened to one uid.
#[derive(Debug)]
pub enum UidOutcome {
    Rendered(Vec<PathBuf>),
    Skipped,
    Failed(PipelineError),
}

/// Uids grouped by outcome, each list in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rendered: Vec<String>,
    pub skipped: Vec<String>,
    /// `(uid, error message)`
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.rendered.len() + self.skipped.len() + self.failed.len()
    }
}

/// Clamps `[start, end)` to `len`; `start` never exceeds `end`.
pub fn slice_range(len: usize, start: usize, end: Option<usize>) -> Range<usize> {
    let end = end.map_or(len, |e| e.min(len));
    start.min(end)..end
}

/// FNV-1a 64 of `uid`, xor `base_seed`. Stable across runs and platforms.
pub fn uid_seed(uid: &str, base_seed: u64) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = uid.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    });
    hash ^ base_seed
}

pub struct BatchDriver {
    renderer: Box<dyn Renderer>,
    policy: Box<dyn PosePolicy>,
    settings: RenderSettings,
}

impl BatchDriver {
    pub fn new(
        renderer: Box<dyn Renderer>,
        policy: Box<dyn PosePolicy>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            renderer,
            policy,
            settings,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn run(&mut self, manifest: &AssetManifest, options: &BatchOptions) -> BatchReport {
        self.run_with_progress(manifest, options, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_uid` after every uid.
    pub fn run_with_progress<F>(
        &mut self,
        manifest: &AssetManifest,
        options: &BatchOptions,
        mut on_uid: F,
    ) -> BatchReport
    where
        F: FnMut(&str, &UidOutcome),
    {
        let range = slice_range(manifest.len(), options.start, options.end);
        log::info!(
            "rendering uids [{}, {}) of {} with {} poses, backend {}",
            range.start,
            range.end,
            manifest.len(),
            self.policy.name(),
            self.renderer.backend()
        );

        let mut report = BatchReport::default();
        for (uid, path) in manifest
            .iter()
            .skip(range.start)
            .take(range.end - range.start)
        {
            let outcome = self.process_isolated(uid, path, options);
            match &outcome {
                UidOutcome::Rendered(_) => report.rendered.push(uid.to_string()),
                UidOutcome::Skipped => report.skipped.push(uid.to_string()),
                UidOutcome::Failed(err) => {
                    log::warn!("{uid}: {err}");
                    report.failed.push((uid.to_string(), err.to_string()));
                }
            }
            on_uid(uid, &outcome);
        }

        log::info!(
            "batch finished: {} rendered, {} skipped, {} failed",
            report.rendered.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    fn process_isolated(&mut self, uid: &str, path: &Path, options: &BatchOptions) -> UidOutcome {
        let out_dir = options.output_root.join(uid);
        if is_complete(&out_dir) {
            log::debug!("{uid}: already complete, skipping");
            return UidOutcome::Skipped;
        }

        log::info!("{uid}: rendering {}", path.display());
        let seed = uid_seed(uid, options.seed);
        match panic::catch_unwind(AssertUnwindSafe(|| self.process(path, &out_dir, seed))) {
            Ok(Ok(written)) => {
                log::info!("{uid}: wrote {} views", written.len());
                UidOutcome::Rendered(written)
            }
            Ok(Err(err)) => UidOutcome::Failed(err),
            Err(payload) => UidOutcome::Failed(PipelineError::Panicked(panic_message(&*payload))),
        }
    }

    fn process(
        &mut self,
        path: &Path,
        out_dir: &Path,
        seed: u64,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let mut objects = vec![import_asset(path)?];
        let normalization = normalize_objects(&mut objects, TARGET_SIZE)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let poses = self.policy.plan(normalization.original_max_dim, &mut rng);

        let mut scene = compose_scene(objects.remove(0), &self.settings);
        fs::create_dir_all(out_dir)?;
        Ok(render_orbit(self.renderer.as_mut(), &mut scene, &poses, out_dir)?)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
