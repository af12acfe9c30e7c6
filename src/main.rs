use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use orbitviews::{
    gfx::{
        lighting::LightingRig,
        rendering::{create_renderer, BackendPreference},
    },
    manifest::{self, AssetManifest},
    pipeline::{completion, driver::slice_range, UidOutcome},
    BatchDriver, BatchOptions, PolicyKind, Preset, RenderSettings,
};

/// Render canonical seven-view orbits of 3D assets.
#[derive(Debug, Parser)]
#[command(name = "orbitviews", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render every uid of a manifest slice that is not complete yet.
    Render(RenderArgs),
    /// Write `{"all": [...]}` listing the complete uid directories.
    Annotate {
        #[arg(long)]
        output_root: PathBuf,
        #[arg(long, default_value = "annotation.json")]
        out: PathBuf,
    },
    /// Write a sorted JSON array of every uid directory.
    ListUids {
        #[arg(long)]
        output_root: PathBuf,
        #[arg(long, default_value = "uids.json")]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// JSON object mapping uid to asset path.
    #[arg(long)]
    manifest: PathBuf,
    #[arg(long)]
    output_root: PathBuf,
    #[arg(long, value_enum, default_value_t = Preset::ThreePoint256)]
    preset: Preset,
    /// Settings JSON; replaces the preset's settings, missing fields keep defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pose policy; defaults to the preset's.
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,
    #[arg(long, value_enum, default_value_t = BackendPreference::Auto)]
    backend: BackendPreference,
    #[arg(long)]
    resolution: Option<u32>,
    #[arg(long)]
    samples: Option<u32>,
    /// Vertical field of view in degrees.
    #[arg(long)]
    fov: Option<f32>,
    /// Camera distance safety factor.
    #[arg(long)]
    margin: Option<f32>,
    #[arg(long, value_enum)]
    lighting: Option<LightingRig>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 0)]
    start: usize,
    #[arg(long)]
    end: Option<usize>,
}

impl RenderArgs {
    fn settings(&self) -> Result<RenderSettings> {
        let mut settings = match &self.config {
            Some(path) => RenderSettings::from_json_file(path)
                .with_context(|| format!("reading render settings {}", path.display()))?,
            None => self.preset.settings(),
        };
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(samples) = self.samples {
            settings.samples = samples;
        }
        if let Some(fov) = self.fov {
            settings.fov_degrees = fov;
        }
        if let Some(margin) = self.margin {
            settings.radius_margin = margin;
        }
        if let Some(lighting) = self.lighting {
            settings.lighting = lighting;
        }
        anyhow::ensure!(settings.resolution > 0, "resolution must be positive");
        anyhow::ensure!(
            settings.fov_degrees > 0.0 && settings.fov_degrees < 180.0,
            "field of view must be within (0, 180) degrees"
        );
        Ok(settings)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Render(args) => render(args),
        Command::Annotate { output_root, out } => {
            let uids = completion::scan_complete(&output_root)
                .with_context(|| format!("scanning {}", output_root.display()))?;
            manifest::write_annotation(&out, &uids)?;
            log::info!("{} complete uids written to {}", uids.len(), out.display());
            Ok(())
        }
        Command::ListUids { output_root, out } => {
            let uids = completion::list_uid_dirs(&output_root)
                .with_context(|| format!("scanning {}", output_root.display()))?;
            manifest::write_uid_list(&out, &uids)?;
            log::info!("{} uids written to {}", uids.len(), out.display());
            Ok(())
        }
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let settings = args.settings()?;
    let manifest = AssetManifest::load(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    std::fs::create_dir_all(&args.output_root)
        .with_context(|| format!("creating output root {}", args.output_root.display()))?;

    let policy = args.policy.unwrap_or(args.preset.policy()).build(&settings);
    let renderer = create_renderer(args.backend);
    let mut driver = BatchDriver::new(renderer, policy, settings);

    let options = BatchOptions {
        output_root: args.output_root,
        start: args.start,
        end: args.end,
        seed: args.seed,
    };

    let range = slice_range(manifest.len(), options.start, options.end);
    let pb = ProgressBar::new(range.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.green/blue}] {pos}/{len} uids ({percent}%) {msg}")?
            .progress_chars("█▉▊▋▌▍▎▏"),
    );

    let report = driver.run_with_progress(&manifest, &options, |uid, outcome| {
        let status = match outcome {
            UidOutcome::Rendered(_) => "rendered",
            UidOutcome::Skipped => "skipped",
            UidOutcome::Failed(_) => "failed",
        };
        pb.set_message(format!("{uid} {status}"));
        pb.inc(1);
    });
    pb.finish_with_message(format!(
        "{} rendered, {} skipped, {} failed",
        report.rendered.len(),
        report.skipped.len(),
        report.failed.len()
    ));

    for (uid, err) in &report.failed {
        log::warn!("failed: {uid}: {err}");
    }
    Ok(())
}
