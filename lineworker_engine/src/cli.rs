use std::path::PathBuf;

use anyhow::{bail, ensure, Result};
use clap::Parser;

use crate::plan::DemoSlug;

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that drives the lineworker tutorial with scripted input",
    version
)]
pub struct Args {
    /// Optional JSON session config (scene layout, tutorial text, delays)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Seed for the blown-fuse draw; overrides the config file
    #[arg(long)]
    pub seed: Option<u64>,

    /// Built-in input plan to run (tutorial, skip-steps, walkthrough)
    #[arg(long, value_name = "SLUG")]
    pub demo: Option<String>,

    /// JSON input plan to run instead of a built-in demo
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Seconds of simulated time per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub frame_dt: f32,

    /// Abort a plan that runs longer than this many frames
    #[arg(long, default_value_t = 20_000)]
    pub max_frames: u64,

    /// Path to write the session event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the per-frame truck trajectory as JSON
    #[arg(long)]
    pub movement_log_json: Option<PathBuf>,

    /// Path to write the final session snapshot as JSON
    #[arg(long)]
    pub snapshot_json: Option<PathBuf>,

    /// Print every frame's truck position
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum PlanSource {
    Demo(DemoSlug),
    File(PathBuf),
}

#[derive(Debug)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub source: PlanSource,
    pub frame_dt: f32,
    pub max_frames: u64,
    pub event_log_json: Option<PathBuf>,
    pub movement_log_json: Option<PathBuf>,
    pub snapshot_json: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse() -> Result<RunArgs> {
    let args = Args::parse();
    args.into_run_args()
}

impl Args {
    fn into_run_args(self) -> Result<RunArgs> {
        ensure!(
            self.frame_dt > 0.0,
            "--frame-dt must be positive (got {})",
            self.frame_dt
        );

        let source = match (self.demo, self.plan) {
            (Some(_), Some(_)) => bail!("--demo and --plan cannot be combined"),
            (Some(slug), None) => PlanSource::Demo(DemoSlug::parse(&slug)?),
            (None, Some(path)) => PlanSource::File(path),
            (None, None) => PlanSource::Demo(DemoSlug::Tutorial),
        };

        Ok(RunArgs {
            config: self.config,
            seed: self.seed,
            source,
            frame_dt: self.frame_dt,
            max_frames: self.max_frames,
            event_log_json: self.event_log_json,
            movement_log_json: self.movement_log_json,
            snapshot_json: self.snapshot_json,
            verbose: self.verbose,
        })
    }
}
