use std::{fs, path::Path};

use anyhow::{Context, Result};
use lineworker_core::{Session, SessionConfig};
use serde::Serialize;

mod cli;
mod plan;
mod runner;

use cli::PlanSource;
use plan::InputPlan;
use runner::Runner;

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::parse()?;

    let mut config = SessionConfig::from_json_file(args.config.as_deref())
        .context("loading session config")?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    let plan = match &args.source {
        PlanSource::Demo(slug) => InputPlan::demo(*slug),
        PlanSource::File(path) => InputPlan::from_json_file(path)?,
    };
    log::info!(
        "running plan {} ({} segments)",
        plan.label,
        plan.segments.len()
    );

    let session = Session::new(config).context("starting session")?;
    let mut runner = Runner::new(session, args.frame_dt, args.max_frames, args.verbose);
    let outcome = runner.run(&plan);

    // Logs are still useful when a plan aborts half way.
    if let Some(path) = args.event_log_json.as_ref() {
        persist_json(path, &runner.session().events())?;
        println!("Saved event log to {}", path.display());
    }
    if let Some(path) = args.movement_log_json.as_ref() {
        persist_json(path, &runner.samples())?;
        println!("Saved movement log to {}", path.display());
    }
    if let Some(path) = args.snapshot_json.as_ref() {
        persist_json(path, &runner.session().snapshot())?;
        println!("Saved session snapshot to {}", path.display());
    }

    outcome.with_context(|| format!("running input plan {}", plan.label))?;

    describe_session(runner.session());
    Ok(())
}

fn describe_session(session: &Session) {
    let tutorial = session.tutorial();
    let repaired = session
        .transformers()
        .iter()
        .filter(|transformer| !transformer.repairable)
        .count();

    println!("\nSession summary after {} frames:", session.frame());
    let truck = session.truck().position;
    println!("  truck at {:.2},{:.2},{:.2}", truck.x, truck.y, truck.z);
    println!(
        "  tutorial step {}/{}: {}",
        tutorial.step(),
        tutorial.len(),
        tutorial.message()
    );
    println!(
        "  transformers serviced: {}/{}",
        repaired,
        session.transformers().len()
    );
    match session.encounter() {
        Some(encounter) => println!(
            "  repair {} still open at stage {}",
            encounter.id(),
            encounter.stage()
        ),
        None => println!("  no repair open"),
    }
}

fn persist_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing JSON for {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))?;
    Ok(())
}
