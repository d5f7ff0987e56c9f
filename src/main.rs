//! Replays recorded inference results through the tracker and the pose-action rules, printing
//! every event that fires.

use std::{collections::BTreeMap, path::PathBuf, time::Instant};

use anyhow::Context;
use clap::Parser;
use handtrack::{
    action::dispatch::Dispatcher, backend::Replay, config::Config, pipeline::Session,
};

#[derive(Parser, Debug)]
#[command(name = "handtrack", about = "Replays recorded hand tracking results")]
struct Cli {
    /// Recording in JSON Lines format, one frame per line
    replay: PathBuf,

    /// Configuration file with tracker settings and pose-action rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print tracker statistics and event counts when done
    #[arg(long)]
    stats: bool,
}

/// Number of events received per callback.
type Counts = BTreeMap<String, u64>;

fn main() -> anyhow::Result<()> {
    handtrack::init_logger!();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let replay = Replay::open(&cli.replay)
        .with_context(|| format!("failed to open {}", cli.replay.display()))?;

    let mut dispatcher = Dispatcher::<Counts>::new();
    dispatcher.set_fallback(|counts, event| {
        if let Some(callback) = &event.callback {
            *counts.entry(callback.clone()).or_default() += 1;
        }
    });

    let mut session = Session::from_config(replay, &config, dispatcher, Counts::new())?;
    log::info!(
        "replaying {} with {} pose actions",
        cli.replay.display(),
        session.engine().rules().len()
    );

    let mut start: Option<Instant> = None;
    let frames = session.run(|step| {
        let start = *start.get_or_insert(step.timestamp);
        let t = step.timestamp.saturating_duration_since(start).as_secs_f64();
        for event in &step.events {
            println!(
                "{t:.3}\t{}\t{}\t{}\t{}\t{}",
                event.rule,
                event.trigger,
                event.gesture,
                event.hand.as_str(),
                event.callback.as_deref().unwrap_or("-"),
            );
        }
    })?;

    log::info!("processed {frames} frames");
    if cli.stats {
        let stats = session.tracker().stats();
        println!("frames: {}", stats.frames);
        println!("frames without hand: {}", stats.frames_without_hand);
        println!("palm detections: {}", stats.palm_detections);
        println!("landmark regressions: {}", stats.landmark_regressions);
        println!(
            "landmark regressions on landmark ROI: {}",
            stats.landmark_roi_regressions
        );
        for (callback, count) in session.state() {
            println!("callback {callback}: {count}");
        }
    }

    Ok(())
}
