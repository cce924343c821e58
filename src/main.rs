// chasebeat — headless demo runner.
//
// Plays a chart through the solo engine on a silent output with a driven
// clock, so the whole judge/score/chase pipeline can be exercised without
// a presentation layer.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use chasebeat::audio::SilentOutput;
use chasebeat::chart::{ChartLibrary, Difficulty, FsChartLibrary};
use chasebeat::clock::MockTimeProvider;
use chasebeat::config::GameSettings;
use chasebeat::engine::{Engine, InputKind, SoloEngine};
use chasebeat::engine::EngineState;
use chasebeat::util::logging::init_logging;

const STEP_MS: f64 = 5.0;

#[derive(Parser, Debug)]
#[command(name = "chasebeat", about = "Chase rhythm game engine (headless demo)")]
struct Args {
    /// Path to a .chart file.
    chart: PathBuf,

    /// Difficulty section to play (defaults to the saved setting).
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Hit every note exactly on time instead of missing everything.
    #[arg(long)]
    autoplay: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(None, args.verbose)?;

    let settings = GameSettings::load();
    let difficulty = args.difficulty.unwrap_or(settings.difficulty);

    let dir = args
        .chart
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let Some(chart_id) = args.chart.file_stem().and_then(|s| s.to_str()) else {
        bail!("chart path has no file name: {}", args.chart.display());
    };

    let chart = FsChartLibrary::new(&dir, difficulty)
        .load(chart_id)
        .with_context(|| format!("loading {}", args.chart.display()))?;
    info!(
        name = chart.metadata.name,
        notes = chart.note_count(),
        bpm = chart.tempo.initial_bpm(),
        ?difficulty,
        "starting demo run"
    );

    // Scripted inputs: on-time hits, full-length sustain releases.
    let mut script: Vec<(f64, InputKind)> = Vec::new();
    if args.autoplay {
        for note in &chart.notes {
            script.push((note.time_ms, InputKind::Hit { lane: note.lane }));
            if note.is_sustain() {
                script.push((note.end_ms(), InputKind::Release { lane: note.lane }));
            }
        }
        script.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let time = MockTimeProvider::new();
    let mut engine = SoloEngine::new(
        Box::new(FsChartLibrary::new(&dir, difficulty)),
        Box::new(SilentOutput::with_time(time.clone())),
    );
    engine.set_volume(settings.volume);
    engine.start(chart_id)?;

    let mut next_event = 0;
    let mut now = 0.0;
    let deadline = chart.duration_ms() + 1_000.0;
    while engine.state() == EngineState::Running && now <= deadline {
        time.set_time(now);
        while next_event < script.len() && script[next_event].0 <= now {
            engine.handle_input(script[next_event].1);
            next_event += 1;
        }
        engine.update()?;
        now += STEP_MS;
    }
    engine.stop();

    let stats = engine.stats();
    println!("== {} ({difficulty:?}) ==", chart.metadata.name);
    println!(
        "score {}  max combo {}  accuracy {:.1}%",
        stats.score, stats.max_combo, stats.accuracy
    );
    println!(
        "perfect {}  great {}  good {}  miss {}",
        stats.perfect_count, stats.great_count, stats.good_count, stats.miss_count
    );
    match stats.outcome {
        Some(outcome) => println!(
            "chase: runner {:.1}% / chaser {:.1}% -> {:?}",
            stats.runner_progress, stats.chaser_progress, outcome
        ),
        None => println!(
            "chase: runner {:.1}% / chaser {:.1}% (unresolved)",
            stats.runner_progress, stats.chaser_progress
        ),
    }
    Ok(())
}
