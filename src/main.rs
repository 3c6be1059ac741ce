use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use trajectory_playback::{
    config::{PlaybackConfig, Projection},
    engine::TrajectorySet,
    player::Player,
    scheduler::{Scheduler, Step},
    types::Category,
};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str =
    "trajectory-playback play <trajectories.json> [--fps N] [--restart-delay-ms N] [--projection side|top]";
const DUMP_USAGE: &str = "trajectory-playback dump <trajectories.json> [--fps N]";
const INSPECT_USAGE: &str = "trajectory-playback inspect <trajectories.json>";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("play") => {
            let path = args.next().context(PLAY_USAGE)?;
            let config = parse_options(PlaybackConfig::load(), args).context(PLAY_USAGE)?;
            play(&path, config)
        }
        Some("dump") => {
            let path = args.next().context(DUMP_USAGE)?;
            let config = parse_options(PlaybackConfig::load(), args).context(DUMP_USAGE)?;
            dump(&path, &config)
        }
        Some("inspect") => {
            let path = args.next().context(INSPECT_USAGE)?;
            inspect(&path)
        }
        _ => bail!(
            "Trajectory playback — animate agent trajectories in the terminal\n\nUsage:\n  {PLAY_USAGE}\n  {DUMP_USAGE}\n  {INSPECT_USAGE}"
        ),
    }
}

/// Apply `--flag value` overrides on top of the loaded config.
fn parse_options(mut config: PlaybackConfig, mut args: impl Iterator<Item = String>) -> Result<PlaybackConfig> {
    while let Some(flag) = args.next() {
        let value = args
            .next()
            .with_context(|| format!("Missing value for {flag}"))?;
        match flag.as_str() {
            "--fps" => {
                config.fps = value
                    .parse()
                    .with_context(|| format!("Invalid --fps {value}"))?;
            }
            "--restart-delay-ms" => {
                config.restart_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid --restart-delay-ms {value}"))?;
            }
            "--projection" => config.projection = Projection::parse(&value)?,
            other => bail!("Unknown option {other}"),
        }
    }
    config.validate()?;
    Ok(config)
}

fn play(path: &str, config: PlaybackConfig) -> Result<()> {
    let store = Arc::new(TrajectorySet::load(path)?);
    let title = Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let mut player = Player::new(store, config, title);
    player.play()
}

/// Print one pass as JSON lines, without waiting between frames.
fn dump(path: &str, config: &PlaybackConfig) -> Result<()> {
    let store = Arc::new(TrajectorySet::load(path)?);
    let mut scheduler = Scheduler::new(store, config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut frames = 0usize;
    while let Step::Frame(frame) = scheduler.step() {
        serde_json::to_writer(&mut out, &frame)?;
        writeln!(out)?;
        frames += 1;
    }
    out.flush()?;

    eprintln!("Dumped {frames} frames from {path}");
    Ok(())
}

fn inspect(path: &str) -> Result<()> {
    let store = TrajectorySet::load(path)?;
    let range = store.range();
    let count = |category: Category| {
        store
            .agents()
            .iter()
            .filter(|agent| agent.category() == category)
            .count()
    };

    println!("{path}");
    println!(
        "  agents:       {} ({} interceptors, {} threats, {} other)",
        store.agents().len(),
        count(Category::Interceptor),
        count(Category::Threat),
        count(Category::Other),
    );
    println!(
        "  samples:      {}",
        store.agents().iter().map(|agent| agent.len()).sum::<usize>()
    );
    println!(
        "  time range:   {:.2} .. {:.2} ({:.2}s)",
        range.min_time,
        range.max_time,
        range.duration()
    );
    if let Some((lo, hi)) = store.bounds() {
        println!(
            "  bounds:       x {:.1}..{:.1}, y {:.1}..{:.1}, z {:.1}..{:.1}",
            lo.x, hi.x, lo.y, hi.y, lo.z, hi.z
        );
    }
    for agent in store.agents().iter().filter(|agent| agent.is_empty()) {
        println!("  warning:      {} has no samples", agent.id());
    }
    Ok(())
}
