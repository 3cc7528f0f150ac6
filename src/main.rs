use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use chopper::{
    config::Config,
    engine::EngineBuilder,
    events::Key,
    level::LevelLoader,
    logging,
    systems::{DamageSystem, ENEMIES_GROUP, PLAYER_TAG},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless chopper game runner")]
struct Cli {
    /// Path to the runner configuration YAML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Level file (overrides the configured one)
    #[arg(long)]
    level: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Seconds per frame (defaults to 1/fps)
    #[arg(long)]
    dt: Option<f64>,

    /// Draw collider outlines
    #[arg(long)]
    debug: bool,

    /// Scripted key press as FRAME:KEY, e.g. 10:right or 30:z
    #[arg(long = "press", value_parser = parse_press)]
    presses: Vec<(u64, Key)>,
}

fn parse_press(value: &str) -> Result<(u64, Key)> {
    let (frame, key) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("expected FRAME:KEY, got `{value}`"))?;
    let frame = frame
        .parse()
        .with_context(|| format!("invalid frame `{frame}`"))?;
    Ok((frame, key.parse()?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_yaml(path)?,
        None => Config::default(),
    };
    if cli.debug {
        config.debug = true;
    }
    if cli.level.is_some() {
        config.level = cli.level.clone();
    }
    logging::init(&config.logging.level)?;

    let dt = cli.dt.unwrap_or_else(|| config.frame_dt());
    let mut builder = EngineBuilder::new(config.clone()).with_default_systems();
    if let Some(path) = &config.level {
        let level = LevelLoader::new(".").load(path)?;
        builder = builder.with_level(level);
    }
    let mut engine = builder.build()?;
    for (frame, key) in cli.presses {
        engine.schedule_key(frame, key);
    }

    let mut peak_entities = 0;
    engine.run_with_hook(cli.frames, dt, |summary| {
        peak_entities = peak_entities.max(summary.entity_count);
    })?;

    let registry = engine.registry();
    let stats = registry.get_system::<DamageSystem>()?.stats();
    let enemies = registry
        .entities_by_group(ENEMIES_GROUP)
        .map(|group| group.len())
        .unwrap_or(0);
    println!(
        "Ran {} frames ({} ms game time). Entities: {} (peak {}). Player alive: {}. Enemies left: {}. Hits on player: {}, on enemies: {}, kills: {}",
        engine.current_frame(),
        engine.elapsed_ms(),
        registry.entity_count(),
        peak_entities,
        registry.entity_by_tag(PLAYER_TAG).is_ok(),
        enemies,
        stats.player_hits,
        stats.enemy_hits,
        stats.kills
    );
    Ok(())
}
