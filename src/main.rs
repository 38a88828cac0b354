//! Headless runner: loads a config, runs the simulation for a fixed number of
//! ticks and logs what happened.
//!
//! Usage: tower-defense-sim [config.ron|config.json] [ticks]

use anyhow::{Context, Result};
use tracing::info;

use defense_core::engine::{DeathCause, SimConfig, SimEvent, Simulation};
use defense_core::logging;
use defense_core::persistence::MemoryStore;
use defense_core::resources::ResourceProvider;

const DEFAULT_TICKS: u32 = 3_000;

fn main() -> Result<()> {
    logging::init_tracing_default();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => SimConfig::default(),
    };
    let ticks = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("tick count '{raw}' is not a number"))?,
        None => DEFAULT_TICKS,
    };

    let dt = config.tick_seconds();
    let mut sim = Simulation::new(config, Box::new(MemoryStore::new()))
        .context("building simulation")?;

    let mut kills = 0u32;
    let mut leaks = 0u32;
    let mut hits = 0u32;
    let mut skill_index = 0usize;

    for _ in 0..ticks {
        sim.tick(dt);

        // Cycle through the configured skills as they become affordable.
        let next = sim
            .skills()
            .skills()
            .get(skill_index % sim.skills().skills().len().max(1))
            .filter(|skill| sim.skills().ledger().is_ready(&skill.id, sim.clock()))
            .filter(|skill| sim.resources().has_resource(&skill.resource_type, skill.cost))
            .map(|skill| skill.id.clone());
        if let Some(id) = next {
            if sim.activate_skill(&id).is_ok() {
                skill_index += 1;
            }
        }

        for event in sim.drain_events() {
            match event {
                SimEvent::EnemyDied { cause: DeathCause::Killed, .. } => kills += 1,
                SimEvent::EnemyDied { cause: DeathCause::ReachedBase, .. } => leaks += 1,
                SimEvent::ProjectileHit { .. } => hits += 1,
                SimEvent::WaveCompleted { wave } => info!(wave, "wave cleared"),
                SimEvent::GameOver { wave } => info!(wave, "base destroyed"),
                _ => {}
            }
        }

        if sim.is_game_over() {
            break;
        }
    }

    info!(
        seconds = sim.clock(),
        wave = sim.current_wave(),
        kills,
        leaks,
        hits,
        base = sim.base().current(),
        money = sim.resources().wallet.balance(),
        "run finished"
    );
    Ok(())
}
