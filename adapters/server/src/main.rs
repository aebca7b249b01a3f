#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless server that hosts one Keybound match over TCP.

mod config;
mod game;
mod net;

use std::net::TcpListener;

use anyhow::{Context, Result};
use clap::Parser;
use keybound_system_enemy_ai::EnemyAi;
use keybound_world::{CardCatalog, KeyCatalog, MapAsset, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::{
    config::{Args, Settings},
    game::Match,
    net::Hub,
};

const LOG_TARGET: &str = "keybound::server";

/// Entry point for the Keybound match server.
fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let settings = Settings::resolve(&args)?;

    let asset = MapAsset::from_path(&settings.map)
        .with_context(|| format!("failed to load map {}", settings.map.display()))?;
    let mut rng = match settings.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let cards = CardCatalog::standard().context("standard card catalog is invalid")?;
    let world = World::new(
        &asset,
        &settings.match_setup(),
        cards,
        KeyCatalog::standard(),
        &mut rng,
    )
    .context("failed to set up the match")?;
    let ai = EnemyAi::new(settings.ai.to_config(rng.gen()));

    let listener = TcpListener::bind(settings.bind)
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    info!(
        target: LOG_TARGET,
        bind = %settings.bind,
        max_players = settings.max_players,
        map = %settings.map.display(),
        seed = ?settings.seed,
        "waiting for players"
    );

    let mut hub = Hub::gather(&listener, settings.max_players)?;
    let mut session = Match::new(world, ai, settings.map_name(), settings.intent_timeout);
    let outcome = session.run(&mut hub);
    info!(target: LOG_TARGET, ?outcome, "server shutting down");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
