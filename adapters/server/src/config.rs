//! Command-line arguments and the optional TOML configuration file.
//!
//! Values are resolved in three layers: built-in defaults, then the
//! configuration file, then command-line flags.

use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use keybound_core::MAX_PLAYERS;
use keybound_system_enemy_ai::{Config as AiConfig, GoalSwitching, DEFAULT_CONTROL_TABLE};
use keybound_world::{
    setup::{default_starting_hands, standard_enemies, standard_pawns},
    EnemySpec, EntitySpec, MatchSetup,
};
use serde::Deserialize;

const DEFAULT_BIND: &str = "0.0.0.0:44440";
const DEFAULT_MAX_PLAYERS: u8 = 2;
const DEFAULT_MAP: &str = "maps/meadow.json";
const DEFAULT_INTENT_TIMEOUT_SECS: u64 = 120;

/// Authoritative match server for Keybound.
#[derive(Debug, Parser)]
#[command(name = "keybound-server", version, about)]
pub(crate) struct Args {
    /// Number of players to wait for before the match starts.
    #[arg(value_parser = clap::value_parser!(u8).range(1..=MAX_PLAYERS as i64))]
    pub(crate) max_players: Option<u8>,
    /// Tiled JSON map to play on.
    #[arg(long)]
    pub(crate) map: Option<PathBuf>,
    /// TOML configuration file.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Address the lobby listens on.
    #[arg(long)]
    pub(crate) bind: Option<SocketAddr>,
    /// Seed for map spawns and enemy decisions.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Seconds a player may take before their turn is skipped.
    #[arg(long = "intent-timeout", value_name = "SECS")]
    pub(crate) intent_timeout: Option<u64>,
}

/// Contents of the configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    bind: Option<SocketAddr>,
    max_players: Option<u8>,
    map: Option<PathBuf>,
    seed: Option<u64>,
    intent_timeout_secs: Option<u64>,
    ai: AiTuning,
    roster: Option<Roster>,
}

/// Enemy behaviour tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AiTuning {
    pub(crate) switching: GoalSwitching,
    pub(crate) decay: f64,
    pub(crate) chase_weight: u32,
    pub(crate) seek_weight: u32,
    pub(crate) control_table: [f64; MAX_PLAYERS as usize],
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            switching: GoalSwitching::Alternate,
            decay: 0.25,
            chase_weight: 1,
            seek_weight: 1,
            control_table: DEFAULT_CONTROL_TABLE,
        }
    }
}

impl AiTuning {
    /// Rejects values the enemy AI cannot roll against.
    fn validate(&self) -> Result<()> {
        if !self.decay.is_finite() {
            bail!("ai.decay must be a finite number, got {}", self.decay);
        }
        if let Some(chance) = self.control_table.iter().find(|chance| !chance.is_finite()) {
            bail!("ai.control_table entries must be finite numbers, got {chance}");
        }
        Ok(())
    }

    pub(crate) fn to_config(&self, seed: u64) -> AiConfig {
        AiConfig::new(seed)
            .with_switching(self.switching)
            .with_decay(self.decay)
            .with_weights(self.chase_weight, self.seek_weight)
            .with_control_table(self.control_table)
    }
}

/// Pawns and enemies placed on the map.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Roster {
    #[serde(default = "standard_pawns")]
    pub(crate) pawns: Vec<EntitySpec>,
    #[serde(default = "standard_enemies")]
    pub(crate) enemies: Vec<EnemySpec>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            pawns: standard_pawns(),
            enemies: standard_enemies(),
        }
    }
}

/// Fully resolved server settings.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Settings {
    pub(crate) bind: SocketAddr,
    pub(crate) max_players: u8,
    pub(crate) map: PathBuf,
    pub(crate) seed: Option<u64>,
    pub(crate) intent_timeout: Duration,
    pub(crate) ai: AiTuning,
    pub(crate) roster: Roster,
}

impl Settings {
    /// Layers the configuration file (if any) and the command-line flags over the defaults.
    pub(crate) fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        Self::layer(file, args)
    }

    fn layer(file: FileConfig, args: &Args) -> Result<Self> {
        let bind = match args.bind.or(file.bind) {
            Some(bind) => bind,
            None => DEFAULT_BIND
                .parse()
                .context("default bind address is malformed")?,
        };
        let max_players = args
            .max_players
            .or(file.max_players)
            .unwrap_or(DEFAULT_MAX_PLAYERS);
        if max_players == 0 || max_players > MAX_PLAYERS {
            bail!("max_players must be between 1 and {MAX_PLAYERS}, got {max_players}");
        }
        let timeout_secs = args
            .intent_timeout
            .or(file.intent_timeout_secs)
            .unwrap_or(DEFAULT_INTENT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("intent timeout must be at least one second");
        }
        file.ai.validate()?;

        Ok(Self {
            bind,
            max_players,
            map: args
                .map
                .clone()
                .or(file.map)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP)),
            seed: args.seed.or(file.seed),
            intent_timeout: Duration::from_secs(timeout_secs),
            ai: file.ai,
            roster: file.roster.unwrap_or_default(),
        })
    }

    /// Roster and starting hands for the configured number of players.
    pub(crate) fn match_setup(&self) -> MatchSetup {
        MatchSetup {
            player_count: self.max_players,
            pawns: self.roster.pawns.clone(),
            enemies: self.roster.enemies.clone(),
            starting_hands: default_starting_hands(self.max_players),
        }
    }

    /// Name shown to clients, taken from the map file name.
    pub(crate) fn map_name(&self) -> String {
        self.map
            .file_stem()
            .map_or_else(|| self.map.display().to_string(), |stem| {
                stem.to_string_lossy().into_owned()
            })
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&source).with_context(|| format!("invalid config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybound_core::Element;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("keybound-server").chain(argv.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn defaults_reproduce_the_standard_match() {
        let settings = Settings::layer(FileConfig::default(), &args(&[])).expect("valid");
        assert_eq!(settings.bind.port(), 44440);
        assert_eq!(settings.max_players, 2);
        assert_eq!(settings.map, PathBuf::from("maps/meadow.json"));
        assert_eq!(settings.map_name(), "meadow");
        assert_eq!(settings.intent_timeout, Duration::from_secs(120));
        assert_eq!(settings.seed, None);
        assert_eq!(settings.ai, AiTuning::default());

        let setup = settings.match_setup();
        assert_eq!(setup.player_count, 2);
        let pawns: Vec<&str> = setup.pawns.iter().map(|pawn| pawn.name.as_str()).collect();
        assert_eq!(pawns, vec!["Gork", "Nano", "Sylphe", "Poticha"]);
        assert_eq!(setup.enemies.len(), 4);
        assert_eq!(setup.starting_hands.len(), 2);
    }

    #[test]
    fn flags_override_the_file() {
        let file: FileConfig = toml::from_str(
            r#"
            max_players = 4
            seed = 5
            intent_timeout_secs = 30
            map = "maps/crypt.json"
            "#,
        )
        .expect("valid toml");
        let settings =
            Settings::layer(file, &args(&["3", "--seed", "9", "--bind", "127.0.0.1:9000"]))
                .expect("valid");
        assert_eq!(settings.max_players, 3);
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.bind, "127.0.0.1:9000".parse().expect("address"));
        assert_eq!(settings.intent_timeout, Duration::from_secs(30));
        assert_eq!(settings.map_name(), "crypt");
    }

    #[test]
    fn file_tunes_ai_and_roster() {
        let file: FileConfig = toml::from_str(
            r#"
            [ai]
            switching = "weighted"
            decay = 0.5
            chase_weight = 3
            control_table = [0.5, 0.6, 0.7, 0.8]

            [[roster.pawns]]
            name = "Ember"
            health = 80
            attack = 25
            element = "fire"

            [[roster.enemies]]
            name = "Slime"
            health = 40
            attack = 5
            element = "water"
            ai_controlled = false
            "#,
        )
        .expect("valid toml");
        let settings = Settings::layer(file, &args(&["1"])).expect("valid");

        assert_eq!(settings.ai.switching, GoalSwitching::Weighted);
        assert_eq!(settings.ai.seek_weight, 1, "unset fields keep defaults");
        let config = settings.ai.to_config(0);
        assert_eq!(config.control_probability(1), 0.5);

        let setup = settings.match_setup();
        assert_eq!(
            setup.pawns,
            vec![EntitySpec::new("Ember", 80, 25, Element::Fire)]
        );
        assert_eq!(setup.enemies.len(), 1);
        assert!(!setup.enemies[0].ai_controlled);
        assert_eq!(setup.enemies[0].stats.element, Element::Water);
    }

    #[test]
    fn example_file_matches_the_defaults() {
        let file: FileConfig = toml::from_str(include_str!("../../../keybound.example.toml"))
            .expect("example config parses");
        let from_file = Settings::layer(file, &args(&[])).expect("valid");
        let defaults = Settings::layer(FileConfig::default(), &args(&[])).expect("valid");
        assert_eq!(from_file, defaults);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file: FileConfig = toml::from_str("max_players = 7").expect("valid toml");
        assert!(Settings::layer(file, &args(&[])).is_err());

        assert!(Args::try_parse_from(["keybound-server", "5"]).is_err());
        assert!(toml::from_str::<FileConfig>("speed = 3").is_err());
    }

    #[test]
    fn non_finite_ai_tuning_is_rejected() {
        let file: FileConfig = toml::from_str(
            r#"
            [ai]
            control_table = [nan, 0.85, 0.9, 1.0]
            "#,
        )
        .expect("toml accepts nan");
        let error = Settings::layer(file, &args(&[])).expect_err("nan chance");
        assert!(error.to_string().contains("control_table"), "{error}");

        let file: FileConfig = toml::from_str("[ai]\ndecay = inf").expect("toml accepts inf");
        assert!(Settings::layer(file, &args(&[])).is_err());
    }
}
