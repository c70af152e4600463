//! Application-level configuration loading, including the per-mode game settings.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::{GameMode, GameSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BUZZ_BACK_CONFIG_PATH";

const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;
const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Period of the timer coordinator sweep.
    pub tick_interval: Duration,
    /// How long a session lives in the store after creation.
    pub retention: Duration,
    /// Number of action workers; actions are partitioned by session id.
    pub worker_count: usize,
    /// Per-subscriber buffer of each event topic on the in-memory bus.
    pub bus_capacity: usize,
    /// Optional JSON file holding the packet catalog.
    pub packets_path: Option<PathBuf>,
    mode_defaults: HashMap<GameMode, GameSettings>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        workers = app_config.worker_count,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Settings a new session of `mode` starts with.
    pub fn settings_for(&self, mode: GameMode) -> GameSettings {
        self.mode_defaults
            .get(&mode)
            .cloned()
            .unwrap_or_else(|| builtin_settings(mode))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            worker_count: DEFAULT_WORKER_COUNT,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            packets_path: None,
            mode_defaults: default_mode_settings(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_tick_interval_ms")]
    tick_interval_ms: u64,
    #[serde(default = "default_retention_secs")]
    retention_secs: u64,
    #[serde(default = "default_worker_count")]
    worker_count: usize,
    #[serde(default = "default_bus_capacity")]
    bus_capacity: usize,
    #[serde(default)]
    packets_path: Option<PathBuf>,
    #[serde(default)]
    mode_defaults: Vec<RawModeSettings>,
}

#[derive(Debug, Deserialize)]
/// Overrides for one game mode; missing keys keep the built-in value.
struct RawModeSettings {
    game_mode: GameMode,
    tossup_timer_seconds: Option<u32>,
    bonus_timer_seconds: Option<u32>,
    auto_timeout: Option<bool>,
    bonuses_enabled: Option<bool>,
    tossup_points: Option<i32>,
}

impl From<RawModeSettings> for GameSettings {
    fn from(value: RawModeSettings) -> Self {
        let base = builtin_settings(value.game_mode);
        Self {
            game_mode: value.game_mode,
            tossup_timer_seconds: value
                .tossup_timer_seconds
                .unwrap_or(base.tossup_timer_seconds),
            bonus_timer_seconds: value.bonus_timer_seconds.unwrap_or(base.bonus_timer_seconds),
            auto_timeout: value.auto_timeout.unwrap_or(base.auto_timeout),
            bonuses_enabled: value.bonuses_enabled.unwrap_or(base.bonuses_enabled),
            tossup_points: value.tossup_points.unwrap_or(base.tossup_points),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let mut mode_defaults = default_mode_settings();
        for raw in value.mode_defaults {
            let settings: GameSettings = raw.into();
            mode_defaults.insert(settings.game_mode, settings);
        }
        Self {
            tick_interval: Duration::from_millis(value.tick_interval_ms.max(1)),
            retention: Duration::from_secs(value.retention_secs),
            worker_count: value.worker_count.max(1),
            bus_capacity: value.bus_capacity.max(1),
            packets_path: value.packets_path,
            mode_defaults,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_bus_capacity() -> usize {
    DEFAULT_BUS_CAPACITY
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_mode_settings() -> HashMap<GameMode, GameSettings> {
    [GameMode::Quizbowl, GameMode::Casual]
        .into_iter()
        .map(|mode| (mode, builtin_settings(mode)))
        .collect()
}

/// Built-in settings shipped with the binary.
fn builtin_settings(mode: GameMode) -> GameSettings {
    match mode {
        GameMode::Quizbowl => GameSettings {
            game_mode: mode,
            tossup_timer_seconds: 5,
            bonus_timer_seconds: 5,
            auto_timeout: true,
            bonuses_enabled: true,
            tossup_points: 10,
        },
        GameMode::Casual => GameSettings {
            game_mode: mode,
            tossup_timer_seconds: 0,
            bonus_timer_seconds: 0,
            auto_timeout: false,
            bonuses_enabled: false,
            tossup_points: 10,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_mode_overrides_keep_builtin_values() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "worker_count": 0,
                "mode_defaults": [{ "game_mode": "quizbowl", "tossup_timer_seconds": 8 }]
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        let quizbowl = config.settings_for(GameMode::Quizbowl);
        assert_eq!(quizbowl.tossup_timer_seconds, 8);
        assert!(quizbowl.auto_timeout);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.settings_for(GameMode::Casual).tossup_timer_seconds, 0);
    }
}
