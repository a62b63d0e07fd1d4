use cq_atlas::AtlasConfig;
use cq_core::{MovementConfig, WorldBounds};
use glam::Vec2;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/game.json";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    pub title: String,
    pub world: WorldConfig,
    /// Top-left spawn point. Defaults to the middle of the world.
    pub spawn: Option<[f32; 2]>,
    pub movement: MovementConfig,
    pub player: PlayerSpriteConfig,
    pub save_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlayerSpriteConfig {
    /// Cache key shared by every entity drawn from the same sheet.
    pub atlas_key: String,
    /// File path or `data:` URL. `None` draws the placeholder.
    pub image: Option<String>,
    pub atlas: AtlasConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "Codequest".to_string(),
            world: WorldConfig::default(),
            spawn: None,
            movement: MovementConfig::default(),
            player: PlayerSpriteConfig::default(),
            save_path: PathBuf::from("saves/progress.json"),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
        }
    }
}

impl Default for PlayerSpriteConfig {
    fn default() -> Self {
        Self {
            atlas_key: "hero".to_string(),
            image: None,
            atlas: AtlasConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world.width, self.world.height)
    }

    pub fn spawn_point(&self) -> Vec2 {
        match self.spawn {
            Some([x, y]) => Vec2::new(x, y),
            None => Vec2::new(
                (self.world.width - self.movement.sprite_width) / 2.0,
                (self.world.height - self.movement.sprite_height) / 2.0,
            ),
        }
    }
}

/// Load the config at `path`. A missing file yields the defaults; an
/// unreadable, malformed or invalid one is an error.
pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    if !path.exists() {
        log::warn!(
            "Config '{}' not found, using built-in defaults",
            path.display()
        );
        return Ok(GameConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.title.trim().is_empty() {
        return Err("Config validation failed: title is empty".to_string());
    }
    let world = &config.world;
    if !(world.width.is_finite() && world.height.is_finite())
        || world.width <= 0.0
        || world.height <= 0.0
    {
        return Err(format!(
            "Config validation failed: world size {}x{} must be positive",
            world.width, world.height
        ));
    }

    let movement = &config.movement;
    if !movement.speed.is_finite() || movement.speed < 0.0 {
        return Err(format!(
            "Config validation failed: movement.speed {} must be >= 0",
            movement.speed
        ));
    }
    if !movement.padding.is_finite() || movement.padding < 0.0 {
        return Err(format!(
            "Config validation failed: movement.padding {} must be >= 0",
            movement.padding
        ));
    }
    if movement.sprite_width <= 0.0 || movement.sprite_height <= 0.0 {
        return Err("Config validation failed: sprite width/height must be > 0".to_string());
    }
    if movement.tick_rate == 0 || movement.ticks_per_frame == 0 {
        return Err(
            "Config validation failed: tick_rate and ticks_per_frame must be > 0".to_string(),
        );
    }

    if let Some([x, y]) = config.spawn {
        if !(x.is_finite() && y.is_finite()) {
            return Err("Config validation failed: spawn must be finite".to_string());
        }
    }
    if config.player.atlas_key.trim().is_empty() {
        return Err("Config validation failed: player.atlas_key is empty".to_string());
    }
    if config.save_path.as_os_str().is_empty() {
        return Err("Config validation failed: save_path is empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "cq_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        let config = load_config_from_path(&path).expect("defaults");
        assert_eq!(config.title, "Codequest");
        assert_eq!(config.movement, MovementConfig::default());
        assert!(config.player.image.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_file_path("partial");
        let json = r#"
        {
          "title": "Village",
          "world": { "width": 400, "height": 300 },
          "movement": { "speed": 5 },
          "player": { "image": "assets/hero.png", "atlas": { "offset_y": 8 } }
        }
        "#;
        fs::write(&path, json).expect("write config");

        let config = load_config_from_path(&path).expect("valid config");
        assert_eq!(config.title, "Village");
        assert_eq!(config.bounds(), WorldBounds::new(400.0, 300.0));
        assert_eq!(config.movement.speed, 5.0);
        assert_eq!(config.movement.padding, 20.0);
        assert_eq!(config.player.atlas_key, "hero");
        assert_eq!(config.player.image.as_deref(), Some("assets/hero.png"));
        assert_eq!(config.player.atlas.offset_y, 8);
        assert_eq!(config.player.atlas.columns, 4);
        assert_eq!(config.spawn_point(), Vec2::new(168.0, 118.0));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_non_positive_world() {
        let path = temp_file_path("bad_world");
        fs::write(&path, r#"{ "world": { "width": 0, "height": 300 } }"#).expect("write");
        let err = load_config_from_path(&path).expect_err("zero width should fail");
        assert!(err.contains("world size"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let path = temp_file_path("bad_ticks");
        fs::write(&path, r#"{ "movement": { "tick_rate": 0 } }"#).expect("write");
        let err = load_config_from_path(&path).expect_err("zero tick rate should fail");
        assert!(err.contains("tick_rate"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_malformed_json() {
        let path = temp_file_path("malformed");
        fs::write(&path, "{ title: ").expect("write");
        let err = load_config_from_path(&path).expect_err("malformed should fail");
        assert!(err.contains("Failed to parse config JSON"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn explicit_spawn_is_used() {
        let config = GameConfig {
            spawn: Some([10.0, 12.0]),
            ..GameConfig::default()
        };
        assert_eq!(config.spawn_point(), Vec2::new(10.0, 12.0));
    }
}
