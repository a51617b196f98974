//! gallery.yaml project configuration parsing.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    NotFound,
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => write!(f, "gallery.yaml not found"),
            ConfigError::Io(e) => write!(f, "IO error reading gallery.yaml: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse gallery.yaml: {}", e),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    pub name: String,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Fade-in duration for a newly bound artwork, in milliseconds.
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
    pub museum: PlacementDef,
    #[serde(default)]
    pub paintings: Vec<PlacementDef>,
    #[serde(default)]
    pub artworks: ArtworkConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
}

fn default_fade_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementConfig {
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_sprint_multiplier")]
    pub sprint_multiplier: f32,
    /// Unitless displacement scale folded into every step.
    #[serde(default = "default_move_scale")]
    pub move_scale: f32,
    #[serde(default = "default_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default = "default_player_height")]
    pub player_height: f32,
    #[serde(default = "default_player_radius")]
    pub player_radius: f32,
}

fn default_base_speed() -> f32 {
    1.0
}
fn default_sprint_multiplier() -> f32 {
    2.0
}
fn default_move_scale() -> f32 {
    100.0
}
fn default_sensitivity() -> f32 {
    0.002
}
fn default_player_height() -> f32 {
    65.0
}
fn default_player_radius() -> f32 {
    10.0
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: default_base_speed(),
            sprint_multiplier: default_sprint_multiplier(),
            move_scale: default_move_scale(),
            mouse_sensitivity: default_sensitivity(),
            player_height: default_player_height(),
            player_radius: default_player_radius(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_fov() -> f32 {
    75.0
}
fn default_near() -> f32 {
    0.1
}
fn default_far() -> f32 {
    100_000.0
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
        }
    }
}

/// Placement of one model in the gallery: the museum shell or a painting.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementDef {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler rotation in degrees.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtworkConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_fallback() -> String {
    "assets/images/fallback.jpg".to_string()
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            fallback: default_fallback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnConfig {
    #[serde(default = "default_spawn_position")]
    pub position: [f32; 3],
    /// Initial view yaw in degrees.
    #[serde(default)]
    pub yaw: f32,
}

fn default_spawn_position() -> [f32; 3] {
    [0.0, 65.0, 50.0]
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            position: default_spawn_position(),
            yaw: 0.0,
        }
    }
}

/// Walk up from `start_dir` looking for `gallery.yaml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join("gallery.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a `gallery.yaml` file.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GalleryConfig = serde_yaml::from_str(&contents).map_err(ConfigError::Parse)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: "Demo Gallery"
fade_ms: 750
movement:
  base_speed: 1.5
  player_radius: 8.0
museum:
  id: museum
  model: procedural:room
  scale: [400, 150, 400]
paintings:
  - id: painting_01
    model: procedural:panel
    position: [-80, 70, -7]
    scale: [30, 30, 1]
  - id: painting_02
    model: procedural:panel
    position: [50, 70, 70]
    rotation: [0, -90, 0]
    scale: [30, 30, 1]
artworks:
  urls:
    - "solid:8a3324"
    - "solid:1f4f7a"
  fallback: "solid:555555"
spawn:
  position: [0, 65, 50]
"#;
        let config: GalleryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "Demo Gallery");
        assert_eq!(config.fade_ms, 750);
        assert_eq!(config.movement.base_speed, 1.5);
        // Unset movement fields keep defaults
        assert_eq!(config.movement.move_scale, 100.0);
        assert_eq!(config.paintings.len(), 2);
        assert_eq!(config.paintings[1].rotation, [0.0, -90.0, 0.0]);
        assert_eq!(config.artworks.urls.len(), 2);
        assert_eq!(config.artworks.fallback, "solid:555555");
    }

    #[test]
    fn test_minimal_config_defaults() {
        let yaml = r#"
name: "Bare"
museum:
  id: museum
  model: assets/models/museum.glb
"#;
        let config: GalleryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fade_ms, 500);
        assert_eq!(config.movement.sprint_multiplier, 2.0);
        assert_eq!(config.movement.player_height, 65.0);
        assert_eq!(config.camera.fov, 75.0);
        assert!(config.paintings.is_empty());
        assert!(config.artworks.urls.is_empty());
        assert_eq!(config.spawn.position, [0.0, 65.0, 50.0]);
        assert_eq!(config.museum.scale, [1.0, 1.0, 1.0]);
    }
}
