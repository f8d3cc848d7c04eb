//! Viewer configuration.
//!
//! Every field has a default so a partial JSON document (or none at all) is
//! enough to start the viewer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub model: ModelConfig,
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub panel: PanelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "orthoview".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Static asset root the model path is resolved against.
    pub asset_root: PathBuf,
    pub path: PathBuf,
    /// Lookup name assigned to the imported root.
    pub name: String,
    /// Name of the mesh node whose material the panel edits. When unset the
    /// first mesh under the model root is used.
    pub material_target: Option<String>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("static"),
            path: PathBuf::from("models/building_02_220919_2.gltf"),
            name: "model".to_string(),
            material_target: None,
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

impl ModelConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.asset_root.join(&self.path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub show_floor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping: bool,
    pub damping_factor: f32,
    pub step_base: [f32; 3],
    pub step_axis: [f32; 3],
    pub step_increment: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            left: -7.0,
            right: 7.0,
            top: 7.0,
            bottom: -7.0,
            near: 0.01,
            far: 1000.0,
            position: [80.0, 110.0, -55.0],
            target: [0.0, 0.0, 0.0],
            damping: true,
            damping_factor: 0.05,
            step_base: [160.0, 110.0, -55.0],
            step_axis: [1.0, 0.0, 0.0],
            step_increment: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub max_pixel_ratio: f32,
    pub clear_color: [f32; 3],
    pub shadows: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            clear_color: [0.02, 0.02, 0.025],
            shadows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub position_min: f32,
    pub position_max: f32,
    pub position_step: f32,
    pub spin_duration_secs: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            position_min: -3.0,
            position_max: 3.0,
            position_step: 0.01,
            spin_duration_secs: 4.0,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads the config named on the command line, falling back to defaults
    /// when no path is given.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        match args.nth(1) {
            Some(path) => {
                log::info!("Loading config from {}", path);
                Self::load(Path::new(&path))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{ "scene": { "show_floor": true }, "camera": { "far": 50.0 } }"#)
                .unwrap();
        assert!(config.scene.show_floor);
        assert_eq!(config.camera.far, 50.0);
        assert_eq!(config.camera.near, 0.01);
        assert_eq!(config.camera.step_increment, 10.0);
        assert_eq!(config.model.name, "model");
        assert_eq!(config.window.width, 800);
    }

    #[test]
    fn resolved_path_joins_asset_root() {
        let model = ModelConfig::default();
        assert_eq!(
            model.resolved_path(),
            PathBuf::from("static/models/building_02_220919_2.gltf")
        );
    }

    #[test]
    fn save_then_load_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        let mut config = ViewerConfig::default();
        config.scene.show_floor = true;
        config.model.material_target = Some("Facade".to_string());
        config.save(&path).unwrap();

        let loaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ViewerConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn from_args_without_path_uses_defaults() {
        let args = vec!["orthoview".to_string()];
        let config = ViewerConfig::from_args(args.into_iter()).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }
}
