//! Annotation workspace configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::palette::{ColorMap, LABEL_COUNT};
use crate::undo::DEFAULT_UNDO_CAPACITY;

/// Settings shared by every layer of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Layer ids, in compositing order.
    pub layers: Vec<String>,
    /// Channels per voxel; 1 for label volumes.
    pub channels: usize,
    /// Undo depth per layer.
    pub undo_capacity: usize,
    /// Opacity applied once to the composited slice.
    pub global_opacity: f32,
    /// Replacement palette, `[r, g, b, a]` for labels 0..=8.
    pub palette: Option<Vec<[u8; 4]>>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            layers: (1..=4).map(|i| format!("layer{i}")).collect(),
            channels: 1,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            global_opacity: 0.6,
            palette: None,
        }
    }
}

impl AnnotationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::Invalid("at least one layer is required".into()));
        }
        for (i, id) in self.layers.iter().enumerate() {
            if self.layers[..i].contains(id) {
                return Err(ConfigError::Invalid(format!("duplicate layer id {id:?}")));
            }
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid("channels must be at least 1".into()));
        }
        if self.undo_capacity == 0 {
            return Err(ConfigError::Invalid("undo_capacity must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.global_opacity) {
            return Err(ConfigError::Invalid(format!(
                "global_opacity {} is outside [0, 1]",
                self.global_opacity
            )));
        }
        if let Some(palette) = &self.palette {
            if palette.len() != LABEL_COUNT + 1 {
                return Err(ConfigError::Invalid(format!(
                    "palette needs {} entries, got {}",
                    LABEL_COUNT + 1,
                    palette.len()
                )));
            }
        }
        Ok(())
    }

    /// The configured palette, or the default one.
    pub fn color_map(&self) -> Result<ColorMap, ConfigError> {
        match &self.palette {
            Some(entries) => {
                ColorMap::from_rgba(entries).map_err(|e| ConfigError::Invalid(e.to_string()))
            }
            None => Ok(ColorMap::default()),
        }
    }
}
