//! JSON-loadable recognizer settings.

use crate::ConfigError;
use fiducial_lens_ar::CaptureError;
use fiducial_lens_core::{center_crop_and_scale, parse_level, CropAndScale, RasterImage};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Pixel size the classifier expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub width: usize,
    pub height: usize,
}

fn default_input_size() -> Option<InputSize> {
    Some(InputSize {
        width: 224,
        height: 224,
    })
}

fn default_worker_threads() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Recognizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Classifier input size. `None` passes the rectified image through
    /// unchanged.
    #[serde(default = "default_input_size")]
    pub input_size: Option<InputSize>,
    /// How the rectified image is fitted to `input_size`.
    pub crop_and_scale: CropAndScale,
    /// Rectification workers; `0` lets the pool decide.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// `off|error|warn|info|debug|trace`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            crop_and_scale: CropAndScale::default(),
            worker_threads: default_worker_threads(),
            log_level: default_log_level(),
        }
    }
}

impl RecognizerConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.level_filter()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Parsed `log_level`.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_level(&self.log_level).ok_or_else(|| ConfigError::LogLevel(self.log_level.clone()))
    }

    /// Fit a rectified surface image to the classifier input.
    pub fn prepare_input(&self, rectified: RasterImage) -> Result<RasterImage, CaptureError> {
        match self.input_size {
            None => Ok(rectified),
            Some(size) => {
                center_crop_and_scale(&rectified, size.width, size.height, self.crop_and_scale)
                    .ok_or(CaptureError::ResizeFailed)
            }
        }
    }
}
