//! `image` crate interop, JSON scene files and CLI reports.

use crate::ar::{
    capture_surface, CameraFrame, CameraIntrinsics, CameraState, CaptureError, DeviceOrientation,
    FrameSnapshot, SceneSnapshot, SurfaceCapture, SurfaceId, TrackedSurface, Viewport,
};
use crate::core::{rectify, PixelBuffer, Quad, RasterImage, RectifyError};
use image::RgbaImage;
use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum LensIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("raster size {width}x{height} does not fit an image buffer")]
    InvalidRaster { width: usize, height: usize },
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Rectify(#[from] RectifyError),
}

/// Copy an `image::RgbaImage` into a [`RasterImage`] with scale 1.
pub fn raster_from_rgba(img: &RgbaImage) -> RasterImage {
    RasterImage {
        width: img.width() as usize,
        height: img.height() as usize,
        scale: 1.0,
        data: img.as_raw().clone(),
    }
}

/// Convert a [`RasterImage`] into an `image::RgbaImage`. The pixel scale is
/// dropped.
pub fn raster_to_rgba(raster: &RasterImage) -> Result<RgbaImage, LensIoError> {
    let invalid = || LensIoError::InvalidRaster {
        width: raster.width,
        height: raster.height,
    };
    let w = u32::try_from(raster.width).map_err(|_| invalid())?;
    let h = u32::try_from(raster.height).map_err(|_| invalid())?;
    RgbaImage::from_raw(w, h, raster.data.clone()).ok_or_else(invalid)
}

/// Wrap an `image::RgbaImage` as a sensor frame.
pub fn frame_from_rgba(img: RgbaImage, timestamp: f64) -> CameraFrame {
    let (w, h) = (img.width() as usize, img.height() as usize);
    CameraFrame {
        buffer: PixelBuffer::rgba8(w, h, img.into_raw()),
        timestamp,
    }
}

/// Decode any format `image` understands into an RGBA raster.
pub fn load_raster(path: impl AsRef<Path>) -> Result<RasterImage, LensIoError> {
    let img = image::open(path)?.to_rgba8();
    Ok(raster_from_rgba(&img))
}

/// Encode a raster; the format follows the file extension.
pub fn save_raster(raster: &RasterImage, path: impl AsRef<Path>) -> Result<(), LensIoError> {
    raster_to_rgba(raster)?.save(path)?;
    Ok(())
}

fn identity_pose() -> Isometry3<f64> {
    Isometry3::identity()
}

/// One recorded tracking frame: the sensor image plus everything needed to
/// locate a surface in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Sensor image, relative paths resolve against the config file.
    pub image_path: String,
    #[serde(default)]
    pub timestamp: f64,
    pub intrinsics: CameraIntrinsics,
    #[serde(default = "identity_pose")]
    pub camera_pose: Isometry3<f64>,
    pub surface: TrackedSurface,
    pub orientation: DeviceOrientation,
    pub viewport: Viewport,
}

impl SceneConfig {
    /// Load a JSON scene from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LensIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this scene to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LensIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// `image_path` resolved against the directory holding the config.
    pub fn resolve_image_path(&self, config_path: &Path) -> PathBuf {
        let image = PathBuf::from(&self.image_path);
        match config_path.parent() {
            Some(dir) if image.is_relative() => dir.join(image),
            _ => image,
        }
    }

    /// Build a single-surface session snapshot from this scene.
    pub fn to_scene(&self, frame: CameraFrame) -> SceneSnapshot {
        let scene = SceneSnapshot::new();
        scene.update_frame(FrameSnapshot {
            frame,
            camera: CameraState {
                intrinsics: self.intrinsics,
                pose: self.camera_pose,
            },
            orientation: self.orientation,
            viewport: self.viewport,
        });
        scene.upsert_surface(self.surface);
        scene
    }
}

/// Result of the `rectify` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectifyReport {
    pub input: String,
    pub output: String,
    pub quad: Quad,
    pub width: usize,
    pub height: usize,
}

/// Result of the `capture` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub surface_id: SurfaceId,
    pub timestamp: f64,
    pub viewport_width: usize,
    pub viewport_height: usize,
    pub quad: Quad,
    pub width: usize,
    pub height: usize,
    /// `[width, height]` of the classifier input, when one was prepared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_input: Option<[usize; 2]>,
}

/// Replay a scene file: capture the viewport, locate the surface and
/// rectify it.
pub fn capture_scene(config_path: &Path) -> Result<(SurfaceCapture, RasterImage), LensIoError> {
    let cfg = SceneConfig::load_json(config_path)?;
    let image_path = cfg.resolve_image_path(config_path);
    log::info!("replaying scene {} ({})", config_path.display(), image_path.display());
    let img = image::open(&image_path)?.to_rgba8();
    let scene = cfg.to_scene(frame_from_rgba(img, cfg.timestamp));

    let capture = capture_surface(&scene, cfg.surface.id)?;
    let rectified = rectify(&capture.image, &capture.quad)?;
    Ok((capture, rectified))
}
