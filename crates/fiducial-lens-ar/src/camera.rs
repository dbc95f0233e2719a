//! Camera, frame and display descriptions supplied by the tracking session.

use fiducial_lens_core::PixelBuffer;
use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics in native sensor orientation (landscape-right).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in x (pixels).
    pub fx: f64,
    /// Focal length in y (pixels).
    pub fy: f64,
    /// Principal point x (pixels).
    pub cx: f64,
    /// Principal point y (pixels).
    pub cy: f64,
    /// Sensor image width (pixels).
    pub width: usize,
    /// Sensor image height (pixels).
    pub height: usize,
}

impl CameraIntrinsics {
    /// Returns `true` when focal lengths are finite and non-zero and the
    /// resolution is non-empty.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx.abs() > 1e-12
            && self.fy.abs() > 1e-12
            && self.width > 0
            && self.height > 0
    }
}

/// Camera pose and intrinsics for one frame.
///
/// `pose` maps camera coordinates to world coordinates. The camera looks
/// down its local `-z` axis with `+y` up and `+x` to the right of the sensor
/// image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraState {
    pub intrinsics: CameraIntrinsics,
    pub pose: Isometry3<f64>,
}

impl CameraState {
    /// World point expressed in camera coordinates.
    #[inline]
    pub fn to_camera(&self, world: &Point3<f64>) -> Point3<f64> {
        self.pose.inverse_transform_point(world)
    }
}

/// Interface orientation of the device displaying the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    Unknown,
}

impl DeviceOrientation {
    /// Portrait orientations fit the preview to the viewport height.
    pub fn is_portrait(self) -> bool {
        matches!(
            self,
            DeviceOrientation::Portrait | DeviceOrientation::PortraitUpsideDown
        )
    }
}

/// On-screen preview area in logical points plus display pixel density.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Viewport {
    pub fn new(width: f64, height: f64, scale: f64) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.scale]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    #[inline]
    pub fn pixel_width(&self) -> usize {
        (self.width * self.scale).round() as usize
    }

    #[inline]
    pub fn pixel_height(&self) -> usize {
        (self.height * self.scale).round() as usize
    }
}

/// Raw sensor frame. Immutable once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub buffer: PixelBuffer,
    /// Capture time in seconds on the session clock.
    pub timestamp: f64,
}
