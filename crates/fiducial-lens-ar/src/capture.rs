//! Rebuild the on-screen preview raster from a raw sensor frame.

use crate::{CameraFrame, CaptureError, DeviceOrientation, Viewport};
use fiducial_lens_core::{
    crop, raster_from_pixel_buffer, resize_to_height, resize_to_width, rotate, LogicalRect,
    RasterImage,
};
use std::f32::consts::{FRAC_PI_2, PI};

/// Clockwise rotation aligning the sensor with the display, or `None` for
/// [`DeviceOrientation::Unknown`].
pub fn rotation_for(orientation: DeviceOrientation) -> Option<f32> {
    match orientation {
        DeviceOrientation::Portrait => Some(FRAC_PI_2),
        DeviceOrientation::PortraitUpsideDown => Some(-FRAC_PI_2),
        DeviceOrientation::LandscapeLeft => Some(PI),
        DeviceOrientation::LandscapeRight => Some(0.0),
        DeviceOrientation::Unknown => None,
    }
}

/// Produce the raster a live preview of `viewport` would show for `frame`.
///
/// 1. rotate into display orientation,
/// 2. scale to the viewport height (portrait) or width (landscape),
/// 3. centre-crop the other axis to the viewport.
///
/// The result has `scale == viewport.scale` and is exactly
/// `viewport.pixel_width() x viewport.pixel_height()` pixels.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(frame, viewport), fields(ts = frame.timestamp))
)]
pub fn capture_frame(
    frame: CameraFrame,
    orientation: DeviceOrientation,
    viewport: &Viewport,
) -> Result<RasterImage, CaptureError> {
    let angle = rotation_for(orientation).ok_or(CaptureError::UnknownOrientation)?;
    if !viewport.is_valid() {
        return Err(CaptureError::InvalidViewport);
    }

    let raw = raster_from_pixel_buffer(frame.buffer)?;
    let rotated = rotate(&raw, angle).ok_or(CaptureError::RotateFailed)?;

    let scale = viewport.scale as f32;
    let (vw, vh) = (viewport.width as f32, viewport.height as f32);
    let (resized, rect) = if orientation.is_portrait() {
        let resized = resize_to_height(&rotated, viewport.pixel_height())
            .ok_or(CaptureError::ResizeFailed)?
            .with_scale(scale);
        let x = (resized.logical_width() - vw) / 2.0;
        (resized, LogicalRect::new(x, 0.0, vw, vh))
    } else {
        let resized = resize_to_width(&rotated, viewport.pixel_width())
            .ok_or(CaptureError::ResizeFailed)?
            .with_scale(scale);
        let y = (resized.logical_height() - vh) / 2.0;
        (resized, LogicalRect::new(0.0, y, vw, vh))
    };

    let out = crop(&resized, rect).ok_or(CaptureError::CropFailed)?;
    log::debug!(
        "captured frame ts={:.3} {:?}: {}x{} -> {}x{} @{}x",
        frame.timestamp,
        orientation,
        raw.width,
        raw.height,
        out.width,
        out.height,
        viewport.scale
    );
    Ok(out)
}
