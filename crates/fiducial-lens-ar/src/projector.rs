//! Projection of tracked-surface corners into viewport pixel coordinates.
//!
//! The mapping mirrors [`crate::capture_frame`]: sensor pixels are rotated
//! into display orientation, aspect-filled into the viewport and centred, so
//! projected corners land on the same pixels of the captured raster.

use crate::frustum::NEAR_PLANE;
use crate::{CameraState, CaptureError, DeviceOrientation, TrackedSurface, Viewport};
use fiducial_lens_core::Quad;
use nalgebra::{Point2, Point3};

/// Rotate a normalized sensor coordinate into display orientation.
fn orient_normalized(
    n: Point2<f64>,
    orientation: DeviceOrientation,
) -> Result<Point2<f64>, CaptureError> {
    Ok(match orientation {
        DeviceOrientation::LandscapeRight => n,
        DeviceOrientation::Portrait => Point2::new(1.0 - n.y, n.x),
        DeviceOrientation::PortraitUpsideDown => Point2::new(n.y, 1.0 - n.x),
        DeviceOrientation::LandscapeLeft => Point2::new(1.0 - n.x, 1.0 - n.y),
        DeviceOrientation::Unknown => return Err(CaptureError::UnknownOrientation),
    })
}

/// Project one world point to viewport pixels.
pub fn project_point(
    camera: &CameraState,
    world: &Point3<f64>,
    orientation: DeviceOrientation,
    viewport: &Viewport,
) -> Result<Point2<f64>, CaptureError> {
    let k = &camera.intrinsics;
    if !k.is_valid() {
        return Err(CaptureError::InvalidIntrinsics);
    }
    if !viewport.is_valid() {
        return Err(CaptureError::InvalidViewport);
    }

    let p = camera.to_camera(world);
    let depth = -p.z;
    if depth < NEAR_PLANE {
        return Err(CaptureError::BehindCamera);
    }
    let (sw, sh) = (k.width as f64, k.height as f64);
    let u = k.fx * p.x / depth + k.cx;
    let v = k.fy * -p.y / depth + k.cy;

    let n = orient_normalized(Point2::new(u / sw, v / sh), orientation)?;

    // sensor size after rotation into display orientation
    let (rw, rh) = if orientation.is_portrait() {
        (sh, sw)
    } else {
        (sw, sh)
    };

    let logical = if orientation.is_portrait() {
        let f = viewport.height / rh;
        let off_x = (rw * f - viewport.width) / 2.0;
        Point2::new(n.x * rw * f - off_x, n.y * viewport.height)
    } else {
        let f = viewport.width / rw;
        let off_y = (rh * f - viewport.height) / 2.0;
        Point2::new(n.x * viewport.width, n.y * rh * f - off_y)
    };

    Ok(logical * viewport.scale)
}

/// Pixel-space corners of `surface` in the captured viewport raster.
///
/// Fails when the surface is not tracked, the orientation is unknown, or any
/// corner is behind the camera. Frustum visibility is checked by the caller.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(surface, camera, viewport), fields(surface = %surface.id))
)]
pub fn project_corners(
    surface: &TrackedSurface,
    camera: &CameraState,
    orientation: DeviceOrientation,
    viewport: &Viewport,
) -> Result<Quad, CaptureError> {
    if !surface.is_tracked {
        return Err(CaptureError::SurfaceNotTracked(surface.id));
    }
    let [tl, tr, bl, br] = surface.world_corners();
    let project = |p: &Point3<f64>| project_point(camera, p, orientation, viewport);
    let quad = Quad::new(project(&tl)?, project(&tr)?, project(&bl)?, project(&br)?);
    log::debug!(
        "projected surface {} corners: tl=({:.1},{:.1}) br=({:.1},{:.1})",
        surface.id,
        quad.top_left.x,
        quad.top_left.y,
        quad.bottom_right.x,
        quad.bottom_right.y
    );
    Ok(quad)
}
