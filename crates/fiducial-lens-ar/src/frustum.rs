//! Geometric view-frustum tests against the sensor image.

use crate::{CameraState, TrackedSurface};
use nalgebra::Point3;

/// Near clipping distance in meters.
pub const NEAR_PLANE: f64 = 0.001;
/// Far clipping distance in meters.
pub const FAR_PLANE: f64 = 1000.0;

/// `true` when `world` is between the clipping planes and projects inside the
/// sensor image.
pub fn is_point_in_frustum(camera: &CameraState, world: &Point3<f64>) -> bool {
    let k = &camera.intrinsics;
    if !k.is_valid() {
        return false;
    }
    let p = camera.to_camera(world);
    let depth = -p.z;
    if !(NEAR_PLANE..=FAR_PLANE).contains(&depth) {
        return false;
    }
    let u = k.fx * p.x / depth + k.cx;
    let v = k.fy * -p.y / depth + k.cy;
    (0.0..=k.width as f64).contains(&u) && (0.0..=k.height as f64).contains(&v)
}

/// `true` when the surface centre or any of its corners is inside the
/// camera frustum.
pub fn is_surface_in_frustum(camera: &CameraState, surface: &TrackedSurface) -> bool {
    is_point_in_frustum(camera, &surface.center())
        || surface
            .world_corners()
            .iter()
            .any(|c| is_point_in_frustum(camera, c))
}
