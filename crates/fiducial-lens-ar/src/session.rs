//! Read access to the tracking session and the capture step built on it.
//!
//! The tracking side keeps updating poses and frames while captures run, so
//! [`SceneSource`] hands out owned snapshots instead of references.

use crate::{
    capture_frame, is_surface_in_frustum, project_corners, CameraFrame, CameraState,
    CaptureError, DeviceOrientation, SurfaceId, TrackedSurface, Viewport,
};
use fiducial_lens_core::{Quad, RasterImage};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Default number of surfaces a [`SceneSnapshot`] tracks at once.
pub const DEFAULT_MAX_SURFACES: usize = 1;

/// Everything needed to map the current frame onto the display.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: CameraFrame,
    pub camera: CameraState,
    pub orientation: DeviceOrientation,
    pub viewport: Viewport,
}

/// Tracking-session capability consumed by the capture pipeline.
pub trait SceneSource: Send + Sync {
    /// Latest frame together with its camera state, or `None` before the
    /// first frame arrives.
    fn current_frame(&self) -> Option<FrameSnapshot>;

    /// Current state of a surface, or `None` if the session never saw it.
    fn surface(&self, id: SurfaceId) -> Option<TrackedSurface>;

    /// Whether `surface` is visible from `camera`.
    fn is_in_frustum(&self, surface: &TrackedSurface, camera: &CameraState) -> bool {
        is_surface_in_frustum(camera, surface)
    }
}

/// Thread-safe in-memory [`SceneSource`] fed by the tracking side.
#[derive(Debug)]
pub struct SceneSnapshot {
    frame: RwLock<Option<FrameSnapshot>>,
    surfaces: RwLock<BTreeMap<SurfaceId, TrackedSurface>>,
    max_surfaces: usize,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneSnapshot {
    pub fn new() -> Self {
        Self::with_max_surfaces(DEFAULT_MAX_SURFACES)
    }

    pub fn with_max_surfaces(max_surfaces: usize) -> Self {
        Self {
            frame: RwLock::new(None),
            surfaces: RwLock::new(BTreeMap::new()),
            max_surfaces,
        }
    }

    pub fn max_surfaces(&self) -> usize {
        self.max_surfaces
    }

    /// Replace the current frame.
    pub fn update_frame(&self, snapshot: FrameSnapshot) {
        log::trace!("scene frame ts={:.3}", snapshot.frame.timestamp);
        *self.frame.write() = Some(snapshot);
    }

    /// Insert or update a surface. A new surface beyond the configured limit
    /// is ignored and `false` is returned.
    pub fn upsert_surface(&self, surface: TrackedSurface) -> bool {
        let mut surfaces = self.surfaces.write();
        if !surfaces.contains_key(&surface.id) && surfaces.len() >= self.max_surfaces {
            log::debug!(
                "ignoring surface {}: already tracking {} of {}",
                surface.id,
                surfaces.len(),
                self.max_surfaces
            );
            return false;
        }
        surfaces.insert(surface.id, surface);
        true
    }

    /// Forget a surface. Returns the last known state, if any.
    pub fn remove_surface(&self, id: SurfaceId) -> Option<TrackedSurface> {
        self.surfaces.write().remove(&id)
    }

    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces.read().keys().copied().collect()
    }
}

impl SceneSource for SceneSnapshot {
    fn current_frame(&self) -> Option<FrameSnapshot> {
        self.frame.read().clone()
    }

    fn surface(&self, id: SurfaceId) -> Option<TrackedSurface> {
        self.surfaces.read().get(&id).copied()
    }
}

/// Viewport raster of the current frame plus the surface corners in it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCapture {
    pub surface_id: SurfaceId,
    pub timestamp: f64,
    pub image: RasterImage,
    pub quad: Quad,
}

/// Capture the current frame as displayed and locate `id` within it.
///
/// Fails when no frame is available, the surface is unknown, untracked or
/// outside the frustum, or when projection or frame capture fails.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(scene), fields(surface = %id))
)]
pub fn capture_surface<S: SceneSource + ?Sized>(
    scene: &S,
    id: SurfaceId,
) -> Result<SurfaceCapture, CaptureError> {
    let snapshot = scene.current_frame().ok_or(CaptureError::NoFrame)?;
    let surface = scene.surface(id).ok_or(CaptureError::UnknownSurface(id))?;
    if !surface.is_tracked {
        return Err(CaptureError::SurfaceNotTracked(id));
    }
    if !scene.is_in_frustum(&surface, &snapshot.camera) {
        return Err(CaptureError::OutOfFrustum(id));
    }

    let FrameSnapshot {
        frame,
        camera,
        orientation,
        viewport,
    } = snapshot;
    let quad = project_corners(&surface, &camera, orientation, &viewport)?;
    let timestamp = frame.timestamp;
    let image = capture_frame(frame, orientation, &viewport)?;

    Ok(SurfaceCapture {
        surface_id: id,
        timestamp,
        image,
        quad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CameraIntrinsics;
    use fiducial_lens_core::PixelBuffer;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

    fn camera() -> CameraState {
        CameraState {
            intrinsics: CameraIntrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                width: 640,
                height: 480,
            },
            pose: Isometry3::identity(),
        }
    }

    fn snapshot() -> FrameSnapshot {
        FrameSnapshot {
            frame: CameraFrame {
                buffer: PixelBuffer::rgba8(640, 480, vec![128; 640 * 480 * 4]),
                timestamp: 0.25,
            },
            camera: camera(),
            orientation: DeviceOrientation::LandscapeRight,
            viewport: Viewport::new(320.0, 240.0, 2.0),
        }
    }

    fn surface(id: u64, z: f64) -> TrackedSurface {
        let pose = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, z),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2),
        );
        TrackedSurface::new(SurfaceId(id), pose, 0.1, 0.1)
    }

    struct NeverVisible(SceneSnapshot);

    impl SceneSource for NeverVisible {
        fn current_frame(&self) -> Option<FrameSnapshot> {
            self.0.current_frame()
        }
        fn surface(&self, id: SurfaceId) -> Option<TrackedSurface> {
            self.0.surface(id)
        }
        fn is_in_frustum(&self, _: &TrackedSurface, _: &CameraState) -> bool {
            false
        }
    }

    #[test]
    fn upsert_respects_surface_limit() {
        let scene = SceneSnapshot::new();
        assert!(scene.upsert_surface(surface(1, -0.5)));
        assert!(!scene.upsert_surface(surface(2, -0.5)));
        // updating a known surface is always allowed
        assert!(scene.upsert_surface(surface(1, -0.6)));
        assert_eq!(scene.surface_ids(), vec![SurfaceId(1)]);

        assert!(scene.remove_surface(SurfaceId(1)).is_some());
        assert!(scene.upsert_surface(surface(2, -0.5)));
    }

    #[test]
    fn capture_requires_frame_and_known_surface() {
        let scene = SceneSnapshot::new();
        assert_eq!(
            capture_surface(&scene, SurfaceId(1)),
            Err(CaptureError::NoFrame)
        );
        scene.update_frame(snapshot());
        assert_eq!(
            capture_surface(&scene, SurfaceId(1)),
            Err(CaptureError::UnknownSurface(SurfaceId(1)))
        );
    }

    #[test]
    fn untracked_and_invisible_surfaces_fail() {
        let scene = SceneSnapshot::new();
        scene.update_frame(snapshot());
        let mut s = surface(1, -0.5);
        s.is_tracked = false;
        scene.upsert_surface(s);
        assert_eq!(
            capture_surface(&scene, SurfaceId(1)),
            Err(CaptureError::SurfaceNotTracked(SurfaceId(1)))
        );

        scene.upsert_surface(surface(1, 0.5));
        assert_eq!(
            capture_surface(&scene, SurfaceId(1)),
            Err(CaptureError::OutOfFrustum(SurfaceId(1)))
        );

        scene.upsert_surface(surface(1, -0.5));
        let hidden = NeverVisible(scene);
        assert_eq!(
            capture_surface(&hidden, SurfaceId(1)),
            Err(CaptureError::OutOfFrustum(SurfaceId(1)))
        );
    }

    #[test]
    fn capture_returns_viewport_raster_and_quad() {
        let scene = SceneSnapshot::new();
        scene.update_frame(snapshot());
        scene.upsert_surface(surface(1, -0.5));
        let cap = capture_surface(&scene, SurfaceId(1)).expect("capture");
        assert_eq!((cap.image.width, cap.image.height), (640, 480));
        assert_eq!(cap.timestamp, 0.25);
        assert!((cap.quad.top_left.x - 270.0).abs() < 1e-6);
        assert!((cap.quad.bottom_right.y - 290.0).abs() < 1e-6);
    }
}
