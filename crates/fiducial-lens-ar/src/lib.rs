//! Camera model, corner projection and viewport capture for tracked planar
//! surfaces.
//!
//! A [`SceneSource`] supplies the latest camera frame and surface poses.
//! [`capture_surface`] turns them into a viewport-sized raster (what the user
//! sees on screen) and the pixel-space [`Quad`](fiducial_lens_core::Quad) of
//! the surface within that raster, ready for
//! [`rectify`](fiducial_lens_core::rectify).
//!
//! ## Conventions
//! - Camera space: x right, y up, looking down `-z`.
//! - Intrinsics are given in native sensor orientation (landscape-right).
//! - Quads are in viewport pixels (logical points times display scale).

mod camera;
mod capture;
mod error;
mod frustum;
mod projector;
mod session;
mod surface;

pub use camera::{CameraFrame, CameraIntrinsics, CameraState, DeviceOrientation, Viewport};
pub use capture::{capture_frame, rotation_for};
pub use error::CaptureError;
pub use frustum::{is_point_in_frustum, is_surface_in_frustum, FAR_PLANE, NEAR_PLANE};
pub use projector::{project_corners, project_point};
pub use session::{
    capture_surface, FrameSnapshot, SceneSnapshot, SceneSource, SurfaceCapture,
    DEFAULT_MAX_SURFACES,
};
pub use surface::{SurfaceId, TrackedSurface};
