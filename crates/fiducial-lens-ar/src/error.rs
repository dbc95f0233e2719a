use crate::SurfaceId;
use fiducial_lens_core::{PixelBufferError, RectifyError};

/// Errors returned while turning a tracked surface into a raster.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("no camera frame available")]
    NoFrame,
    #[error("surface {0} is not known to the session")]
    UnknownSurface(SurfaceId),
    #[error("surface {0} is not currently tracked")]
    SurfaceNotTracked(SurfaceId),
    #[error("surface {0} is outside the camera frustum")]
    OutOfFrustum(SurfaceId),
    #[error("device orientation is unknown")]
    UnknownOrientation,
    #[error("point is behind the camera")]
    BehindCamera,
    #[error("camera intrinsics are invalid")]
    InvalidIntrinsics,
    #[error("viewport must have positive finite size and scale")]
    InvalidViewport,
    #[error(transparent)]
    PixelBuffer(#[from] PixelBufferError),
    #[error("frame rotation failed")]
    RotateFailed,
    #[error("frame resize failed")]
    ResizeFailed,
    #[error("viewport crop is outside the frame")]
    CropFailed,
    #[error(transparent)]
    Rectify(#[from] RectifyError),
}
