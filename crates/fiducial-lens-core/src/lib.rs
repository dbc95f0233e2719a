//! Core raster and geometry utilities for fiducial-lens.
//!
//! This crate is intentionally small and purely computational. It knows
//! nothing about cameras, tracking sessions or classifiers; it only turns
//! pixel buffers into RGBA rasters, transforms those rasters, and rectifies
//! a quadrilateral region into an upright image.
//!
//! ## Coordinate conventions
//! - Pixel space: origin at the top-left corner, y grows downwards, pixel
//!   `(i, j)` covers `[i, i+1) x [j, j+1)` and its centre is `(i+0.5, j+0.5)`.
//! - Cartesian space (used by [`perspective_correct`]): origin at the
//!   bottom-left corner, y grows upwards.

mod homography;
mod image;
mod logger;
mod pixel_buffer;
mod rectify;
mod transform;

pub use homography::{homography_from_4pt, warp_perspective_rgba, Homography};
pub use image::{sample_bilinear, sample_bilinear_rgba, RasterImage, RasterView, Rgba, CHANNELS};
pub use pixel_buffer::{raster_from_pixel_buffer, PixelBuffer, PixelBufferError, PixelFormat};
pub use rectify::{perspective_correct, rectify, CartesianQuad, Quad, RectifyError};
pub use transform::{
    center_crop_and_scale, crop, resize, resize_to_height, resize_to_width, rotate, CropAndScale,
    LogicalRect, ROTATE_BACKGROUND,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
