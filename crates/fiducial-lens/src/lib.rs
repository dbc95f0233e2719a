//! High-level facade crate for the `fiducial-lens-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the raster core, the camera/capture layer and the
//!   recognition coordinator
//! - (feature `image`) conversions to and from `image::RgbaImage`, JSON scene
//!   files and replay helpers
//! - (feature `cli`) the `fiducial-lens` binary
//!
//! ## Quickstart
//!
//! ```no_run
//! use fiducial_lens::core::{rectify, Quad};
//! use fiducial_lens::io::{load_raster, save_raster};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = load_raster("card.png")?;
//! let quad = Quad::new(
//!     Point2::new(120.0, 80.0),
//!     Point2::new(410.0, 95.0),
//!     Point2::new(100.0, 460.0),
//!     Point2::new(430.0, 470.0),
//! );
//! let deskewed = rectify(&img, &quad)?;
//! save_raster(&deskewed, "card_rectified.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `fiducial_lens::core`: rasters, transforms, homographies, rectification.
//! - `fiducial_lens::ar`: camera model, corner projection, viewport capture,
//!   session snapshots.
//! - `fiducial_lens::recognizer`: the capture/rectify/classify coordinator and
//!   its executors.
//! - `fiducial_lens::io` (feature `image`): file helpers and scene replay.

pub use fiducial_lens_ar as ar;
pub use fiducial_lens_core as core;
pub use fiducial_lens_recognizer as recognizer;

pub use fiducial_lens_ar::{capture_surface, SceneSnapshot, SceneSource, SurfaceId, TrackedSurface};
pub use fiducial_lens_core::{rectify, Quad, RasterImage};
pub use fiducial_lens_recognizer::{
    Classification, Classifier, RecognitionError, Recognizer, RecognizerConfig, Submission,
};

#[cfg(feature = "image")]
pub mod io;
