//! Perspective rectification of a quadrilateral image region.
//!
//! Corners always travel in the order top-left, top-right, bottom-left,
//! bottom-right. [`rectify`] takes pixel-space corners (y-down) and hands
//! them to [`perspective_correct`], which works in Cartesian space (y-up).

use crate::{homography_from_4pt, warp_perspective_rgba, RasterImage};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RectifyError {
    #[error("degenerate quad (coincident, collinear, non-convex or non-finite corners)")]
    DegenerateQuad,
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("quad corners reach too far outside the {width}x{height} source image")]
    QuadOutOfBounds { width: usize, height: usize },
}

/// How far, in multiples of the source image size, a corner may lie outside
/// the image. Bounds the rectified output to a few times the source extent.
pub const MAX_CORNER_OVERHANG: f64 = 1.0;

/// Four corners in pixel space (origin top-left, y-down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
    pub bottom_right: Point2<f64>,
}

/// Four corners in Cartesian space (origin bottom-left, y-up).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartesianQuad {
    pub top_left: Point2<f64>,
    pub top_right: Point2<f64>,
    pub bottom_left: Point2<f64>,
    pub bottom_right: Point2<f64>,
}

impl Quad {
    pub fn new(
        top_left: Point2<f64>,
        top_right: Point2<f64>,
        bottom_left: Point2<f64>,
        bottom_right: Point2<f64>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// Quad covering a whole `width x height` image.
    pub fn full_frame(width: usize, height: usize) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self::new(
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(0.0, h),
            Point2::new(w, h),
        )
    }

    /// Corners in the canonical order TL, TR, BL, BR.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Flip into Cartesian space of an image `image_height` pixels tall.
    pub fn to_cartesian(&self, image_height: f64) -> CartesianQuad {
        let flip = |p: Point2<f64>| Point2::new(p.x, image_height - p.y);
        CartesianQuad {
            top_left: flip(self.top_left),
            top_right: flip(self.top_right),
            bottom_left: flip(self.bottom_left),
            bottom_right: flip(self.bottom_right),
        }
    }
}

impl CartesianQuad {
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Rectified output size: the longer of each pair of opposite edges.
    pub fn output_size(&self) -> (usize, usize) {
        let d = |a: Point2<f64>, b: Point2<f64>| (a - b).norm();
        let w = d(self.top_left, self.top_right).max(d(self.bottom_left, self.bottom_right));
        let h = d(self.top_left, self.bottom_left).max(d(self.top_right, self.bottom_right));
        (
            w.round().max(1.0) as usize,
            h.round().max(1.0) as usize,
        )
    }

    /// `true` when every corner lies within `MAX_CORNER_OVERHANG` image
    /// extents of a `width x height` image.
    pub fn fits_image(&self, width: usize, height: usize) -> bool {
        let (w, h) = (width as f64, height as f64);
        let (mx, my) = (MAX_CORNER_OVERHANG * w, MAX_CORNER_OVERHANG * h);
        self.corners()
            .iter()
            .all(|p| p.x >= -mx && p.x <= w + mx && p.y >= -my && p.y <= h + my)
    }

    /// `true` for a strictly convex, finite quad.
    ///
    /// Walks TL -> TR -> BR -> BL; every turn must have the same sign and a
    /// non-negligible magnitude. This rejects coincident corners, three
    /// collinear corners and self-intersecting (bow-tie) orderings.
    pub fn is_convex(&self) -> bool {
        let ring = [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ];
        if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return false;
        }
        let max_edge = (0..4)
            .map(|i| (ring[(i + 1) % 4] - ring[i]).norm())
            .fold(0.0_f64, f64::max);
        let tol = 1e-9 * max_edge * max_edge;
        if max_edge <= 0.0 {
            return false;
        }

        let mut sign = 0.0_f64;
        for i in 0..4 {
            let a = ring[i];
            let b = ring[(i + 1) % 4];
            let c = ring[(i + 2) % 4];
            let cross = (b - a).perp(&(c - b));
            if cross.abs() <= tol {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

/// Unwarp the region bounded by a Cartesian quad into an upright rectangle.
///
/// The source image is stored top row first; Cartesian `y` is measured from
/// its bottom edge. The output scale is 1.0.
pub fn perspective_correct(
    image: &RasterImage,
    quad: &CartesianQuad,
) -> Result<RasterImage, RectifyError> {
    if image.is_empty() || !quad.is_convex() {
        return Err(RectifyError::DegenerateQuad);
    }
    if !quad.fits_image(image.width, image.height) {
        return Err(RectifyError::QuadOutOfBounds {
            width: image.width,
            height: image.height,
        });
    }
    let (out_w, out_h) = quad.output_size();
    let h_img = image.height as f64;
    let img_pts = quad.corners().map(|p| Point2::new(p.x, h_img - p.y));
    let (w, h) = (out_w as f64, out_h as f64);
    let out_pts = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(0.0, h),
        Point2::new(w, h),
    ];

    let h_img_from_out =
        homography_from_4pt(&out_pts, &img_pts).ok_or(RectifyError::HomographyFailed)?;
    log::trace!(
        "perspective_correct {}x{} -> {}x{}",
        image.width,
        image.height,
        out_w,
        out_h
    );
    Ok(warp_perspective_rgba(
        &image.view(),
        h_img_from_out,
        out_w,
        out_h,
    ))
}

/// Deskew the pixel-space `quad` of `image` into an upright raster.
///
/// Each corner is flipped into Cartesian space (`y' = image.height - y`)
/// before [`perspective_correct`]; its output is already upright and is
/// returned as is.
pub fn rectify(image: &RasterImage, quad: &Quad) -> Result<RasterImage, RectifyError> {
    perspective_correct(image, &quad.to_cartesian(image.height as f64))
}
