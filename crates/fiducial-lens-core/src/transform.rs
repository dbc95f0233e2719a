//! Pure raster transforms: crop, resize, rotate and classifier input preparation.
//!
//! Every function takes the source by reference and returns a fresh raster;
//! nothing is modified in place.

use crate::{sample_bilinear_rgba, RasterImage, Rgba, CHANNELS};
use serde::{Deserialize, Serialize};

/// Fill colour for canvas area not covered by rotated content.
pub const ROTATE_BACKGROUND: Rgba = [0, 0, 0, 255];

// Absorbs float noise in sin/cos so quarter turns keep exact sizes.
const SIZE_EPS: f64 = 1e-6;

/// Axis-aligned rectangle in logical units (see [`RasterImage::scale`]).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogicalRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LogicalRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// How a rectified image is fitted to a fixed classifier input size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropAndScale {
    /// Scale to cover the target, then crop the centre.
    #[default]
    CenterCrop,
    /// Scale to fit inside the target, letterboxed on opaque black.
    ScaleFit,
    /// Stretch to the target size, ignoring aspect ratio.
    ScaleFill,
}

fn crop_pixels(image: &RasterImage, x: usize, y: usize, w: usize, h: usize) -> RasterImage {
    let mut data = Vec::with_capacity(w * h * CHANNELS);
    for row in y..y + h {
        let start = (row * image.width + x) * CHANNELS;
        data.extend_from_slice(&image.data[start..start + w * CHANNELS]);
    }
    RasterImage {
        width: w,
        height: h,
        scale: image.scale,
        data,
    }
}

/// Crop a logical rectangle out of `image`.
///
/// The rectangle is multiplied by `image.scale` and rounded to whole pixels.
/// Returns `None` unless the scaled rectangle is non-empty and lies entirely
/// inside the image.
pub fn crop(image: &RasterImage, rect: LogicalRect) -> Option<RasterImage> {
    let s = image.scale;
    let x = (rect.x * s).round();
    let y = (rect.y * s).round();
    let w = (rect.width * s).round();
    let h = (rect.height * s).round();
    if ![x, y, w, h].iter().all(|v| v.is_finite()) {
        return None;
    }
    if x < 0.0 || y < 0.0 || w < 1.0 || h < 1.0 {
        return None;
    }
    let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
    if x + w > image.width || y + h > image.height {
        return None;
    }
    Some(crop_pixels(image, x, y, w, h))
}

/// Bilinear resample to an explicit pixel size. Keeps the source scale.
pub fn resize(image: &RasterImage, width: usize, height: usize) -> Option<RasterImage> {
    if width == 0 || height == 0 || image.is_empty() {
        return None;
    }
    if width == image.width && height == image.height {
        return Some(image.clone());
    }

    let sx = image.width as f32 / width as f32;
    let sy = image.height as f32 / height as f32;
    let src = image.view();
    let mut data = Vec::with_capacity(width * height * CHANNELS);
    for y in 0..height {
        let v = (y as f32 + 0.5) * sy - 0.5;
        for x in 0..width {
            let u = (x as f32 + 0.5) * sx - 0.5;
            data.extend_from_slice(&sample_bilinear_rgba(&src, u, v));
        }
    }
    Some(RasterImage {
        width,
        height,
        scale: image.scale,
        data,
    })
}

/// Scale uniformly so the height becomes `height` pixels.
///
/// Returns an unchanged copy when the height already matches.
pub fn resize_to_height(image: &RasterImage, height: usize) -> Option<RasterImage> {
    if height == image.height {
        return Some(image.clone());
    }
    if image.is_empty() {
        return None;
    }
    let ratio = height as f64 / image.height as f64;
    let width = (image.width as f64 * ratio).round().max(1.0) as usize;
    resize(image, width, height)
}

/// Scale uniformly so the width becomes `width` pixels.
///
/// Returns an unchanged copy when the width already matches.
pub fn resize_to_width(image: &RasterImage, width: usize) -> Option<RasterImage> {
    if width == image.width {
        return Some(image.clone());
    }
    if image.is_empty() {
        return None;
    }
    let ratio = width as f64 / image.width as f64;
    let height = (image.height as f64 * ratio).round().max(1.0) as usize;
    resize(image, width, height)
}

/// Rotate about the image centre by `radians`, clockwise in pixel space.
///
/// The canvas is the bounding box of the rotated image, floored to whole
/// pixels. Uncovered canvas is filled with [`ROTATE_BACKGROUND`].
pub fn rotate(image: &RasterImage, radians: f32) -> Option<RasterImage> {
    if image.is_empty() || !radians.is_finite() {
        return None;
    }
    let (sin, cos) = (radians as f64).sin_cos();
    let (w, h) = (image.width as f64, image.height as f64);
    let new_w = (w * cos.abs() + h * sin.abs() + SIZE_EPS).floor().max(1.0) as usize;
    let new_h = (w * sin.abs() + h * cos.abs() + SIZE_EPS).floor().max(1.0) as usize;

    let (ocx, ocy) = (new_w as f64 / 2.0, new_h as f64 / 2.0);
    let (icx, icy) = (w / 2.0, h / 2.0);
    let src = image.view();

    let mut data = Vec::with_capacity(new_w * new_h * CHANNELS);
    for j in 0..new_h {
        let dy = j as f64 + 0.5 - ocy;
        for i in 0..new_w {
            let dx = i as f64 + 0.5 - ocx;
            // inverse rotation back into the source frame
            let sx = cos * dx + sin * dy + icx;
            let sy = -sin * dx + cos * dy + icy;
            if sx < 0.0 || sy < 0.0 || sx > w || sy > h {
                data.extend_from_slice(&ROTATE_BACKGROUND);
            } else {
                data.extend_from_slice(&sample_bilinear_rgba(
                    &src,
                    (sx - 0.5) as f32,
                    (sy - 0.5) as f32,
                ));
            }
        }
    }

    Some(RasterImage {
        width: new_w,
        height: new_h,
        scale: image.scale,
        data,
    })
}

/// Fit `image` to exactly `width x height` pixels using `mode`.
pub fn center_crop_and_scale(
    image: &RasterImage,
    width: usize,
    height: usize,
    mode: CropAndScale,
) -> Option<RasterImage> {
    if width == 0 || height == 0 || image.is_empty() {
        return None;
    }
    let fx = width as f64 / image.width as f64;
    let fy = height as f64 / image.height as f64;

    let out = match mode {
        CropAndScale::ScaleFill => resize(image, width, height)?,
        CropAndScale::CenterCrop => {
            let f = fx.max(fy);
            let sw = ((image.width as f64 * f).round() as usize).max(width);
            let sh = ((image.height as f64 * f).round() as usize).max(height);
            let scaled = resize(image, sw, sh)?;
            crop_pixels(&scaled, (sw - width) / 2, (sh - height) / 2, width, height)
        }
        CropAndScale::ScaleFit => {
            let f = fx.min(fy);
            let sw = ((image.width as f64 * f).round() as usize).clamp(1, width);
            let sh = ((image.height as f64 * f).round() as usize).clamp(1, height);
            let scaled = resize(image, sw, sh)?;
            let mut canvas = RasterImage::filled(width, height, ROTATE_BACKGROUND);
            let (ox, oy) = ((width - sw) / 2, (height - sh) / 2);
            for row in 0..sh {
                let src = row * sw * CHANNELS;
                let dst = ((oy + row) * width + ox) * CHANNELS;
                canvas.data[dst..dst + sw * CHANNELS]
                    .copy_from_slice(&scaled.data[src..src + sw * CHANNELS]);
            }
            canvas
        }
    };
    Some(out.with_scale(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    // 3x2 image with distinct pixels.
    fn gradient(w: usize, h: usize) -> RasterImage {
        let mut img = RasterImage::filled(w, h, [0, 0, 0, 255]);
        for y in 0..h {
            for x in 0..w {
                img.put_pixel(x, y, [(x * 40) as u8, (y * 60) as u8, 7, 255]);
            }
        }
        img
    }

    #[test]
    fn crop_scales_logical_rect() {
        let img = gradient(6, 4).with_scale(2.0);
        let out = crop(&img, LogicalRect::new(1.0, 0.5, 2.0, 1.5)).expect("inside");
        assert_eq!((out.width, out.height), (4, 3));
        assert_eq!(out.scale, 2.0);
        assert_eq!(out.pixel(0, 0), img.pixel(2, 1));
        assert_eq!(out.pixel(3, 2), img.pixel(5, 3));
    }

    #[test]
    fn crop_outside_bounds_fails() {
        let img = gradient(6, 4);
        assert!(crop(&img, LogicalRect::new(4.0, 0.0, 3.0, 2.0)).is_none());
        assert!(crop(&img, LogicalRect::new(-1.0, 0.0, 2.0, 2.0)).is_none());
        assert!(crop(&img, LogicalRect::new(0.0, 0.0, 0.0, 2.0)).is_none());
        assert!(crop(&img, LogicalRect::new(f32::NAN, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn resize_to_matching_dimension_is_identity() {
        let img = gradient(5, 3).with_scale(3.0);
        assert_eq!(resize_to_height(&img, 3), Some(img.clone()));
        assert_eq!(resize_to_width(&img, 5), Some(img));
    }

    #[test]
    fn resize_preserves_aspect_ratio() {
        let img = RasterImage::filled(400, 300, [9, 9, 9, 255]);
        let h = resize_to_height(&img, 150).expect("resize");
        assert_eq!((h.width, h.height), (200, 150));
        let w = resize_to_width(&img, 100).expect("resize");
        assert_eq!((w.width, w.height), (100, 75));
        assert!(w.data.chunks(4).all(|p| p == [9, 9, 9, 255]));
        assert!(resize_to_width(&img, 0).is_none());
    }

    #[test]
    fn rotate_by_zero_is_identity() {
        let img = gradient(7, 4);
        assert_eq!(rotate(&img, 0.0), Some(img));
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        let img = gradient(3, 2);
        let out = rotate(&img, FRAC_PI_2).expect("rotate");
        assert_eq!((out.width, out.height), (2, 3));
        // top-left moves to top-right
        assert_eq!(out.pixel(1, 0), img.pixel(0, 0));
        // bottom-left moves to top-left
        assert_eq!(out.pixel(0, 0), img.pixel(0, 1));
        assert_eq!(out.pixel(0, 2), img.pixel(2, 1));
    }

    #[test]
    fn half_turn_and_counter_quarter_turn() {
        let img = gradient(3, 2);
        let half = rotate(&img, PI).expect("rotate");
        assert_eq!((half.width, half.height), (3, 2));
        assert_eq!(half.pixel(0, 0), img.pixel(2, 1));

        let ccw = rotate(&img, -FRAC_PI_2).expect("rotate");
        assert_eq!((ccw.width, ccw.height), (2, 3));
        // top-right moves to top-left
        assert_eq!(ccw.pixel(0, 0), img.pixel(2, 0));
    }

    #[test]
    fn diagonal_rotation_grows_canvas_and_fills_corners() {
        let img = RasterImage::filled(10, 10, [255, 255, 255, 255]);
        let out = rotate(&img, FRAC_PI_4).expect("rotate");
        assert_eq!((out.width, out.height), (14, 14));
        assert_eq!(out.pixel(0, 0), Some(ROTATE_BACKGROUND));
        assert_eq!(out.pixel(7, 7), Some([255, 255, 255, 255]));
    }

    #[test]
    fn center_crop_keeps_middle() {
        let mut img = RasterImage::filled(300, 100, [0, 0, 255, 255]);
        for y in 0..100 {
            for x in 100..200 {
                img.put_pixel(x, y, [255, 0, 0, 255]);
            }
        }
        let out = center_crop_and_scale(&img, 50, 50, CropAndScale::CenterCrop).expect("fit");
        assert_eq!((out.width, out.height), (50, 50));
        assert!(out.data.chunks(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn scale_fit_letterboxes() {
        let img = RasterImage::filled(200, 100, [255, 255, 255, 255]);
        let out = center_crop_and_scale(&img, 100, 100, CropAndScale::ScaleFit).expect("fit");
        assert_eq!(out.pixel(50, 0), Some(ROTATE_BACKGROUND));
        assert_eq!(out.pixel(50, 50), Some([255, 255, 255, 255]));

        let fill = center_crop_and_scale(&img, 30, 40, CropAndScale::ScaleFill).expect("fill");
        assert_eq!((fill.width, fill.height), (30, 40));
    }
}
