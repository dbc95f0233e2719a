use serde::{Deserialize, Serialize};

/// Number of interleaved channels in a [`RasterImage`] (RGBA).
pub const CHANNELS: usize = 4;

/// A single RGBA8 pixel.
pub type Rgba = [u8; 4];

#[derive(Clone, Copy, Debug)]
pub struct RasterView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGBA, len = w*h*4
}

/// Owned RGBA8 raster.
///
/// `scale` is the number of pixels per logical unit. Logical rectangles passed
/// to [`crate::crop`] are multiplied by it before cropping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterImage {
    pub width: usize,
    pub height: usize,
    pub scale: f32,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Wrap an RGBA buffer. Returns `None` when the buffer length does not
    /// match `width * height * 4`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(CHANNELS)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            scale: 1.0,
            data,
        })
    }

    /// Image of the given size filled with one colour.
    pub fn filled(width: usize, height: usize, color: Rgba) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            scale: 1.0,
            data,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width in logical units.
    #[inline]
    pub fn logical_width(&self) -> f32 {
        self.width as f32 / self.scale
    }

    /// Height in logical units.
    #[inline]
    pub fn logical_height(&self) -> f32 {
        self.height as f32 / self.scale
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * CHANNELS;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, px: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&px);
    }

    pub fn view(&self) -> RasterView<'_> {
        RasterView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

// Clamp-to-edge fetch.
#[inline]
fn get_rgba(src: &RasterView<'_>, x: i32, y: i32) -> [f32; 4] {
    let xc = x.clamp(0, src.width as i32 - 1) as usize;
    let yc = y.clamp(0, src.height as i32 - 1) as usize;
    let i = (yc * src.width + xc) * CHANNELS;
    [
        src.data[i] as f32,
        src.data[i + 1] as f32,
        src.data[i + 2] as f32,
        src.data[i + 3] as f32,
    ]
}

/// Bilinear sample with pixel centres at integer coordinates.
///
/// Coordinates outside the image are clamped to the nearest edge pixel.
#[inline]
pub fn sample_bilinear(src: &RasterView<'_>, x: f32, y: f32) -> [f32; 4] {
    if src.width == 0 || src.height == 0 {
        return [0.0; 4];
    }
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgba(src, x0, y0);
    let p10 = get_rgba(src, x0 + 1, y0);
    let p01 = get_rgba(src, x0, y0 + 1);
    let p11 = get_rgba(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..CHANNELS {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

#[inline]
pub fn sample_bilinear_rgba(src: &RasterView<'_>, x: f32, y: f32) -> Rgba {
    let v = sample_bilinear(src, x, y);
    v.map(|c| c.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_buffer() {
        assert!(RasterImage::new(2, 2, vec![0; 15]).is_none());
        assert!(RasterImage::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn bilinear_hits_pixel_centres_exactly() {
        let mut img = RasterImage::filled(3, 2, [0, 0, 0, 255]);
        img.put_pixel(1, 1, [200, 100, 50, 255]);
        let view = img.view();
        assert_eq!(sample_bilinear_rgba(&view, 1.0, 1.0), [200, 100, 50, 255]);
        assert_eq!(sample_bilinear_rgba(&view, 0.5, 1.0), [100, 50, 25, 255]);
    }

    #[test]
    fn bilinear_clamps_outside_samples() {
        let mut img = RasterImage::filled(2, 2, [10, 20, 30, 255]);
        img.put_pixel(0, 0, [90, 90, 90, 255]);
        let view = img.view();
        assert_eq!(sample_bilinear_rgba(&view, -3.0, -7.5), [90, 90, 90, 255]);
    }

    #[test]
    fn logical_size_follows_scale() {
        let img = RasterImage::filled(300, 150, [0, 0, 0, 255]).with_scale(3.0);
        assert_eq!(img.logical_width(), 100.0);
        assert_eq!(img.logical_height(), 50.0);
    }
}
