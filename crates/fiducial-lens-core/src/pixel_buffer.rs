//! Sensor pixel buffers and their conversion to RGBA rasters.

use crate::{RasterImage, CHANNELS};
use serde::{Deserialize, Serialize};

/// Memory layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Interleaved 8-bit RGBA.
    Rgba8,
    /// Interleaved 8-bit BGRA, the usual layout of camera preview buffers.
    Bgra8,
    /// Single 8-bit luma channel.
    Gray8,
    /// Bi-planar full-range YCbCr 4:2:0: a luma plane followed by an
    /// interleaved CbCr plane at half resolution. Both planes share `stride`.
    Nv12,
}

impl PixelFormat {
    /// Bytes needed for one row of the first plane.
    fn min_row_bytes(self, width: usize) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => width * 4,
            PixelFormat::Gray8 | PixelFormat::Nv12 => width,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PixelBufferError {
    #[error("pixel buffer has zero width or height")]
    EmptyDimensions,
    #[error("row stride {stride} is smaller than one row ({min} bytes)")]
    StrideTooSmall { stride: usize, min: usize },
    #[error("pixel buffer too small (expected at least {expected} bytes, got {got})")]
    BufferTooSmall { expected: usize, got: usize },
    #[error("NV12 buffers need even dimensions (width={width}, height={height})")]
    OddChromaDimensions { width: usize, height: usize },
}

/// Raw camera buffer as delivered by the capture device.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    pub format: PixelFormat,
    pub width: usize,
    pub height: usize,
    /// Bytes per row, including any padding.
    pub stride: usize,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(
        format: PixelFormat,
        width: usize,
        height: usize,
        stride: usize,
        data: Vec<u8>,
    ) -> Self {
        Self {
            format,
            width,
            height,
            stride,
            data,
        }
    }

    /// Tightly packed RGBA buffer.
    pub fn rgba8(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self::new(PixelFormat::Rgba8, width, height, width * 4, data)
    }

    fn validate(&self) -> Result<(), PixelBufferError> {
        if self.width == 0 || self.height == 0 {
            return Err(PixelBufferError::EmptyDimensions);
        }
        let min = self.format.min_row_bytes(self.width);
        if self.stride < min {
            return Err(PixelBufferError::StrideTooSmall {
                stride: self.stride,
                min,
            });
        }
        let rows = match self.format {
            PixelFormat::Nv12 => {
                if self.width % 2 != 0 || self.height % 2 != 0 {
                    return Err(PixelBufferError::OddChromaDimensions {
                        width: self.width,
                        height: self.height,
                    });
                }
                self.height + self.height / 2
            }
            _ => self.height,
        };
        // The last row of the last plane does not need trailing padding.
        let expected = (rows - 1) * self.stride + min;
        if self.data.len() < expected {
            return Err(PixelBufferError::BufferTooSmall {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Convert a sensor buffer into an RGBA raster with scale 1.0.
///
/// A tightly packed `Rgba8` buffer is moved into the raster without copying.
pub fn raster_from_pixel_buffer(buffer: PixelBuffer) -> Result<RasterImage, PixelBufferError> {
    buffer.validate()?;
    let (w, h, stride) = (buffer.width, buffer.height, buffer.stride);

    if buffer.format == PixelFormat::Rgba8 && stride == w * CHANNELS {
        let mut data = buffer.data;
        data.truncate(w * h * CHANNELS);
        return Ok(RasterImage {
            width: w,
            height: h,
            scale: 1.0,
            data,
        });
    }

    let mut out = Vec::with_capacity(w * h * CHANNELS);
    match buffer.format {
        PixelFormat::Rgba8 => {
            for row in buffer.data.chunks(stride).take(h) {
                out.extend_from_slice(&row[..w * CHANNELS]);
            }
        }
        PixelFormat::Bgra8 => {
            for row in buffer.data.chunks(stride).take(h) {
                for px in row[..w * CHANNELS].chunks_exact(CHANNELS) {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
        }
        PixelFormat::Gray8 => {
            for row in buffer.data.chunks(stride).take(h) {
                for &g in &row[..w] {
                    out.extend_from_slice(&[g, g, g, 255]);
                }
            }
        }
        PixelFormat::Nv12 => {
            let chroma = &buffer.data[h * stride..];
            for y in 0..h {
                let luma_row = &buffer.data[y * stride..y * stride + w];
                let chroma_row = &chroma[(y / 2) * stride..];
                for (x, &luma) in luma_row.iter().enumerate() {
                    let c = (x / 2) * 2;
                    out.extend_from_slice(&ycbcr_to_rgba(luma, chroma_row[c], chroma_row[c + 1]));
                }
            }
        }
    }

    Ok(RasterImage {
        width: w,
        height: h,
        scale: 1.0,
        data: out,
    })
}

// BT.601 full range.
#[inline]
fn ycbcr_to_rgba(y: u8, cb: u8, cr: u8) -> [u8; 4] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let r = y + 1.402 * cr;
    let g = y - 0.344_136 * cb - 0.714_136 * cr;
    let b = y + 1.772 * cb;
    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
        255,
    ]
}
