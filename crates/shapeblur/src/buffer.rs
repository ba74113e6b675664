//! Borrowed image buffer and the zero-copy region view.
//!
//! The caller owns the pixel storage; this module only ever borrows it.
//! [`RegionViewMut`] aliases the buffer's memory through a validated
//! rectangle, so a write through the view is immediately visible in the
//! original buffer with no intermediate copy.

use image::{GrayImage, RgbImage};

use crate::error::{Result, ShapeBlurError};
use crate::types::Rect;

const CHANNELS: usize = 3;

/// A mutable view over caller-owned interleaved pixel data.
///
/// Shape is `(height, width, 3)` with 8-bit samples, channel order BGR
/// by convention. Construction validates the shape invariants; the view
/// never reallocates or resizes the storage.
pub struct ImageBufferMut<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
}

// dimensions only; dumping the pixel bytes would swamp any log line
impl std::fmt::Debug for ImageBufferMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBufferMut")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl<'a> ImageBufferMut<'a> {
    /// Borrow raw interleaved pixel data as an image buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeBlurError::InvalidInputShape`] unless the data is
    /// 3-channel with `height >= 1`, `width >= 1` and exactly
    /// `height * width * 3` bytes.
    pub fn from_raw(data: &'a mut [u8], width: u32, height: u32, channels: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS));
        let valid = channels == CHANNELS as u32
            && width >= 1
            && height >= 1
            && expected == Some(data.len());
        if !valid {
            return Err(ShapeBlurError::InvalidInputShape {
                height,
                width,
                channels,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    /// Take a mutable, zero-copy view onto the sub-region addressed by
    /// `rect`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeBlurError::InvalidRectangle`] when the rectangle
    /// falls outside the buffer or has non-positive extent.
    pub fn region_mut(&mut self, rect: Rect) -> Result<RegionViewMut<'_>> {
        rect.validate(self.width, self.height)?;
        Ok(RegionViewMut {
            data: self.data,
            row_stride: self.width as usize * CHANNELS,
            rect,
        })
    }
}

/// A non-owning window onto an [`ImageBufferMut`]'s memory.
///
/// Writes go straight through to the underlying buffer. The lifetime is
/// bound to the buffer borrow, so the view cannot outlive it.
pub struct RegionViewMut<'a> {
    data: &'a mut [u8],
    row_stride: usize,
    rect: Rect,
}

impl RegionViewMut<'_> {
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    pub fn height(&self) -> u32 {
        self.rect.height
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        let abs_y = (self.rect.y + y) as usize;
        let abs_x = (self.rect.x + x) as usize;
        abs_y * self.row_stride + abs_x * CHANNELS
    }

    /// Read one pixel at region-local coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write one pixel at region-local coordinates, mutating the
    /// underlying buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&value);
    }

    /// Copy the region out into an owned image for processing.
    ///
    /// Processing stages work on this copy; the buffer itself is only
    /// touched by [`composite_masked`](Self::composite_masked).
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.rect.width, self.rect.height, |x, y| {
            image::Rgb(self.pixel(x, y))
        })
    }

    /// Write `blurred` through the view wherever `mask` is nonzero,
    /// leaving every other pixel untouched.
    ///
    /// This is the pipeline's single mutation point. An all-zero mask
    /// makes it a no-op.
    pub fn composite_masked(&mut self, blurred: &RgbImage, mask: &GrayImage) {
        debug_assert_eq!((blurred.width(), blurred.height()), (self.width(), self.height()));
        debug_assert_eq!((mask.width(), mask.height()), (self.width(), self.height()));
        for y in 0..self.rect.height {
            for x in 0..self.rect.width {
                if mask.get_pixel(x, y).0[0] != 0 {
                    self.set_pixel(x, y, blurred.get_pixel(x, y).0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn black(width: u32, height: u32) -> Vec<u8> {
        vec![0u8; (width * height * 3) as usize]
    }

    #[test]
    fn debug_output_reports_dimensions_not_pixels() {
        let mut data = vec![7u8; 4 * 4 * 3];
        let buffer = ImageBufferMut::from_raw(&mut data, 4, 4, 3).unwrap();
        let rendered = format!("{buffer:?}");
        assert!(rendered.contains("width: 4"));
        assert!(rendered.contains("height: 4"));
        assert!(!rendered.contains('7'));
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let mut data = vec![0u8; 100 * 100 * 2];
        let err = ImageBufferMut::from_raw(&mut data, 100, 100, 2).unwrap_err();
        assert!(matches!(err, ShapeBlurError::InvalidInputShape { .. }));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut data = vec![0u8; 10];
        assert!(ImageBufferMut::from_raw(&mut data, 100, 100, 3).is_err());
    }

    #[test]
    fn rejects_zero_dimensions() {
        let mut data = vec![];
        assert!(ImageBufferMut::from_raw(&mut data, 0, 0, 3).is_err());
    }

    #[test]
    fn region_writes_alias_the_buffer() {
        let mut data = black(10, 10);
        let mut buffer = ImageBufferMut::from_raw(&mut data, 10, 10, 3).unwrap();
        let mut view = buffer.region_mut(Rect::new(2, 3, 4, 4)).unwrap();
        view.set_pixel(0, 0, [1, 2, 3]);
        // region-local (0, 0) is absolute (2, 3)
        let i = (3 * 10 + 2) * 3;
        assert_eq!(&data[i..i + 3], &[1, 2, 3]);
    }

    #[test]
    fn region_view_rejects_out_of_bounds_rect() {
        let mut data = black(10, 10);
        let mut buffer = ImageBufferMut::from_raw(&mut data, 10, 10, 3).unwrap();
        assert!(buffer.region_mut(Rect::new(5, 5, 10, 10)).is_err());
    }

    #[test]
    fn composite_writes_only_masked_pixels() {
        let mut data = black(8, 8);
        let mut buffer = ImageBufferMut::from_raw(&mut data, 8, 8, 3).unwrap();
        let mut view = buffer.region_mut(Rect::new(0, 0, 8, 8)).unwrap();

        let blurred = RgbImage::from_pixel(8, 8, image::Rgb([200, 200, 200]));
        let mut mask = GrayImage::new(8, 8);
        mask.put_pixel(3, 3, Luma([255]));

        view.composite_masked(&blurred, &mask);
        assert_eq!(view.pixel(3, 3), [200, 200, 200]);
        assert_eq!(view.pixel(4, 4), [0, 0, 0]);
    }
}
