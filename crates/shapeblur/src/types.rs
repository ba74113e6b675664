use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShapeBlurError};

/// Default Gaussian kernel size for the selective blur stage.
pub const DEFAULT_BLUR_KERNEL: u32 = 15;

/// An ordered boundary of a traced shape, in region-local pixel
/// coordinates. Outer boundaries only; holes are never traced.
pub type Contour = Vec<imageproc::point::Point<i32>>;

/// Axis-aligned rectangle in image pixel coordinates, origin top-left.
///
/// Immutable once constructed; bounds are checked against a concrete
/// image when a region view is taken, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check this rectangle against an image of the given dimensions.
    pub fn validate(&self, image_width: u32, image_height: u32) -> Result<()> {
        let fits_x = u64::from(self.x) + u64::from(self.width) <= u64::from(image_width);
        let fits_y = u64::from(self.y) + u64::from(self.height) <= u64::from(image_height);
        if self.width == 0 || self.height == 0 || !fits_x || !fits_y {
            return Err(ShapeBlurError::InvalidRectangle {
                rect: *self,
                width: image_width,
                height: image_height,
            });
        }
        Ok(())
    }
}

/// Parameters for the edge map builder.
///
/// Defaults: a 5x5 smoothing kernel, Canny hysteresis thresholds
/// 180/500, and a 3x3 closing element applied 3 times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Gaussian smoothing kernel size applied before edge detection.
    pub smooth_kernel: u32,
    /// Canny low hysteresis threshold.
    pub low_threshold: f32,
    /// Canny high hysteresis threshold.
    pub high_threshold: f32,
    /// Iterations of 3x3 morphological closing applied to the edge map.
    pub closing_iterations: u8,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            smooth_kernel: 5,
            low_threshold: 180.0,
            high_threshold: 500.0,
            closing_iterations: 3,
        }
    }
}

/// Intermediate buffers captured by the `_with_diagnostics` call
/// variants, for inspection and testing.
///
/// A side channel attached to the primary in-place mutation contract:
/// producing these never changes what gets written to the image.
#[derive(Debug, Clone)]
pub struct StageDiagnostics {
    /// Copy of the region as it was before blurring.
    pub region: RgbImage,
    /// Single-channel intensity conversion of the region.
    pub grayscale: GrayImage,
    /// Binary edge map after Canny and morphological closing.
    pub edges: GrayImage,
    /// Filled mask of the selected contour (all zero when none found).
    pub mask: GrayImage,
}

/// Reject even or zero kernel sizes before any processing.
///
/// Even kernels have no center tap; fail fast rather than hand them to
/// the blur primitive.
pub fn validate_blur_kernel(kernel: u32) -> Result<()> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(ShapeBlurError::InvalidBlurKernel(kernel));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_inside_bounds_is_valid() {
        assert!(Rect::new(10, 10, 50, 50).validate(100, 100).is_ok());
        assert!(Rect::new(0, 0, 100, 100).validate(100, 100).is_ok());
    }

    #[test]
    fn rect_outside_bounds_is_rejected() {
        assert!(Rect::new(0, 0, 100, 101).validate(100, 100).is_err());
        assert!(Rect::new(60, 0, 50, 50).validate(100, 100).is_err());
        assert!(Rect::new(0, 0, 0, 10).validate(100, 100).is_err());
        assert!(Rect::new(0, 0, 10, 0).validate(100, 100).is_err());
    }

    #[test]
    fn rect_validation_does_not_overflow() {
        assert!(Rect::new(u32::MAX, 0, 1, 1).validate(100, 100).is_err());
    }

    #[test]
    fn blur_kernel_must_be_odd_and_positive() {
        assert!(validate_blur_kernel(15).is_ok());
        assert!(validate_blur_kernel(1).is_ok());
        assert!(validate_blur_kernel(0).is_err());
        assert!(validate_blur_kernel(14).is_err());
    }
}
