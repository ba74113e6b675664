//! # Region-of-Interest Shape Blur
//!
//! Detects the largest closed contour inside a rectangular sub-region of
//! an image and applies a Gaussian blur to only the pixels inside that
//! contour, writing the result back into the caller-owned buffer in
//! place.
//!
//! ## Pipeline
//!
//! region extraction → edge map (grayscale, smooth, Canny, closing) →
//! outer contour tracing → largest-shape selection → mask rasterization
//! → masked blur compositing.
//!
//! Finding no shape is a valid outcome: the region is returned
//! unmodified. All validation failures surface before any mutation.
//!
//! ## Quick start
//!
//! ```rust
//! use shapeblur::{blur_largest_shape_in_rect, ImageBufferMut, Rect, DEFAULT_BLUR_KERNEL};
//!
//! let mut pixels = vec![0u8; 100 * 100 * 3];
//! let mut image = ImageBufferMut::from_raw(&mut pixels, 100, 100, 3)?;
//! blur_largest_shape_in_rect(&mut image, Rect::new(10, 10, 50, 50), DEFAULT_BLUR_KERNEL)?;
//! # Ok::<(), shapeblur::ShapeBlurError>(())
//! ```
//!
//! A GPU-accelerated backend implementing the same
//! [`ShapeBlurPipeline`] interface lives in the `shapeblur_gpu` crate;
//! callers fall back to [`HostPipeline`] when it reports
//! [`ShapeBlurError::DeviceUnavailable`].

pub mod algorithms;
pub mod buffer;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use buffer::{ImageBufferMut, RegionViewMut};
pub use error::{Result, ShapeBlurError};
pub use pipeline::HostPipeline;
pub use traits::{ContourTracer, EdgeMapBuilder, MaskRasterizer, ShapeBlurPipeline};
pub use types::{
    validate_blur_kernel, Contour, EdgeConfig, Rect, StageDiagnostics, DEFAULT_BLUR_KERNEL,
};

/// Blur the largest detected shape inside `rect`, mutating `image` in
/// place via the host pipeline.
pub fn blur_largest_shape_in_rect(
    image: &mut ImageBufferMut<'_>,
    rect: Rect,
    blur_kernel: u32,
) -> Result<()> {
    HostPipeline::new().process(image, rect, blur_kernel)
}

/// Same as [`blur_largest_shape_in_rect`], additionally returning the
/// intermediate grayscale, edge map, region, and mask buffers.
pub fn blur_largest_shape_in_rect_with_diagnostics(
    image: &mut ImageBufferMut<'_>,
    rect: Rect,
    blur_kernel: u32,
) -> Result<StageDiagnostics> {
    HostPipeline::new().process_with_diagnostics(image, rect, blur_kernel)
}
