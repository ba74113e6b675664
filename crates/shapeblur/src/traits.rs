use image::{GrayImage, RgbImage};

use crate::buffer::ImageBufferMut;
use crate::error::Result;
use crate::types::{Contour, Rect, StageDiagnostics};

/// Trait for edge map construction: intensity conversion followed by
/// smoothing, edge detection, and gap closing.
pub trait EdgeMapBuilder: Send + Sync {
    /// Convert a 3-channel region to single-channel intensity.
    fn grayscale(&self, region: &RgbImage) -> GrayImage;

    /// Produce a binary (0/255) edge map from the intensity image.
    fn edge_map(&self, gray: &GrayImage) -> GrayImage;
}

/// Trait for contour tracing over a binary edge map.
pub trait ContourTracer: Send + Sync {
    /// Trace the outer boundaries of 8-connected foreground regions.
    /// Enclosed holes are not reported. An empty result is a valid
    /// outcome, not an error.
    fn trace_outer_contours(&self, edges: &GrayImage) -> Vec<Contour>;
}

/// Trait for rasterizing a selected contour into a filled binary mask.
pub trait MaskRasterizer: Send + Sync {
    /// Fill the contour's interior with 255 on a zeroed region-sized
    /// canvas. `None` (or a degenerate contour) yields an all-zero
    /// mask, which makes the downstream composite a no-op.
    fn rasterize(&self, width: u32, height: u32, contour: Option<&Contour>) -> GrayImage;
}

/// The backend seam: one interface, two implementations (host-only and
/// device-accelerated). Callers pick a backend explicitly and fall back
/// to the host pipeline when the device one reports
/// [`crate::ShapeBlurError::DeviceUnavailable`].
pub trait ShapeBlurPipeline: Send + Sync {
    /// Detect the largest closed contour inside `rect` and Gaussian-blur
    /// the pixels inside it, in place. Finding no shape is a successful
    /// no-op.
    fn process(&self, image: &mut ImageBufferMut<'_>, rect: Rect, blur_kernel: u32) -> Result<()>;

    /// Same as [`process`](Self::process), additionally returning the
    /// intermediate stage buffers for inspection.
    fn process_with_diagnostics(
        &self,
        image: &mut ImageBufferMut<'_>,
        rect: Rect,
        blur_kernel: u32,
    ) -> Result<StageDiagnostics>;
}
