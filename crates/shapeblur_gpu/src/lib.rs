//! GPU-accelerated backend for the region-of-interest shape blur.
//!
//! Implements the same [`ShapeBlurPipeline`] interface as the host
//! backend in `shapeblur`. The device runs the data-parallel stages
//! (channel unpacking, Gaussian smoothing, Sobel gradients, non-maximum
//! suppression, and the selective channel blurs); hysteresis linking,
//! morphological closing, contour tracing, and the masked composite
//! run on the host. The backends agree on which shape gets selected and
//! which pixels change, not on bit-exact output.
//!
//! [`DevicePipeline::new`] probes for an adapter and fails with
//! [`shapeblur::ShapeBlurError::DeviceUnavailable`] when the machine
//! has none; callers are expected to fall back to
//! [`shapeblur::HostPipeline`] on that error.

pub mod context;
pub mod hysteresis;
pub mod pipeline;
mod shaders;

use shapeblur::traits::ShapeBlurPipeline;
use shapeblur::types::{Rect, StageDiagnostics};
use shapeblur::{ImageBufferMut, Result};

pub use context::GpuContext;
pub use pipeline::DevicePipeline;

/// Blur the largest detected shape inside `rect` on the GPU, mutating
/// `image` in place. Opens a fresh device per call; hold a
/// [`DevicePipeline`] instead when processing many images.
pub fn blur_largest_shape_in_rect_gpu(
    image: &mut ImageBufferMut<'_>,
    rect: Rect,
    blur_kernel: u32,
) -> Result<()> {
    DevicePipeline::new()?.process(image, rect, blur_kernel)
}

/// Same as [`blur_largest_shape_in_rect_gpu`], additionally returning
/// the intermediate stage buffers.
pub fn blur_largest_shape_in_rect_gpu_with_diagnostics(
    image: &mut ImageBufferMut<'_>,
    rect: Rect,
    blur_kernel: u32,
) -> Result<StageDiagnostics> {
    DevicePipeline::new()?.process_with_diagnostics(image, rect, blur_kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeblur::ShapeBlurError;

    /// Open a pipeline or skip the test on machines without a GPU.
    fn pipeline_or_skip() -> Option<DevicePipeline> {
        match DevicePipeline::new() {
            Ok(pipeline) => Some(pipeline),
            Err(ShapeBlurError::DeviceUnavailable(reason)) => {
                eprintln!("skipping GPU test: {reason}");
                None
            }
            Err(err) => panic!("unexpected pipeline error: {err}"),
        }
    }

    fn image_with_white_square(x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<u8> {
        let mut data = vec![0u8; 100 * 100 * 3];
        for y in y0..y1 {
            for x in x0..x1 {
                let i = ((y * 100 + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        data
    }

    #[test]
    fn flat_black_region_is_a_no_op() {
        let Some(pipeline) = pipeline_or_skip() else {
            return;
        };
        let mut data = vec![0u8; 100 * 100 * 3];
        let before = data.clone();
        let mut image = ImageBufferMut::from_raw(&mut data, 100, 100, 3).unwrap();
        pipeline
            .process(&mut image, Rect::new(10, 10, 50, 50), 15)
            .unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn white_square_is_selected_and_blurred() {
        let Some(pipeline) = pipeline_or_skip() else {
            return;
        };
        let mut data = image_with_white_square(20, 20, 60, 60);
        let before = data.clone();
        let mut image = ImageBufferMut::from_raw(&mut data, 100, 100, 3).unwrap();
        let diagnostics = pipeline
            .process_with_diagnostics(&mut image, Rect::new(0, 0, 100, 100), 15)
            .unwrap();

        assert!(diagnostics.mask.pixels().any(|p| p.0[0] != 0));

        let at = |x: u32, y: u32| ((y * 100 + x) * 3) as usize;
        // far outside the square: untouched
        assert_eq!(data[at(5, 5)], before[at(5, 5)]);
        // deep inside the square the blur window is uniform white
        assert_eq!(data[at(40, 40)], 255);
    }

    #[test]
    fn invalid_arguments_fail_before_device_work() {
        let Some(pipeline) = pipeline_or_skip() else {
            return;
        };
        let mut data = image_with_white_square(20, 20, 60, 60);
        let before = data.clone();
        let mut image = ImageBufferMut::from_raw(&mut data, 100, 100, 3).unwrap();

        let err = pipeline
            .process(&mut image, Rect::new(0, 0, 100, 101), 15)
            .unwrap_err();
        assert!(matches!(err, ShapeBlurError::InvalidRectangle { .. }));

        let err = pipeline
            .process(&mut image, Rect::new(0, 0, 100, 100), 14)
            .unwrap_err();
        assert!(matches!(err, ShapeBlurError::InvalidBlurKernel(14)));
        assert_eq!(data, before);
    }
}
