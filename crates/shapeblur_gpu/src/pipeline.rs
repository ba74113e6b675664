//! Device pipeline: the GPU-accelerated implementation of
//! [`ShapeBlurPipeline`].
//!
//! The region is uploaded once; edge classification and the channel
//! blurs run on the device; contour tracing, mask rasterization, and
//! the masked composite stay on the host. Exactly two downloads cross
//! the bus per invocation: the edge class map and the blurred planes.

use std::time::Instant;

use image::RgbImage;
use imageproc::distance_transform::Norm;
use shapeblur::algorithms::{self, edges::bgr_to_luma, ImageprocContourTracer, PolygonMaskRasterizer};
use shapeblur::traits::{ContourTracer, MaskRasterizer, ShapeBlurPipeline};
use shapeblur::types::{validate_blur_kernel, EdgeConfig, Rect, StageDiagnostics};
use shapeblur::{ImageBufferMut, Result};
use tracing::debug;

use crate::context::GpuContext;
use crate::hysteresis;

/// GPU-accelerated backend. Construction probes for a device and fails
/// with [`shapeblur::ShapeBlurError::DeviceUnavailable`] when none is
/// usable, letting callers fall back to the host pipeline.
pub struct DevicePipeline {
    context: GpuContext,
    config: EdgeConfig,
    contour_tracer: ImageprocContourTracer,
    mask_rasterizer: PolygonMaskRasterizer,
}

impl DevicePipeline {
    /// Open a device with the default edge parameters.
    pub fn new() -> Result<Self> {
        Self::with_config(EdgeConfig::default())
    }

    /// Open a device with non-default edge detection parameters.
    pub fn with_config(config: EdgeConfig) -> Result<Self> {
        Ok(Self {
            context: GpuContext::new()?,
            config,
            contour_tracer: ImageprocContourTracer,
            mask_rasterizer: PolygonMaskRasterizer,
        })
    }

    fn run(
        &self,
        image: &mut ImageBufferMut<'_>,
        rect: Rect,
        blur_kernel: u32,
    ) -> Result<StageDiagnostics> {
        validate_blur_kernel(blur_kernel)?;
        let mut view = image.region_mut(rect)?;
        let (width, height) = (view.width(), view.height());

        let region = view.to_image();
        let upload_start = Instant::now();
        let device_region = self.context.upload_region(&region);
        debug!(elapsed = ?upload_start.elapsed(), "region uploaded");

        let edge_start = Instant::now();
        let classes = self.context.detect_edges(&device_region, &self.config)?;
        let linked = hysteresis::link_edges(&classes, width, height);
        let edges = imageproc::morphology::close(
            &linked,
            Norm::LInf,
            self.config.closing_iterations,
        );
        debug!(elapsed = ?edge_start.elapsed(), "edge map built");

        let contours = self.contour_tracer.trace_outer_contours(&edges);
        debug!(count = contours.len(), "outer contours traced");

        let selected = algorithms::largest_contour(&contours);
        let mask = self
            .mask_rasterizer
            .rasterize(width, height, selected.map(|i| &contours[i]));

        if let Some(i) = selected {
            debug!(
                area = algorithms::contour_area(&contours[i]),
                "largest contour selected"
            );
            let blur_start = Instant::now();
            let planes = self.context.blur_planes(&device_region, blur_kernel)?;
            let blurred = planes_to_image(&planes, width, height);
            debug!(elapsed = ?blur_start.elapsed(), "channel planes blurred");
            view.composite_masked(&blurred, &mask);
        }

        Ok(StageDiagnostics {
            grayscale: bgr_to_luma(&region),
            region,
            edges,
            mask,
        })
    }
}

impl ShapeBlurPipeline for DevicePipeline {
    fn process(&self, image: &mut ImageBufferMut<'_>, rect: Rect, blur_kernel: u32) -> Result<()> {
        self.run(image, rect, blur_kernel).map(|_| ())
    }

    fn process_with_diagnostics(
        &self,
        image: &mut ImageBufferMut<'_>,
        rect: Rect,
        blur_kernel: u32,
    ) -> Result<StageDiagnostics> {
        self.run(image, rect, blur_kernel)
    }
}

/// Reassemble three downloaded f32 planes into an interleaved image.
fn planes_to_image(planes: &[Vec<f32>; 3], width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let i = (y * width + x) as usize;
        image::Rgb([
            planes[0][i].round().clamp(0.0, 255.0) as u8,
            planes[1][i].round().clamp(0.0, 255.0) as u8,
            planes[2][i].round().clamp(0.0, 255.0) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes_reassemble_in_channel_order() {
        let planes = [
            vec![10.0, 20.0],
            vec![30.0, 40.0],
            vec![250.0, 300.0],
        ];
        let image = planes_to_image(&planes, 2, 1);
        assert_eq!(image.get_pixel(0, 0).0, [10, 30, 250]);
        // values past the sample range clamp
        assert_eq!(image.get_pixel(1, 0).0, [20, 40, 255]);
    }
}
