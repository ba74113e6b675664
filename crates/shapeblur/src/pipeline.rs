//! Host pipeline: region extraction, edge map, contour tracing,
//! selection, mask rasterization, and masked blur compositing.

use tracing::debug;

use crate::algorithms::{
    self, CannyEdgeMapBuilder, ImageprocContourTracer, PolygonMaskRasterizer,
};
use crate::buffer::ImageBufferMut;
use crate::error::Result;
use crate::traits::{ContourTracer, EdgeMapBuilder, MaskRasterizer, ShapeBlurPipeline};
use crate::types::{validate_blur_kernel, EdgeConfig, Rect, StageDiagnostics};

/// Host-only backend, generic over the stage implementations.
#[derive(Debug, Default)]
pub struct HostPipeline<
    E = CannyEdgeMapBuilder,
    C = ImageprocContourTracer,
    M = PolygonMaskRasterizer,
> where
    E: EdgeMapBuilder,
    C: ContourTracer,
    M: MaskRasterizer,
{
    pub edge_builder: E,
    pub contour_tracer: C,
    pub mask_rasterizer: M,
}

impl HostPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host pipeline with non-default edge detection parameters.
    pub fn with_config(config: EdgeConfig) -> Self {
        Self {
            edge_builder: CannyEdgeMapBuilder::new(config),
            contour_tracer: ImageprocContourTracer,
            mask_rasterizer: PolygonMaskRasterizer,
        }
    }
}

impl<E, C, M> HostPipeline<E, C, M>
where
    E: EdgeMapBuilder,
    C: ContourTracer,
    M: MaskRasterizer,
{
    fn run(
        &self,
        image: &mut ImageBufferMut<'_>,
        rect: Rect,
        blur_kernel: u32,
    ) -> Result<StageDiagnostics> {
        // All validation happens before any processing or writes.
        validate_blur_kernel(blur_kernel)?;
        let mut view = image.region_mut(rect)?;
        debug!(width = view.width(), height = view.height(), "region extracted");

        let region = view.to_image();
        let grayscale = self.edge_builder.grayscale(&region);
        let edges = self.edge_builder.edge_map(&grayscale);

        let contours = self.contour_tracer.trace_outer_contours(&edges);
        debug!(count = contours.len(), "outer contours traced");

        let selected = algorithms::largest_contour(&contours);
        let mask = self.mask_rasterizer.rasterize(
            view.width(),
            view.height(),
            selected.map(|i| &contours[i]),
        );

        if let Some(i) = selected {
            debug!(area = algorithms::contour_area(&contours[i]), "largest contour selected");
            let blurred = algorithms::gaussian_blur_region(&region, blur_kernel);
            // sole mutation point; gated behind the fully computed mask
            view.composite_masked(&blurred, &mask);
        }

        Ok(StageDiagnostics {
            region,
            grayscale,
            edges,
            mask,
        })
    }
}

impl<E, C, M> ShapeBlurPipeline for HostPipeline<E, C, M>
where
    E: EdgeMapBuilder,
    C: ContourTracer,
    M: MaskRasterizer,
{
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
