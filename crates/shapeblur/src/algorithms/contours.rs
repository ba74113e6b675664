//! Contour tracing over the binary edge map.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::traits::ContourTracer;
use crate::types::Contour;

/// Imageproc-based contour tracer, restricted to outermost boundaries.
///
/// Holes enclosed by a shape are not separately reported (RETR_EXTERNAL
/// in OpenCV terms). Returned contours are in trace order, which is
/// stable for a given edge map.
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourTracer;

impl ContourTracer for ImageprocContourTracer {
    fn trace_outer_contours(&self, edges: &GrayImage) -> Vec<Contour> {
        imageproc::contours::find_contours::<i32>(edges)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .map(|contour| contour.points)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filled_square(size: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn empty_edge_map_yields_no_contours() {
        let edges = GrayImage::new(30, 30);
        assert!(ImageprocContourTracer.trace_outer_contours(&edges).is_empty());
    }

    #[test]
    fn square_yields_one_outer_contour() {
        let edges = filled_square(40, 10, 10, 30, 30);
        let contours = ImageprocContourTracer.trace_outer_contours(&edges);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].len() >= 4);
    }

    #[test]
    fn hole_inside_square_is_not_reported() {
        let mut edges = filled_square(40, 5, 5, 35, 35);
        // carve a hole; its boundary is a Hole border, not an Outer one
        for y in 15..25 {
            for x in 15..25 {
                edges.put_pixel(x, y, Luma([0]));
            }
        }
        let contours = ImageprocContourTracer.trace_outer_contours(&edges);
        assert_eq!(contours.len(), 1);
    }

    #[test]
    fn two_separate_squares_yield_two_contours() {
        let mut edges = filled_square(60, 5, 5, 20, 20);
        for y in 30..50 {
            for x in 30..50 {
                edges.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = ImageprocContourTracer.trace_outer_contours(&edges);
        assert_eq!(contours.len(), 2);
    }
}
