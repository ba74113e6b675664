//! Rasterization of a selected contour into a filled binary mask.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;

use crate::traits::MaskRasterizer;
use crate::types::Contour;

/// Fills the selected contour's interior with 255 via standard
/// polygon scanline fill, the equivalent of a filled-contour draw.
#[derive(Debug, Clone, Default)]
pub struct PolygonMaskRasterizer;

impl MaskRasterizer for PolygonMaskRasterizer {
    fn rasterize(&self, width: u32, height: u32, contour: Option<&Contour>) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        let Some(points) = contour else {
            return mask;
        };

        let mut polygon = points.clone();
        // draw_polygon_mut requires an open ring
        if polygon.len() >= 2 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        if polygon.len() < 3 {
            // degenerate boundary encloses nothing
            return mask;
        }

        draw_polygon_mut(&mut mask, &polygon, Luma([255u8]));
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn square(x0: i32, y0: i32, side: i32) -> Contour {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ]
    }

    #[test]
    fn no_selection_yields_zero_mask() {
        let mask = PolygonMaskRasterizer.rasterize(20, 20, None);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn degenerate_contour_yields_zero_mask() {
        let line = vec![Point::new(2, 2), Point::new(8, 2)];
        let mask = PolygonMaskRasterizer.rasterize(20, 20, Some(&line));
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn square_interior_is_filled() {
        let contour = square(4, 4, 10);
        let mask = PolygonMaskRasterizer.rasterize(20, 20, Some(&contour));
        assert_eq!(mask.get_pixel(9, 9).0[0], 255);
        assert_eq!(mask.get_pixel(4, 4).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(17, 17).0[0], 0);
    }

    #[test]
    fn closed_ring_input_is_accepted() {
        let mut contour = square(4, 4, 10);
        contour.push(contour[0]);
        let mask = PolygonMaskRasterizer.rasterize(20, 20, Some(&contour));
        assert_eq!(mask.get_pixel(9, 9).0[0], 255);
    }
}
