//! Edge map construction: intensity conversion, Gaussian smoothing,
//! Canny edge detection, and morphological closing.

use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;

use crate::traits::EdgeMapBuilder;
use crate::types::EdgeConfig;

use super::blur::sigma_for_kernel;

/// Canny-based edge map builder. Defaults: 5x5 smoothing, hysteresis
/// thresholds 180/500, and a 3x3 closing element applied 3 times to
/// bridge small gaps into closed boundaries.
#[derive(Debug, Clone, Default)]
pub struct CannyEdgeMapBuilder {
    pub config: EdgeConfig,
}

impl CannyEdgeMapBuilder {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }
}

impl EdgeMapBuilder for CannyEdgeMapBuilder {
    fn grayscale(&self, region: &RgbImage) -> GrayImage {
        bgr_to_luma(region)
    }

    fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        let sigma = sigma_for_kernel(self.config.smooth_kernel);
        let smoothed = imageproc::filter::gaussian_blur_f32(gray, sigma);
        let edges = imageproc::edges::canny(
            &smoothed,
            self.config.low_threshold,
            self.config.high_threshold,
        );
        // k iterations of a 3x3 LInf element collapse into one pass
        // with radius k.
        imageproc::morphology::close(&edges, Norm::LInf, self.config.closing_iterations)
    }
}

/// Rec.601 luma over BGR-ordered samples.
pub fn bgr_to_luma(region: &RgbImage) -> GrayImage {
    GrayImage::from_fn(region.width(), region.height(), |x, y| {
        let [b, g, r] = region.get_pixel(x, y).0;
        let luma = 0.114f32 * f32::from(b) + 0.587 * f32::from(g) + 0.299 * f32::from(r);
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_gray_pixel_is_identity() {
        let region = RgbImage::from_pixel(4, 4, image::Rgb([90, 90, 90]));
        let gray = bgr_to_luma(&region);
        assert_eq!(gray.get_pixel(0, 0).0[0], 90);
    }

    #[test]
    fn luma_weights_follow_bgr_order() {
        // pure blue (channel 0) must carry the smallest weight
        let blue = bgr_to_luma(&RgbImage::from_pixel(1, 1, image::Rgb([255, 0, 0])));
        let red = bgr_to_luma(&RgbImage::from_pixel(1, 1, image::Rgb([0, 0, 255])));
        assert!(blue.get_pixel(0, 0).0[0] < red.get_pixel(0, 0).0[0]);
    }

    #[test]
    fn flat_region_produces_empty_edge_map() {
        let gray = GrayImage::from_pixel(32, 32, image::Luma([40]));
        let edges = CannyEdgeMapBuilder::default().edge_map(&gray);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn step_edge_is_detected_and_closed() {
        let gray = GrayImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        });
        let edges = CannyEdgeMapBuilder::default().edge_map(&gray);
        assert!(edges.pixels().any(|p| p.0[0] != 0));
    }
}
