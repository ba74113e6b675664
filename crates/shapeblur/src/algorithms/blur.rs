//! Gaussian blur of the full region ahead of masked compositing.
//!
//! `imageproc`'s Gaussian blur operates on a single channel, so the
//! 3-channel region is split into planes, each plane blurred
//! independently, and the result reassembled. Gaussian blur is linear
//! and per-channel, so this is equivalent to blurring in color space.

use image::GrayImage;
use image::RgbImage;

/// Derive sigma from an odd kernel size so the kernel approximates a
/// Gaussian truncated at 3 sigma (OpenCV's automatic sigma rule).
pub fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Blur all three channels of the region with a `kernel` x `kernel`
/// Gaussian, sigma auto-derived from the kernel size.
///
/// The kernel size must already be validated
/// ([`crate::types::validate_blur_kernel`]); this function assumes it.
pub fn gaussian_blur_region(region: &RgbImage, kernel: u32) -> RgbImage {
    let sigma = sigma_for_kernel(kernel);
    let (w, h) = (region.width(), region.height());

    let planes: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([region.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&planes[c], sigma));

    RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_matches_reference_rule() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-6);
        assert!((sigma_for_kernel(15) - 2.6).abs() < 1e-6);
        assert!(sigma_for_kernel(1) > 0.0);
    }

    #[test]
    fn uniform_region_is_unchanged_by_blur() {
        let region = RgbImage::from_pixel(30, 30, image::Rgb([17, 120, 240]));
        let blurred = gaussian_blur_region(&region, 15);
        assert_eq!(blurred.get_pixel(15, 15).0, [17, 120, 240]);
    }

    #[test]
    fn step_edge_is_smoothed() {
        let region = RgbImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let blurred = gaussian_blur_region(&region, 15);
        let at_edge = blurred.get_pixel(20, 20).0[0];
        assert!(at_edge > 0 && at_edge < 255);
    }
}
