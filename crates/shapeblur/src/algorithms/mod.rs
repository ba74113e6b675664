pub mod blur;
pub mod contours;
pub mod edges;
pub mod masking;
pub mod selection;

pub use blur::{gaussian_blur_region, sigma_for_kernel};
pub use contours::ImageprocContourTracer;
pub use edges::CannyEdgeMapBuilder;
pub use masking::PolygonMaskRasterizer;
pub use selection::{contour_area, largest_contour};
