//! Largest-shape selection by enclosed polygon area.

use geo::Area;
use geo_types::{Coord, LineString, Polygon};

use crate::types::Contour;

/// Shoelace-formula magnitude of the area enclosed by a contour.
pub fn contour_area(contour: &Contour) -> f32 {
    let coords: Vec<Coord<f32>> = contour
        .iter()
        .map(|p| Coord {
            x: p.x as f32,
            y: p.y as f32,
        })
        .collect();
    // Polygon::new closes the ring implicitly.
    Polygon::new(LineString::new(coords), vec![]).unsigned_area()
}

/// Index of the contour with maximum enclosed area.
///
/// Ties break toward the first contour in trace order; empty input is a
/// valid "no selection" outcome.
pub fn largest_contour(contours: &[Contour]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, contour) in contours.iter().enumerate() {
        let area = contour_area(contour);
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((i, area)),
        }
    }
    best.map(|(i, _)| i)
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
    fn area_of_unit_square() {
        assert_eq!(contour_area(&square(0, 0, 1)), 1.0);
        assert_eq!(contour_area(&square(3, 7, 10)), 100.0);
    }

    #[test]
    fn strictly_larger_area_wins_regardless_of_order() {
        let small = square(0, 0, 5);
        let large = square(20, 20, 10);
        assert_eq!(largest_contour(&[small.clone(), large.clone()]), Some(1));
        assert_eq!(largest_contour(&[large, small]), Some(0));
    }

    #[test]
    fn ties_break_toward_trace_order() {
        let a = square(0, 0, 5);
        let b = square(30, 30, 5);
        assert_eq!(largest_contour(&[a, b]), Some(0));
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert_eq!(largest_contour(&[]), None);
    }
}
