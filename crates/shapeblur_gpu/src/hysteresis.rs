//! Host-side completion of the device edge pass.
//!
//! The device classifies every pixel as strong, weak, or suppressed.
//! Linking weak pixels to strong ones is a data-dependent flood fill
//! that fits the CPU better, so it runs here on the single downloaded
//! class map.

use image::{GrayImage, Luma};

const STRONG: f32 = 254.0;
const WEAK: f32 = 127.0;

/// Resolve weak edge pixels against their 8-connected neighborhood:
/// weak pixels reachable from a strong pixel become edges, the rest are
/// dropped. Returns the final binary (0/255) edge map.
pub fn link_edges(classes: &[f32], width: u32, height: u32) -> GrayImage {
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(classes.len(), w * h);

    let mut edges = GrayImage::new(width, height);
    let mut stack = Vec::new();
    for (i, &class) in classes.iter().enumerate() {
        if class >= STRONG {
            edges.put_pixel((i % w) as u32, (i / w) as u32, Luma([255]));
            stack.push(i);
        }
    }

    while let Some(i) = stack.pop() {
        let x = (i % w) as i64;
        let y = (i / w) as i64;
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let n = ny as usize * w + nx as usize;
                if classes[n] >= WEAK && edges.get_pixel(nx as u32, ny as u32).0[0] == 0 {
                    edges.put_pixel(nx as u32, ny as u32, Luma([255]));
                    stack.push(n);
                }
            }
        }
    }

    edges
}
