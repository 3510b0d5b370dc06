//! Sobel gradient magnitude.
//!
//! - Correlates the 3×3 kernel pair (`X`, `Y`) with zero padding outside the grid.
//! - Outputs `floor(sqrt(gx² + gy²))` per pixel, without clamping, so strong edges on
//!   8-bit input can exceed 255. Threshold the result to get a binary edge map.

use image::Luma;

use crate::Grid;

type Kernel3 = [[i64; 3]; 3];

/// Responds positively when intensity increases towards higher columns.
const SOBEL_KERNEL_X: Kernel3 = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
/// Responds positively when intensity decreases towards higher rows.
const SOBEL_KERNEL_Y: Kernel3 = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

fn correlate(grid: &Grid, kernel: &Kernel3, x: u32, y: u32) -> i64 {
    let (width, height) = grid.dimensions();
    let mut sum = 0;
    for (ky, kernel_row) in kernel.iter().enumerate() {
        for (kx, &weight) in kernel_row.iter().enumerate() {
            let (Some(sx), Some(sy)) = (
                (x + kx as u32).checked_sub(1),
                (y + ky as u32).checked_sub(1),
            ) else {
                continue;
            };
            if sx < width && sy < height {
                sum += weight * i64::from(grid.get_pixel(sx, sy)[0]);
            }
        }
    }
    sum
}

/// Computes the Sobel gradient magnitude of every pixel.
pub fn sobel_magnitude(grid: &Grid) -> Grid {
    Grid::from_fn(grid.width(), grid.height(), |x, y| {
        let gx = correlate(grid, &SOBEL_KERNEL_X, x, y) as f64;
        let gy = correlate(grid, &SOBEL_KERNEL_Y, x, y) as f64;
        Luma([gx.hypot(gy).floor() as u32])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::gray_image;

    #[test]
    fn flat_interior_has_no_gradient_but_borders_do() {
        let grid = gray_image!(type: u32,
            10, 10, 10;
            10, 10, 10;
            10, 10, 10);
        let magnitude = sobel_magnitude(&grid);
        assert_eq!(magnitude.get_pixel(1, 1)[0], 0);
        // Corner sees gx = 30, gy = -30 because of the zero padding.
        assert_eq!(magnitude.get_pixel(0, 0)[0], 42);
        // Top edge centre: gx cancels and only the lower kernel row sees pixels.
        assert_eq!(magnitude.get_pixel(1, 0)[0], 40);
    }

    #[test]
    fn vertical_step_edge() {
        let grid = gray_image!(type: u32,
            0, 0, 100, 100;
            0, 0, 100, 100;
            0, 0, 100, 100);
        let magnitude = sobel_magnitude(&grid);
        // Middle row, columns 1 and 2 straddle the step: gx = 400, gy = 0.
        assert_eq!(magnitude.get_pixel(1, 1)[0], 400);
        assert_eq!(magnitude.get_pixel(2, 1)[0], 400);
        assert_eq!(magnitude.get_pixel(0, 1)[0], 0);
    }

    #[test]
    fn empty_grid_stays_empty() {
        assert_eq!(sobel_magnitude(&Grid::new(0, 0)).dimensions(), (0, 0));
    }
}
