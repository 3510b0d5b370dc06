//! Annotations drawn on top of grids: centroid dots and orientation lines.
//!
//! Coordinates are `(row, col)`; conversion to imageproc's `(x, y)` happens here.

use image::Luma;
use imageproc::drawing::draw_line_segment_mut;

use crate::Grid;
use crate::moments::ObjectStats;

/// Draws a 3x3 square centred on `(row, col)`, clipped to the grid.
pub fn draw_dot_mut(grid: &mut Grid, row: i64, col: i64, value: u32) {
    let (width, height) = grid.dimensions();
    for r in row - 1..=row + 1 {
        for c in col - 1..=col + 1 {
            if r >= 0 && c >= 0 && r < i64::from(height) && c < i64::from(width) {
                grid.put_pixel(c as u32, r as u32, Luma([value]));
            }
        }
    }
}

/// Draws a straight segment between two `(row, col)` points, clipped to the grid.
pub fn draw_segment_mut(grid: &mut Grid, start: (f32, f32), end: (f32, f32), value: u32) {
    draw_line_segment_mut(grid, (start.1, start.0), (end.1, end.0), Luma([value]));
}

/// Marks an object's centroid with a dot and draws a line of `length` pixels from it
/// along the object's orientation.
pub fn draw_orientation_mut(grid: &mut Grid, object: &ObjectStats, length: f64, value: u32) {
    let (row, col) = object.centroid;
    let theta = object.orientation.to_radians();
    draw_dot_mut(grid, row.floor() as i64, col.floor() as i64, value);

    let end = (row + length * theta.cos(), col + length * theta.sin());
    draw_segment_mut(
        grid,
        (row as f32, col as f32),
        (end.0 as f32, end.1 as f32),
        value,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moments::object_stats;
    use imageproc::gray_image;

    #[test]
    fn dot_is_clipped_at_the_corner() {
        let mut grid = gray_image!(type: u32,
            0, 0, 0;
            0, 0, 0;
            0, 0, 0);
        draw_dot_mut(&mut grid, 0, 0, 9);
        assert_eq!(grid.into_raw(), vec![9, 9, 0, 9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn segment_uses_row_col_order() {
        let mut grid = Grid::new(4, 3);
        draw_segment_mut(&mut grid, (1.0, 0.0), (1.0, 3.0), 5);
        assert!((0..4).all(|x| grid.get_pixel(x, 1)[0] == 5));
        assert!((0..4).all(|x| grid.get_pixel(x, 0)[0] == 0));
    }

    #[test]
    fn orientation_line_follows_a_horizontal_bar() {
        let mut grid = Grid::new(40, 5);
        for x in 5..16 {
            grid.put_pixel(x, 2, Luma([1]));
        }
        let stats = object_stats(&grid);
        let bar = &stats[&1];

        let mut canvas = Grid::new(40, 5);
        draw_orientation_mut(&mut canvas, bar, 20.0, 255);

        // The bar runs along the columns, so the line stays on row 2.
        assert_eq!(canvas.get_pixel(25, 2)[0], 255);
        assert_eq!(canvas.get_pixel(25, 1)[0], 0);
        assert_eq!(canvas.get_pixel(9, 1)[0], 255);
    }
}
