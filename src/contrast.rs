//! Binarization of grids ahead of labelling or voting.

use crate::Grid;

/// Sets pixels strictly above `level` to 255 and everything else to 0.
pub fn threshold_mut(grid: &mut Grid, level: u32) {
    binarize(grid, |value| value > level);
}

/// Sets pixels at or above `level` to 255 and everything else to 0.
pub fn threshold_inclusive_mut(grid: &mut Grid, level: u32) {
    binarize(grid, |value| value >= level);
}

fn binarize(grid: &mut Grid, keep: impl Fn(u32) -> bool) {
    for pixel in grid.pixels_mut() {
        pixel[0] = if keep(pixel[0]) { 255 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::gray_image;

    #[test]
    fn strict_threshold_drops_the_level_itself() {
        let mut grid = gray_image!(type: u32, 0, 99, 100, 101, 4000);
        threshold_mut(&mut grid, 100);
        assert_eq!(grid.into_raw(), vec![0, 0, 0, 255, 255]);
    }

    #[test]
    fn inclusive_threshold_keeps_the_level() {
        let mut grid = gray_image!(type: u32, 0, 99, 100, 101);
        threshold_inclusive_mut(&mut grid, 100);
        assert_eq!(grid.into_raw(), vec![0, 0, 255, 255]);
    }
}
