//! Photometric stereo with three point light sources.
//!
//! A calibration sphere gives the light directions: the brightest point of each
//! sphere image is where the surface normal faces the light. With the three directions
//! stacked into `S`, every pixel's intensities `I` give the scaled surface normal
//! `S⁻¹ I`, whose length is the albedo and whose direction is the normal.

use std::io::{BufRead, Write};

use image::Luma;
use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::Grid;
use crate::drawing::{draw_dot_mut, draw_segment_mut};
use crate::error::{Error, Result};
use crate::io::read_records;

/// Length, in pixels, of the needles drawn by [`needle_map`].
const NEEDLE_LENGTH: f64 = 10.0;

/// Position and size of the calibration sphere in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereParams {
    /// `(row, col)` of the sphere centre.
    pub center: (f64, f64),
    pub radius: f64,
}

impl SphereParams {
    /// Reads `row col radius` from the first non-blank line.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let records = read_records(reader, 3)?;
        let record = records.first().ok_or_else(|| Error::Parse {
            line: 1,
            message: "missing sphere parameters".to_string(),
        })?;
        Ok(Self {
            center: (record.values[0], record.values[1]),
            radius: record.values[2],
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{} {} {}", self.center.0, self.center.1, self.radius)?;
        Ok(())
    }
}

/// Locates the bright disk of a sphere image.
///
/// The centre is the centroid of all pixels above `threshold`. The radius is a quarter
/// of the summed vertical and horizontal extents of the disk through the centre, both
/// counted inclusively. Returns `None` when no pixel is above the threshold.
pub fn detect_sphere(grid: &Grid, threshold: u32) -> Option<SphereParams> {
    let inside = |value: u32| value > threshold;

    let (mut area, mut row_sum, mut col_sum) = (0u64, 0f64, 0f64);
    for (x, y, pixel) in grid.enumerate_pixels() {
        if inside(pixel[0]) {
            area += 1;
            row_sum += f64::from(y);
            col_sum += f64::from(x);
        }
    }
    if area == 0 {
        return None;
    }
    let center = (row_sum / area as f64, col_sum / area as f64);
    let (center_x, center_y) = (center.1.round() as u32, center.0.round() as u32);

    let extent = |values: Vec<u32>| -> f64 {
        let first = values.iter().position(|&v| inside(v));
        let last = values.iter().rposition(|&v| inside(v));
        match (first, last) {
            (Some(first), Some(last)) => (last - first + 1) as f64,
            _ => 0.0,
        }
    };
    let vertical = extent((0..grid.height()).map(|y| grid.get_pixel(center_x, y)[0]).collect());
    let horizontal = extent((0..grid.width()).map(|x| grid.get_pixel(x, center_y)[0]).collect());

    let sphere = SphereParams {
        center,
        radius: (vertical + horizontal) / 4.0,
    };
    debug!("detected sphere at {:?} with radius {}", sphere.center, sphere.radius);
    Some(sphere)
}

/// Returns the centroid `(row, col)` of the pixels sharing the maximum value.
pub fn brightest_point(grid: &Grid) -> Option<(f64, f64)> {
    let max = grid.pixels().map(|pixel| pixel[0]).max()?;
    let (mut count, mut row_sum, mut col_sum) = (0u64, 0f64, 0f64);
    for (x, y, pixel) in grid.enumerate_pixels() {
        if pixel[0] == max {
            count += 1;
            row_sum += f64::from(y);
            col_sum += f64::from(x);
        }
    }
    Some((row_sum / count as f64, col_sum / count as f64))
}

/// Computes the unit direction towards the light that lit `grid`.
///
/// The direction is the sphere normal at the brightest point. Its components are
/// `(row, col, towards the viewer)`.
pub fn light_direction(sphere: &SphereParams, grid: &Grid) -> Result<Vector3<f64>> {
    let (row, col) = brightest_point(grid).ok_or(Error::EmptyImage)?;
    let dr = row - sphere.center.0;
    let dc = col - sphere.center.1;
    let radicand = sphere.radius.powi(2) - dr.powi(2) - dc.powi(2);
    if radicand <= 0.0 {
        return Err(Error::OutsideSphere { row, col });
    }

    let depth = radicand.sqrt();
    Ok(Vector3::new(dr / depth, dc / depth, 1.0).normalize())
}

/// The three light directions, one per matrix row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDirections {
    pub matrix: Matrix3<f64>,
}

impl LightDirections {
    pub fn new(directions: [Vector3<f64>; 3]) -> Self {
        let [a, b, c] = directions;
        Self {
            matrix: Matrix3::new(a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z),
        }
    }

    pub fn direction(&self, index: usize) -> Vector3<f64> {
        self.matrix.row(index).transpose()
    }

    /// Reads three lines of `x y z`.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let records = read_records(reader, 3)?;
        if records.len() != 3 {
            let line = match records.get(3) {
                Some(extra) => extra.line,
                None => records.last().map_or(1, |record| record.line + 1),
            };
            return Err(Error::Parse {
                line,
                message: format!("expected 3 light directions, found {}", records.len()),
            });
        }
        let direction = |i: usize| {
            let v = &records[i].values;
            Vector3::new(v[0], v[1], v[2])
        };
        Ok(Self::new([direction(0), direction(1), direction(2)]))
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        for i in 0..3 {
            let d = self.direction(i);
            writeln!(writer, "{} {} {}", d.x, d.y, d.z)?;
        }
        Ok(())
    }

    fn inverse(&self) -> Result<Matrix3<f64>> {
        self.matrix.try_inverse().ok_or(Error::SingularDirections)
    }
}

/// Estimates one light direction per sphere image.
pub fn estimate_light_directions(sphere: &SphereParams, images: [&Grid; 3]) -> Result<LightDirections> {
    check_dimensions(&images)?;
    let directions = LightDirections::new([
        light_direction(sphere, images[0])?,
        light_direction(sphere, images[1])?,
        light_direction(sphere, images[2])?,
    ]);
    debug!("estimated light directions {:?}", directions.matrix);
    Ok(directions)
}

fn check_dimensions(images: &[&Grid; 3]) -> Result<()> {
    let expected = images[0].dimensions();
    for image in &images[1..] {
        if image.dimensions() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                got: image.dimensions(),
            });
        }
    }
    Ok(())
}

/// Scaled normal `S⁻¹ I` at `(x, y)`, if all three intensities exceed `threshold`.
fn scaled_normal(
    inverse: &Matrix3<f64>,
    images: &[&Grid; 3],
    threshold: u32,
    x: u32,
    y: u32,
) -> Option<Vector3<f64>> {
    let [a, b, c] = [0, 1, 2].map(|i| images[i].get_pixel(x, y)[0]);
    if a <= threshold || b <= threshold || c <= threshold {
        return None;
    }
    Some(inverse * Vector3::new(f64::from(a), f64::from(b), f64::from(c)))
}

/// Computes the albedo of every pixel lit in all three images, scaled to `0..=255`.
///
/// Pixels at or below `threshold` in any image get 0. If no pixel has a positive
/// albedo the result is all zeros.
pub fn albedo_map(directions: &LightDirections, images: [&Grid; 3], threshold: u32) -> Result<Grid> {
    check_dimensions(&images)?;
    let inverse = directions.inverse()?;
    let (width, height) = images[0].dimensions();

    let albedo: Vec<f64> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            scaled_normal(&inverse, &images, threshold, x, y).map_or(0.0, |n| n.norm())
        })
        .collect();
    let max = albedo.iter().copied().fold(0.0, f64::max);
    debug!("maximum albedo {max}");

    Ok(Grid::from_fn(width, height, |x, y| {
        let value = albedo[(y * width + x) as usize];
        if max > 0.0 {
            Luma([(255.0 * value / max).floor() as u32])
        } else {
            Luma([0])
        }
    }))
}

/// Draws surface normals over the first image on a regular lattice.
///
/// Lattice points are every `step` pixels, starting `step` pixels in from the top-left
/// corner. Each point lit in all three images gets a 3×3 dot of 0 and a 255 needle
/// towards `point + 10·n̂`, using the row and column components of the unit normal.
///
/// # Panics
///
/// Panics if `step` is 0.
pub fn needle_map(
    directions: &LightDirections,
    images: [&Grid; 3],
    step: u32,
    threshold: u32,
) -> Result<Grid> {
    assert!(step > 0, "needle step must be positive");
    check_dimensions(&images)?;
    let inverse = directions.inverse()?;

    let mut canvas = images[0].clone();
    let (width, height) = canvas.dimensions();
    let mut needles = 0usize;
    for y in (step..height).step_by(step as usize) {
        for x in (step..width).step_by(step as usize) {
            let Some(normal) = scaled_normal(&inverse, &images, threshold, x, y) else {
                continue;
            };
            let Some(unit) = normal.try_normalize(f64::EPSILON) else {
                continue;
            };

            let (row, col) = (f64::from(y), f64::from(x));
            let end = (
                row + (NEEDLE_LENGTH * unit.x).floor(),
                col + (NEEDLE_LENGTH * unit.y).floor(),
            );
            draw_dot_mut(&mut canvas, i64::from(y), i64::from(x), 0);
            draw_segment_mut(
                &mut canvas,
                (row as f32, col as f32),
                (end.0 as f32, end.1 as f32),
                255,
            );
            needles += 1;
        }
    }
    debug!("drew {needles} needles at step {step}");
    Ok(canvas)
}
