//! Loading and saving grids, and reading whitespace separated record files.
//!
//! - `load_grid`: read any raster the `image` crate understands into a [`Grid`].
//! - `save_grid`: write a grid, 8-bit when every value fits and 16-bit otherwise.
//! - `read_records`: parse numeric text records such as sphere or light files.

use std::io::BufRead;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use log::debug;
use num_traits::ToPrimitive;

use crate::Grid;
use crate::error::{Error, Result};

/// Loads a raster from disk as a grid of intensities.
///
/// 16-bit grayscale images keep their full range; every other format is converted to
/// 8-bit luma first.
pub fn load_grid(path: impl AsRef<Path>) -> Result<Grid> {
    let path = path.as_ref();
    let grid = grid_from_image(image::open(path)?);
    debug!(
        "loaded {}x{} grid from {}",
        grid.width(),
        grid.height(),
        path.display()
    );
    Ok(grid)
}

/// Converts a decoded image into a grid of intensities.
pub fn grid_from_image(image: DynamicImage) -> Grid {
    match image {
        DynamicImage::ImageLuma16(gray) => Grid::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([u32::from(gray.get_pixel(x, y)[0])])
        }),
        other => {
            let gray = other.into_luma8();
            Grid::from_fn(gray.width(), gray.height(), |x, y| {
                Luma([u32::from(gray.get_pixel(x, y)[0])])
            })
        }
    }
}

/// Converts a grid into an encodable image, saturating values that exceed 16 bits.
pub fn grid_to_image(grid: &Grid) -> DynamicImage {
    let max = grid.pixels().map(|pixel| pixel[0]).max().unwrap_or(0);
    if max <= u32::from(u8::MAX) {
        DynamicImage::ImageLuma8(GrayImage::from_fn(grid.width(), grid.height(), |x, y| {
            Luma([grid.get_pixel(x, y)[0].to_u8().unwrap_or(u8::MAX)])
        }))
    } else {
        DynamicImage::ImageLuma16(ImageBuffer::from_fn(grid.width(), grid.height(), |x, y| {
            Luma([grid.get_pixel(x, y)[0].to_u16().unwrap_or(u16::MAX)])
        }))
    }
}

/// Saves a grid; the format follows the file extension (`.pgm`, `.png`, ...).
pub fn save_grid(path: impl AsRef<Path>, grid: &Grid) -> Result<()> {
    let path = path.as_ref();
    grid_to_image(grid).save(path)?;
    debug!(
        "saved {}x{} grid to {}",
        grid.width(),
        grid.height(),
        path.display()
    );
    Ok(())
}

/// One parsed line of a record file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line number in the source.
    pub line: usize,
    pub values: Vec<f64>,
}

impl Record {
    /// Interprets field `index` as a non-negative whole number.
    pub fn count(&self, index: usize) -> Result<u64> {
        let value = *self.values.get(index).ok_or_else(|| Error::Parse {
            line: self.line,
            message: format!("missing field {}, found {}", index + 1, self.values.len()),
        })?;
        if value.fract() != 0.0 {
            return Err(Error::Parse {
                line: self.line,
                message: format!("field {} must be a whole number, found {value}", index + 1),
            });
        }
        value.to_u64().ok_or_else(|| Error::Parse {
            line: self.line,
            message: format!("field {} must be non-negative, found {value}", index + 1),
        })
    }
}

/// Reads lines of whitespace separated numbers, each with exactly `fields` values.
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn read_records<R: BufRead>(reader: R, fields: usize) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let values = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|e| Error::Parse {
                    line: line_number,
                    message: format!("invalid number '{token}': {e}"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != fields {
            return Err(Error::Parse {
                line: line_number,
                message: format!("expected {fields} fields, found {}", values.len()),
            });
        }
        records.push(Record {
            line: line_number,
            values,
        });
    }
    Ok(records)
}
