//! Area, centroid and orientation of labelled objects from second moments.
//!
//! Coordinates are `(row, col)`. The orientation is the angle of the axis of least
//! second moment, measured from the row axis towards the column axis, in degrees.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;
use std::io::{BufRead, Write};

use log::debug;

use crate::Grid;
use crate::error::Result;
use crate::io::read_records;

/// Shape attributes of one labelled object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectStats {
    pub label: u32,
    pub area: u64,
    /// Mean `(row, col)` of the object's pixels.
    pub centroid: (f64, f64),
    /// `Σ (r - r̄)²`
    pub a: f64,
    /// `2 Σ (r - r̄)(c - c̄)`
    pub b: f64,
    /// `Σ (c - c̄)²`
    pub c: f64,
    /// Angle of the axis of least second moment, in degrees.
    pub orientation: f64,
    /// Second moment about the orientation axis.
    pub e_min: f64,
    /// Second moment about the perpendicular axis.
    pub e_max: f64,
    /// `e_min / e_max`; 1 for a perfectly round object.
    pub roundedness: f64,
}

#[derive(Default)]
struct Accumulator {
    area: u64,
    row_sum: f64,
    col_sum: f64,
    a: f64,
    b: f64,
    c: f64,
}

/// Second moment of an object about the axis at angle `theta`.
fn inertia(a: f64, b: f64, c: f64, theta: f64) -> f64 {
    let (sin, cos) = theta.sin_cos();
    a * sin * sin - b * sin * cos + c * cos * cos
}

/// Computes [`ObjectStats`] for every non-zero value of a labelled grid.
///
/// Each distinct value is treated as one object, whether or not its pixels are
/// connected. Objects are keyed and ordered by label.
pub fn object_stats(grid: &Grid) -> BTreeMap<u32, ObjectStats> {
    let mut accumulators: BTreeMap<u32, Accumulator> = BTreeMap::new();

    for (x, y, pixel) in grid.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        let entry = accumulators.entry(pixel[0]).or_default();
        entry.area += 1;
        entry.row_sum += f64::from(y);
        entry.col_sum += f64::from(x);
    }

    let centroids: BTreeMap<u32, (f64, f64)> = accumulators
        .iter()
        .map(|(&label, acc)| {
            let area = acc.area as f64;
            (label, (acc.row_sum / area, acc.col_sum / area))
        })
        .collect();

    for (x, y, pixel) in grid.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }
        let (row_mean, col_mean) = centroids[&label];
        let dr = f64::from(y) - row_mean;
        let dc = f64::from(x) - col_mean;
        if let Some(acc) = accumulators.get_mut(&label) {
            acc.a += dr * dr;
            acc.b += 2.0 * dr * dc;
            acc.c += dc * dc;
        }
    }

    let objects: BTreeMap<u32, ObjectStats> = accumulators
        .into_iter()
        .map(|(label, acc)| {
            let theta = acc.b.atan2(acc.a - acc.c) / 2.0;
            let e_min = inertia(acc.a, acc.b, acc.c, theta);
            let e_max = inertia(acc.a, acc.b, acc.c, theta + FRAC_PI_2);
            let roundedness = if e_max.abs() < f64::EPSILON {
                1.0
            } else {
                e_min / e_max
            };
            let stats = ObjectStats {
                label,
                area: acc.area,
                centroid: centroids[&label],
                a: acc.a,
                b: acc.b,
                c: acc.c,
                orientation: theta.to_degrees(),
                e_min,
                e_max,
                roundedness,
            };
            (label, stats)
        })
        .collect();

    debug!("computed statistics for {} objects", objects.len());
    objects
}

/// One line of an object database:
/// `label row col e_min area roundedness orientation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectRecord {
    pub label: u32,
    pub centroid: (f64, f64),
    pub e_min: f64,
    pub area: u64,
    pub roundedness: f64,
    pub orientation: f64,
}

impl From<&ObjectStats> for ObjectRecord {
    fn from(stats: &ObjectStats) -> Self {
        Self {
            label: stats.label,
            centroid: stats.centroid,
            e_min: stats.e_min,
            area: stats.area,
            roundedness: stats.roundedness,
            orientation: stats.orientation,
        }
    }
}

/// Writes one database line per object, in label order.
pub fn write_object_database<'a, W: Write>(
    mut writer: W,
    objects: impl IntoIterator<Item = &'a ObjectStats>,
) -> Result<()> {
    for object in objects {
        let record = ObjectRecord::from(object);
        writeln!(
            writer,
            "{} {} {} {} {} {} {}",
            record.label,
            record.centroid.0,
            record.centroid.1,
            record.e_min,
            record.area,
            record.roundedness,
            record.orientation
        )?;
    }
    Ok(())
}

/// Reads an object database written by [`write_object_database`].
pub fn read_object_database<R: BufRead>(reader: R) -> Result<Vec<ObjectRecord>> {
    read_records(reader, 7)?
        .into_iter()
        .map(|record| {
            let label = u32::try_from(record.count(0)?).map_err(|_| crate::Error::Parse {
                line: record.line,
                message: "label does not fit in 32 bits".to_string(),
            })?;
            Ok(ObjectRecord {
                label,
                centroid: (record.values[1], record.values[2]),
                e_min: record.values[3],
                area: record.count(4)?,
                roundedness: record.values[5],
                orientation: record.values[6],
            })
        })
        .collect()
}

/// Returns the objects whose roundedness lies within `tolerance` of any database entry.
///
/// Roundedness does not change under translation, scaling or rotation, which makes it
/// the comparison key.
pub fn recognize<'a>(
    objects: &'a BTreeMap<u32, ObjectStats>,
    database: &[ObjectRecord],
    tolerance: f64,
) -> Vec<&'a ObjectStats> {
    let recognized: Vec<&ObjectStats> = objects
        .values()
        .filter(|object| {
            database
                .iter()
                .any(|known| (object.roundedness - known.roundedness).abs() <= tolerance)
        })
        .collect();
    debug!(
        "recognized {} of {} objects against {} database entries",
        recognized.len(),
        objects.len(),
        database.len()
    );
    recognized
}
