//! Two-pass connected component labelling with equivalence resolution.
//!
//! The labeller scans a [`Grid`] in raster order and only looks at the already visited
//! `upper`, `left` and `upper_left` neighbours of each foreground pixel. Pixels touching
//! only through an upper-right/lower-left diagonal therefore end up in different
//! components, unlike [`imageproc::region_labelling::connected_components`] with
//! eight-way connectivity.

use std::collections::{BTreeMap, BTreeSet};

use image::{Luma, Rgba, RgbaImage};
use log::{debug, warn};

use crate::Grid;
use crate::colors::contrasting_colors;

/// Decides which input pixels take part in labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foreground {
    /// Pixels exactly equal to the value, e.g. `255` in a binary image.
    Equals(u32),
    /// Any non-zero pixel, e.g. when relabelling an already labelled grid.
    NonZero,
    /// Pixels strictly greater than the threshold.
    Above(u32),
}

impl Foreground {
    /// Returns whether a pixel with `value` takes part in labelling.
    pub fn contains(self, value: u32) -> bool {
        match self {
            Foreground::Equals(expected) => value == expected,
            Foreground::NonZero => value != 0,
            Foreground::Above(threshold) => value > threshold,
        }
    }
}

/// How resolved components are mapped to output pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPolicy {
    /// Evenly spaced gray levels strictly below `max_level`, so that `max_level` stays
    /// free for annotations drawn on top of the labelled grid.
    SpacedGray { max_level: u32 },
    /// Gray levels starting at `max_level / (n + 1)` and doubling for every further
    /// component.
    ///
    /// From four components on, the last values exceed `max_level` (four components at
    /// 255 end at 408); they are neither clamped nor wrapped. Values that would
    /// overflow `u32` saturate at `u32::MAX` and then repeat.
    DoublingGray { max_level: u32 },
    /// Dense integers starting at 1, for grids consumed numerically.
    Sequential,
}

impl ColorPolicy {
    fn display_values(self, count: u32) -> Vec<u32> {
        match self {
            ColorPolicy::Sequential => (1..=count).collect(),
            ColorPolicy::SpacedGray { max_level } => {
                let step = gray_base(max_level, count);
                (1..=count).map(|i| step.saturating_mul(i)).collect()
            }
            ColorPolicy::DoublingGray { max_level } => {
                let base = gray_base(max_level, count);
                let values: Vec<u32> = (0..count)
                    .map(|i| {
                        2u32.checked_pow(i)
                            .and_then(|factor| base.checked_mul(factor))
                            .unwrap_or(u32::MAX)
                    })
                    .collect();
                if values.last().is_some_and(|&last| last >= max_level) {
                    warn!("doubling gray levels for {count} components reach or exceed {max_level}");
                }
                values
            }
        }
    }
}

/// `max_level / (count + 1)`, or 1 when that rounds down to 0.
fn gray_base(max_level: u32, count: u32) -> u32 {
    let base = max_level / count.saturating_add(1);
    if base == 0 {
        warn!(
            "{count} components do not fit below gray level {max_level}, \
             falling back to consecutive levels"
        );
        return 1;
    }
    base
}

/// How provisional labels are merged and resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Union-find with path compression. Every connected set gets exactly one label.
    #[default]
    Full,
    /// One-hop merges and a single ascending flattening sweep.
    ///
    /// Merging overwrites `equiv[left]` with `equiv[upper]` and resolution runs
    /// `equiv[k] = equiv[equiv[k]]` once per key. Equivalence chains deeper than two
    /// hops stay partially unresolved, leaving one connected set split across several
    /// output values.
    SingleHop,
}

/// Configuration of a labelling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelOptions {
    pub foreground: Foreground,
    pub colors: ColorPolicy,
    pub resolution: Resolution,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            foreground: Foreground::Equals(255),
            colors: ColorPolicy::SpacedGray { max_level: 255 },
            resolution: Resolution::Full,
        }
    }
}

impl LabelOptions {
    /// Labels an already thresholded grid (`255` foreground) with dense integers.
    pub fn sequential() -> Self {
        Self {
            colors: ColorPolicy::Sequential,
            ..Self::default()
        }
    }
}

/// Summary of a labelling call: the registry of resolved representatives and the
/// output value each one was painted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelledComponents {
    registry: BTreeMap<u32, u32>,
    provisional_labels: u32,
}

impl LabelledComponents {
    /// Number of components written to the grid.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of labels allocated during the first pass.
    pub fn provisional_labels(&self) -> u32 {
        self.provisional_labels
    }

    /// Representative label to output value, ordered by representative.
    pub fn registry(&self) -> &BTreeMap<u32, u32> {
        &self.registry
    }

    /// Output values in representative order.
    pub fn display_values(&self) -> impl Iterator<Item = u32> + '_ {
        self.registry.values().copied()
    }
}

/// Provisional label equivalences for one labelling call.
///
/// Index 0 is unused so that labels index the table directly.
struct EquivalenceTable {
    parent: Vec<u32>,
    resolution: Resolution,
}

impl EquivalenceTable {
    fn new(resolution: Resolution) -> Self {
        Self {
            parent: vec![0],
            resolution,
        }
    }

    fn len(&self) -> u32 {
        (self.parent.len() - 1) as u32
    }

    fn new_label(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn find(&mut self, label: u32) -> u32 {
        match self.resolution {
            Resolution::SingleHop => self.parent[label as usize],
            Resolution::Full => {
                let mut root = label;
                while self.parent[root as usize] != root {
                    root = self.parent[root as usize];
                }
                let mut current = label;
                while current != root {
                    let next = self.parent[current as usize];
                    self.parent[current as usize] = root;
                    current = next;
                }
                root
            }
        }
    }

    /// Folds the class of `left` into the class of `upper` and returns the
    /// representative the current pixel should carry.
    fn merge(&mut self, left: u32, upper: u32) -> u32 {
        match self.resolution {
            Resolution::SingleHop => {
                let representative = self.parent[upper as usize];
                self.parent[left as usize] = representative;
                representative
            }
            Resolution::Full => {
                let upper_root = self.find(upper);
                let left_root = self.find(left);
                self.parent[left_root as usize] = upper_root;
                upper_root
            }
        }
    }

    /// Consumes the table and returns the final representative of every label.
    fn resolve(mut self) -> Vec<u32> {
        for label in 1..self.parent.len() {
            self.parent[label] = match self.resolution {
                Resolution::SingleHop => self.parent[self.parent[label] as usize],
                Resolution::Full => self.find(label as u32),
            };
        }
        self.parent
    }
}

/// Labels the connected foreground components of `grid` in place.
///
/// Foreground pixels, as decided by [`LabelOptions::foreground`], are overwritten with a
/// positive value shared by exactly the pixels of their component; every other pixel is
/// set to 0. Connectivity follows the causal `upper`, `left`, `upper_left` mask, so the
/// upper-right/lower-left diagonal does not connect pixels.
///
/// The first pass assigns provisional labels and records equivalences, the table is
/// then resolved, and a second pass rewrites every labelled pixel through a lookup table
/// built from the resolved equivalences and the [`ColorPolicy`]. Each pixel is read and
/// written exactly once in the second pass.
///
/// A grid without foreground pixels comes back all zero with an empty registry.
///
/// # Examples
///
/// ```
/// use gray_vision::region_labelling::{label_components_mut, LabelOptions};
/// use imageproc::gray_image;
///
/// let mut grid = gray_image!(type: u32,
///     255, 255,   0, 255;
///       0, 255,   0, 255);
///
/// let components = label_components_mut(&mut grid, &LabelOptions::sequential());
///
/// assert_eq!(components.len(), 2);
/// assert_eq!(grid.into_raw(), vec![1, 1, 0, 2, 0, 1, 0, 2]);
/// ```
pub fn label_components_mut(grid: &mut Grid, options: &LabelOptions) -> LabelledComponents {
    let (width, height) = grid.dimensions();
    let mut table = EquivalenceTable::new(options.resolution);

    for y in 0..height {
        for x in 0..width {
            if !options.foreground.contains(grid.get_pixel(x, y)[0]) {
                grid.put_pixel(x, y, Luma([0]));
                continue;
            }

            let upper = if y > 0 { grid.get_pixel(x, y - 1)[0] } else { 0 };
            let left = if x > 0 { grid.get_pixel(x - 1, y)[0] } else { 0 };
            let upper_left = if x > 0 && y > 0 {
                grid.get_pixel(x - 1, y - 1)[0]
            } else {
                0
            };

            let label = if upper == 0 && left == 0 && upper_left == 0 {
                table.new_label()
            } else if upper != 0 && left != 0 {
                table.merge(left, upper)
            } else if left != 0 {
                table.find(left)
            } else if upper != 0 {
                table.find(upper)
            } else {
                table.find(upper_left)
            };
            grid.put_pixel(x, y, Luma([label]));
        }
    }

    let provisional_labels = table.len();
    let representatives = table.resolve();

    let distinct: BTreeSet<u32> = representatives.iter().skip(1).copied().collect();
    let values = options.colors.display_values(distinct.len() as u32);
    let registry: BTreeMap<u32, u32> = distinct.into_iter().zip(values).collect();

    let lookup: Vec<u32> = representatives
        .iter()
        .map(|representative| registry.get(representative).copied().unwrap_or(0))
        .collect();

    for pixel in grid.pixels_mut() {
        let provisional = pixel[0];
        if provisional > 0 {
            pixel[0] = lookup[provisional as usize];
        }
    }

    debug!(
        "labelled {}x{} grid: {} provisional labels, {} components",
        width,
        height,
        provisional_labels,
        registry.len()
    );

    LabelledComponents {
        registry,
        provisional_labels,
    }
}

/// Labels a copy of `grid`, leaving the input untouched.
pub fn connected_components(grid: &Grid, options: &LabelOptions) -> (Grid, LabelledComponents) {
    let mut labelled = grid.clone();
    let components = label_components_mut(&mut labelled, options);
    (labelled, components)
}

/// Returns the distinct non-zero values of a labelled grid.
pub fn component_labels(grid: &Grid) -> BTreeSet<u32> {
    grid.pixels()
        .map(|pixel| pixel[0])
        .filter(|&value| value != 0)
        .collect()
}

/// Paints the `n` largest components of a labelled grid with visually distinct colors.
///
/// Components are ranked by pixel count (ties broken by the smaller label). Pixels of
/// the remaining components and the background are painted with `background`.
///
/// # Arguments
///
/// * `labels` - A labelled grid, e.g. the output of [`label_components_mut`].
/// * `n` - How many of the largest components to highlight.
/// * `background` - Color for every pixel that is not highlighted.
pub fn draw_principal_connected_components(
    labels: &Grid,
    n: usize,
    background: Rgba<u8>,
) -> RgbaImage {
    let mut areas: BTreeMap<u32, usize> = BTreeMap::new();
    for pixel in labels.pixels() {
        if pixel[0] != 0 {
            *areas.entry(pixel[0]).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(u32, usize)> = areas.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);

    let colors = contrasting_colors(ranked.len(), 255);
    let palette: BTreeMap<u32, Rgba<u8>> = ranked
        .into_iter()
        .map(|(label, _)| label)
        .zip(colors)
        .collect();

    RgbaImage::from_fn(labels.width(), labels.height(), |x, y| {
        palette
            .get(&labels.get_pixel(x, y)[0])
            .copied()
            .unwrap_or(background)
    })
}
