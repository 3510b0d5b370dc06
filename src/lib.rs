//! Gray-level vision routines built on [imageproc]: connected component labelling with
//! equivalence resolution, object moments, Sobel edges, Hough lines and photometric stereo.
//!
//! Every routine works on a [`Grid`], a single-channel image with `u32` samples so that
//! labels, vote counts and gradient magnitudes do not saturate at 255. The modules are
//! organised into the same categories (as possible) as in [imageproc].

use image::Luma;
use imageproc::definitions::Image;

mod colors;
pub mod contrast;
pub mod drawing;
pub mod edges;
mod error;
pub mod hough;
pub mod io;
pub mod moments;
pub mod photometric;
pub mod region_labelling;

pub use error::{Error, Result};

/// A rectangular grid of non-negative intensities, indexed `(x, y)` = `(col, row)`.
pub type Grid = Image<Luma<u32>>;
