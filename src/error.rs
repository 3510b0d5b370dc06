use thiserror::Error;

/// Errors produced while loading inputs or running the numeric pipelines.
#[derive(Error, Debug)]
pub enum Error {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("image dimensions differ: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("light direction matrix is singular")]
    SingularDirections,

    #[error("point ({row}, {col}) is not inside the sphere")]
    OutsideSphere { row: f64, col: f64 },

    #[error("image has no pixels")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, Error>;
