use thiserror::Error;

/// Every failure the engine and its persistence layer can report.
///
/// None of these are fatal: the caller reconfigures and retries.
#[derive(Error, Debug)]
pub enum LyapError {
    /// A record is missing a field, names an unknown kind, or holds a value
    /// that does not parse.
    #[error("malformed record (line {line}): {reason}")]
    Malformed { line: usize, reason: String },

    /// An exponent grid file disagrees with the field's current size.
    #[error("grid is {found_width}x{found_height}, field is {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("grid holds {found} exponents, field needs {expected}")]
    GridLength { expected: usize, found: usize },

    /// The color map already holds its maximum number of intervals.
    #[error("color map is full ({0} intervals)")]
    Capacity(usize),

    /// The operation makes no sense for this function or state.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("bad configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("grid encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("grid decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl LyapError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        LyapError::Malformed { line, reason: reason.into() }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        LyapError::Unsupported(what.into())
    }
}

pub type LyapResult<T> = Result<T, LyapError>;
