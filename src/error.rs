//! Error types.
//!
//! Only configuration and resource problems are reported as [`Error`]s. A target that cannot be
//! followed, or a region without mass, is not an error: those show up as `false` success flags or
//! [`None`] results on the affected value.

use std::io;

/// Errors produced while constructing, training, loading or saving skin models.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The bin count does not divide the range by a power of two.
    #[error("{bins} bins cannot quantize a range of {range} (range must be bins * 2^k)")]
    InvalidQuantization { bins: usize, range: usize },

    /// Histograms must have 1, 2 or 3 dimensions.
    #[error("unsupported histogram dimensionality {0} (expected 1, 2 or 3)")]
    UnsupportedDimensions(usize),

    /// An image and its mask (or two images that must match) have different sizes.
    #[error("size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A tunable was given a value outside of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Reading or writing a model file failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A model file is truncated or contains malformed values.
    #[error("malformed histogram file (token {token}): {message}")]
    Parse { token: usize, message: String },
}

impl Error {
    /// Returns `true` for errors caused by an invalid model or tracker configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuantization { .. }
                | Self::UnsupportedDimensions(_)
                | Self::InvalidParameter(_)
        )
    }

    /// Returns `true` for errors caused by a missing or corrupt model file.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Parse { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
