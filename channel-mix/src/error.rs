//! Construction errors

use crate::types::{AudioFormat, MAX_CHANNELS};
use std::fmt;
use thiserror::Error;

/// Side of the mixer a layout belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Reasons a channel mixer cannot be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelMixError {
    /// Only S32 and F64 have a mixing path
    #[error("unsupported sample format {0:?}, expected S32 or F64")]
    UnsupportedFormat(AudioFormat),

    /// A layout is empty or wider than 63 channels
    #[error("{direction} channel count {count} outside 1..={max}", max = MAX_CHANNELS)]
    InvalidChannelCount { direction: Direction, count: usize },
}
