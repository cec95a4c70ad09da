//! Audio channel mixing
//!
//! Converts audio between arbitrary speaker layouts.
//!
//! Key features:
//! - Heuristic conversion matrix derived from channel positions
//!   (identical, compatible and spatially nearby channels)
//! - Double precision and 32-bit fixed-point mixing paths
//! - In-place mixing for both upmix and downmix
//! - Parallel mixing of large buffers with rayon

pub mod clamping;
pub mod error;
pub mod matrix;
pub mod mixer;
pub mod types;

pub use clamping::*;
pub use error::*;
pub use matrix::*;
pub use mixer::*;
pub use types::*;

pub fn version() -> &'static str {
    "0.1.0"
}
