//! Output clamping for both numeric paths
//!
//! Floating samples are clamped to [-1.0, 1.0] with NaN mapped to silence.
//! Fixed-point accumulators are saturated to the signed 32-bit range.

/// Clamp one floating sample to [-1.0, 1.0]
#[inline]
pub fn clamp_f64(val: f64) -> f64 {
    if val.is_nan() {
        0.0
    } else {
        val.clamp(-1.0, 1.0)
    }
}

/// Saturate a 64-bit accumulator to the i32 range
#[inline]
pub fn clamp_s32(acc: i64) -> i32 {
    acc.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
