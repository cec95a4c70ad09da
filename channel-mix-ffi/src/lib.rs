//! Channel mix FFI - C Foreign Function Interface
//!
//! Provides C-compatible API for hosts that keep channel positions and
//! sample formats as plain integers.

use libc::{c_char, c_int, c_void};
use std::{ptr, slice};

use channel_mix::{
    AudioFormat, ChannelMix, ChannelPosition, MixFlags, MixSample, SampleLayout, MAX_CHANNELS,
};

/// Opaque handle to ChannelMix (C-compatible)
pub struct CChannelMix {
    _private: [u8; 0],
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Read `count` raw positions, rejecting counts outside 1..=63
unsafe fn read_positions(
    what: &str,
    count: c_int,
    raw: *const i32,
) -> Option<([ChannelPosition; MAX_CHANNELS], usize)> {
    if raw.is_null() {
        log::warn!("{} positions are null", what);
        return None;
    }
    if count <= 0 || count as usize > MAX_CHANNELS {
        log::warn!("{} channel count {} outside 1..={}", what, count, MAX_CHANNELS);
        return None;
    }

    let count = count as usize;
    let mut positions = [ChannelPosition::Invalid; MAX_CHANNELS];
    for (slot, &value) in positions.iter_mut().zip(slice::from_raw_parts(raw, count)) {
        *slot = ChannelPosition::from_raw(value);
    }
    Some((positions, count))
}

/// Create a new channel mixer
///
/// `flags` and `format` take the host's `GstAudioChannelMixFlags` and
/// `GstAudioFormat` values. The non-interleaved flags are accepted and
/// stored; the buffer layout is chosen per `channel_mix_samples` call.
/// Returns null when the flags, format, channel counts or positions are
/// rejected.
///
/// # Safety
/// `in_position` and `out_position` must point to `in_channels` and
/// `out_channels` readable positions.
#[no_mangle]
pub unsafe extern "C" fn channel_mix_new(
    flags: u32,
    format: u32,
    in_channels: c_int,
    in_position: *const i32,
    out_channels: c_int,
    out_position: *const i32,
) -> *mut CChannelMix {
    let Some(flags) = MixFlags::from_bits(flags) else {
        log::warn!("unknown channel mix flags {:#x}", flags);
        return ptr::null_mut();
    };

    let Some((in_pos, in_len)) = read_positions("input", in_channels, in_position) else {
        return ptr::null_mut();
    };
    let Some((out_pos, out_len)) = read_positions("output", out_channels, out_position) else {
        return ptr::null_mut();
    };

    match ChannelMix::new(
        flags,
        AudioFormat::from_raw(format),
        &in_pos[..in_len],
        &out_pos[..out_len],
    ) {
        Ok(mix) => Box::into_raw(Box::new(mix)) as *mut CChannelMix,
        Err(err) => {
            log::warn!("channel mix rejected: {}", err);
            ptr::null_mut()
        }
    }
}

/// Destroy a channel mixer
///
/// # Safety
/// Caller must ensure ptr is valid and not already freed.
#[no_mangle]
pub unsafe extern "C" fn channel_mix_free(ptr: *mut CChannelMix) {
    if !ptr.is_null() {
        let _ = Box::from_raw(ptr as *mut ChannelMix);
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Check if the mixer is passthrough
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn channel_mix_is_passthrough(ptr: *const CChannelMix) -> c_int {
    if ptr.is_null() {
        return 0;
    }

    let mix = &*(ptr as *const ChannelMix);
    mix.is_passthrough() as c_int
}

/// Get the weight of input channel `in_channel` in output channel `out_channel`
///
/// Returns 0.0 for out-of-range channels.
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn channel_mix_get_weight(
    ptr: *const CChannelMix,
    in_channel: c_int,
    out_channel: c_int,
) -> f32 {
    if ptr.is_null() || in_channel < 0 || out_channel < 0 {
        return 0.0;
    }

    let mix = &*(ptr as *const ChannelMix);
    let (in_channel, out_channel) = (in_channel as usize, out_channel as usize);
    if in_channel >= mix.in_channels() || out_channel >= mix.out_channels() {
        return 0.0;
    }
    mix.matrix().weight(in_channel, out_channel)
}

// ============================================================================
// MIXING
// ============================================================================

/// Mix `samples` frames from `in_` into `out`
///
/// With an interleaved `layout`, `in_` and `out` point to a single buffer
/// pointer each, and both may be the same buffer (sized for the wider side).
/// With a non-interleaved layout they point to one buffer per channel; those
/// planes must not overlap.
///
/// # Safety
/// Caller must ensure all pointers are valid and buffers are properly sized
/// for the mixer's format.
#[no_mangle]
pub unsafe extern "C" fn channel_mix_samples(
    ptr: *mut CChannelMix,
    layout: u32,
    in_: *const *const c_void,
    out: *const *mut c_void,
    samples: c_int,
) {
    if ptr.is_null() || in_.is_null() || out.is_null() || samples <= 0 {
        return;
    }

    let Some(layout) = SampleLayout::from_raw(layout) else {
        log::warn!("unknown sample layout {}", layout);
        return;
    };

    let mix = &mut *(ptr as *mut ChannelMix);
    let frames = samples as usize;

    match mix.format() {
        AudioFormat::S32 => mix_raw::<i32>(mix, layout, in_, out, frames),
        AudioFormat::F64 => mix_raw::<f64>(mix, layout, in_, out, frames),
        _ => unreachable!("mixer constructed with unmixable format"),
    }
}

unsafe fn mix_raw<T: MixSample>(
    mix: &mut ChannelMix,
    layout: SampleLayout,
    in_: *const *const c_void,
    out: *const *mut c_void,
    frames: usize,
) {
    let (in_channels, out_channels) = (mix.in_channels(), mix.out_channels());

    match layout {
        SampleLayout::Interleaved => {
            let src = *in_ as *const T;
            let dst = *out as *mut T;
            if src.is_null() || dst.is_null() {
                return;
            }

            if src == dst as *const T {
                let buffer = slice::from_raw_parts_mut(dst, frames * in_channels.max(out_channels));
                mix.mix_in_place(buffer, frames);
            } else {
                let input = slice::from_raw_parts(src, frames * in_channels);
                let output = slice::from_raw_parts_mut(dst, frames * out_channels);
                mix.mix(input, output, frames);
            }
        }
        SampleLayout::NonInterleaved => {
            let in_planes = slice::from_raw_parts(in_, in_channels);
            let out_planes = slice::from_raw_parts(out, out_channels);
            if in_planes.iter().any(|p| p.is_null()) || out_planes.iter().any(|p| p.is_null()) {
                log::warn!("null channel plane");
                return;
            }

            let inputs: Vec<&[T]> = in_planes
                .iter()
                .map(|&p| slice::from_raw_parts(p as *const T, frames))
                .collect();
            let mut outputs: Vec<&mut [T]> = out_planes
                .iter()
                .map(|&p| slice::from_raw_parts_mut(p as *mut T, frames))
                .collect();
            mix.mix_planar(&inputs, &mut outputs, frames);
        }
    }
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Get library version string
///
/// # Safety
/// Returns a static string, safe to call.
#[no_mangle]
pub extern "C" fn channel_mix_version() -> *const c_char {
    "0.1.0\0".as_ptr() as *const c_char
}
