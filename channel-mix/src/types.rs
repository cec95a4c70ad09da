//! Channel positions, layouts, sample formats and mixer flags

use crate::error::{ChannelMixError, Direction};
use bitflags::bitflags;
use std::fmt;

/// Largest channel count a layout may carry
pub const MAX_CHANNELS: usize = 63;

/// Sample format identifiers of the host framework
///
/// Values match `GstAudioFormat`, including the explicit endianness variants.
/// Only native-endian `S32` and `F64` can be mixed; every other format is
/// rejected at construction.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Unknown = 0,
    Encoded = 1,
    S8 = 2,
    U8 = 3,
    S16Le = 4,
    S16Be = 5,
    U16Le = 6,
    U16Be = 7,
    S24_32Le = 8, // 24-bit in 32-bit words
    S24_32Be = 9,
    U24_32Le = 10,
    U24_32Be = 11,
    S32Le = 12,
    S32Be = 13,
    U32Le = 14,
    U32Be = 15,
    S24Le = 16, // Packed 24-bit
    S24Be = 17,
    U24Le = 18,
    U24Be = 19,
    S20Le = 20,
    S20Be = 21,
    U20Le = 22,
    U20Be = 23,
    S18Le = 24,
    S18Be = 25,
    U18Le = 26,
    U18Be = 27,
    F32Le = 28,
    F32Be = 29,
    F64Le = 30,
    F64Be = 31,
}

#[cfg(target_endian = "little")]
impl AudioFormat {
    pub const S16: Self = AudioFormat::S16Le;
    pub const S32: Self = AudioFormat::S32Le;
    pub const F32: Self = AudioFormat::F32Le;
    pub const F64: Self = AudioFormat::F64Le;
}

#[cfg(target_endian = "big")]
impl AudioFormat {
    pub const S16: Self = AudioFormat::S16Be;
    pub const S32: Self = AudioFormat::S32Be;
    pub const F32: Self = AudioFormat::F32Be;
    pub const F64: Self = AudioFormat::F64Be;
}

impl AudioFormat {
    /// Map a raw identifier, unknown values become `Unknown`
    pub fn from_raw(raw: u32) -> Self {
        use AudioFormat::*;

        const ALL: [AudioFormat; 32] = [
            Unknown, Encoded, S8, U8, S16Le, S16Be, U16Le, U16Be, S24_32Le, S24_32Be, U24_32Le,
            U24_32Be, S32Le, S32Be, U32Le, U32Be, S24Le, S24Be, U24Le, U24Be, S20Le, S20Be, U20Le,
            U20Be, S18Le, S18Be, U18Le, U18Be, F32Le, F32Be, F64Le, F64Be,
        ];
        ALL.get(raw as usize).copied().unwrap_or(Unknown)
    }

    /// Whether the mixing engine has a numeric path for this format
    pub fn is_mixable(self) -> bool {
        matches!(self, AudioFormat::S32 | AudioFormat::F64)
    }
}

/// Memory layout of the sample buffers handed to the mixer
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// One buffer, frames of `channels` consecutive samples
    Interleaved = 0,
    /// One buffer per channel
    NonInterleaved = 1,
}

impl SampleLayout {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(SampleLayout::Interleaved),
            1 => Some(SampleLayout::NonInterleaved),
            _ => None,
        }
    }
}

/// Semantic speaker position of one channel
///
/// Discriminants match the host framework so positions can cross the C ABI
/// unchanged.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPosition {
    /// Unpositioned channel
    None = -3,
    Mono = -2,
    Invalid = -1,
    FrontLeft = 0,
    FrontRight = 1,
    FrontCenter = 2,
    Lfe1 = 3,
    RearLeft = 4,
    RearRight = 5,
    FrontLeftOfCenter = 6,
    FrontRightOfCenter = 7,
    RearCenter = 8,
    Lfe2 = 9,
    SideLeft = 10,
    SideRight = 11,
    TopFrontLeft = 12,
    TopFrontRight = 13,
    TopFrontCenter = 14,
    TopCenter = 15,
    TopRearLeft = 16,
    TopRearRight = 17,
    TopSideLeft = 18,
    TopSideRight = 19,
    TopRearCenter = 20,
    BottomFrontCenter = 21,
    BottomFrontLeft = 22,
    BottomFrontRight = 23,
    WideLeft = 24,
    WideRight = 25,
    SurroundLeft = 26,
    SurroundRight = 27,
}

impl ChannelPosition {
    /// Map a raw identifier, unknown values become `Invalid`
    pub fn from_raw(raw: i32) -> Self {
        use ChannelPosition as P;

        match raw {
            -3 => P::None,
            -2 => P::Mono,
            0 => P::FrontLeft,
            1 => P::FrontRight,
            2 => P::FrontCenter,
            3 => P::Lfe1,
            4 => P::RearLeft,
            5 => P::RearRight,
            6 => P::FrontLeftOfCenter,
            7 => P::FrontRightOfCenter,
            8 => P::RearCenter,
            9 => P::Lfe2,
            10 => P::SideLeft,
            11 => P::SideRight,
            12 => P::TopFrontLeft,
            13 => P::TopFrontRight,
            14 => P::TopFrontCenter,
            15 => P::TopCenter,
            16 => P::TopRearLeft,
            17 => P::TopRearRight,
            18 => P::TopSideLeft,
            19 => P::TopSideRight,
            20 => P::TopRearCenter,
            21 => P::BottomFrontCenter,
            22 => P::BottomFrontLeft,
            23 => P::BottomFrontRight,
            24 => P::WideLeft,
            25 => P::WideRight,
            26 => P::SurroundLeft,
            27 => P::SurroundRight,
            _ => P::Invalid,
        }
    }

    /// Bit this position occupies in a [`ChannelMask`]
    pub fn mask_bit(self) -> u32 {
        match self {
            ChannelPosition::Mono => 61,
            ChannelPosition::None => 62,
            ChannelPosition::Invalid => 63,
            positioned => positioned as i32 as u32,
        }
    }
}

bitflags! {
    /// Set of channel positions, one fixed bit per position
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChannelMask: u64 {
        const FRONT_LEFT = 1 << 0;
        const FRONT_RIGHT = 1 << 1;
        const FRONT_CENTER = 1 << 2;
        const LFE1 = 1 << 3;
        const REAR_LEFT = 1 << 4;
        const REAR_RIGHT = 1 << 5;
        const FRONT_LEFT_OF_CENTER = 1 << 6;
        const FRONT_RIGHT_OF_CENTER = 1 << 7;
        const REAR_CENTER = 1 << 8;
        const LFE2 = 1 << 9;
        const SIDE_LEFT = 1 << 10;
        const SIDE_RIGHT = 1 << 11;
        const TOP_FRONT_LEFT = 1 << 12;
        const TOP_FRONT_RIGHT = 1 << 13;
        const TOP_FRONT_CENTER = 1 << 14;
        const TOP_CENTER = 1 << 15;
        const TOP_REAR_LEFT = 1 << 16;
        const TOP_REAR_RIGHT = 1 << 17;
        const TOP_SIDE_LEFT = 1 << 18;
        const TOP_SIDE_RIGHT = 1 << 19;
        const TOP_REAR_CENTER = 1 << 20;
        const BOTTOM_FRONT_CENTER = 1 << 21;
        const BOTTOM_FRONT_LEFT = 1 << 22;
        const BOTTOM_FRONT_RIGHT = 1 << 23;
        const WIDE_LEFT = 1 << 24;
        const WIDE_RIGHT = 1 << 25;
        const SURROUND_LEFT = 1 << 26;
        const SURROUND_RIGHT = 1 << 27;
        const MONO = 1 << 61;
        const NONE = 1 << 62;
        const INVALID = 1 << 63;
    }
}

impl ChannelMask {
    /// Union of every position in `positions`
    pub fn from_positions(positions: &[ChannelPosition]) -> Self {
        positions
            .iter()
            .fold(ChannelMask::empty(), |mask, &pos| mask | ChannelMask::from(pos))
    }
}

impl From<ChannelPosition> for ChannelMask {
    fn from(pos: ChannelPosition) -> Self {
        ChannelMask::from_bits_retain(1 << pos.mask_bit())
    }
}

bitflags! {
    /// Construction flags of a channel mixer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MixFlags: u32 {
        /// Input buffers are planar; the layout is chosen per mix call
        const NON_INTERLEAVED_IN = 1 << 0;
        /// Output buffers are planar; the layout is chosen per mix call
        const NON_INTERLEAVED_OUT = 1 << 1;
        /// Input channels carry no spatial meaning, only identical
        /// positions are connected
        const UNPOSITIONED_IN = 1 << 2;
        /// Output channels carry no spatial meaning
        const UNPOSITIONED_OUT = 1 << 3;
    }
}

/// Audio speaker layout presets
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerLayout {
    Mono = 1,
    Stereo = 2,
    TwoOne = 3,   // 2.1
    Quad = 4,     // 4.0
    FourOne = 5,  // 4.1
    FiveOne = 6,  // 5.1
    SevenOne = 8, // 7.1
}

impl SpeakerLayout {
    pub fn channel_count(self) -> usize {
        self.positions().len()
    }

    /// Channel order used by the host framework for this preset
    pub fn positions(self) -> &'static [ChannelPosition] {
        use ChannelPosition as P;

        match self {
            SpeakerLayout::Mono => &[P::Mono],
            SpeakerLayout::Stereo => &[P::FrontLeft, P::FrontRight],
            SpeakerLayout::TwoOne => &[P::FrontLeft, P::FrontRight, P::Lfe1],
            SpeakerLayout::Quad => &[P::FrontLeft, P::FrontRight, P::RearLeft, P::RearRight],
            SpeakerLayout::FourOne => &[
                P::FrontLeft,
                P::FrontRight,
                P::Lfe1,
                P::RearLeft,
                P::RearRight,
            ],
            SpeakerLayout::FiveOne => &[
                P::FrontLeft,
                P::FrontRight,
                P::FrontCenter,
                P::Lfe1,
                P::RearLeft,
                P::RearRight,
            ],
            SpeakerLayout::SevenOne => &[
                P::FrontLeft,
                P::FrontRight,
                P::FrontCenter,
                P::Lfe1,
                P::RearLeft,
                P::RearRight,
                P::SideLeft,
                P::SideRight,
            ],
        }
    }
}

/// Ordered channel positions of one side of the mixer, stored by value
#[derive(Clone, Copy)]
pub struct ChannelLayout {
    positions: [ChannelPosition; MAX_CHANNELS],
    len: usize,
}

impl ChannelLayout {
    /// Copy `positions` into a layout, rejecting 0 or more than 63 channels
    pub fn new(direction: Direction, positions: &[ChannelPosition]) -> Result<Self, ChannelMixError> {
        let len = positions.len();
        if len == 0 || len > MAX_CHANNELS {
            return Err(ChannelMixError::InvalidChannelCount {
                direction,
                count: len,
            });
        }

        let mut stored = [ChannelPosition::Invalid; MAX_CHANNELS];
        stored[..len].copy_from_slice(positions);

        Ok(Self {
            positions: stored,
            len,
        })
    }

    pub fn channels(&self) -> usize {
        self.len
    }

    pub fn positions(&self) -> &[ChannelPosition] {
        &self.positions[..self.len]
    }

    pub fn mask(&self) -> ChannelMask {
        ChannelMask::from_positions(self.positions())
    }
}

impl PartialEq for ChannelLayout {
    fn eq(&self, other: &Self) -> bool {
        self.positions() == other.positions()
    }
}

impl Eq for ChannelLayout {}

impl fmt::Debug for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.positions()).finish()
    }
}
