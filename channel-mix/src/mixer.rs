//! Channel mixer: owns the matrix for one layout pair and applies it

use crate::clamping::{clamp_f64, clamp_s32};
use crate::error::{ChannelMixError, Direction};
use crate::matrix::{MixMatrix, INT_MATRIX_FACTOR_EXPONENT};
use crate::types::{AudioFormat, ChannelLayout, ChannelPosition, MixFlags, MAX_CHANNELS};

/// Frames handed to one rayon task by [`ChannelMix::mix_parallel`]
const PARALLEL_CHUNK_FRAMES: usize = 1024;

/// Sample types the mixing engine has a numeric path for
pub trait MixSample: Copy + Default + Send + Sync + 'static {
    /// Format a mixer must be built with to accept this sample type
    const FORMAT: AudioFormat;

    /// Mix one interleaved input frame into one output frame
    fn mix_frame(matrix: &MixMatrix, input: &[Self], output: &mut [Self]);

    #[doc(hidden)]
    fn scratch(scratch: &mut FrameScratch) -> &mut [Self];
}

impl MixSample for i32 {
    const FORMAT: AudioFormat = AudioFormat::S32;

    #[inline]
    fn mix_frame(matrix: &MixMatrix, input: &[i32], output: &mut [i32]) {
        for (out_ch, slot) in output.iter_mut().enumerate() {
            let mut res: i64 = 0;
            for (in_ch, &sample) in input.iter().enumerate() {
                res += sample as i64 * matrix.weight_int(in_ch, out_ch) as i64;
            }

            // remove factor from int matrix
            *slot = clamp_s32(res >> INT_MATRIX_FACTOR_EXPONENT);
        }
    }

    fn scratch(scratch: &mut FrameScratch) -> &mut [i32] {
        &mut scratch.s32
    }
}

impl MixSample for f64 {
    const FORMAT: AudioFormat = AudioFormat::F64;

    #[inline]
    fn mix_frame(matrix: &MixMatrix, input: &[f64], output: &mut [f64]) {
        for (out_ch, slot) in output.iter_mut().enumerate() {
            let mut res = 0.0;
            for (in_ch, &sample) in input.iter().enumerate() {
                res += sample * matrix.weight(in_ch, out_ch) as f64;
            }

            *slot = clamp_f64(res);
        }
    }

    fn scratch(scratch: &mut FrameScratch) -> &mut [f64] {
        &mut scratch.f64
    }
}

/// One output frame of staging space, allocated for the mixer's format only
#[derive(Debug, Default)]
pub struct FrameScratch {
    s32: Vec<i32>,
    f64: Vec<f64>,
}

impl FrameScratch {
    fn new(format: AudioFormat, out_channels: usize) -> Self {
        match format {
            AudioFormat::S32 => Self {
                s32: vec![0; out_channels],
                f64: Vec::new(),
            },
            _ => Self {
                s32: Vec::new(),
                f64: vec![0.0; out_channels],
            },
        }
    }
}

/// Converts interleaved frames from one channel layout to another
///
/// Built once for a fixed layout pair and reused for many buffers. The
/// matrices never change after construction; the scratch frame is private
/// mutable state, so sharing one mixer across threads goes through
/// [`mix_with_scratch`](Self::mix_with_scratch) or
/// [`mix_parallel`](Self::mix_parallel).
#[derive(Debug)]
pub struct ChannelMix {
    flags: MixFlags,
    format: AudioFormat,
    in_layout: ChannelLayout,
    out_layout: ChannelLayout,
    matrix: MixMatrix,
    scratch: FrameScratch,
}

impl ChannelMix {
    /// Create a mixer converting `in_positions` into `out_positions`
    ///
    /// Fails for formats other than S32/F64 and for channel counts outside
    /// 1..=63, before anything is allocated.
    pub fn new(
        flags: MixFlags,
        format: AudioFormat,
        in_positions: &[ChannelPosition],
        out_positions: &[ChannelPosition],
    ) -> Result<Self, ChannelMixError> {
        if !format.is_mixable() {
            return Err(ChannelMixError::UnsupportedFormat(format));
        }

        let in_layout = ChannelLayout::new(Direction::Input, in_positions)?;
        let out_layout = ChannelLayout::new(Direction::Output, out_positions)?;

        let matrix = MixMatrix::build(flags, in_layout.positions(), out_layout.positions());
        log::debug!("{}", matrix);

        Ok(Self {
            flags,
            format,
            in_layout,
            out_layout,
            scratch: FrameScratch::new(format, out_layout.channels()),
            matrix,
        })
    }

    pub fn flags(&self) -> MixFlags {
        self.flags
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn in_channels(&self) -> usize {
        self.in_layout.channels()
    }

    pub fn out_channels(&self) -> usize {
        self.out_layout.channels()
    }

    pub fn in_positions(&self) -> &[ChannelPosition] {
        self.in_layout.positions()
    }

    pub fn out_positions(&self) -> &[ChannelPosition] {
        self.out_layout.positions()
    }

    pub fn matrix(&self) -> &MixMatrix {
        &self.matrix
    }

    /// Whether mixing can be skipped
    ///
    /// Only NxN conversions qualify: 1 -> 1 always (mono and unpositioned are
    /// the same here), otherwise when both layouts cover the same positions.
    /// The matrix itself is not inspected.
    pub fn is_passthrough(&self) -> bool {
        if self.in_channels() != self.out_channels() {
            return false;
        }

        if self.in_channels() == 1 {
            return true;
        }

        self.in_layout.mask() == self.out_layout.mask()
    }

    /// Mix `frames` interleaved frames from `input` into `output`
    ///
    /// # Panics
    /// If `T` does not match the mixer's format or a buffer is shorter than
    /// `frames` frames of its layout.
    pub fn mix<T: MixSample>(&mut self, input: &[T], output: &mut [T], frames: usize) {
        self.check_format::<T>();
        let scratch = T::scratch(&mut self.scratch);
        run(&self.matrix, input, output, frames, scratch);
    }

    /// Mix in place, `buffer` holds the input frames and receives the output
    ///
    /// `buffer` must fit `frames` frames of the wider layout. Upmixing walks
    /// frames last to first so no input frame is overwritten before it is read.
    ///
    /// # Panics
    /// Same conditions as [`mix`](Self::mix).
    pub fn mix_in_place<T: MixSample>(&mut self, buffer: &mut [T], frames: usize) {
        self.check_format::<T>();
        let scratch = T::scratch(&mut self.scratch);
        run_in_place(&self.matrix, buffer, frames, scratch);
    }

    /// Like [`mix`](Self::mix) with caller-owned staging space
    ///
    /// `scratch` must hold at least one output frame.
    pub fn mix_with_scratch<T: MixSample>(
        &self,
        input: &[T],
        output: &mut [T],
        frames: usize,
        scratch: &mut [T],
    ) {
        self.check_format::<T>();
        let out_channels = self.out_channels();
        assert!(
            scratch.len() >= out_channels,
            "scratch holds {} samples, need {}",
            scratch.len(),
            out_channels
        );
        run(&self.matrix, input, output, frames, &mut scratch[..out_channels]);
    }

    /// Mix non-interleaved buffers, one slice per channel
    pub fn mix_planar<T: MixSample>(
        &mut self,
        inputs: &[&[T]],
        outputs: &mut [&mut [T]],
        frames: usize,
    ) {
        self.check_format::<T>();
        let in_channels = self.in_channels();
        assert_eq!(inputs.len(), in_channels, "one input plane per channel");
        assert_eq!(outputs.len(), self.out_channels(), "one output plane per channel");
        assert!(inputs.iter().all(|plane| plane.len() >= frames));
        assert!(outputs.iter().all(|plane| plane.len() >= frames));

        let scratch = T::scratch(&mut self.scratch);
        let mut frame = [T::default(); MAX_CHANNELS];

        for n in 0..frames {
            for (slot, plane) in frame.iter_mut().zip(inputs) {
                *slot = plane[n];
            }
            T::mix_frame(&self.matrix, &frame[..in_channels], scratch);
            for (plane, &sample) in outputs.iter_mut().zip(scratch.iter()) {
                plane[n] = sample;
            }
        }
    }

    /// Mix a large out-of-place buffer on the rayon pool
    ///
    /// Frames are split into chunks, every worker stages into its own scratch
    /// frame so the mixer is only borrowed shared.
    pub fn mix_parallel<T: MixSample>(&self, input: &[T], output: &mut [T], frames: usize) {
        use rayon::prelude::*;

        self.check_format::<T>();
        let (in_channels, out_channels) = (self.in_channels(), self.out_channels());
        check_len(input.len(), frames, in_channels, "input");
        check_len(output.len(), frames, out_channels, "output");

        output[..frames * out_channels]
            .par_chunks_mut(PARALLEL_CHUNK_FRAMES * out_channels)
            .zip(input[..frames * in_channels].par_chunks(PARALLEL_CHUNK_FRAMES * in_channels))
            .for_each_init(
                || vec![T::default(); out_channels],
                |scratch, (out_chunk, in_chunk)| {
                    let chunk_frames = out_chunk.len() / out_channels;
                    run(&self.matrix, in_chunk, out_chunk, chunk_frames, scratch);
                },
            );
    }

    fn check_format<T: MixSample>(&self) {
        assert_eq!(
            T::FORMAT,
            self.format,
            "sample type does not match mixer format"
        );
    }
}

#[inline]
fn check_len(len: usize, frames: usize, channels: usize, what: &str) {
    assert!(
        len >= frames * channels,
        "{} buffer holds {} samples, need {} frames of {} channels",
        what,
        len,
        frames,
        channels
    );
}

/// Frame visited at `step`, reversed when the output is wider than the input
#[inline]
fn frame_index(step: usize, frames: usize, backwards: bool) -> usize {
    if backwards {
        frames - 1 - step
    } else {
        step
    }
}

fn run<T: MixSample>(
    matrix: &MixMatrix,
    input: &[T],
    output: &mut [T],
    frames: usize,
    scratch: &mut [T],
) {
    let (in_channels, out_channels) = (matrix.in_channels(), matrix.out_channels());
    check_len(input.len(), frames, in_channels, "input");
    check_len(output.len(), frames, out_channels, "output");

    let backwards = out_channels > in_channels;
    for step in 0..frames {
        let n = frame_index(step, frames, backwards);
        T::mix_frame(
            matrix,
            &input[n * in_channels..(n + 1) * in_channels],
            scratch,
        );
        output[n * out_channels..(n + 1) * out_channels].copy_from_slice(scratch);
    }
}

// IMPORTANT: input and output share `buffer`, frame order must never let an
// output frame overwrite input that is still to be read
fn run_in_place<T: MixSample>(
    matrix: &MixMatrix,
    buffer: &mut [T],
    frames: usize,
    scratch: &mut [T],
) {
    let (in_channels, out_channels) = (matrix.in_channels(), matrix.out_channels());
    check_len(buffer.len(), frames, in_channels.max(out_channels), "in-place");

    let backwards = out_channels > in_channels;
    for step in 0..frames {
        let n = frame_index(step, frames, backwards);
        T::mix_frame(
            matrix,
            &buffer[n * in_channels..(n + 1) * in_channels],
            scratch,
        );
        buffer[n * out_channels..(n + 1) * out_channels].copy_from_slice(scratch);
    }
}
