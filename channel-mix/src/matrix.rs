//! Channel conversion matrix
//!
//! The matrix is built once per layout pair by an ordered pipeline:
//! special fast paths, identical positions, compatible split/unified pairs,
//! spatial proximity between channel groups, and finally normalization.
//! Each stage only writes cells that were still zero when it began.

use crate::types::{ChannelPosition, MixFlags};
use std::fmt;

/// The fixed-point matrix holds `weight * 2^INT_MATRIX_FACTOR_EXPONENT`
pub const INT_MATRIX_FACTOR_EXPONENT: u32 = 10;

const RATIO_CENTER_FRONT: f64 = std::f64::consts::FRAC_1_SQRT_2;
const RATIO_CENTER_SIDE: f64 = 0.5;
const RATIO_CENTER_REAR: f64 = 0.353_553_390_593_273_8; // 1 / sqrt(8)

const RATIO_FRONT_SIDE: f64 = std::f64::consts::FRAC_1_SQRT_2;
const RATIO_FRONT_REAR: f64 = 0.5;

const RATIO_SIDE_REAR: f64 = std::f64::consts::FRAC_1_SQRT_2;

const RATIO_CENTER_BASS: f64 = std::f64::consts::FRAC_1_SQRT_2;
const RATIO_FRONT_BASS: f64 = 1.0;
const RATIO_SIDE_BASS: f64 = std::f64::consts::FRAC_1_SQRT_2;
const RATIO_REAR_BASS: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Split stereo-like pairs and the single channel they fold into
const COMPATIBLE_PAIRS: [(ChannelPosition, ChannelPosition, ChannelPosition); 3] = [
    (
        ChannelPosition::FrontLeft,
        ChannelPosition::FrontRight,
        ChannelPosition::Mono,
    ),
    (
        ChannelPosition::FrontLeftOfCenter,
        ChannelPosition::FrontRightOfCenter,
        ChannelPosition::FrontCenter,
    ),
    (
        ChannelPosition::RearLeft,
        ChannelPosition::RearRight,
        ChannelPosition::RearCenter,
    ),
];

/// Mixing weights, `[in_channels][out_channels]`, stored row-major
#[derive(Clone, PartialEq)]
pub struct MixMatrix {
    in_channels: usize,
    out_channels: usize,
    weights: Vec<f32>,
    weights_int: Vec<i32>,
}

impl MixMatrix {
    /// Derive the matrix for converting `in_positions` into `out_positions`
    ///
    /// Channel counts are the slice lengths. The result is deterministic and
    /// its fixed-point twin is derived from the final floating weights.
    pub fn build(
        flags: MixFlags,
        in_positions: &[ChannelPosition],
        out_positions: &[ChannelPosition],
    ) -> Self {
        let in_channels = in_positions.len();
        let out_channels = out_positions.len();

        let mut fill = Fill::new(in_channels, out_channels);
        fill_matrix(&mut fill, flags, in_positions, out_positions);

        let weights = fill.weights;
        let factor = (1u32 << INT_MATRIX_FACTOR_EXPONENT) as f32;
        // `as` truncates toward zero
        let weights_int = weights.iter().map(|&w| (w * factor) as i32).collect();

        Self {
            in_channels,
            out_channels,
            weights,
            weights_int,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Weight of input channel `input` in output channel `output`
    #[inline]
    pub fn weight(&self, input: usize, output: usize) -> f32 {
        self.weights[input * self.out_channels + output]
    }

    /// Fixed-point weight, scaled by `2^INT_MATRIX_FACTOR_EXPONENT`
    #[inline]
    pub fn weight_int(&self, input: usize, output: usize) -> i32 {
        self.weights_int[input * self.out_channels + output]
    }

    /// Weights of one input channel across all outputs
    pub fn row(&self, input: usize) -> &[f32] {
        let start = input * self.out_channels;
        &self.weights[start..start + self.out_channels]
    }

    pub fn row_int(&self, input: usize) -> &[i32] {
        let start = input * self.out_channels;
        &self.weights_int[start..start + self.out_channels]
    }

    /// Sum of absolute weights feeding `output`
    pub fn column_sum(&self, output: usize) -> f32 {
        (0..self.in_channels)
            .map(|input| self.weight(input, output).abs())
            .sum()
    }

    pub fn max_column_sum(&self) -> f32 {
        (0..self.out_channels)
            .map(|output| self.column_sum(output))
            .fold(0.0, f32::max)
    }

    /// True when no input reaches any output
    pub fn is_zero(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }
}

impl fmt::Display for MixMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix for {} -> {}: {{", self.in_channels, self.out_channels)?;
        for input in 0..self.in_channels {
            if input != 0 {
                f.write_str(",")?;
            }
            f.write_str(" {")?;
            for (output, weight) in self.row(input).iter().enumerate() {
                if output != 0 {
                    f.write_str(",")?;
                }
                write!(f, " {:.6}", weight)?;
            }
            f.write_str(" }")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Debug for MixMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Matrix under construction
///
/// `sealed` holds, per input row, the output columns written by a finished
/// stage. Writes to sealed cells are dropped.
struct Fill {
    out_channels: usize,
    weights: Vec<f32>,
    sealed: Vec<u64>,
}

impl Fill {
    fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            out_channels,
            weights: vec![0.0; in_channels * out_channels],
            sealed: vec![0; in_channels],
        }
    }

    fn set(&mut self, input: usize, output: usize, weight: f64) {
        if self.sealed[input] & (1 << output) == 0 {
            self.weights[input * self.out_channels + output] = weight as f32;
        }
    }

    /// Close the current stage, every nonzero cell becomes read-only
    fn seal(&mut self) {
        for (input, row) in self.weights.chunks(self.out_channels).enumerate() {
            for (output, &weight) in row.iter().enumerate() {
                if weight != 0.0 {
                    self.sealed[input] |= 1 << output;
                }
            }
        }
    }

    fn normalize(&mut self) {
        let top = (0..self.out_channels)
            .map(|output| {
                self.weights
                    .iter()
                    .skip(output)
                    .step_by(self.out_channels)
                    .map(|w| w.abs())
                    .sum::<f32>()
            })
            .fold(0.0f32, f32::max);

        if top == 0.0 {
            log::trace!("matrix is silent, skipping normalization");
            return;
        }

        for weight in self.weights.iter_mut() {
            *weight /= top;
        }
    }
}

fn fill_matrix(
    fill: &mut Fill,
    flags: MixFlags,
    in_positions: &[ChannelPosition],
    out_positions: &[ChannelPosition],
) {
    if fill_special(fill, in_positions, out_positions) {
        log::trace!("mono/stereo fast path");
        return;
    }

    fill_identical(fill, in_positions, out_positions);
    fill.seal();

    if flags.contains(MixFlags::UNPOSITIONED_IN) {
        log::trace!("unpositioned input, only identical channels connected");
        return;
    }

    fill_compatible(fill, in_positions, out_positions);
    fill.seal();

    fill_others(
        fill,
        &Groups::detect(in_positions),
        &Groups::detect(out_positions),
    );
    fill.normalize();
}

fn is_stereo(positions: &[ChannelPosition]) -> bool {
    use ChannelPosition as P;

    matches!(
        positions,
        [P::FrontLeft, P::FrontRight] | [P::FrontRight, P::FrontLeft]
    )
}

fn fill_special(
    fill: &mut Fill,
    in_positions: &[ChannelPosition],
    out_positions: &[ChannelPosition],
) -> bool {
    if is_stereo(in_positions) && out_positions == [ChannelPosition::Mono] {
        fill.set(0, 0, 0.5);
        fill.set(1, 0, 0.5);
        true
    } else if in_positions == [ChannelPosition::Mono] && is_stereo(out_positions) {
        fill.set(0, 0, 1.0);
        fill.set(0, 1, 1.0);
        true
    } else {
        false
    }
}

/// Forward channels present on both sides, e.g. front left/right in 5.1 to 2.0
fn fill_identical(
    fill: &mut Fill,
    in_positions: &[ChannelPosition],
    out_positions: &[ChannelPosition],
) {
    for (output, out_pos) in out_positions.iter().enumerate() {
        for (input, in_pos) in in_positions.iter().enumerate() {
            if in_pos == out_pos {
                fill.set(input, output, 1.0);
            }
        }
    }
}

/// Channel indices of one split/unified pair within a layout
#[derive(Default)]
struct PairSlots {
    left: Option<usize>,
    right: Option<usize>,
    unified: Option<usize>,
}

impl PairSlots {
    fn detect(
        positions: &[ChannelPosition],
        (left, right, unified): (ChannelPosition, ChannelPosition, ChannelPosition),
    ) -> Self {
        let mut slots = PairSlots::default();
        for (idx, &pos) in positions.iter().enumerate() {
            if pos == left {
                slots.left = Some(idx);
            } else if pos == right {
                slots.right = Some(idx);
            } else if pos == unified {
                slots.unified = Some(idx);
            }
        }
        slots
    }
}

/// Weight for routing `src` into `dst` across a split/unified pair
///
/// `src_peer` is the source's channel at the destination's position and
/// `dst_peer` the destination's channel at the source's position.
fn compatible_weight(
    src: Option<usize>,
    src_peer: Option<usize>,
    dst_peer: Option<usize>,
    dst: Option<usize>,
) -> Option<(usize, usize, f64)> {
    let (src, dst) = (src?, dst?);
    match (src_peer, dst_peer) {
        (None, _) => Some((src, dst, 1.0)),
        (Some(_), None) => Some((src, dst, 0.5)),
        (Some(_), Some(_)) => None,
    }
}

/// Fold left/right into their unified channel and back, e.g. stereo to mono
fn fill_compatible(
    fill: &mut Fill,
    in_positions: &[ChannelPosition],
    out_positions: &[ChannelPosition],
) {
    for pair in COMPATIBLE_PAIRS {
        let from = PairSlots::detect(in_positions, pair);
        let to = PairSlots::detect(out_positions, pair);

        let routes = [
            // left -> unified
            compatible_weight(from.left, from.unified, to.left, to.unified),
            // right -> unified
            compatible_weight(from.right, from.unified, to.right, to.unified),
            // unified -> left
            compatible_weight(from.unified, from.left, to.unified, to.left),
            // unified -> right
            compatible_weight(from.unified, from.right, to.unified, to.right),
        ];

        for (input, output, weight) in routes.into_iter().flatten() {
            fill.set(input, output, weight);
        }
    }
}

/// Left, center and right channel of one spatial group
#[derive(Default, Clone, Copy)]
struct Group {
    left: Option<usize>,
    center: Option<usize>,
    right: Option<usize>,
}

impl Group {
    fn present(&self) -> bool {
        self.left.is_some() || self.center.is_some() || self.right.is_some()
    }
}

#[derive(Default)]
struct Groups {
    front: Group,
    center: Group,
    rear: Group,
    side: Group,
    bass: Group,
}

impl Groups {
    fn detect(positions: &[ChannelPosition]) -> Self {
        use ChannelPosition as P;

        let mut groups = Groups::default();
        for (idx, &pos) in positions.iter().enumerate() {
            let slot = match pos {
                P::FrontLeft => &mut groups.front.left,
                P::Mono => &mut groups.front.center,
                P::FrontRight => &mut groups.front.right,
                P::FrontLeftOfCenter => &mut groups.center.left,
                P::FrontCenter => &mut groups.center.center,
                P::FrontRightOfCenter => &mut groups.center.right,
                P::RearLeft => &mut groups.rear.left,
                P::RearCenter => &mut groups.rear.center,
                P::RearRight => &mut groups.rear.right,
                P::SideLeft => &mut groups.side.left,
                P::SideRight => &mut groups.side.right,
                P::Lfe1 => &mut groups.bass.center,
                _ => continue,
            };
            *slot = Some(idx);
        }
        groups
    }
}

/// Route one group into another, matching left/center/right slots
fn fill_one_other(fill: &mut Fill, from: &Group, to: &Group, ratio: f64) {
    let mut route = |input: Option<usize>, output: Option<usize>, weight: f64| {
        if let (Some(input), Some(output)) = (input, output) {
            fill.set(input, output, weight);
        }
    };

    route(from.center, to.center, ratio);
    route(from.left, to.left, ratio);
    route(from.right, to.right, ratio);

    // sides fold into a center slot, halved when the source has its own center
    let into_center = if from.center.is_some() { 0.5 * ratio } else { ratio };
    route(from.left, to.center, into_center);
    route(from.right, to.center, into_center);

    // center spreads into a side slot, halved when the source has that side
    let into_left = if from.left.is_some() { 0.5 * ratio } else { ratio };
    route(from.center, to.left, into_left);
    let into_right = if from.right.is_some() { 0.5 * ratio } else { ratio };
    route(from.center, to.right, into_right);
}

/// Mix groups missing on one side into the nearest group on the other
///
/// The ratio drops as the distance between the groups grows. Blocks run in
/// order and a later block may revise what an earlier one wrote.
fn fill_others(fill: &mut Fill, from: &Groups, to: &Groups) {
    let (in_f, in_c, in_r, in_s, in_b) = (
        from.front.present(),
        from.center.present(),
        from.rear.present(),
        from.side.present(),
        from.bass.present(),
    );
    let (out_f, out_c, out_r, out_s, out_b) = (
        to.front.present(),
        to.center.present(),
        to.rear.present(),
        to.side.present(),
        to.bass.present(),
    );

    // center <-> front/side/rear
    if !in_c && in_f && out_c {
        fill_one_other(fill, &from.front, &to.center, RATIO_CENTER_FRONT);
    } else if !in_c && !in_f && in_s && out_c {
        fill_one_other(fill, &from.side, &to.center, RATIO_CENTER_SIDE);
    } else if !in_c && !in_f && !in_s && in_r && out_c {
        fill_one_other(fill, &from.rear, &to.center, RATIO_CENTER_REAR);
    } else if in_c && !out_c && out_f {
        fill_one_other(fill, &from.center, &to.front, RATIO_CENTER_FRONT);
    } else if in_c && !out_c && !out_f && out_s {
        fill_one_other(fill, &from.center, &to.side, RATIO_CENTER_SIDE);
    } else if in_c && !out_c && !out_f && !out_s && out_r {
        fill_one_other(fill, &from.center, &to.rear, RATIO_CENTER_REAR);
    }

    // front <-> center/side/rear
    if !in_f && in_c && !in_s && out_f {
        fill_one_other(fill, &from.center, &to.front, RATIO_CENTER_FRONT);
    } else if !in_f && !in_c && in_s && out_f {
        fill_one_other(fill, &from.side, &to.front, RATIO_FRONT_SIDE);
    } else if !in_f && in_c && in_s && out_f {
        fill_one_other(fill, &from.center, &to.front, 0.5 * RATIO_CENTER_FRONT);
        fill_one_other(fill, &from.side, &to.front, 0.5 * RATIO_FRONT_SIDE);
    } else if !in_f && !in_c && !in_s && in_r && out_f {
        fill_one_other(fill, &from.rear, &to.front, RATIO_FRONT_REAR);
    } else if in_f && out_c && !out_s && !out_f {
        fill_one_other(fill, &from.front, &to.center, RATIO_CENTER_FRONT);
    } else if in_f && !out_c && out_s && !out_f {
        fill_one_other(fill, &from.front, &to.side, RATIO_FRONT_SIDE);
    } else if in_f && out_c && out_s && !out_f {
        fill_one_other(fill, &from.front, &to.center, 0.5 * RATIO_CENTER_FRONT);
        fill_one_other(fill, &from.front, &to.side, 0.5 * RATIO_FRONT_SIDE);
    } else if in_f && !out_c && !out_s && !out_f && out_r {
        fill_one_other(fill, &from.front, &to.rear, RATIO_FRONT_REAR);
    }

    // side <-> center/front/rear
    if !in_s && in_f && !in_r && out_s {
        fill_one_other(fill, &from.front, &to.side, RATIO_FRONT_SIDE);
    } else if !in_s && !in_f && in_r && out_s {
        fill_one_other(fill, &from.rear, &to.side, RATIO_SIDE_REAR);
    } else if !in_s && in_f && in_r && out_s {
        fill_one_other(fill, &from.front, &to.side, 0.5 * RATIO_FRONT_SIDE);
        fill_one_other(fill, &from.rear, &to.side, 0.5 * RATIO_SIDE_REAR);
    } else if !in_s && !in_f && !in_r && in_c && out_s {
        fill_one_other(fill, &from.center, &to.side, RATIO_CENTER_SIDE);
    } else if in_s && out_f && !out_r && !out_s {
        fill_one_other(fill, &from.side, &to.front, RATIO_FRONT_SIDE);
    } else if in_s && !out_f && out_r && !out_s {
        fill_one_other(fill, &from.side, &to.rear, RATIO_SIDE_REAR);
    } else if in_s && out_f && out_r && !out_s {
        fill_one_other(fill, &from.side, &to.front, 0.5 * RATIO_FRONT_SIDE);
        fill_one_other(fill, &from.side, &to.rear, 0.5 * RATIO_SIDE_REAR);
    } else if in_s && !out_f && !out_r && out_c && !out_s {
        fill_one_other(fill, &from.side, &to.center, RATIO_CENTER_SIDE);
    }

    // rear <-> center/front/side
    if !in_r && in_s && out_r {
        fill_one_other(fill, &from.side, &to.rear, RATIO_SIDE_REAR);
    } else if !in_r && !in_s && in_f && out_r {
        fill_one_other(fill, &from.front, &to.rear, RATIO_FRONT_REAR);
    } else if !in_r && !in_s && !in_f && in_c && out_r {
        fill_one_other(fill, &from.center, &to.rear, RATIO_CENTER_REAR);
    } else if in_r && !out_r && out_s {
        fill_one_other(fill, &from.rear, &to.side, RATIO_SIDE_REAR);
    } else if in_r && !out_r && !out_s && out_f {
        fill_one_other(fill, &from.rear, &to.front, RATIO_FRONT_REAR);
    } else if in_r && !out_r && !out_s && !out_f && out_c {
        fill_one_other(fill, &from.rear, &to.center, RATIO_CENTER_REAR);
    }

    // bass <-> any
    if in_b && !out_b {
        if out_c {
            fill_one_other(fill, &from.bass, &to.center, RATIO_CENTER_BASS);
        }
        if out_f {
            fill_one_other(fill, &from.bass, &to.front, RATIO_FRONT_BASS);
        }
        if out_s {
            fill_one_other(fill, &from.bass, &to.side, RATIO_SIDE_BASS);
        }
        if out_r {
            fill_one_other(fill, &from.bass, &to.rear, RATIO_REAR_BASS);
        }
    } else if !in_b && out_b {
        if in_c {
            fill_one_other(fill, &from.center, &to.bass, RATIO_CENTER_BASS);
        }
        if in_f {
            fill_one_other(fill, &from.front, &to.bass, RATIO_FRONT_BASS);
        }
        // side feeds bass at the rear ratio
        if in_s {
            fill_one_other(fill, &from.side, &to.bass, RATIO_REAR_BASS);
        }
        if in_r {
            fill_one_other(fill, &from.rear, &to.bass, RATIO_REAR_BASS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeakerLayout;
    use ChannelPosition as P;

    const EPS: f32 = 1e-6;

    fn build(input: &[ChannelPosition], output: &[ChannelPosition]) -> MixMatrix {
        MixMatrix::build(MixFlags::empty(), input, output)
    }

    fn assert_weight(m: &MixMatrix, input: usize, output: usize, expected: f32) {
        let actual = m.weight(input, output);
        assert!(
            (actual - expected).abs() < EPS,
            "weight[{}][{}] = {}, expected {} in {}",
            input,
            output,
            actual,
            expected,
            m
        );
    }

    #[test]
    fn test_stereo_to_mono_fast_path() {
        for input in [[P::FrontLeft, P::FrontRight], [P::FrontRight, P::FrontLeft]] {
            let m = build(&input, &[P::Mono]);
            assert_eq!(m.row(0), &[0.5]);
            assert_eq!(m.row(1), &[0.5]);
        }
    }

    #[test]
    fn test_mono_to_stereo_fast_path() {
        let m = build(&[P::Mono], &[P::FrontLeft, P::FrontRight]);
        assert_eq!(m.row(0), &[1.0, 1.0]);

        let m = build(&[P::Mono], &[P::FrontRight, P::FrontLeft]);
        assert_eq!(m.row(0), &[1.0, 1.0]);
    }

    #[test]
    fn test_fast_path_ignores_unpositioned_flag() {
        let m = MixMatrix::build(
            MixFlags::UNPOSITIONED_IN,
            &[P::FrontLeft, P::FrontRight],
            &[P::Mono],
        );
        assert_eq!(m.row(0), &[0.5]);
        assert_eq!(m.row(1), &[0.5]);
    }

    #[test]
    fn test_identity_for_same_layout() {
        let layout = SpeakerLayout::SevenOne.positions();
        let m = build(layout, layout);

        for input in 0..layout.len() {
            for output in 0..layout.len() {
                let expected = if input == output { 1.0 } else { 0.0 };
                assert_weight(&m, input, output, expected);
            }
        }
        assert_eq!(m.weight_int(3, 3), 1024);
    }

    #[test]
    fn test_five_one_to_stereo() {
        let m = build(
            SpeakerLayout::FiveOne.positions(),
            SpeakerLayout::Stereo.positions(),
        );

        let direct = m.weight(0, 0);
        assert!(direct > 0.0);

        // center at 1/sqrt(2) into both fronts
        assert_weight(&m, 2, 0, direct * std::f32::consts::FRAC_1_SQRT_2);
        assert_weight(&m, 2, 1, direct * std::f32::consts::FRAC_1_SQRT_2);
        // bass at unity into both fronts
        assert_weight(&m, 3, 0, direct);
        assert_weight(&m, 3, 1, direct);
        // rear pairs up with its own side only
        assert_weight(&m, 4, 0, direct * 0.5);
        assert_weight(&m, 4, 1, 0.0);
        assert_weight(&m, 5, 1, direct * 0.5);
        assert_weight(&m, 1, 0, 0.0);

        assert!((m.max_column_sum() - 1.0).abs() < EPS);
        assert!((m.column_sum(0) - m.column_sum(1)).abs() < EPS);
    }

    #[test]
    fn test_stereo_to_stereo_plus_mono_uses_compatible_fill() {
        let m = build(
            &[P::FrontLeft, P::FrontRight],
            &[P::FrontLeft, P::FrontRight, P::Mono],
        );

        // mono column sums to 2 before normalization
        assert_weight(&m, 0, 0, 0.5);
        assert_weight(&m, 0, 2, 0.5);
        assert_weight(&m, 1, 1, 0.5);
        assert_weight(&m, 1, 2, 0.5);
        assert_weight(&m, 0, 1, 0.0);
    }

    #[test]
    fn test_rear_pair_folds_into_rear_center() {
        let m = build(&[P::RearLeft, P::RearRight], &[P::RearCenter]);
        assert_weight(&m, 0, 0, 0.5);
        assert_weight(&m, 1, 0, 0.5);
    }

    #[test]
    fn test_compatible_halves_when_source_has_both() {
        // left/right plus front center into front center and nothing else
        let m = build(
            &[P::FrontLeftOfCenter, P::FrontRightOfCenter, P::FrontCenter],
            &[P::FrontCenter],
        );
        // identical 1.0 plus two halves, normalized by 2
        assert_weight(&m, 2, 0, 0.5);
        assert_weight(&m, 0, 0, 0.25);
        assert_weight(&m, 1, 0, 0.25);
    }

    #[test]
    fn test_center_spreads_into_stereo() {
        let m = build(&[P::FrontCenter], &[P::FrontLeft, P::FrontRight]);
        // single source row, normalized to full scale
        assert_weight(&m, 0, 0, 1.0);
        assert_weight(&m, 0, 1, 1.0);
    }

    #[test]
    fn test_later_block_halves_center_when_sides_present() {
        let m = build(
            &[P::FrontCenter, P::SideLeft, P::SideRight],
            &[P::FrontLeft, P::FrontRight],
        );

        let center = m.weight(0, 0);
        let side = m.weight(1, 0);
        // center halved by the front block, side restored to full by the side block
        assert!((side / center - 2.0).abs() < 1e-5, "{}", m);
        assert_weight(&m, 2, 0, 0.0);
        assert!((m.max_column_sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_stereo_upmix_to_five_one() {
        let m = build(
            SpeakerLayout::Stereo.positions(),
            SpeakerLayout::FiveOne.positions(),
        );

        // left reaches its own rear channel but not the opposite one
        assert!(m.weight(0, 4) > 0.0);
        assert_weight(&m, 0, 5, 0.0);
        // both fronts feed center and bass
        assert!(m.weight(0, 2) > 0.0);
        assert!((m.weight(0, 2) - m.weight(1, 2)).abs() < EPS);
        assert!(m.weight(0, 3) > 0.0);
        assert!((m.max_column_sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_side_to_bass_uses_rear_ratio() {
        let m = build(&[P::SideLeft, P::SideRight], &[P::Lfe1]);
        // both sides at the same ratio, normalized together
        assert_weight(&m, 0, 0, 0.5);
        assert_weight(&m, 1, 0, 0.5);
    }

    #[test]
    fn test_unpositioned_connects_identical_only() {
        let m = MixMatrix::build(
            MixFlags::UNPOSITIONED_IN,
            &[P::FrontLeft, P::FrontRight, P::FrontCenter],
            &[P::FrontLeft, P::FrontRight],
        );
        assert_weight(&m, 0, 0, 1.0);
        assert_weight(&m, 1, 1, 1.0);
        assert_weight(&m, 2, 0, 0.0);
        assert_weight(&m, 2, 1, 0.0);
    }

    #[test]
    fn test_unpositioned_disjoint_is_silent() {
        let m = MixMatrix::build(
            MixFlags::UNPOSITIONED_IN,
            &[P::None, P::None],
            &[P::FrontLeft, P::FrontRight],
        );
        assert!(m.is_zero());
        assert!(m.row_int(0).iter().chain(m.row_int(1)).all(|&w| w == 0));
    }

    #[test]
    fn test_normalization_skips_silent_matrix() {
        let m = build(&[P::TopCenter], &[P::FrontLeft]);
        assert!(m.is_zero());
        assert_eq!(m.max_column_sum(), 0.0);
    }

    #[test]
    fn test_duplicates_all_connected() {
        let m = MixMatrix::build(
            MixFlags::UNPOSITIONED_IN,
            &[P::None, P::None],
            &[P::None],
        );
        assert_eq!(m.row(0), &[1.0]);
        assert_eq!(m.row(1), &[1.0]);
    }

    #[test]
    fn test_fixed_point_truncates_toward_zero() {
        let m = build(
            SpeakerLayout::FiveOne.positions(),
            SpeakerLayout::Stereo.positions(),
        );
        for input in 0..m.in_channels() {
            for output in 0..m.out_channels() {
                let expected = (m.weight(input, output) * 1024.0) as i32;
                assert_eq!(m.weight_int(input, output), expected);
                assert!(m.weight_int(input, output) as f32 <= m.weight(input, output) * 1024.0);
            }
        }
    }

    #[test]
    fn test_sealed_cells_keep_their_weight() {
        let mut fill = Fill::new(2, 2);
        fill.set(0, 0, 1.0);
        fill.seal();

        fill.set(0, 0, 0.25);
        fill.set(1, 0, 0.25);
        fill.set(1, 0, 0.5);

        assert_eq!(fill.weights, vec![1.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build(
            SpeakerLayout::SevenOne.positions(),
            SpeakerLayout::TwoOne.positions(),
        );
        let b = build(
            SpeakerLayout::SevenOne.positions(),
            SpeakerLayout::TwoOne.positions(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_format() {
        let m = build(&[P::FrontLeft, P::FrontRight], &[P::Mono]);
        assert_eq!(m.to_string(), "Matrix for 2 -> 1: { { 0.500000 }, { 0.500000 } }");
    }
}
