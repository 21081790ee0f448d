//! Local gate kernels.
//!
//! On the local path the shard is a whole number of blocks of
//! `2^(target+1)` amplitudes, so each kernel pairs offset `k` with
//! `k + 2^target` inside every block. Blocks are independent and are
//! processed in parallel.

use rayon::prelude::*;
use std::f64::consts::FRAC_1_SQRT_2;

use dqs_core::physics::{C64, Matrix2x2, Real};

use crate::state::AmpBuffer;

/// Applies `op` to the (upper, lower) half-pair of every block.
///
/// `op` receives the block's start offset within the shard and the four
/// component slices (upper re/im, lower re/im), each `2^target` long.
fn for_each_block_pair<F>(amps: &mut AmpBuffer, target: usize, op: F)
where
    F: Fn(usize, &mut [Real], &mut [Real], &mut [Real], &mut [Real]) + Sync,
{
    let size_half_block = 1usize << target;
    let size_block = 2 * size_half_block;
    amps.re
        .par_chunks_mut(size_block)
        .zip(amps.im.par_chunks_mut(size_block))
        .enumerate()
        .for_each(|(block, (re_block, im_block))| {
            let (re_up, re_lo) = re_block.split_at_mut(size_half_block);
            let (im_up, im_lo) = im_block.split_at_mut(size_half_block);
            op(block * size_block, re_up, im_up, re_lo, im_lo);
        });
}

/// General one-qubit unitary `u`.
pub fn unitary(amps: &mut AmpBuffer, target: usize, u: &Matrix2x2) {
    let u = *u;
    for_each_block_pair(amps, target, move |_, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let up = C64::new(re_up[k], im_up[k]);
            let lo = C64::new(re_lo[k], im_lo[k]);
            let new_up = u[0][0] * up + u[0][1] * lo;
            let new_lo = u[1][0] * up + u[1][1] * lo;
            re_up[k] = new_up.re;
            im_up[k] = new_up.im;
            re_lo[k] = new_lo.re;
            im_lo[k] = new_lo.im;
        }
    });
}

/// Compact unitary `[[alpha, -conj(beta)], [beta, conj(alpha)]]`.
pub fn compact_unitary(amps: &mut AmpBuffer, target: usize, alpha: C64, beta: C64) {
    for_each_block_pair(amps, target, move |_, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let up = C64::new(re_up[k], im_up[k]);
            let lo = C64::new(re_lo[k], im_lo[k]);
            let new_up = alpha * up - beta.conj() * lo;
            let new_lo = beta * up + alpha.conj() * lo;
            re_up[k] = new_up.re;
            im_up[k] = new_up.im;
            re_lo[k] = new_lo.re;
            im_lo[k] = new_lo.im;
        }
    });
}

/// General unitary restricted to amplitudes whose control bits (of the
/// global index) are all 1. Control bits never include the target bit, so
/// the predicate is evaluated once per pair on the upper index.
pub fn controlled_unitary(
    amps: &mut AmpBuffer,
    chunk_offset: u64,
    target: usize,
    control_mask: u64,
    u: &Matrix2x2,
) {
    let u = *u;
    for_each_block_pair(amps, target, move |base, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let global = chunk_offset + (base + k) as u64;
            if global & control_mask != control_mask {
                continue;
            }
            let up = C64::new(re_up[k], im_up[k]);
            let lo = C64::new(re_lo[k], im_lo[k]);
            let new_up = u[0][0] * up + u[0][1] * lo;
            let new_lo = u[1][0] * up + u[1][1] * lo;
            re_up[k] = new_up.re;
            im_up[k] = new_up.im;
            re_lo[k] = new_lo.re;
            im_lo[k] = new_lo.im;
        }
    });
}

/// Compact unitary restricted to control-bit-1 amplitudes.
pub fn controlled_compact_unitary(
    amps: &mut AmpBuffer,
    chunk_offset: u64,
    target: usize,
    control_mask: u64,
    alpha: C64,
    beta: C64,
) {
    for_each_block_pair(amps, target, move |base, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let global = chunk_offset + (base + k) as u64;
            if global & control_mask != control_mask {
                continue;
            }
            let up = C64::new(re_up[k], im_up[k]);
            let lo = C64::new(re_lo[k], im_lo[k]);
            let new_up = alpha * up - beta.conj() * lo;
            let new_lo = beta * up + alpha.conj() * lo;
            re_up[k] = new_up.re;
            im_up[k] = new_up.im;
            re_lo[k] = new_lo.re;
            im_lo[k] = new_lo.im;
        }
    });
}

/// Pauli-X: swap the two halves of every block.
pub fn sigma_x(amps: &mut AmpBuffer, target: usize) {
    for_each_block_pair(amps, target, |_, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            std::mem::swap(&mut re_up[k], &mut re_lo[k]);
            std::mem::swap(&mut im_up[k], &mut im_lo[k]);
        }
    });
}

/// Pauli-Y: swap the halves with phases -i (upper) and +i (lower).
pub fn sigma_y(amps: &mut AmpBuffer, target: usize) {
    for_each_block_pair(amps, target, |_, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let (r_up, i_up) = (re_up[k], im_up[k]);
            let (r_lo, i_lo) = (re_lo[k], im_lo[k]);
            // new upper = -i * lower, new lower = i * upper
            re_up[k] = i_lo;
            im_up[k] = -r_lo;
            re_lo[k] = -i_up;
            im_lo[k] = r_up;
        }
    });
}

/// Pauli-X restricted to control-bit-1 amplitudes.
pub fn controlled_not(amps: &mut AmpBuffer, chunk_offset: u64, target: usize, control_mask: u64) {
    for_each_block_pair(amps, target, move |base, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let global = chunk_offset + (base + k) as u64;
            if global & control_mask != control_mask {
                continue;
            }
            std::mem::swap(&mut re_up[k], &mut re_lo[k]);
            std::mem::swap(&mut im_up[k], &mut im_lo[k]);
        }
    });
}

/// Hadamard: mix the halves as `(up ± lo) / sqrt(2)`.
pub fn hadamard(amps: &mut AmpBuffer, target: usize) {
    let recip: Real = FRAC_1_SQRT_2;
    for_each_block_pair(amps, target, move |_, re_up, im_up, re_lo, im_lo| {
        for k in 0..re_up.len() {
            let (r_up, i_up) = (re_up[k], im_up[k]);
            let (r_lo, i_lo) = (re_lo[k], im_lo[k]);
            re_up[k] = recip * (r_up + r_lo);
            im_up[k] = recip * (i_up + i_lo);
            re_lo[k] = recip * (r_up - r_lo);
            im_lo[k] = recip * (i_up - i_lo);
        }
    });
}

/// Diagonal phase: multiply every lower-half (bit-1) amplitude by `factor`.
pub fn phase(amps: &mut AmpBuffer, target: usize, factor: C64) {
    for_each_block_pair(amps, target, move |_, _re_up, _im_up, re_lo, im_lo| {
        for k in 0..re_lo.len() {
            let lo = C64::new(re_lo[k], im_lo[k]) * factor;
            re_lo[k] = lo.re;
            im_lo[k] = lo.im;
        }
    });
}

/// Probability mass of the upper (bit-0) halves of this shard, by Kahan
/// compensated summation. Sequential so every worker feeds the reduction a
/// deterministic value.
pub fn find_probability_of_zero(amps: &AmpBuffer, target: usize) -> Real {
    let size_half_block = 1usize << target;
    let size_block = 2 * size_half_block;
    let num_blocks = amps.len() / size_block;

    let mut total: Real = 0.0;
    let mut c: Real = 0.0;
    for block in 0..num_blocks {
        let base = block * size_block;
        for k in 0..size_half_block {
            let index = base + k;
            let y = amps.re[index] * amps.re[index] - c;
            let t = total + y;
            c = (t - total) - y;
            total = t;

            let y = amps.im[index] * amps.im[index] - c;
            let t = total + y;
            c = (t - total) - y;
            total = t;
        }
    }
    total
}

/// Project onto `outcome` and renormalize: amplitudes in the matching half
/// are divided by `sqrt(total_prob)`, the others are zeroed.
pub fn collapse_to_outcome(amps: &mut AmpBuffer, target: usize, outcome: u8, total_prob: Real) {
    let renorm = 1.0 / total_prob.sqrt();
    for_each_block_pair(amps, target, move |_, re_up, im_up, re_lo, im_lo| {
        let (keep_re, keep_im, zero_re, zero_im) = if outcome == 0 {
            (re_up, im_up, re_lo, im_lo)
        } else {
            (re_lo, im_lo, re_up, im_up)
        };
        for k in 0..keep_re.len() {
            keep_re[k] *= renorm;
            keep_im[k] *= renorm;
        }
        zero_re.fill(0.0);
        zero_im.fill(0.0);
    });
}
