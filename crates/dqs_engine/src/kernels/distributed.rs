//! Distributed gate kernels.
//!
//! On the distributed path this worker's shard lies in exactly one half of
//! every block it overlaps, and the complementary half sits in the scratch
//! buffer after a shard exchange. Updates are elementwise: local offset `k`
//! pairs with the peer's offset `k`. The `rank_is_upper` flag says which
//! half this shard holds; it selects the (upper, lower) operand order and,
//! for Pauli-Y and Hadamard, the output sign.

use rayon::prelude::*;
use std::f64::consts::FRAC_1_SQRT_2;

use dqs_core::physics::{C64, Real};

use crate::state::AmpBuffer;

/// Elementwise update of the local shard from the paired shard.
fn for_each_paired<F>(local: &mut AmpBuffer, pair: &AmpBuffer, op: F)
where
    F: Fn(&mut Real, &mut Real, Real, Real) + Sync,
{
    local
        .re
        .par_iter_mut()
        .zip(local.im.par_iter_mut())
        .zip(pair.re.par_iter().zip(pair.im.par_iter()))
        .for_each(|((re, im), (&p_re, &p_im))| op(re, im, p_re, p_im));
}

/// Elementwise update carrying the local offset, for control-mask kernels.
fn for_each_paired_indexed<F>(local: &mut AmpBuffer, pair: &AmpBuffer, op: F)
where
    F: Fn(usize, &mut Real, &mut Real, Real, Real) + Sync,
{
    local
        .re
        .par_iter_mut()
        .zip(local.im.par_iter_mut())
        .zip(pair.re.par_iter().zip(pair.im.par_iter()))
        .enumerate()
        .for_each(|(offset, ((re, im), (&p_re, &p_im)))| op(offset, re, im, p_re, p_im));
}

/// Compact unitary: output = `rot1 * up + conj(rot2) * lo`, where the
/// per-shard `(rot1, rot2)` already encode which matrix row this half
/// needs. The conjugation lives here, not in the coefficient derivation.
pub fn compact_unitary(
    local: &mut AmpBuffer,
    pair: &AmpBuffer,
    rank_is_upper: bool,
    rot1: C64,
    rot2: C64,
) {
    let rot2_conj = rot2.conj();
    for_each_paired(local, pair, move |re, im, p_re, p_im| {
        let mine = C64::new(*re, *im);
        let theirs = C64::new(p_re, p_im);
        let (up, lo) = if rank_is_upper {
            (mine, theirs)
        } else {
            (theirs, mine)
        };
        let out = rot1 * up + rot2_conj * lo;
        *re = out.re;
        *im = out.im;
    });
}

/// Full-matrix unitary: output = `rot1 * up + rot2 * lo` with the matrix
/// row passed through unconjugated.
pub fn unitary(local: &mut AmpBuffer, pair: &AmpBuffer, rank_is_upper: bool, rot1: C64, rot2: C64) {
    for_each_paired(local, pair, move |re, im, p_re, p_im| {
        let mine = C64::new(*re, *im);
        let theirs = C64::new(p_re, p_im);
        let (up, lo) = if rank_is_upper {
            (mine, theirs)
        } else {
            (theirs, mine)
        };
        let out = rot1 * up + rot2 * lo;
        *re = out.re;
        *im = out.im;
    });
}

/// Compact unitary restricted to control-bit-1 amplitudes of the global
/// index. `chunk_offset` is the first global index of this shard.
pub fn controlled_compact_unitary(
    local: &mut AmpBuffer,
    pair: &AmpBuffer,
    chunk_offset: u64,
    control_mask: u64,
    rank_is_upper: bool,
    rot1: C64,
    rot2: C64,
) {
    let rot2_conj = rot2.conj();
    for_each_paired_indexed(local, pair, move |offset, re, im, p_re, p_im| {
        let global = chunk_offset + offset as u64;
        if global & control_mask != control_mask {
            return;
        }
        let mine = C64::new(*re, *im);
        let theirs = C64::new(p_re, p_im);
        let (up, lo) = if rank_is_upper {
            (mine, theirs)
        } else {
            (theirs, mine)
        };
        let out = rot1 * up + rot2_conj * lo;
        *re = out.re;
        *im = out.im;
    });
}

/// Full-matrix unitary restricted to control-bit-1 amplitudes. Serves both
/// the single-control and the multi-control dispatch (the mask is the OR of
/// all control bits).
pub fn controlled_unitary(
    local: &mut AmpBuffer,
    pair: &AmpBuffer,
    chunk_offset: u64,
    control_mask: u64,
    rank_is_upper: bool,
    rot1: C64,
    rot2: C64,
) {
    for_each_paired_indexed(local, pair, move |offset, re, im, p_re, p_im| {
        let global = chunk_offset + offset as u64;
        if global & control_mask != control_mask {
            return;
        }
        let mine = C64::new(*re, *im);
        let theirs = C64::new(p_re, p_im);
        let (up, lo) = if rank_is_upper {
            (mine, theirs)
        } else {
            (theirs, mine)
        };
        let out = rot1 * up + rot2 * lo;
        *re = out.re;
        *im = out.im;
    });
}

/// Pauli-X: replace this shard with the paired shard. No coefficients and
/// no half-dependent branch.
pub fn sigma_x(local: &mut AmpBuffer, pair: &AmpBuffer) {
    local.re.copy_from_slice(&pair.re);
    local.im.copy_from_slice(&pair.im);
}

/// Pauli-X restricted to control-bit-1 amplitudes. Like the uncontrolled
/// kernel it always reads the paired shard, regardless of half.
pub fn controlled_not(
    local: &mut AmpBuffer,
    pair: &AmpBuffer,
    chunk_offset: u64,
    control_mask: u64,
) {
    for_each_paired_indexed(local, pair, move |offset, re, im, p_re, p_im| {
        let global = chunk_offset + offset as u64;
        if global & control_mask != control_mask {
            return;
        }
        *re = p_re;
        *im = p_im;
    });
}

/// Pauli-Y: replace with the paired shard times -i (upper outputs) or +i
/// (lower outputs).
pub fn sigma_y(local: &mut AmpBuffer, pair: &AmpBuffer, rank_is_upper: bool) {
    for_each_paired(local, pair, move |re, im, p_re, p_im| {
        if rank_is_upper {
            *re = p_im;
            *im = -p_re;
        } else {
            *re = -p_im;
            *im = p_re;
        }
    });
}

/// Hadamard: `(up + lo) / sqrt(2)` on upper outputs, `(up - lo) / sqrt(2)`
/// on lower outputs.
pub fn hadamard(local: &mut AmpBuffer, pair: &AmpBuffer, rank_is_upper: bool) {
    let recip: Real = FRAC_1_SQRT_2;
    let sign: Real = if rank_is_upper { 1.0 } else { -1.0 };
    for_each_paired(local, pair, move |re, im, p_re, p_im| {
        let (up_re, up_im, lo_re, lo_im) = if rank_is_upper {
            (*re, *im, p_re, p_im)
        } else {
            (p_re, p_im, *re, *im)
        };
        *re = recip * (up_re + sign * lo_re);
        *im = recip * (up_im + sign * lo_im);
    });
}

/// Diagonal phase on a shard that lies entirely in the lower half of its
/// blocks: multiply every amplitude by `factor`.
pub fn phase(local: &mut AmpBuffer, factor: C64) {
    local
        .re
        .par_iter_mut()
        .zip(local.im.par_iter_mut())
        .for_each(|(re, im)| {
            let a = C64::new(*re, *im) * factor;
            *re = a.re;
            *im = a.im;
        });
}

/// Probability mass of the whole shard, by Kahan compensated summation.
/// Used when the shard lies entirely in the upper (bit-0) half.
pub fn find_probability_of_zero(amps: &AmpBuffer) -> Real {
    let mut total: Real = 0.0;
    let mut c: Real = 0.0;
    for index in 0..amps.len() {
        let y = amps.re[index] * amps.re[index] - c;
        let t = total + y;
        c = (t - total) - y;
        total = t;

        let y = amps.im[index] * amps.im[index] - c;
        let t = total + y;
        c = (t - total) - y;
        total = t;
    }
    total
}

/// Renormalize a shard whose half matches the collapse outcome.
pub fn collapse_renormalize(local: &mut AmpBuffer, total_prob: Real) {
    let renorm = 1.0 / total_prob.sqrt();
    local
        .re
        .par_iter_mut()
        .zip(local.im.par_iter_mut())
        .for_each(|(re, im)| {
            *re *= renorm;
            *im *= renorm;
        });
}

/// Zero a shard whose half contradicts the collapse outcome.
pub fn collapse_set_zero(local: &mut AmpBuffer) {
    local.clear();
}
