//! Gate dispatch.
//!
//! Every one-qubit (optionally controlled) unitary follows one template:
//! validate, test whether the target's half-block fits inside the shard,
//! and either run the local kernel or derive per-shard coefficients from
//! the upper/lower predicate, exchange shards with the peer holding the
//! complementary half, and run the distributed kernel. The predicate is
//! computed once and threaded everywhere it matters: coefficient choice,
//! peer selection, and the σY/Hadamard kernel sign.

use tracing::trace;

use dqs_core::physics::{self, Matrix2x2, PhaseKind, C64, REAL_EPS};
use dqs_core::{Result, SimError};

use crate::env::SimEnv;
use crate::exchange;
use crate::index;
use crate::kernels::{distributed, local};
use crate::state::{AmpBuffer, ShardedState};

/// Per-shard coefficients for the compact form: the matrix row this half
/// produces, with the conjugation of `rot2` left to the distributed kernel.
fn rotation_coefficients(rank_is_upper: bool, alpha: C64, beta: C64) -> (C64, C64) {
    if rank_is_upper {
        (alpha, -beta)
    } else {
        (beta, alpha)
    }
}

/// Per-shard coefficients from a full matrix: the row this half produces,
/// unconjugated.
fn rotation_coefficients_from_matrix(rank_is_upper: bool, u: &Matrix2x2) -> (C64, C64) {
    if rank_is_upper {
        (u[0][0], u[0][1])
    } else {
        (u[1][0], u[1][1])
    }
}

fn validate_unitary(u: &Matrix2x2) -> Result<()> {
    if physics::is_unitary_2x2(u, REAL_EPS) {
        Ok(())
    } else {
        Err(SimError::MatrixNotUnitary)
    }
}

fn validate_compact_pair(alpha: C64, beta: C64) -> Result<()> {
    if physics::is_valid_compact_pair(alpha, beta, REAL_EPS) {
        Ok(())
    } else {
        Err(SimError::InvalidCompactPair(
            alpha.norm_sqr() + beta.norm_sqr(),
        ))
    }
}

impl ShardedState {
    pub(crate) fn validate_target(&self, target: usize) -> Result<()> {
        if target >= self.num_qubits() {
            Err(SimError::TargetOutOfRange(target, self.num_qubits()))
        } else {
            Ok(())
        }
    }

    fn validate_control(&self, control: usize, target: usize) -> Result<()> {
        if control >= self.num_qubits() {
            return Err(SimError::ControlOutOfRange(control, self.num_qubits()));
        }
        if control == target {
            return Err(SimError::ControlConflictsTarget(target));
        }
        Ok(())
    }

    /// First global index of this worker's shard.
    pub(crate) fn chunk_offset(&self) -> u64 {
        self.chunk_id() as u64 * self.amps_per_chunk() as u64
    }

    /// Shared gate template. The distributed kernel receives the shard, the
    /// exchanged peer shard, and the upper/lower predicate.
    fn dispatch<L, D>(&mut self, env: &SimEnv, target: usize, local_kernel: L, distributed_kernel: D)
    where
        L: FnOnce(&mut AmpBuffer),
        D: FnOnce(&mut AmpBuffer, &AmpBuffer, bool),
    {
        if index::half_block_fits_in_chunk(self.amps_per_chunk(), target) {
            local_kernel(&mut self.amps);
        } else {
            let rank_is_upper =
                index::chunk_is_upper(self.chunk_id(), self.amps_per_chunk(), target);
            let pair_rank =
                index::chunk_pair_id(rank_is_upper, self.chunk_id(), self.amps_per_chunk(), target);
            trace!(target, rank_is_upper, pair_rank, "distributed gate path");
            exchange::exchange_shards(self, env, pair_rank);
            let (amps, pair) = self.shard_mut_and_pair();
            distributed_kernel(amps, pair, rank_is_upper);
        }
    }

    /// Applies the compact unitary `[[alpha, -conj(beta)], [beta,
    /// conj(alpha)]]` to `target`.
    pub fn compact_unitary(
        &mut self,
        env: &SimEnv,
        target: usize,
        alpha: C64,
        beta: C64,
    ) -> Result<()> {
        self.validate_target(target)?;
        validate_compact_pair(alpha, beta)?;

        self.dispatch(
            env,
            target,
            |amps| local::compact_unitary(amps, target, alpha, beta),
            |amps, pair, rank_is_upper| {
                let (rot1, rot2) = rotation_coefficients(rank_is_upper, alpha, beta);
                distributed::compact_unitary(amps, pair, rank_is_upper, rot1, rot2);
            },
        );
        Ok(())
    }

    /// Applies an arbitrary one-qubit unitary to `target`.
    pub fn unitary(&mut self, env: &SimEnv, target: usize, u: &Matrix2x2) -> Result<()> {
        self.validate_target(target)?;
        validate_unitary(u)?;

        self.dispatch(
            env,
            target,
            |amps| local::unitary(amps, target, u),
            |amps, pair, rank_is_upper| {
                let (rot1, rot2) = rotation_coefficients_from_matrix(rank_is_upper, u);
                distributed::unitary(amps, pair, rank_is_upper, rot1, rot2);
            },
        );
        Ok(())
    }

    /// Compact unitary applied only where `control` is 1.
    pub fn controlled_compact_unitary(
        &mut self,
        env: &SimEnv,
        control: usize,
        target: usize,
        alpha: C64,
        beta: C64,
    ) -> Result<()> {
        self.validate_target(target)?;
        self.validate_control(control, target)?;
        validate_compact_pair(alpha, beta)?;

        let control_mask = 1u64 << control;
        let chunk_offset = self.chunk_offset();
        self.dispatch(
            env,
            target,
            |amps| {
                local::controlled_compact_unitary(
                    amps,
                    chunk_offset,
                    target,
                    control_mask,
                    alpha,
                    beta,
                )
            },
            |amps, pair, rank_is_upper| {
                let (rot1, rot2) = rotation_coefficients(rank_is_upper, alpha, beta);
                distributed::controlled_compact_unitary(
                    amps,
                    pair,
                    chunk_offset,
                    control_mask,
                    rank_is_upper,
                    rot1,
                    rot2,
                );
            },
        );
        Ok(())
    }

    /// Arbitrary unitary applied only where `control` is 1.
    pub fn controlled_unitary(
        &mut self,
        env: &SimEnv,
        control: usize,
        target: usize,
        u: &Matrix2x2,
    ) -> Result<()> {
        self.validate_target(target)?;
        self.validate_control(control, target)?;
        validate_unitary(u)?;

        let control_mask = 1u64 << control;
        self.dispatch_masked_unitary(env, target, control_mask, u);
        Ok(())
    }

    /// Arbitrary unitary applied only where every qubit in `controls` is 1.
    /// The controls are compressed into one bitmask, which must not cover
    /// the target bit.
    pub fn multi_controlled_unitary(
        &mut self,
        env: &SimEnv,
        controls: &[usize],
        target: usize,
        u: &Matrix2x2,
    ) -> Result<()> {
        self.validate_target(target)?;
        if controls.len() >= self.num_qubits() {
            return Err(SimError::ControlCountOutOfRange(
                controls.len(),
                self.num_qubits(),
            ));
        }
        validate_unitary(u)?;

        let mut control_mask: u64 = 0;
        for &control in controls {
            if control >= self.num_qubits() {
                return Err(SimError::ControlOutOfRange(control, self.num_qubits()));
            }
            control_mask |= 1u64 << control;
        }
        if control_mask & (1u64 << target) != 0 {
            return Err(SimError::ControlConflictsTarget(target));
        }

        self.dispatch_masked_unitary(env, target, control_mask, u);
        Ok(())
    }

    /// Shared body of the single- and multi-control unitary paths after
    /// validation: the kernels only see the mask.
    fn dispatch_masked_unitary(
        &mut self,
        env: &SimEnv,
        target: usize,
        control_mask: u64,
        u: &Matrix2x2,
    ) {
        let chunk_offset = self.chunk_offset();
        self.dispatch(
            env,
            target,
            |amps| local::controlled_unitary(amps, chunk_offset, target, control_mask, u),
            |amps, pair, rank_is_upper| {
                let (rot1, rot2) = rotation_coefficients_from_matrix(rank_is_upper, u);
                distributed::controlled_unitary(
                    amps,
                    pair,
                    chunk_offset,
                    control_mask,
                    rank_is_upper,
                    rot1,
                    rot2,
                );
            },
        );
    }

    /// Pauli-X on `target`.
    pub fn sigma_x(&mut self, env: &SimEnv, target: usize) -> Result<()> {
        self.validate_target(target)?;
        self.dispatch(
            env,
            target,
            |amps| local::sigma_x(amps, target),
            // the permutation has no coefficients and no half-dependent
            // branch: the shard is replaced by the paired shard
            |amps, pair, _rank_is_upper| distributed::sigma_x(amps, pair),
        );
        Ok(())
    }

    /// Pauli-Y on `target`.
    pub fn sigma_y(&mut self, env: &SimEnv, target: usize) -> Result<()> {
        self.validate_target(target)?;
        self.dispatch(
            env,
            target,
            |amps| local::sigma_y(amps, target),
            |amps, pair, rank_is_upper| distributed::sigma_y(amps, pair, rank_is_upper),
        );
        Ok(())
    }

    /// Pauli-X on `target` where `control` is 1.
    pub fn controlled_not(&mut self, env: &SimEnv, control: usize, target: usize) -> Result<()> {
        self.validate_target(target)?;
        self.validate_control(control, target)?;

        let control_mask = 1u64 << control;
        let chunk_offset = self.chunk_offset();
        self.dispatch(
            env,
            target,
            |amps| local::controlled_not(amps, chunk_offset, target, control_mask),
            |amps, pair, _rank_is_upper| {
                distributed::controlled_not(amps, pair, chunk_offset, control_mask)
            },
        );
        Ok(())
    }

    /// Hadamard on `target`.
    pub fn hadamard(&mut self, env: &SimEnv, target: usize) -> Result<()> {
        self.validate_target(target)?;
        self.dispatch(
            env,
            target,
            |amps| local::hadamard(amps, target),
            |amps, pair, rank_is_upper| distributed::hadamard(amps, pair, rank_is_upper),
        );
        Ok(())
    }

    /// Diagonal phase gate on `target`. Never exchanges: a shard in the
    /// upper half of its blocks is untouched, a shard in the lower half is
    /// scaled wholesale, and the local path handles both halves in place.
    pub fn phase_gate(&mut self, _env: &SimEnv, target: usize, kind: PhaseKind) -> Result<()> {
        self.validate_target(target)?;

        let factor = kind.factor();
        if index::half_block_fits_in_chunk(self.amps_per_chunk(), target) {
            local::phase(&mut self.amps, target, factor);
        } else if !index::chunk_is_upper(self.chunk_id(), self.amps_per_chunk(), target) {
            distributed::phase(&mut self.amps, factor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqs_comm::SoloCommunicator;
    use dqs_core::physics::c;
    use std::f64::consts::FRAC_1_SQRT_2;
    use std::sync::Arc;

    const TOLERANCE: f64 = 1e-12;

    fn solo_env() -> SimEnv {
        SimEnv::new(Arc::new(SoloCommunicator))
    }

    fn amp(state: &ShardedState, env: &SimEnv, index: u64) -> C64 {
        C64::new(
            state.get_real_amp(env, index),
            state.get_imag_amp(env, index),
        )
    }

    #[test]
    fn test_bell_pair_local() {
        let env = solo_env();
        let mut state = ShardedState::new(2, &env).unwrap();
        state.hadamard(&env, 0).unwrap();
        state.controlled_not(&env, 0, 1).unwrap();

        let expected = c(FRAC_1_SQRT_2, 0.0);
        assert!((amp(&state, &env, 0b00) - expected).norm() < TOLERANCE);
        assert!(amp(&state, &env, 0b01).norm() < TOLERANCE);
        assert!(amp(&state, &env, 0b10).norm() < TOLERANCE);
        assert!((amp(&state, &env, 0b11) - expected).norm() < TOLERANCE);
    }

    #[test]
    fn test_phase_between_hadamards() {
        // H; S; H on one qubit: |0> -> ((1+i)/2, (1-i)/2)
        let env = solo_env();
        let mut state = ShardedState::new(1, &env).unwrap();
        state.hadamard(&env, 0).unwrap();
        state.phase_gate(&env, 0, PhaseKind::S).unwrap();
        state.hadamard(&env, 0).unwrap();

        assert!((amp(&state, &env, 0) - c(0.5, 0.5)).norm() < TOLERANCE);
        assert!((amp(&state, &env, 1) - c(0.5, -0.5)).norm() < TOLERANCE);
    }

    #[test]
    fn test_sigma_y_is_involution() {
        let env = solo_env();
        let mut state = ShardedState::new(3, &env).unwrap();
        state.init_plus_state();
        state.sigma_y(&env, 1).unwrap();
        state.sigma_y(&env, 1).unwrap();

        let expected = 1.0 / (8f64).sqrt();
        for index in 0..8 {
            assert!((amp(&state, &env, index) - c(expected, 0.0)).norm() < TOLERANCE);
        }
    }

    #[test]
    fn test_compact_unitary_preserves_norm() {
        let env = solo_env();
        let mut state = ShardedState::new(3, &env).unwrap();
        state.init_plus_state();
        let alpha = c(0.6, 0.0);
        let beta = c(0.0, 0.8);
        state.compact_unitary(&env, 2, alpha, beta).unwrap();
        assert!((state.calc_total_probability(&env) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_validation_codes() {
        let env = solo_env();
        let mut state = ShardedState::new(2, &env).unwrap();

        let err = state.sigma_x(&env, 2).unwrap_err();
        assert_eq!(err.code(), 1);

        let err = state.controlled_not(&env, 5, 0).unwrap_err();
        assert_eq!(err.code(), 2);

        let err = state.controlled_not(&env, 1, 1).unwrap_err();
        assert_eq!(err.code(), 3);

        let err = state
            .multi_controlled_unitary(&env, &[0, 1], 0, &physics::PAULI_X)
            .unwrap_err();
        assert_eq!(err.code(), 4);

        let bad = [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(2.0, 0.0)]];
        let err = state.unitary(&env, 0, &bad).unwrap_err();
        assert_eq!(err.code(), 5);

        let err = state
            .compact_unitary(&env, 0, c(1.0, 0.0), c(1.0, 0.0))
            .unwrap_err();
        assert_eq!(err.code(), 6);
    }

    #[test]
    fn test_multi_control_mask_may_not_cover_target() {
        let env = solo_env();
        let mut state = ShardedState::new(3, &env).unwrap();
        let err = state
            .multi_controlled_unitary(&env, &[0, 1], 1, &physics::PAULI_X)
            .unwrap_err();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_multi_controlled_unitary_is_toffoli() {
        let env = solo_env();
        let mut state = ShardedState::new(3, &env).unwrap();
        // prepare |011> (bits 0 and 1 set)
        state.sigma_x(&env, 0).unwrap();
        state.sigma_x(&env, 1).unwrap();
        state
            .multi_controlled_unitary(&env, &[0, 1], 2, &physics::PAULI_X)
            .unwrap();
        assert!((amp(&state, &env, 0b111) - c(1.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_controlled_variants_agree() {
        let alpha = c(FRAC_1_SQRT_2, 0.0);
        let beta = c(0.0, -FRAC_1_SQRT_2);
        let u = [[alpha, -beta.conj()], [beta, alpha.conj()]];

        let env = solo_env();
        let mut compact = ShardedState::new(3, &env).unwrap();
        compact.init_plus_state();
        compact.phase_gate(&env, 1, PhaseKind::T).unwrap();
        compact
            .controlled_compact_unitary(&env, 0, 2, alpha, beta)
            .unwrap();

        let mut full = ShardedState::new(3, &env).unwrap();
        full.init_plus_state();
        full.phase_gate(&env, 1, PhaseKind::T).unwrap();
        full.controlled_unitary(&env, 0, 2, &u).unwrap();

        for index in 0..8 {
            assert!((amp(&compact, &env, index) - amp(&full, &env, index)).norm() < TOLERANCE);
        }
    }
}
