//! Measurement operators.
//!
//! A marginal probability is a reduction: each shard contributes the
//! probability mass of its outcome-0 amplitudes (all of them on the local
//! path, all or nothing on the distributed path), and the transport sums
//! the contributions. A collapse reuses that probability to renormalize the
//! surviving amplitudes and zero the rest.

use rand::Rng;

use dqs_core::physics::{Real, REAL_EPS};
use dqs_core::{Result, SimError};

use crate::env::SimEnv;
use crate::index;
use crate::kernels::{distributed, local};
use crate::state::ShardedState;

impl ShardedState {
    fn validate_measure_qubit(&self, target: usize) -> Result<()> {
        if target >= self.num_qubits() {
            Err(SimError::MeasureQubitOutOfRange(target, self.num_qubits()))
        } else {
            Ok(())
        }
    }

    /// Probability that measuring `target` yields `outcome`.
    ///
    /// Collective: every worker contributes its shard's outcome-0 mass to
    /// an all-reduce and receives the same total.
    pub fn find_probability_of_outcome(
        &self,
        env: &SimEnv,
        target: usize,
        outcome: u8,
    ) -> Result<Real> {
        self.validate_measure_qubit(target)?;

        let p_zero = if index::half_block_fits_in_chunk(self.amps_per_chunk(), target) {
            local::find_probability_of_zero(&self.amps, target)
        } else if !index::chunk_is_skipped_for_outcome_zero(
            self.chunk_id(),
            self.amps_per_chunk(),
            target,
        ) {
            distributed::find_probability_of_zero(&self.amps)
        } else {
            0.0
        };

        let total = env.comm().all_reduce_sum(p_zero);
        Ok(if outcome == 0 { total } else { 1.0 - total })
    }

    /// Projects the state onto `outcome` for `target` and renormalizes.
    /// Returns the probability the outcome had before the collapse.
    ///
    /// # Errors
    ///
    /// Fails when the outcome's probability is below `REAL_EPS`: the
    /// projected state would not be normalizable.
    pub fn collapse_to_outcome(&mut self, env: &SimEnv, target: usize, outcome: u8) -> Result<Real> {
        let total_prob = self.find_probability_of_outcome(env, target, outcome)?;
        if total_prob.abs() <= REAL_EPS {
            return Err(SimError::CollapseProbabilityTooSmall {
                outcome,
                probability: total_prob,
            });
        }

        if index::half_block_fits_in_chunk(self.amps_per_chunk(), target) {
            local::collapse_to_outcome(&mut self.amps, target, outcome, total_prob);
        } else {
            // on the distributed path the whole shard is one outcome
            let shard_outcome: u8 = if index::chunk_is_skipped_for_outcome_zero(
                self.chunk_id(),
                self.amps_per_chunk(),
                target,
            ) {
                1
            } else {
                0
            };
            if shard_outcome == outcome {
                distributed::collapse_renormalize(&mut self.amps, total_prob);
            } else {
                distributed::collapse_set_zero(&mut self.amps);
            }
        }
        Ok(total_prob)
    }

    /// Measures `target` in the computational basis, collapsing the state
    /// to the sampled outcome.
    ///
    /// The uniform deviate is drawn on worker 0 and broadcast, so every
    /// worker agrees on the outcome regardless of its own generator state.
    pub fn measure<R: Rng>(&mut self, env: &SimEnv, target: usize, rng: &mut R) -> Result<u8> {
        let p_zero = self.find_probability_of_outcome(env, target, 0)?;
        let mut draw: Real = rng.gen();
        env.comm().broadcast_real(&mut draw, 0);
        let outcome = u8::from(draw >= p_zero);
        self.collapse_to_outcome(env, target, outcome)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqs_comm::SoloCommunicator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const TOLERANCE: f64 = 1e-12;

    fn solo_env() -> SimEnv {
        SimEnv::new(Arc::new(SoloCommunicator))
    }

    #[test]
    fn test_marginals_sum_to_one() {
        let env = solo_env();
        let mut state = ShardedState::new(3, &env).unwrap();
        state.init_plus_state();
        state.phase_gate(&env, 1, dqs_core::PhaseKind::T).unwrap();

        for target in 0..3 {
            let p0 = state.find_probability_of_outcome(&env, target, 0).unwrap();
            let p1 = state.find_probability_of_outcome(&env, target, 1).unwrap();
            assert!((p0 + p1 - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_collapse_on_plus_state() {
        let env = solo_env();
        let mut state = ShardedState::new(2, &env).unwrap();
        state.init_plus_state();

        let prob = state.collapse_to_outcome(&env, 0, 1).unwrap();
        assert!((prob - 0.5).abs() < TOLERANCE);

        // every bit-0-clear amplitude is exactly zero, rest renormalized
        assert_eq!(state.get_real_amp(&env, 0b00), 0.0);
        assert_eq!(state.get_real_amp(&env, 0b10), 0.0);
        assert!((state.get_real_amp(&env, 0b01) - 0.5f64.sqrt()).abs() < TOLERANCE);
        assert!((state.calc_total_probability(&env) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_collapse_to_impossible_outcome_fails() {
        let env = solo_env();
        let mut state = ShardedState::new(2, &env).unwrap();
        // |00>: outcome 1 on qubit 0 has zero probability
        let err = state.collapse_to_outcome(&env, 0, 1).unwrap_err();
        assert_eq!(err.code(), 8);
    }

    #[test]
    fn test_measure_qubit_out_of_range_uses_control_code() {
        let env = solo_env();
        let state = ShardedState::new(2, &env).unwrap();
        let err = state.find_probability_of_outcome(&env, 7, 0).unwrap_err();
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn test_measure_collapses_to_sampled_outcome() {
        let env = solo_env();
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = ShardedState::new(2, &env).unwrap();
        state.hadamard(&env, 0).unwrap();
        state.controlled_not(&env, 0, 1).unwrap();

        let outcome = state.measure(&env, 0, &mut rng).unwrap();
        // Bell pair: both qubits agree after measuring one
        let expected_index = if outcome == 0 { 0b00 } else { 0b11 };
        assert!((state.get_real_amp(&env, expected_index) - 1.0).abs() < TOLERANCE);
        assert!((state.calc_total_probability(&env) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_measure_on_basis_state_is_deterministic() {
        let env = solo_env();
        let mut rng = StdRng::seed_from_u64(1234);
        let mut state = ShardedState::new(2, &env).unwrap();
        state.sigma_x(&env, 1).unwrap();

        for _ in 0..8 {
            assert_eq!(state.measure(&env, 1, &mut rng).unwrap(), 1);
            assert_eq!(state.measure(&env, 0, &mut rng).unwrap(), 0);
        }
    }
}
