//! Amplitude shard store.
//!
//! A state on N qubits is a vector of `2^N` complex amplitudes, sharded
//! evenly over the workers: worker `r` owns global indices
//! `[r * S, (r+1) * S)` where `S = 2^N / P`. Amplitudes are stored as two
//! parallel real arrays. Each worker also owns a same-sized scratch buffer
//! that receives the peer's shard during a distributed gate; it is allocated
//! once with the shard and stays resident through purely local gates.

use dqs_core::physics::Real;
use dqs_core::{Result, SimError};

use crate::env::SimEnv;
use crate::index;

/// Two parallel arrays of amplitude components.
#[derive(Debug, Clone, PartialEq)]
pub struct AmpBuffer {
    /// Real parts
    pub re: Vec<Real>,
    /// Imaginary parts
    pub im: Vec<Real>,
}

impl AmpBuffer {
    /// Allocates a zero-filled buffer for `len` amplitudes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            re: vec![0.0; len],
            im: vec![0.0; len],
        }
    }

    /// Number of amplitudes.
    pub fn len(&self) -> usize {
        self.re.len()
    }

    /// Whether the buffer holds no amplitudes.
    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    /// Zero every component.
    pub fn clear(&mut self) {
        self.re.fill(0.0);
        self.im.fill(0.0);
    }
}

/// One worker's shard of a distributed N-qubit state vector.
///
/// Created once per simulation with the geometry fixed; every gate and
/// measurement mutates it in place. All operations that touch other workers
/// are collective: each worker must invoke them in the same order with the
/// same arguments.
pub struct ShardedState {
    num_qubits: usize,
    chunk_id: usize,
    num_chunks: usize,
    pub(crate) amps: AmpBuffer,
    pub(crate) pair_amps: AmpBuffer,
}

impl ShardedState {
    /// Allocates this worker's shard of an `num_qubits`-qubit state and
    /// initializes `|0...0⟩`.
    ///
    /// # Errors
    ///
    /// Fails if the worker count is not a power of two, or exceeds the
    /// number of amplitudes.
    pub fn new(num_qubits: usize, env: &SimEnv) -> Result<Self> {
        let num_workers = env.num_ranks();
        let num_amps = 1u64 << num_qubits;
        if !num_workers.is_power_of_two() || num_workers as u64 > num_amps {
            return Err(SimError::InvalidSharding {
                num_amps,
                num_workers,
            });
        }

        let amps_per_chunk = (num_amps / num_workers as u64) as usize;
        let mut state = Self {
            num_qubits,
            chunk_id: env.rank(),
            num_chunks: num_workers,
            amps: AmpBuffer::zeroed(amps_per_chunk),
            pair_amps: AmpBuffer::zeroed(amps_per_chunk),
        };
        state.init_zero_state();
        Ok(state)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Total number of amplitudes across all workers.
    pub fn num_amps_total(&self) -> u64 {
        1u64 << self.num_qubits
    }

    /// Amplitudes held by each worker.
    pub fn amps_per_chunk(&self) -> usize {
        self.amps.len()
    }

    /// This worker's chunk id.
    pub fn chunk_id(&self) -> usize {
        self.chunk_id
    }

    /// Number of chunks the state is sharded into.
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// This worker's shard.
    pub fn amps(&self) -> &AmpBuffer {
        &self.amps
    }

    /// Split borrow used by the exchange layer: the shard to send and the
    /// scratch buffer to receive into.
    pub(crate) fn shard_and_scratch_mut(&mut self) -> (&AmpBuffer, &mut AmpBuffer) {
        (&self.amps, &mut self.pair_amps)
    }

    /// Split borrow used by distributed kernels: the output shard and the
    /// previously exchanged peer shard.
    pub(crate) fn shard_mut_and_pair(&mut self) -> (&mut AmpBuffer, &AmpBuffer) {
        (&mut self.amps, &self.pair_amps)
    }

    /// Resets to `|0...0⟩`: amplitude of global index 0 is 1.
    pub fn init_zero_state(&mut self) {
        self.amps.clear();
        if self.chunk_id == 0 {
            self.amps.re[0] = 1.0;
        }
    }

    /// Resets to the uniform superposition: every amplitude `1/sqrt(2^N)`.
    pub fn init_plus_state(&mut self) {
        let norm = 1.0 / (self.num_amps_total() as Real).sqrt();
        self.amps.re.fill(norm);
        self.amps.im.fill(0.0);
    }

    /// Real part of the global amplitude `index`.
    ///
    /// Collective: the owning worker broadcasts its value, so every worker
    /// must call this with the same index.
    pub fn get_real_amp(&self, env: &SimEnv, index: u64) -> Real {
        let owner = index::chunk_id_from_index(index, self.amps_per_chunk());
        let mut el = 0.0;
        if self.chunk_id == owner {
            el = self.amps.re[(index - owner as u64 * self.amps_per_chunk() as u64) as usize];
        }
        env.comm().broadcast_real(&mut el, owner);
        el
    }

    /// Imaginary part of the global amplitude `index`. Collective, like
    /// [`get_real_amp`](Self::get_real_amp).
    pub fn get_imag_amp(&self, env: &SimEnv, index: u64) -> Real {
        let owner = index::chunk_id_from_index(index, self.amps_per_chunk());
        let mut el = 0.0;
        if self.chunk_id == owner {
            el = self.amps.im[(index - owner as u64 * self.amps_per_chunk() as u64) as usize];
        }
        env.comm().broadcast_real(&mut el, owner);
        el
    }

    /// Sum of `re^2 + im^2` over the whole distributed state.
    ///
    /// The per-shard sum uses Kahan compensated summation, with the single
    /// compensation carried from each real term into the following
    /// imaginary term. Do not change the bracketing in this routine.
    pub fn calc_total_probability(&self, env: &SimEnv) -> Real {
        let mut p_total: Real = 0.0;
        let mut c: Real = 0.0;
        for index in 0..self.amps.len() {
            let y = self.amps.re[index] * self.amps.re[index] - c;
            let t = p_total + y;
            c = (t - p_total) - y;
            p_total = t;

            let y = self.amps.im[index] * self.amps.im[index] - c;
            let t = p_total + y;
            c = (t - p_total) - y;
            p_total = t;
        }
        if self.num_chunks > 1 {
            env.comm().all_reduce_sum(p_total)
        } else {
            p_total
        }
    }
}
