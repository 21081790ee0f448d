//! # DQS Engine
//!
//! Distributed state-vector engine for DQS (Distributed Qubit Simulator).
//!
//! The engine stores the `2^N` complex amplitudes of an N-qubit pure state
//! sharded evenly over the workers of an ambient SPMD environment and
//! applies single- and multi-controlled one-qubit unitaries and measurement
//! operators in place. For each gate the dispatch layer decides whether the
//! target qubit's block structure fits inside one shard (local kernel) or
//! spans a pair of workers (chunked shard exchange, then the distributed
//! kernel with the correct upper/lower pairing).
//!
//! ## Modules
//! - **state**: amplitude shard store and collective accessors
//! - **index**: pure chunk/block index arithmetic
//! - **exchange**: chunked full-duplex shard transfer
//! - **kernels**: local and distributed numeric cores
//! - **gates**: per-gate validation and dispatch
//! - **measure**: marginal probabilities, collapse, sampled measurement
//! - **env**: handle over the injected SPMD transport
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dqs_comm::SoloCommunicator;
//! use dqs_engine::{ShardedState, SimEnv};
//!
//! let env = SimEnv::new(Arc::new(SoloCommunicator));
//! let mut state = ShardedState::new(2, &env).unwrap();
//! state.hadamard(&env, 0).unwrap();
//! state.controlled_not(&env, 0, 1).unwrap();
//! assert!((state.calc_total_probability(&env) - 1.0).abs() < 1e-12);
//! ```

pub mod env;
pub mod exchange;
pub mod gates;
pub mod index;
pub mod kernels;
pub mod measure;
pub mod state;

pub use env::SimEnv;
pub use exchange::exchange_shards;
pub use state::{AmpBuffer, ShardedState};
