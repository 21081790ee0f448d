//! # DQS Core
//!
//! Core types and utilities for DQS (Distributed Qubit Simulator).
//!
//! This crate provides:
//! - `SimError`: unified error type with stable cross-worker codes
//! - `Real` / `C64` scalar aliases and the standard gate matrices
//! - `PhaseKind`: the diagonal phase-gate family
//! - `SimConfig`: serde-backed run configuration
//!
//! ## Example
//!
//! ```rust
//! use dqs_core::prelude::*;
//! use dqs_core::physics;
//!
//! assert!(physics::is_unitary_2x2(&physics::HADAMARD, REAL_EPS));
//! assert_eq!(SimError::MatrixNotUnitary.code(), 5);
//! ```

pub mod config;
pub mod error;
pub mod physics;
pub mod prelude;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use physics::{PhaseKind, Real, C64, REAL_EPS};
