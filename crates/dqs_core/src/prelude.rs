//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust
//! use dqs_core::prelude::*;
//! ```

pub use crate::config::{ClusterConfig, EngineConfig, SimConfig};
pub use crate::error::{Result, SimError};
pub use crate::physics::{Matrix2x2, PhaseKind, Real, C64, REAL_EPS};
