//! Configuration management for DQS.

use serde::{Deserialize, Serialize};

/// Global configuration for a DQS run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimConfig {
    /// Cluster configuration
    pub cluster: ClusterConfig,
    /// Engine configuration
    pub engine: EngineConfig,
}

/// Configuration for the worker cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of workers (must be a power of two)
    pub num_workers: usize,
}

/// Configuration for the simulation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of qubits accepted by the CLI
    pub max_qubits: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { num_workers: 2 }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_qubits: 24 }
    }
}

impl SimConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes configuration to a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
