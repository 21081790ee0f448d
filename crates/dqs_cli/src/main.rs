//! DQS CLI - Distributed Qubit Simulator command line interface
//!
//! Provides commands for:
//! - Running demo circuits on an in-process worker cluster
//! - Reporting the execution environment

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dqs_comm::LocalCluster;
use dqs_core::physics::Real;
use dqs_core::{SimConfig, SimError};
use dqs_engine::{ShardedState, SimEnv};

/// DQS - Distributed Qubit Simulator
///
/// A state-vector simulator that shards the amplitude vector over a
/// cluster of workers.
#[derive(Parser)]
#[command(name = "dqs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Circuit {
    /// H(0); CNOT(0,1)
    Bell,
    /// H(0); CNOT chain over all qubits
    Ghz,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo circuit on an in-process worker cluster
    Run {
        /// Circuit to run
        #[arg(value_name = "CIRCUIT")]
        circuit: Circuit,

        /// Number of qubits
        #[arg(short, long, default_value = "3")]
        qubits: usize,

        /// Number of workers (power of two)
        #[arg(short, long, default_value = "2")]
        workers: usize,
    },

    /// Show the execution environment
    Info {
        /// Number of workers (power of two)
        #[arg(short, long, default_value = "2")]
        workers: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();

    match cli.command {
        Commands::Run {
            circuit,
            qubits,
            workers,
        } => cmd_run(circuit, qubits, workers, cli.format),
        Commands::Info { workers } => cmd_info(workers, cli.format),
    }
}

/// Apply the selected demo circuit. Collective: runs identically on every
/// worker.
fn apply_circuit(
    circuit: Circuit,
    state: &mut ShardedState,
    env: &SimEnv,
) -> std::result::Result<(), SimError> {
    match circuit {
        Circuit::Bell => {
            state.hadamard(env, 0)?;
            state.controlled_not(env, 0, 1)?;
        }
        Circuit::Ghz => {
            state.hadamard(env, 0)?;
            for target in 1..state.num_qubits() {
                state.controlled_not(env, target - 1, target)?;
            }
        }
    }
    Ok(())
}

/// Run a demo circuit and report the resulting state
fn cmd_run(circuit: Circuit, qubits: usize, workers: usize, format: OutputFormat) -> Result<()> {
    let config = SimConfig::default();
    if !workers.is_power_of_two() {
        bail!("worker count {} is not a power of two", workers);
    }
    if qubits == 0 || qubits > config.engine.max_qubits {
        bail!(
            "qubit count {} outside 1..={}",
            qubits,
            config.engine.max_qubits
        );
    }

    let qubits = match circuit {
        Circuit::Bell if qubits != 2 => {
            warn!("bell circuit is fixed at 2 qubits, ignoring --qubits {}", qubits);
            2
        }
        _ => qubits,
    };
    if (1u64 << qubits) < workers as u64 {
        bail!("{} workers need at least {} amplitudes", workers, workers);
    }

    info!(
        "running {} on {} qubits over {} workers",
        circuit_name(circuit),
        qubits,
        workers
    );

    // amplitude listings only stay readable for small registers; the
    // decision must be identical on every worker because the accessors are
    // collective
    let show_amps = qubits <= 6;
    let outcomes = LocalCluster::run(workers, |worker| {
        let env = SimEnv::new(Arc::new(worker));
        let mut state = ShardedState::new(qubits, &env)?;
        apply_circuit(circuit, &mut state, &env)?;

        let total_probability = state.calc_total_probability(&env);
        let amplitudes: Vec<(Real, Real)> = if show_amps {
            (0..state.num_amps_total())
                .map(|index| {
                    (
                        state.get_real_amp(&env, index),
                        state.get_imag_amp(&env, index),
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok::<_, SimError>((total_probability, amplitudes))
    });

    // every worker observed the same collective results; report worker 0's
    let mut collected = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(value) => collected.push(value),
            Err(err) => bail!("simulation failed with code {}: {}", err.code(), err),
        }
    }
    let (total_probability, amplitudes) = collected.swap_remove(0);

    let result = RunResult {
        circuit: circuit_name(circuit).to_string(),
        num_qubits: qubits,
        num_workers: workers,
        total_probability,
        amplitudes: amplitudes
            .iter()
            .enumerate()
            .map(|(index, &(re, im))| AmplitudeJson {
                basis_state: format!("{index:0width$b}", width = qubits),
                re,
                im,
            })
            .collect(),
    };

    match format {
        OutputFormat::Text => {
            println!("\n=== DQS Run Result ===");
            println!("Circuit:    {}", result.circuit);
            println!("Qubits:     {}", result.num_qubits);
            println!("Workers:    {}", result.num_workers);
            println!("Total prob: {:.12}", result.total_probability);
            println!();
            if result.amplitudes.is_empty() {
                println!("(amplitude listing skipped for more than 6 qubits)");
            }
            for amp in &result.amplitudes {
                println!("|{}>  {:+.6} {:+.6}i", amp.basis_state, amp.re, amp.im);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

/// Show the execution environment
fn cmd_info(workers: usize, format: OutputFormat) -> Result<()> {
    if !workers.is_power_of_two() {
        bail!("worker count {} is not a power of two", workers);
    }

    match format {
        OutputFormat::Text => {
            LocalCluster::run(workers, |worker| {
                let env = SimEnv::new(Arc::new(worker));
                env.report();
                env.sync();
                env.report_node_list();
            });
        }
        OutputFormat::Json => {
            let info = SystemInfo {
                name: "DQS (Distributed Qubit Simulator)".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                num_workers: workers,
                kernel_threads: rayon_thread_count(),
                real_bytes: std::mem::size_of::<Real>(),
            };
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

fn circuit_name(circuit: Circuit) -> &'static str {
    match circuit {
        Circuit::Bell => "bell",
        Circuit::Ghz => "ghz",
    }
}

fn rayon_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// JSON output structures

#[derive(serde::Serialize)]
struct RunResult {
    circuit: String,
    num_qubits: usize,
    num_workers: usize,
    total_probability: Real,
    amplitudes: Vec<AmplitudeJson>,
}

#[derive(serde::Serialize)]
struct AmplitudeJson {
    basis_state: String,
    re: Real,
    im: Real,
}

#[derive(serde::Serialize)]
struct SystemInfo {
    name: String,
    version: String,
    num_workers: usize,
    kernel_threads: usize,
    real_bytes: usize,
}
