//! Environment handle over the ambient SPMD transport.

use std::sync::Arc;

use dqs_comm::Communicator;
use dqs_core::physics::Real;
use dqs_core::SimError;

/// Handle to the SPMD environment a simulation runs in.
///
/// The environment is injected at construction; the engine neither creates
/// nor finalizes the underlying transport. Cloning the handle shares the
/// same communicator.
#[derive(Clone)]
pub struct SimEnv {
    comm: Arc<dyn Communicator>,
}

impl SimEnv {
    /// Wraps an ambient communicator.
    pub fn new(comm: Arc<dyn Communicator>) -> Self {
        Self { comm }
    }

    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Total number of workers.
    pub fn num_ranks(&self) -> usize {
        self.comm.num_ranks()
    }

    /// The underlying transport.
    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    /// Barrier across all workers.
    pub fn sync(&self) {
        self.comm.barrier();
    }

    /// Logical-AND reduction of per-worker success flags; every worker
    /// receives the global result.
    pub fn sync_success(&self, success: bool) -> bool {
        self.comm.all_reduce_and(success)
    }

    /// Host identification string for this worker.
    pub fn node_name(&self) -> String {
        self.comm.node_name()
    }

    /// Prints the execution environment on worker 0.
    pub fn report(&self) {
        if self.rank() == 0 {
            println!("EXECUTION ENVIRONMENT:");
            println!("Running distributed over {} workers", self.num_ranks());
            println!(
                "Kernel threads available per worker: {}",
                rayon::current_num_threads()
            );
            println!(
                "Precision: size of Real is {} bytes",
                std::mem::size_of::<Real>()
            );
        }
    }

    /// Prints this worker's host name.
    pub fn report_node_list(&self) {
        println!("host name on worker {}: {}", self.rank(), self.node_name());
    }

    /// Prints the error banner and aborts the whole environment with the
    /// error's stable code. Validation failures are collective, so every
    /// worker reaches this symmetrically.
    pub fn abort_with(&self, err: &SimError) -> ! {
        eprintln!("!!!");
        eprintln!("DQS error: {err}");
        eprintln!("!!!");
        self.comm.abort(err.code())
    }
}
