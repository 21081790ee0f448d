//! # DQS Comm
//!
//! The SPMD transport seam for DQS (Distributed Qubit Simulator).
//!
//! The engine assumes an ambient single-program-multiple-data environment:
//! every worker runs the same program over its own shard of the amplitude
//! vector and meets the others at collective operations. This crate defines
//! that environment as the [`Communicator`] trait and ships two in-process
//! implementations:
//!
//! - [`LocalCluster`]: one worker per thread, point-to-point transfers over
//!   per-rank-pair FIFO channels, reductions evaluated in rank order so all
//!   workers observe bit-identical results.
//! - [`SoloCommunicator`]: the trivial single-worker environment.
//!
//! The engine consumes the trait; it never constructs or owns the
//! environment.

pub mod local;

pub use local::{LocalCluster, LocalWorker, SoloCommunicator};

use dqs_core::physics::Real;

/// Collective and point-to-point operations of the ambient SPMD environment.
///
/// Every method except `send_recv` is collective: all workers must call it
/// the same number of times in the same order. Diverging call sequences are
/// undefined behavior (in the in-process implementations, a deadlock).
pub trait Communicator: Send + Sync {
    /// This worker's rank in `[0, num_ranks)`.
    fn rank(&self) -> usize;

    /// Total number of workers.
    fn num_ranks(&self) -> usize;

    /// Block until every worker has reached the barrier.
    fn barrier(&self);

    /// Replace `value` on every worker with the `root` worker's value.
    fn broadcast_real(&self, value: &mut Real, root: usize);

    /// Sum `value` over all workers; every worker receives the same total.
    fn all_reduce_sum(&self, value: Real) -> Real;

    /// Logical AND of `value` over all workers.
    fn all_reduce_and(&self, value: bool) -> bool;

    /// Full-duplex transfer with `peer`: send all of `send` and fill all of
    /// `recv` with the peer's payload of the same `tag`. Blocks until both
    /// directions complete. `send` and `recv` must have equal lengths on
    /// both sides.
    fn send_recv(&self, peer: usize, tag: u32, send: &[Real], recv: &mut [Real]);

    /// Host identification string for this worker.
    fn node_name(&self) -> String;

    /// Tear down the whole environment, carrying `code` as the exit status.
    /// Used for fatal collective validation failures.
    fn abort(&self, code: i32) -> !;
}
