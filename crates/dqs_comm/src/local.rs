//! In-process SPMD environments.
//!
//! [`LocalCluster`] runs one worker per thread. Point-to-point transfers go
//! over a dedicated FIFO channel per ordered rank pair, so a message from
//! rank `a` can never overtake an earlier message from `a` and a slow worker
//! never receives a fast peer's traffic out of order. Reductions go through
//! a slot vector guarded by a barrier on each side; every worker folds the
//! slots in rank order, so all workers compute bit-identical results.

use std::sync::{Arc, Barrier, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::error;

use crate::Communicator;
use dqs_core::physics::Real;

/// A tagged point-to-point payload.
struct Envelope {
    tag: u32,
    payload: Vec<Real>,
}

/// State shared by all workers of one cluster.
struct ClusterShared {
    num_ranks: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Real>>,
}

/// One worker's endpoint of a [`LocalCluster`].
pub struct LocalWorker {
    rank: usize,
    shared: Arc<ClusterShared>,
    /// `senders[dst]` is this worker's end of the (self → dst) channel.
    senders: Vec<Sender<Envelope>>,
    /// `receivers[src]` is this worker's end of the (src → self) channel.
    receivers: Vec<Receiver<Envelope>>,
}

/// Builder and launcher for an in-process worker cluster.
pub struct LocalCluster;

impl LocalCluster {
    /// Creates the endpoints of a `num_ranks`-worker cluster.
    ///
    /// # Panics
    ///
    /// Panics if `num_ranks` is zero.
    pub fn build(num_ranks: usize) -> Vec<LocalWorker> {
        assert!(num_ranks > 0, "cluster needs at least one worker");

        let shared = Arc::new(ClusterShared {
            num_ranks,
            barrier: Barrier::new(num_ranks),
            slots: Mutex::new(vec![0.0; num_ranks]),
        });

        // channel[src][dst], split into per-worker sender/receiver vectors
        let mut channels: Vec<Vec<(Sender<Envelope>, Receiver<Envelope>)>> = (0..num_ranks)
            .map(|_| (0..num_ranks).map(|_| unbounded()).collect())
            .collect();

        let mut receivers_by_dst: Vec<Vec<Receiver<Envelope>>> =
            (0..num_ranks).map(|_| Vec::with_capacity(num_ranks)).collect();
        let mut senders_by_src: Vec<Vec<Sender<Envelope>>> =
            (0..num_ranks).map(|_| Vec::with_capacity(num_ranks)).collect();

        for (src, row) in channels.drain(..).enumerate() {
            for (dst, (tx, rx)) in row.into_iter().enumerate() {
                senders_by_src[src].push(tx);
                receivers_by_dst[dst].push(rx);
            }
        }

        senders_by_src
            .into_iter()
            .zip(receivers_by_dst)
            .enumerate()
            .map(|(rank, (senders, receivers))| LocalWorker {
                rank,
                shared: Arc::clone(&shared),
                senders,
                receivers,
            })
            .collect()
    }

    /// Runs the same worker function on `num_ranks` threads and collects the
    /// per-rank results in rank order.
    ///
    /// # Panics
    ///
    /// Propagates a panic from any worker thread (including transport
    /// aborts).
    pub fn run<T, F>(num_ranks: usize, f: F) -> Vec<T>
    where
        F: Fn(LocalWorker) -> T + Sync,
        T: Send,
    {
        let workers = Self::build(num_ranks);
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = workers
                .into_iter()
                .map(|worker| scope.spawn(move || f(worker)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(value) => value,
                    Err(cause) => std::panic::resume_unwind(cause),
                })
                .collect()
        })
    }
}

impl Communicator for LocalWorker {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.shared.num_ranks
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn broadcast_real(&self, value: &mut Real, root: usize) {
        if self.rank == root {
            self.shared.slots.lock().expect("cluster poisoned")[root] = *value;
        }
        self.shared.barrier.wait();
        *value = self.shared.slots.lock().expect("cluster poisoned")[root];
        self.shared.barrier.wait();
    }

    fn all_reduce_sum(&self, value: Real) -> Real {
        self.shared.slots.lock().expect("cluster poisoned")[self.rank] = value;
        self.shared.barrier.wait();
        // fold in rank order on every worker: all workers agree bitwise
        let total = {
            let slots = self.shared.slots.lock().expect("cluster poisoned");
            slots.iter().fold(0.0, |acc, &slot| acc + slot)
        };
        self.shared.barrier.wait();
        total
    }

    fn all_reduce_and(&self, value: bool) -> bool {
        self.shared.slots.lock().expect("cluster poisoned")[self.rank] =
            if value { 1.0 } else { 0.0 };
        self.shared.barrier.wait();
        let all = {
            let slots = self.shared.slots.lock().expect("cluster poisoned");
            slots.iter().all(|&slot| slot != 0.0)
        };
        self.shared.barrier.wait();
        all
    }

    fn send_recv(&self, peer: usize, tag: u32, send: &[Real], recv: &mut [Real]) {
        self.senders[peer]
            .send(Envelope {
                tag,
                payload: send.to_vec(),
            })
            .expect("peer worker hung up");
        let envelope = self.receivers[peer].recv().expect("peer worker hung up");
        assert_eq!(envelope.tag, tag, "mismatched transfer tag");
        recv.copy_from_slice(&envelope.payload);
    }

    fn node_name(&self) -> String {
        format!("localhost:{}", self.rank)
    }

    fn abort(&self, code: i32) -> ! {
        error!(code, rank = self.rank, "transport abort");
        panic!("transport aborted with code {code}");
    }
}

/// The trivial single-worker environment. Collectives are identities and the
/// exchange path is unreachable (a one-worker shard always takes the local
/// gate path).
#[derive(Debug, Default, Clone, Copy)]
pub struct SoloCommunicator;

impl Communicator for SoloCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn broadcast_real(&self, _value: &mut Real, _root: usize) {}

    fn all_reduce_sum(&self, value: Real) -> Real {
        value
    }

    fn all_reduce_and(&self, value: bool) -> bool {
        value
    }

    fn send_recv(&self, _peer: usize, _tag: u32, send: &[Real], recv: &mut [Real]) {
        recv.copy_from_slice(send);
    }

    fn node_name(&self) -> String {
        "localhost:0".to_string()
    }

    fn abort(&self, code: i32) -> ! {
        error!(code, "transport abort");
        panic!("transport aborted with code {code}");
    }
}
