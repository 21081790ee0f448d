//! Chunked full-duplex shard exchange.
//!
//! A distributed gate needs the peer worker's whole shard. The transfer is
//! subdivided because the transport caps a single message at 2 GiB and a
//! 32-bit element count; the cap is therefore a correctness boundary, not a
//! tuning knob. Wider real scalars get proportionally smaller element caps.

use tracing::debug;

use dqs_core::physics::Real;

use crate::env::SimEnv;
use crate::state::ShardedState;

/// Single fixed tag shared by all shard-exchange sub-messages.
const EXCHANGE_TAG: u32 = 100;

/// Elements per sub-message: `2^29` by default, `2^28` for 8-byte reals,
/// `2^27` for 16-byte reals, clamped to the shard size.
pub(crate) fn max_message_count(amps_per_chunk: usize) -> usize {
    let mut cap: usize = match std::mem::size_of::<Real>() {
        8 => 1 << 28,
        16 => 1 << 27,
        _ => 1 << 29,
    };
    if amps_per_chunk < cap {
        cap = amps_per_chunk;
    }
    cap
}

/// Fills the scratch buffer with the peer worker's shard while sending this
/// worker's shard to the peer, real array then imaginary array for each
/// sub-message range. Blocks until both directions complete.
pub fn exchange_shards(state: &mut ShardedState, env: &SimEnv, pair_rank: usize) {
    let amps_per_chunk = state.amps_per_chunk();
    let count = max_message_count(amps_per_chunk);
    let num_messages = amps_per_chunk / count;
    debug!(num_messages, count, pair_rank, "exchanging shards");

    let (amps, scratch) = state.shard_and_scratch_mut();
    for i in 0..num_messages {
        let range = i * count..(i + 1) * count;
        env.comm().send_recv(
            pair_rank,
            EXCHANGE_TAG,
            &amps.re[range.clone()],
            &mut scratch.re[range.clone()],
        );
        env.comm().send_recv(
            pair_rank,
            EXCHANGE_TAG,
            &amps.im[range.clone()],
            &mut scratch.im[range],
        );
    }
}
