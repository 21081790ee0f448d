//! Pure index arithmetic for the block structure induced by a target qubit.
//!
//! Bit `q` of a global amplitude index splits the state vector into
//! contiguous blocks of `2^(q+1)` amplitudes; the first `2^q` indices of a
//! block (bit `q` = 0) form its upper half, the rest its lower half. Because
//! chunk sizes and block sizes are both powers of two, a chunk either
//! contains whole blocks (the local gate path) or lies entirely inside one
//! half of a block (the distributed path). These helpers decide which, and
//! locate the peer chunk holding the complementary half.

/// Whether the chunk lies in the upper half of every block it overlaps.
///
/// Equivalently, bit `target` of the chunk's first global index is zero.
pub fn chunk_is_upper(chunk_id: usize, amps_per_chunk: usize, target: usize) -> bool {
    let size_half_block = 1u64 << target;
    let size_block = size_half_block * 2;
    let pos_in_block = (chunk_id as u64 * amps_per_chunk as u64) % size_block;
    pos_in_block < size_half_block
}

/// Chunk id of the peer holding the complementary half-block.
///
/// Only meaningful on the distributed path (`amps_per_chunk <= 2^target`).
pub fn chunk_pair_id(
    chunk_is_upper: bool,
    chunk_id: usize,
    amps_per_chunk: usize,
    target: usize,
) -> usize {
    let size_half_block = 1u64 << target;
    let chunks_per_half_block = (size_half_block / amps_per_chunk as u64) as usize;
    if chunk_is_upper {
        chunk_id + chunks_per_half_block
    } else {
        chunk_id - chunks_per_half_block
    }
}

/// Whether both halves of every affected block fit inside one chunk, i.e.
/// the gate needs no shard exchange.
pub fn half_block_fits_in_chunk(amps_per_chunk: usize, target: usize) -> bool {
    amps_per_chunk as u64 > (1u64 << target)
}

/// Chunk owning the global amplitude `index`.
pub fn chunk_id_from_index(index: u64, amps_per_chunk: usize) -> usize {
    (index / amps_per_chunk as u64) as usize
}

/// On the distributed path, whether this chunk lies entirely in the lower
/// (outcome-1) half of its block, and therefore contributes nothing when
/// accumulating the probability of outcome 0.
pub fn chunk_is_skipped_for_outcome_zero(
    chunk_id: usize,
    amps_per_chunk: usize,
    target: usize,
) -> bool {
    let size_half_block = 1u64 << target;
    let chunks_per_half_block = size_half_block / amps_per_chunk as u64;
    (chunk_id as u64 & chunks_per_half_block) != 0
}
