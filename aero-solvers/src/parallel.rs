//! Static block partitioning for parallel kernels
//!
//! All parallel work in the engine goes through this module: a range of
//! rows/columns/panel indices is split into contiguous blocks, each block
//! is computed independently (disjoint writes or a per-block accumulator),
//! and the partial results are combined by the calling thread in block
//! order after the parallel call returns. Results are therefore
//! reproducible for a fixed block count; changing the block count may
//! change floating-point summation order in the combine step.

use std::ops::Range;

use rayon::prelude::*;

/// Clamps a requested thread count to the available hardware concurrency.
/// Zero requests one thread per available core.
pub fn clamped_threads(requested: usize) -> usize {
    let hw = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    if requested == 0 {
        hw
    } else {
        requested.min(hw).max(1)
    }
}

/// Splits `0..total` into at most `n_blocks` contiguous ranges of size
/// `total / n_blocks + 1`, the last block absorbing the remainder.
pub fn block_ranges(total: usize, n_blocks: usize) -> Vec<Range<usize>> {
    let n_blocks = n_blocks.max(1);
    let block_size = total / n_blocks + 1;
    let mut ranges = Vec::with_capacity(n_blocks);
    let mut start = 0;
    while start < total {
        let end = (start + block_size).min(total);
        ranges.push(start..end);
        start = end;
    }
    if ranges.is_empty() {
        ranges.push(0..0);
    }
    ranges
}

/// Maps a closure over the block ranges of `0..total`, in parallel when
/// `multithread` is set, and returns the per-block results in block order.
pub fn map_blocks<B, F>(total: usize, n_blocks: usize, multithread: bool, f: F) -> Vec<B>
where
    B: Send,
    F: Fn(Range<usize>) -> B + Sync + Send,
{
    let ranges = block_ranges(total, n_blocks);
    if multithread && ranges.len() > 1 {
        ranges.into_par_iter().map(f).collect()
    } else {
        ranges.into_iter().map(f).collect()
    }
}
