//! Partition discovered instances into command batches.

use std::num::NonZeroUsize;

use fleetcmd_core::{Batch, InstanceId};

/// Split `ids` into contiguous batches of at most `size`, preserving order.
///
/// Every id lands in exactly one batch; only the last batch may be short.
/// Empty input yields no batches.
pub fn chunk(ids: &[InstanceId], size: NonZeroUsize) -> Vec<Batch> {
    ids.chunks(size.get())
        .enumerate()
        .map(|(index, group)| Batch {
            index,
            instance_ids: group.to_vec(),
        })
        .collect()
}
