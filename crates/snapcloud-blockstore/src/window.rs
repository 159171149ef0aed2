use crate::protocol::{BlockProtocol, MAX_BLOCK_SIZE};

/// One legal block read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Computes the next block to request for a range ending at `range_end` (inclusive).
///
/// The offset is `current_offset` rounded down to the protocol alignment. The limit is
/// the preferred read size, shrunk so the block stays inside one [`MAX_BLOCK_SIZE`]
/// segment, unless fewer bytes are still needed, in which case the needed count is
/// rounded *up* to the next legal size. Returns `None` once the range or the blob is
/// exhausted.
pub fn compute_next_block_window(
    protocol: &BlockProtocol,
    current_offset: u64,
    range_end: u64,
    total_size: u64,
) -> Option<BlockWindow> {
    let offset = protocol.align_down(current_offset);
    if current_offset > range_end || offset >= total_size {
        return None;
    }

    let remaining_in_blob = total_size - offset;
    let needed = remaining_in_blob.min(range_end + 1 - offset);

    let room_in_segment = MAX_BLOCK_SIZE - offset % MAX_BLOCK_SIZE;
    let largest = protocol.round_down_limit(protocol.read_block_size().min(room_in_segment));

    let limit = if needed < largest {
        protocol.round_up_limit(needed)
    } else {
        largest
    };

    Some(BlockWindow { offset, limit })
}
