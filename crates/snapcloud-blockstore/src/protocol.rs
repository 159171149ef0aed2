use crate::error::{InvalidLimitSnafu, InvalidOffsetSnafu, InvalidPartSizeSnafu, InvalidProtocolSnafu};
use crate::Result;

/// Every block read must start on a multiple of this.
pub const ALIGNMENT: u64 = 4096;

/// Largest legal block read. Reads may not straddle a multiple of this either.
pub const MAX_BLOCK_SIZE: u64 = 1024 * 1024;

/// Size of every upload part except the last one.
pub const DEFAULT_PART_SIZE: usize = 512 * 1024;

/// Block size the range proxy asks for when enough bytes are still needed.
pub const DEFAULT_READ_BLOCK_SIZE: u64 = 512 * 1024;

// Upload parts must divide this evenly.
const MAX_PART_SIZE: usize = 512 * 1024;
const PART_SIZE_GRANULARITY: usize = 1024;

/// The constraints the remote block protocol enforces.
///
/// Legal read limits form a ladder of powers of two from [`ALIGNMENT`] up to
/// [`MAX_BLOCK_SIZE`]: 4096, 8192, 16384 and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockProtocol {
    part_size: usize,
    read_block_size: u64,
}

impl Default for BlockProtocol {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }
}

impl BlockProtocol {
    pub fn new(part_size: usize, read_block_size: u64) -> Result<Self> {
        if part_size == 0
            || part_size % PART_SIZE_GRANULARITY != 0
            || MAX_PART_SIZE % part_size != 0
        {
            return InvalidProtocolSnafu {
                message: format!(
                    "part size {} must be a multiple of {} dividing {}",
                    part_size, PART_SIZE_GRANULARITY, MAX_PART_SIZE
                ),
            }
            .fail();
        }

        if !is_ladder_step(read_block_size) {
            return InvalidProtocolSnafu {
                message: format!(
                    "read block size {} is not a legal block size",
                    read_block_size
                ),
            }
            .fail();
        }

        Ok(Self {
            part_size,
            read_block_size,
        })
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// The block size preferred for reads when enough bytes remain.
    pub fn read_block_size(&self) -> u64 {
        self.read_block_size
    }

    pub fn is_legal_limit(&self, limit: u64) -> bool {
        is_ladder_step(limit)
    }

    pub fn align_down(&self, offset: u64) -> u64 {
        offset - offset % ALIGNMENT
    }

    /// Smallest legal limit covering `needed` bytes, capped at [`MAX_BLOCK_SIZE`].
    pub fn round_up_limit(&self, needed: u64) -> u64 {
        let mut limit = ALIGNMENT;
        while limit < needed && limit < MAX_BLOCK_SIZE {
            limit *= 2;
        }
        limit
    }

    /// Largest legal limit not exceeding `cap`, never below [`ALIGNMENT`].
    pub fn round_down_limit(&self, cap: u64) -> u64 {
        let mut limit = ALIGNMENT;
        while limit * 2 <= cap && limit < MAX_BLOCK_SIZE {
            limit *= 2;
        }
        limit
    }

    /// Rejects block reads the remote would refuse.
    pub fn validate_read(&self, offset: u64, limit: u64) -> Result<()> {
        if offset % ALIGNMENT != 0 {
            return InvalidOffsetSnafu { offset }.fail();
        }

        if !self.is_legal_limit(limit)
            || offset / MAX_BLOCK_SIZE != (offset + limit - 1) / MAX_BLOCK_SIZE
        {
            return InvalidLimitSnafu { offset, limit }.fail();
        }

        Ok(())
    }

    /// Rejects parts that could never be legal, whatever their position.
    pub fn validate_part(&self, part_index: u32, size: usize) -> Result<()> {
        if size == 0 || size > self.part_size {
            return InvalidPartSizeSnafu {
                part_index,
                size,
                part_size: self.part_size,
            }
            .fail();
        }
        Ok(())
    }
}

fn is_ladder_step(limit: u64) -> bool {
    limit >= ALIGNMENT
        && limit <= MAX_BLOCK_SIZE
        && limit % ALIGNMENT == 0
        && (limit / ALIGNMENT).is_power_of_two()
}
