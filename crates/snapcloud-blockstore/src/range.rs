use std::ops::Range;

/// A single byte range as a client expressed it, before the blob size is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-end`, both inclusive.
    FromTo(u64, u64),

    /// `bytes=start-`
    From(u64),

    /// `bytes=-n`: the last `n` bytes.
    Suffix(u64),
}

impl RangeSpec {
    /// Resolves the range against a blob of `size` bytes.
    ///
    /// An end past the blob is clamped to the last byte. Returns `None` when no byte of the
    /// blob is covered.
    pub fn resolve(self, size: u64) -> Option<RangeRequest> {
        if size == 0 {
            return None;
        }

        let (start, end) = match self {
            RangeSpec::FromTo(start, end) => {
                if start > end {
                    return None;
                }
                (start, end.min(size - 1))
            }
            RangeSpec::From(start) => (start, size - 1),
            RangeSpec::Suffix(0) => return None,
            RangeSpec::Suffix(n) => (size.saturating_sub(n), size - 1),
        };

        if start >= size {
            return None;
        }

        Some(RangeRequest {
            start,
            end,
            logical_size: size,
        })
    }
}

/// A satisfiable byte range: `start <= end < logical_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: u64,
    pub end: u64,
    pub logical_size: u64,
}

impl RangeRequest {
    /// The whole blob, if it has at least one byte.
    pub fn full(size: u64) -> Option<Self> {
        RangeSpec::From(0).resolve(size)
    }

    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_full(&self) -> bool {
        self.start == 0 && self.end + 1 == self.logical_size
    }

    pub fn as_range(&self) -> Range<u64> {
        self.start..self.end + 1
    }
}
