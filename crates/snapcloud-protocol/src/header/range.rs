use std::ops::Bound;

use blockstore::RangeSpec;

use headers::{Error, Header, HeaderName, HeaderValue};

/// A `Range` header holding a single byte range.
///
/// Multiple ranges and other units fail to decode, so the header gets ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeHeader(pub RangeSpec);

impl RangeHeader {
    fn from_bounds(bounds: (Bound<u64>, Bound<u64>)) -> Option<Self> {
        let spec = match bounds {
            (Bound::Included(start), Bound::Included(end)) if start <= end => {
                RangeSpec::FromTo(start, end)
            }
            (Bound::Included(start), Bound::Unbounded) => RangeSpec::From(start),
            (Bound::Unbounded, Bound::Included(n)) => RangeSpec::Suffix(n),
            _ => return None,
        };
        Some(Self(spec))
    }

    fn bounds(&self) -> (Bound<u64>, Bound<u64>) {
        match self.0 {
            RangeSpec::FromTo(start, end) => (Bound::Included(start), Bound::Included(end)),
            RangeSpec::From(start) => (Bound::Included(start), Bound::Unbounded),
            RangeSpec::Suffix(n) => (Bound::Unbounded, Bound::Included(n)),
        }
    }
}

impl Header for RangeHeader {
    fn name() -> &'static HeaderName {
        headers::Range::name()
    }

    fn decode<'i, I>(values: &mut I) -> std::result::Result<Self, Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let requested = headers::Range::decode(values)?;

        let ranges: Vec<(Bound<u64>, Bound<u64>)> = requested.iter().collect();
        if ranges.len() != 1 {
            tracing::trace!(count = ranges.len(), "only single ranges are supported");
            return Err(Error::invalid());
        }

        Self::from_bounds(ranges[0]).ok_or_else(Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(range) = headers::Range::bytes(self.bounds()) {
            range.encode(values);
        }
    }
}
