use std::pin::Pin;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::error::{OversizedBlockSnafu, TruncatedSnafu};
use crate::{
    compute_next_block_window, BlobReference, BlockProtocol, DynBlockStore, RangeRequest,
    Result, RetryPolicy,
};

/// A boxed stream of blob bytes.
pub type BlockStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// Serves byte ranges out of a store that only reads aligned, ladder-sized blocks.
#[derive(Clone)]
pub struct RangeProxy {
    store: DynBlockStore,
    retry: RetryPolicy,
}

impl RangeProxy {
    pub fn new(store: DynBlockStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn cursor(&self, reference: BlobReference, range: RangeRequest) -> RangeCursor {
        let protocol = *self.store.protocol();
        let offset = protocol.align_down(range.start);

        RangeCursor {
            store: self.store.clone(),
            protocol,
            retry: self.retry,
            reference,
            range,
            offset,
            initial_skip: range.start - offset,
            state: CursorState::Aligning,
        }
    }

    /// Fetches the first block before handing back the stream.
    ///
    /// Lets the caller report a failing blob before it committed to a response.
    #[tracing::instrument(name = "proxy.open", level = "debug", skip(self), fields(reference = %reference))]
    pub async fn open(&self, reference: BlobReference, range: RangeRequest) -> Result<BlockStream> {
        let mut cursor = self.cursor(reference, range);
        let first = cursor.next_chunk().await?;

        let head = stream::iter(first.map(Ok));
        Ok(Box::pin(head.chain(cursor.into_stream())))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorState {
    Aligning,
    Fetching,
    Done,
}

/// Walks one range, block by block.
///
/// Reads are issued strictly in increasing offset order and only when the next chunk is
/// requested; dropping the cursor stops all remote traffic.
pub struct RangeCursor {
    store: DynBlockStore,
    protocol: BlockProtocol,
    retry: RetryPolicy,
    reference: BlobReference,
    range: RangeRequest,
    offset: u64,
    initial_skip: u64,
    state: CursorState,
}

impl RangeCursor {
    /// Returns the next trimmed chunk of the range, or `None` once it is exhausted.
    ///
    /// A blob shorter than `range.logical_size` ends the range early without error.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.state == CursorState::Done {
                return Ok(None);
            }

            let window = match compute_next_block_window(
                &self.protocol,
                self.offset,
                self.range.end,
                self.range.logical_size,
            ) {
                Some(w) => w,
                None => {
                    self.state = CursorState::Done;
                    return Ok(None);
                }
            };

            let store = &self.store;
            let reference = &self.reference;
            let read = self
                .retry
                .run(move || store.read_block(reference, window.offset, window.limit))
                .await;

            let block = match read {
                Ok(block) => block,
                Err(e) => {
                    self.state = CursorState::Done;
                    return Err(e);
                }
            };

            if block.len() as u64 > window.limit {
                self.state = CursorState::Done;
                return OversizedBlockSnafu {
                    limit: window.limit,
                    got: block.len(),
                }
                .fail();
            }

            if block.is_empty() {
                tracing::trace!(offset = window.offset, "remote signaled end of blob");
                self.state = CursorState::Done;
                return Ok(None);
            }

            let raw_len = block.len() as u64;
            let skip = if self.state == CursorState::Aligning {
                self.initial_skip
            } else {
                0
            };
            let keep_end = raw_len.min(self.range.end + 1 - window.offset);

            self.offset = window.offset + raw_len;
            self.state = if raw_len < window.limit || self.offset > self.range.end {
                CursorState::Done
            } else {
                CursorState::Fetching
            };

            tracing::trace!(
                offset = window.offset,
                limit = window.limit,
                received = raw_len,
                skip = skip,
                keep_end = keep_end,
                "fetched block"
            );

            if skip < keep_end {
                return Ok(Some(block.slice(skip as usize..keep_end as usize)));
            }
        }
    }

    pub fn into_stream(self) -> BlockStream {
        Box::pin(stream::try_unfold(self, |mut cursor| async move {
            Ok(cursor.next_chunk().await?.map(|chunk| (chunk, cursor)))
        }))
    }
}

/// Fails the stream if it ends before exactly `expected` bytes went through.
///
/// Used once a response announced its length: a short body must turn into an error so
/// the connection gets torn down rather than silently cut short.
pub fn exact_length(inner: BlockStream, expected: u64) -> BlockStream {
    Box::pin(stream::try_unfold(
        (inner, 0_u64),
        move |(mut inner, sent)| async move {
            match inner.next().await {
                Some(Ok(chunk)) => {
                    let sent = sent + chunk.len() as u64;
                    Ok(Some((chunk, (inner, sent))))
                }
                Some(Err(e)) => Err(e),
                None if sent == expected => Ok(None),
                None => TruncatedSnafu {
                    expected,
                    got: sent,
                }
                .fail(),
            }
        },
    ))
}
