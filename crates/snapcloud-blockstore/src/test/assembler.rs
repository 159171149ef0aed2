use std::io;

use anyhow::Result;
use bytes::Bytes;
use futures::stream;

use crate::memory::MemoryBlockStore;
use crate::{
    assemble, BlockProtocol, BlockStore, BlockStoreError, UploadAssembler, UploadError,
    UploadHandle,
};

const PART: usize = 4096;

fn small_parts() -> MemoryBlockStore {
    MemoryBlockStore::new(BlockProtocol::new(PART, 4096).unwrap())
}

fn payload(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}

/// Cuts `data` in uneven chunks so parts never line up with what the client sent.
fn chunked(data: &Bytes, chunk: usize) -> Vec<Result<Bytes, io::Error>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let end = (start + chunk).min(data.len());
        chunks.push(Ok(data.slice(start..end)));
        start = end;
    }
    chunks
}

#[tokio::test]
async fn round_trip_for_every_boundary_size() -> Result<()> {
    for len in [0, 1, PART - 1, PART, PART + 1, 5 * PART, 5 * PART + 17] {
        let store = small_parts();
        let data = payload(len);

        let body = stream::iter(chunked(&data, 1000));
        let blob = assemble(&store, body, Some(len as u64), "file.bin").await?;

        assert_eq!(blob.size, len as u64);
        assert_eq!(store.blob_data(&blob.reference).unwrap(), data);

        let writes = store.writes();
        assert_eq!(writes.len(), (len + PART - 1) / PART);
        for (i, w) in writes.iter().enumerate() {
            assert_eq!(w.part_index, i as u32);
            if i + 1 < writes.len() {
                assert_eq!(w.size, PART);
            } else {
                assert!(w.size > 0 && w.size <= PART);
            }
        }
        assert_eq!(store.pending_uploads(), 0);
    }

    Ok(())
}

#[tokio::test]
async fn chunks_larger_than_a_part_are_split() -> Result<()> {
    let store = small_parts();
    let data = payload(3 * PART + 10);

    let body = stream::iter(vec![Ok::<_, io::Error>(data.clone())]);
    let blob = assemble(&store, body, None, "big.bin").await?;

    assert_eq!(store.blob_data(&blob.reference).unwrap(), data);
    let sizes: Vec<_> = store.writes().iter().map(|w| w.size).collect();
    assert_eq!(sizes, vec![PART, PART, PART, 10]);
    Ok(())
}

#[tokio::test]
async fn body_error_aborts_without_finalizing() -> Result<()> {
    let store = small_parts();
    let data = payload(2 * PART + 5);

    let mut chunks = chunked(&data, PART);
    chunks.insert(2, Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone")));

    let err = assemble(&store, stream::iter(chunks), None, "broken.bin")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Body { .. }));
    assert_eq!(store.finalized_count(), 0);
    assert_eq!(store.blob_count(), 0);
    assert_eq!(store.pending_uploads(), 0);
    Ok(())
}

#[tokio::test]
async fn part_failure_aborts_without_finalizing() -> Result<()> {
    let store = small_parts();
    store.fail_part(1);

    let data = payload(4 * PART);
    let err = assemble(&store, stream::iter(chunked(&data, 700)), None, "x.bin")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Store { .. }));
    assert_eq!(store.finalized_count(), 0);
    assert_eq!(store.pending_uploads(), 0);

    // Nothing after the failed part reaches the store.
    let indices: Vec<_> = store.writes().iter().map(|w| w.part_index).collect();
    assert_eq!(indices, vec![0, 1]);
    Ok(())
}

#[tokio::test]
async fn finalize_failure_aborts_the_upload() -> Result<()> {
    let store = small_parts();
    store.fail_finalize();

    let data = payload(PART + 1);
    let err = assemble(&store, stream::iter(chunked(&data, PART)), None, "x.bin")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Store { .. }));
    assert_eq!(store.blob_count(), 0);
    assert_eq!(store.pending_uploads(), 0);
    Ok(())
}

#[tokio::test]
async fn explicit_abort_marks_the_upload() -> Result<()> {
    let store = small_parts();
    let mut assembler = UploadAssembler::begin(&store, Some(10)).await?;
    assembler.push(payload(10)).await?;

    let upload = *assembler.upload();
    assert_eq!(upload.total_parts, Some(1));
    assembler.abort().await;

    assert!(store.was_aborted(upload.id));
    assert_eq!(store.pending_uploads(), 0);
    Ok(())
}

#[tokio::test]
async fn store_rejects_illegal_parts() -> Result<()> {
    let store = small_parts();
    let upload = store.begin_upload(None).await?;

    let too_big = store
        .write_part(&upload, 0, payload(PART + 1))
        .await
        .unwrap_err();
    assert!(matches!(too_big, BlockStoreError::InvalidPartSize { .. }));

    let skipped = store.write_part(&upload, 1, payload(PART)).await.unwrap_err();
    assert!(matches!(skipped, BlockStoreError::PartOutOfOrder { .. }));

    store.write_part(&upload, 0, payload(10)).await?;
    let after_short = store.write_part(&upload, 1, payload(PART)).await.unwrap_err();
    assert!(matches!(after_short, BlockStoreError::PartAfterFinal { .. }));
    Ok(())
}

#[test]
fn part_size_must_divide_the_maximum() {
    assert!(BlockProtocol::new(512 * 1024, 4096).is_ok());
    assert!(BlockProtocol::new(1024, 4096).is_ok());
    assert!(BlockProtocol::new(64 * 1024, 4096).is_ok());

    assert!(BlockProtocol::new(0, 4096).is_err());
    assert!(BlockProtocol::new(1000, 4096).is_err());
    assert!(BlockProtocol::new(3 * 1024, 4096).is_err());
    assert!(BlockProtocol::new(1024 * 1024, 4096).is_err());
    assert!(BlockProtocol::new(1024, 5000).is_err());
}

#[test]
fn part_hint_rounds_up() {
    assert_eq!(UploadHandle::new(None, PART).total_parts, None);
    assert_eq!(UploadHandle::new(Some(0), PART).total_parts, Some(0));
    assert_eq!(UploadHandle::new(Some(PART as u64), PART).total_parts, Some(1));
    assert_eq!(UploadHandle::new(Some(PART as u64 + 1), PART).total_parts, Some(2));
}

#[tokio::test]
async fn huge_size_hints_saturate() -> Result<()> {
    assert_eq!(
        UploadHandle::new(Some(u64::MAX), PART).total_parts,
        Some(u32::MAX)
    );

    let store = small_parts();
    let upload = store.begin_upload(Some(u64::MAX - 10)).await?;
    assert_eq!(upload.total_parts, Some(u32::MAX));
    Ok(())
}
