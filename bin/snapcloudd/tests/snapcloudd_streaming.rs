//! Streaming files back, with and without ranges.
mod util;

use anyhow::Result;

use reqwest::StatusCode;

use util::{payload, SnapCloud};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_file_without_range() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(50_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster.stream(&token, &file.id, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-length"], "50000");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert!(resp.headers().get("content-range").is_none());
    assert_eq!(resp.bytes().await?.to_vec(), data);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn middle_range() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(50_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster
        .stream(&token, &file.id, Some("bytes=1000-2000"))
        .await?;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()["content-range"], "bytes 1000-2000/50000");
    assert_eq!(resp.headers()["content-length"], "1001");
    assert_eq!(resp.bytes().await?.to_vec(), data[1000..2001].to_vec());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_ended_tail_range() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(10_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster.stream(&token, &file.id, Some("bytes=9990-")).await?;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()["content-range"], "bytes 9990-9999/10000");
    assert_eq!(resp.headers()["content-length"], "10");
    assert_eq!(resp.bytes().await?.to_vec(), data[9990..].to_vec());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn suffix_range() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(30_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster.stream(&token, &file.id, Some("bytes=-500")).await?;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()["content-range"], "bytes 29500-29999/30000");
    assert_eq!(resp.bytes().await?.to_vec(), data[29_500..].to_vec());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn range_end_is_clamped() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(10_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster
        .stream(&token, &file.id, Some("bytes=9000-20000"))
        .await?;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()["content-range"], "bytes 9000-9999/10000");
    assert_eq!(resp.bytes().await?.to_vec(), data[9000..].to_vec());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn range_past_the_end() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let file = cluster.upload(&token, "clip.bin", payload(10_000)).await?;

    let resp = cluster
        .stream(&token, &file.id, Some("bytes=10000-"))
        .await?;
    assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(resp.headers()["content-range"], "bytes */10000");

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsupported_range_serves_everything() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(5_000);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster
        .stream(&token, &file.id, Some("bytes=0-10,20-30"))
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.bytes().await?.to_vec(), data);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_in_query() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;
    let data = payload(100);
    let file = cluster.upload(&token, "clip.bin", data.clone()).await?;

    let resp = cluster
        .client
        .get(cluster.url(format!("/stream/{}?token={}", file.id, token)))
        .header("range", "bytes=10-19")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.bytes().await?.to_vec(), data[10..20].to_vec());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_file() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let resp = cluster.stream(&token, "does-not-exist", None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    cluster.stop().await?;
    Ok(())
}
