//! Uploading, listing and deleting files.
mod util;

use anyhow::Result;

use protocol::files::{FileInfo, ListFilesResponse};

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use util::{payload, SnapCloud};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_then_list() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let first = cluster.upload(&token, "first.txt", payload(10)).await?;
    let second = cluster.upload(&token, "second.bin", payload(3 * 4096 + 5)).await?;

    assert_eq!(first.display_name, "first.txt");
    assert_eq!(first.mime_type, "text/plain");
    assert_eq!(second.size, 3 * 4096 + 5);
    assert!(!second.has_thumbnail);

    let listing: ListFilesResponse = cluster
        .client
        .get(cluster.url("/files"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    let mut ids: Vec<_> = listing.files.iter().map(|f| f.id.clone()).collect();
    ids.sort();
    let mut expected = vec![first.id.clone(), second.id.clone()];
    expected.sort();
    assert_eq!(ids, expected);

    let fetched: FileInfo = cluster
        .client
        .get(cluster.url(format!("/files/{}", first.id)))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched, first);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_file_upload() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let file = cluster.upload(&token, "empty.txt", Vec::new()).await?;
    assert_eq!(file.size, 0);

    let resp = cluster.stream(&token, &file.id, None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.bytes().await?.is_empty());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_without_file_field() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let form = Form::new().text("comment", "no file here");
    let resp = cluster.upload_form(&token, form).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_requires_a_token() -> Result<()> {
    let cluster = SnapCloud::new().await?;

    let form = Form::new().part("file", Part::bytes(payload(10)).file_name("a.txt"));
    let resp = cluster
        .client
        .post(cluster.url("/upload"))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_thumbnail_is_served() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let thumbnail = b"\xff\xd8 small preview \xff\xd9".to_vec();
    let form = Form::new()
        .part("thumbnail", Part::bytes(thumbnail.clone()).file_name("thumb.jpg"))
        .part(
            "file",
            Part::bytes(payload(20_000))
                .file_name("holiday.mp4")
                .mime_str("video/mp4")?,
        );
    let resp = cluster.upload_form(&token, form).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let file: protocol::files::UploadResponse = resp.json().await?;
    assert!(file.file.has_thumbnail);
    assert_eq!(file.file.mime_type, "video/mp4");

    let resp = cluster
        .client
        .get(cluster.url(format!("/files/{}/thumbnail", file.file.id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/jpeg");
    assert_eq!(resp.bytes().await?.to_vec(), thumbnail);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_thumbnail_leaves_no_record() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let too_big = vec![0_u8; cluster.config.thumbnail.max_client_thumbnail + 1];
    let form = Form::new()
        .part("file", Part::bytes(payload(100)).file_name("a.jpg"))
        .part("thumbnail", Part::bytes(too_big).file_name("t.jpg"));
    let resp = cluster.upload_form(&token, form).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let listing: ListFilesResponse = cluster
        .client
        .get(cluster.url("/files"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert!(listing.files.is_empty());

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn files_are_private() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let alice = cluster.token("alice")?;
    let bob = cluster.token("bob")?;

    let file = cluster.upload(&alice, "secret.txt", payload(10)).await?;

    let resp = cluster
        .client
        .get(cluster.url(format!("/files/{}", file.id)))
        .bearer_auth(&bob)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = cluster.stream(&bob, &file.id, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    cluster.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_file() -> Result<()> {
    let cluster = SnapCloud::new().await?;
    let token = cluster.token("alice")?;

    let file = cluster.upload(&token, "a.txt", payload(10)).await?;

    let resp = cluster
        .client
        .delete(cluster.url(format!("/files/{}", file.id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = cluster.stream(&token, &file.id, None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = cluster
        .client
        .delete(cluster.url(format!("/files/{}", file.id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    cluster.stop().await?;
    Ok(())
}
