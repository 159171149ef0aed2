use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use interface::{SpawnSnafu, ThumbnailError, ThumbnailProducer};
use snafu::ResultExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const THUMBNAIL_SIDE: u32 = 150;
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(30);

/// Extracts the first frame of an image or video through an ffmpeg subprocess.
///
/// The sample is piped in on stdin and a square JPEG comes back on stdout, so nothing
/// touches the disk.
pub struct FfmpegThumbnailer {
    ffmpeg_path: PathBuf,
}

impl FfmpegThumbnailer {
    pub fn new<P: Into<PathBuf>>(ffmpeg_path: P) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn filter() -> String {
        format!(
            "scale={side}:{side}:force_original_aspect_ratio=increase,crop={side}:{side}",
            side = THUMBNAIL_SIDE
        )
    }

    async fn run(&self, sample: Bytes) -> Result<Bytes, ThumbnailError> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-i", "pipe:0"])
            .args(["-frames:v", "1", "-vf", Self::filter().as_str()])
            .args(["-f", "image2", "-c:v", "mjpeg", "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context(SpawnSnafu)?;

        let mut stdin = child.stdin.take().ok_or_else(|| ThumbnailError::Failed {
            message: String::from("stdin unavailable"),
        })?;

        // ffmpeg may stop reading once it has a frame; a broken pipe is expected then.
        let feeder = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&sample).await {
                tracing::trace!("thumbnailer stopped reading: {}", e);
            }
        });

        let output = child.wait_with_output().await.context(SpawnSnafu)?;
        feeder.await.ok();

        if !output.status.success() {
            return Err(ThumbnailError::Failed {
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        if output.stdout.is_empty() {
            return Err(ThumbnailError::Empty);
        }

        Ok(Bytes::from(output.stdout))
    }
}

#[async_trait]
impl ThumbnailProducer for FfmpegThumbnailer {
    fn accepts(&self, mime_type: &str) -> bool {
        mime_type.starts_with("image/") || mime_type.starts_with("video/")
    }

    #[tracing::instrument(name = "thumbnail.ffmpeg", skip(self, sample), fields(sample = sample.len()))]
    async fn produce(&self, sample: Bytes) -> Result<Bytes, ThumbnailError> {
        match tokio::time::timeout(FFMPEG_TIMEOUT, self.run(sample)).await {
            Ok(result) => result,
            Err(_) => Err(ThumbnailError::Failed {
                message: String::from("timed out"),
            }),
        }
    }
}
