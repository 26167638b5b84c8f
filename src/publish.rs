//! Upload of written result files to S3.

use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::{DispositionError, Result};

/// Key prefix result files are uploaded under.
pub const KEY_PREFIX: &str = "dispositions";

/// Object key for `path`, with a `.gz` suffix when compressed.
pub fn object_key(path: &Path, gzip: bool) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if gzip {
        format!("{KEY_PREFIX}/{name}.gz")
    } else {
        format!("{KEY_PREFIX}/{name}")
    }
}

/// Gzip-compresses `contents` at the default level.
pub fn gzip_bytes(contents: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    encoder.finish()
}

/// Uploads the file at `path` to `bucket`, optionally gzip-compressed, and
/// returns the object key.
#[tracing::instrument(skip(client, path), fields(file = %path.display()))]
pub async fn upload_file(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    path: &Path,
    gzip: bool,
) -> Result<String> {
    let key = object_key(path, gzip);
    let target = format!("s3://{bucket}/{key}");

    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| DispositionError::write_failure(path.display(), e))?;
    let body = if gzip {
        gzip_bytes(&contents).map_err(|e| DispositionError::write_failure(&target, e))?
    } else {
        contents
    };

    client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(body))
        .send()
        .await
        .map_err(|e| DispositionError::write_failure(&target, e))?;

    info!(target = %target, "Uploaded to S3");
    Ok(key)
}

/// Uploads every file in `paths`, stopping at the first failure.
pub async fn upload_all(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    paths: &[impl AsRef<Path>],
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;
    for path in paths {
        upload_file(client, bucket, path.as_ref(), gzip).await?;
        upload_count += 1;
    }
    info!(upload_count, bucket, "S3 upload complete");
    Ok(upload_count)
}
