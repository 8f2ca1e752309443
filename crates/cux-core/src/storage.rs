//! Object-storage upload of the finished export, optionally gzipped.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::retry::{run_with_retry, RetryObserver, RetryPolicy, ServiceError};

/// Object storage seam, so upload plumbing is testable without S3.
#[async_trait]
pub trait ObjectStore {
    async fn put_file(&self, local: &Path, bucket: &str, key: &str) -> Result<(), ServiceError>;
}

/// S3-backed store.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, local: &Path, bucket: &str, key: &str) -> Result<(), ServiceError> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| ServiceError::new("LocalReadError", e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let code = e.code().unwrap_or("TransportError").to_string();
                let message = e.message().unwrap_or("put_object failed").to_string();
                ServiceError::new(code, message)
            })?;
        Ok(())
    }
}

/// Upload the export to object storage through the retry layer.
///
/// With `compress`, the CSV is gzipped next to itself first, the `.gz`
/// artifact is what gets uploaded (default key = its basename), and the
/// artifact is removed afterwards whether or not the upload succeeded.
pub async fn upload_export<S: ObjectStore>(
    store: &S,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    local: &Path,
    bucket: &str,
    key: Option<&str>,
    compress: bool,
) -> Result<()> {
    let (file_to_upload, cleanup) = if compress {
        let gz = gzip_to_sibling(local)?;
        (gz.clone(), Some(gz))
    } else {
        (local.to_path_buf(), None)
    };

    let upload_key = match key {
        Some(k) => k.to_string(),
        None => file_to_upload
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let result = run_with_retry(policy, observer, || {
        store.put_file(&file_to_upload, bucket, &upload_key)
    })
    .await;

    if let Some(gz) = cleanup {
        if let Err(e) = std::fs::remove_file(&gz) {
            tracing::warn!("could not remove {}: {}", gz.display(), e);
        }
    }

    result.with_context(|| format!("upload to s3://{}/{}", bucket, upload_key))?;
    tracing::info!(
        "uploaded {} to s3://{}/{}",
        file_to_upload.display(),
        bucket,
        upload_key
    );
    Ok(())
}

/// Gzip `path` to `path.gz` and return the artifact path.
fn gzip_to_sibling(path: &Path) -> Result<PathBuf> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut src = BufReader::new(
        File::open(path).with_context(|| format!("open {}", path.display()))?,
    );
    let dst = File::create(&gz_path).with_context(|| format!("create {}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(dst), Compression::default());
    io::copy(&mut src, &mut encoder).context("compress export")?;
    let writer = encoder.finish().context("finalize gzip stream")?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("flush gzip output")?;
    Ok(gz_path)
}
