// Object store downloads into local scratch space
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use log::info;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the object `bucket/key` to `dest`, replacing it if present.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> anyhow::Result<()>;
}

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client configured from the ambient AWS environment (region, role).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> anyhow::Result<()> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("fetching s3://{bucket}/{key}"))?;

        let mut body = object.body;
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        while let Some(chunk) = body.try_next().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// Serves `<root>/<bucket>/<key>` from the local filesystem.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> anyhow::Result<()> {
        let source = self.root.join(bucket).join(key);
        tokio::fs::copy(&source, dest)
            .await
            .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
        Ok(())
    }
}

/// One object to download and the file name it lands under.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub key: String,
    pub file_name: &'static str,
}

impl Artifact {
    pub fn new(key: impl Into<String>, file_name: &'static str) -> Self {
        Self {
            key: key.into(),
            file_name,
        }
    }
}

/// Downloads every artifact into `scratch_dir`. Files already on disk are
/// kept, so a warm container does not pay for the transfer twice.
pub async fn download_artifacts<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    artifacts: &[Artifact],
    scratch_dir: &Path,
) -> anyhow::Result<usize> {
    info!("Download model files from object store");
    if tokio::fs::metadata(scratch_dir)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        info!("Folder already exists: {}", scratch_dir.display());
    } else {
        tokio::fs::create_dir_all(scratch_dir)
            .await
            .with_context(|| format!("creating {}", scratch_dir.display()))?;
        info!("Created folder: {}", scratch_dir.display());
    }

    let mut downloaded = 0;
    for artifact in artifacts {
        let dest = scratch_dir.join(artifact.file_name);
        if is_populated(&dest).await {
            info!("{} already present, skipping", dest.display());
            continue;
        }

        // a failed transfer must not leave a file that looks complete
        let partial = scratch_dir.join(format!("{}.part", artifact.file_name));
        store.fetch(bucket, &artifact.key, &partial).await?;
        tokio::fs::rename(&partial, &dest).await?;
        info!("Downloaded {} to {}", artifact.key, dest.display());
        downloaded += 1;
    }
    Ok(downloaded)
}

async fn is_populated(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}
