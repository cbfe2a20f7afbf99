//! The artifact module fetches the build output from the pipeline's artifact store and pulls the
//! new image reference out of it.
//!
//! The artifact is a zip archive.  One entry in it (`build.out` unless configured otherwise)
//! holds the image reference as text, exactly as the build stage wrote it.

use crate::error::{self, Result};
use crate::event::{ArtifactCredentials, S3Location};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use aws_types::SdkConfig;
use log::{debug, info};
use snafu::ResultExt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use zip::ZipArchive;

/// Name given to the credentials handed to us in the job, for SDK diagnostics.
const CREDENTIALS_PROVIDER_NAME: &str = "codepipeline-artifact-credentials";

#[async_trait]
pub(crate) trait ArtifactSource {
    /// Returns the image reference stored in the artifact at `location`.
    async fn fetch_image(
        &self,
        location: &S3Location,
        credentials: &ArtifactCredentials,
    ) -> Result<String>;
}

/// Reads artifacts from S3 with the short-lived credentials from each job.
pub(crate) struct S3Artifacts {
    sdk_config: SdkConfig,
    entry: String,
    download_dir: PathBuf,
}

impl S3Artifacts {
    pub(crate) fn new<S, P>(sdk_config: SdkConfig, entry: S, download_dir: P) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            sdk_config,
            entry: entry.into(),
            download_dir: download_dir.into(),
        }
    }

    /// Builds a client that can only do what the job's credentials allow, which is reading the
    /// job's input artifacts.  Region and endpoint settings come from the shared config.
    fn client(&self, credentials: &ArtifactCredentials) -> S3Client {
        let credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .credentials_provider(credentials)
            .build();
        S3Client::from_conf(config)
    }

    /// Streams the object at `location` into a temporary file in the download directory.  The
    /// file is removed when the returned handle is dropped.
    async fn download(&self, client: &S3Client, location: &S3Location) -> Result<NamedTempFile> {
        let object = client
            .get_object()
            .bucket(&location.bucket_name)
            .key(&location.object_key)
            .send()
            .await
            .context(error::GetObjectSnafu {
                bucket: &location.bucket_name,
                key: &location.object_key,
            })?;

        let staged = tempfile::Builder::new()
            .prefix("artifact-")
            .suffix(".zip")
            .tempfile_in(&self.download_dir)
            .context(error::TempFileSnafu {
                path: &self.download_dir,
            })?;
        let path = staged.path().to_path_buf();

        let std_file = staged
            .as_file()
            .try_clone()
            .context(error::ArtifactWriteSnafu { path: &path })?;
        let mut file = tokio::fs::File::from_std(std_file);
        let mut body = object.body.into_async_read();
        let size = tokio::io::copy(&mut body, &mut file)
            .await
            .context(error::ArtifactWriteSnafu { path: &path })?;
        file.flush()
            .await
            .context(error::ArtifactWriteSnafu { path: &path })?;
        debug!("Wrote {} bytes from {} to {}", size, location, path.display());

        Ok(staged)
    }
}

#[async_trait]
impl ArtifactSource for S3Artifacts {
    async fn fetch_image(
        &self,
        location: &S3Location,
        credentials: &ArtifactCredentials,
    ) -> Result<String> {
        info!("Downloading artifact {}", location);
        let client = self.client(credentials);
        let staged = self.download(&client, location).await?;
        read_image(staged.path(), &self.entry)
    }
}

/// Reads the entry named `entry` from the zip archive at `path` as a UTF-8 string.
pub(crate) fn read_image<P>(path: P, entry: &str) -> Result<String>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).context(error::ArtifactReadSnafu { path })?;
    let mut archive = ZipArchive::new(file).context(error::ArchiveOpenSnafu { path })?;
    let mut zipped = archive
        .by_name(entry)
        .context(error::ArchiveEntrySnafu { entry, path })?;

    let mut contents = Vec::new();
    zipped
        .read_to_end(&mut contents)
        .context(error::ArchiveReadSnafu { entry, path })?;
    String::from_utf8(contents).context(error::ImageNotUtf8Snafu { entry })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::error::Error;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    /// Writes a zip archive holding the given entries and returns its path.
    pub(crate) fn write_archive(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("artifact.zip");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        for (name, contents) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn reads_image_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(
            dir.path(),
            &[
                ("imagedefinitions.json", b"[]"),
                ("build.out", b"123.dkr/app:v2"),
            ],
        );
        assert_eq!(read_image(&path, "build.out").unwrap(), "123.dkr/app:v2");
    }

    #[test]
    fn missing_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), &[("other.txt", b"hello")]);
        let err = read_image(&path, "build.out").unwrap_err();
        assert!(matches!(err, Error::ArchiveEntry { ref entry, .. } if entry == "build.out"));
    }

    #[test]
    fn not_an_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.zip");
        std::fs::write(&path, b"123.dkr/app:v2").unwrap();
        let err = read_image(&path, "build.out").unwrap_err();
        assert!(matches!(err, Error::ArchiveOpen { .. }));
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_image(dir.path().join("nope.zip"), "build.out").unwrap_err();
        assert!(matches!(err, Error::ArtifactRead { .. }));
    }

    #[test]
    fn image_must_be_utf8() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), &[("build.out", b"\xff\xfe\x00")]);
        let err = read_image(&path, "build.out").unwrap_err();
        assert!(matches!(err, Error::ImageNotUtf8 { .. }));
    }

    #[test]
    fn entry_is_not_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(dir.path(), &[("build.out", b"123.dkr/app:v2\n")]);
        assert_eq!(read_image(&path, "build.out").unwrap(), "123.dkr/app:v2\n");
    }
}
