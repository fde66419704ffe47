//! Mirror a local directory under a bucket prefix.
//!
//! Every regular file below the source directory lands at
//! `<prefix><relative path>`; keys under the prefix with no source file are
//! pruned. Files whose sha256 matches the checksum recorded on the existing
//! object are skipped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use walkdir::WalkDir;

use csvlake_core::stack::BucketDeploymentSpec;

use crate::error::DeployError;
use crate::provider::CloudProvider;

/// User metadata key holding the uploaded content's sha256.
pub const CHECKSUM_METADATA_KEY: &str = "csvlake-sha256";

/// A local file and the key suffix it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFile {
    pub path: PathBuf,
    /// Path relative to the source directory, `/`-separated.
    pub relative_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub uploaded: usize,
    pub unchanged: usize,
    pub pruned: usize,
}

/// Regular files under `dir`, sorted by key.
pub fn collect_files(dir: &Path) -> Result<Vec<SeedFile>, DeployError> {
    if !dir.is_dir() {
        return Err(DeployError::SeedSourceMissing(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| DeployError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| DeployError::Other(format!("walk outside source dir: {e}")))?;
        let relative_key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(SeedFile {
            path: entry.path().to_path_buf(),
            relative_key,
        });
    }

    files.sort_by(|a, b| a.relative_key.cmp(&b.relative_key));
    Ok(files)
}

pub fn content_type(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

pub fn checksum(body: &[u8]) -> String {
    format!("{:x}", Sha256::digest(body))
}

/// Normalise a key prefix to end in exactly one `/` (empty stays empty).
fn normalise_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

pub struct Seeder;

impl Seeder {
    /// Upload `spec.source_dir` to `s3://<bucket>/<prefix>` and prune stale keys.
    pub async fn sync(
        provider: &dyn CloudProvider,
        spec: &BucketDeploymentSpec,
    ) -> Result<SeedReport, DeployError> {
        let prefix = normalise_prefix(&spec.destination_prefix);
        let files = collect_files(&spec.source_dir)?;
        let mut report = SeedReport::default();
        let mut wanted = BTreeSet::new();

        for file in &files {
            let key = format!("{prefix}{}", file.relative_key);
            let body = tokio::fs::read(&file.path).await?;
            let sum = checksum(&body);

            if provider.object_checksum(&spec.bucket, &key).await?.as_deref() == Some(sum.as_str()) {
                debug!(key = %key, "seed object unchanged");
                report.unchanged += 1;
            } else {
                provider
                    .put_object(&spec.bucket, &key, body, content_type(&key), &sum)
                    .await?;
                report.uploaded += 1;
            }
            wanted.insert(key);
        }

        if spec.prune {
            let stale: Vec<String> = provider
                .list_objects(&spec.bucket, &prefix)
                .await?
                .into_iter()
                .filter(|k| !wanted.contains(k))
                .collect();
            if !stale.is_empty() {
                provider.delete_objects(&spec.bucket, &stale).await?;
            }
            report.pruned = stale.len();
        }

        info!(
            bucket = %spec.bucket,
            prefix = %prefix,
            uploaded = report.uploaded,
            unchanged = report.unchanged,
            pruned = report.pruned,
            "seed data synced"
        );
        Ok(report)
    }
}
