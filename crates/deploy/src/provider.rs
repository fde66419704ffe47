//! The provider API surface the deploy engine drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use csvlake_core::stack::{BucketSpec, CrawlerSpec, RoleSpec, WorkGroupSpec};

use crate::error::DeployError;

/// Crawler state as reported by `GetCrawler`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerStatus {
    /// `READY`, `RUNNING` or `STOPPING`.
    pub state: String,
    /// `SUCCEEDED`, `CANCELLED` or `FAILED` for the most recent crawl.
    pub last_crawl_status: Option<String>,
    pub last_crawl_error: Option<String>,
}

impl CrawlerStatus {
    /// Glue rejects updates and deletes while a crawl is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.state.as_str(), "RUNNING" | "STOPPING")
    }
}

/// A crawler's current definition alongside its run state.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerDescription {
    pub spec: CrawlerSpec,
    pub status: CrawlerStatus,
}

/// Thin wrapper over the cloud APIs, one method per call.
///
/// Implementations never retry or reconcile; create-or-update decisions are
/// made by the engine from the `*_exists` / `get_*` answers.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Account id of the caller's credentials.
    async fn account_id(&self) -> Result<String, DeployError>;

    // ── Object storage ────────────────────────────────────────

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), DeployError>;

    /// Apply encryption and public-access-block settings.
    async fn configure_bucket(&self, spec: &BucketSpec) -> Result<(), DeployError>;

    /// Delete an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), DeployError>;

    /// Every key under `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, DeployError>;

    /// Content checksum recorded on upload, `None` when the object is absent
    /// or was written by something else.
    async fn object_checksum(&self, bucket: &str, key: &str)
        -> Result<Option<String>, DeployError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        checksum: &str,
    ) -> Result<(), DeployError>;

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), DeployError>;

    // ── Catalog ───────────────────────────────────────────────

    async fn database_exists(&self, name: &str) -> Result<bool, DeployError>;

    async fn create_database(&self, name: &str) -> Result<(), DeployError>;

    async fn delete_database(&self, name: &str) -> Result<(), DeployError>;

    /// `None` when the crawler does not exist.
    async fn describe_crawler(&self, name: &str)
        -> Result<Option<CrawlerDescription>, DeployError>;

    async fn crawler_status(&self, name: &str) -> Result<Option<CrawlerStatus>, DeployError> {
        Ok(self.describe_crawler(name).await?.map(|d| d.status))
    }

    async fn create_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError>;

    async fn update_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError>;

    /// Fire-and-forget; completion is the crawler service's business.
    async fn start_crawler(&self, name: &str) -> Result<(), DeployError>;

    async fn delete_crawler(&self, name: &str) -> Result<(), DeployError>;

    // ── Identity ──────────────────────────────────────────────

    /// ARN of the role, `None` when it does not exist.
    async fn role_arn(&self, name: &str) -> Result<Option<String>, DeployError>;

    /// Create the role with its trust policy; returns the ARN.
    async fn create_role(&self, spec: &RoleSpec) -> Result<String, DeployError>;

    async fn update_role_trust(&self, spec: &RoleSpec) -> Result<(), DeployError>;

    /// Attach managed policies and put inline policies.
    async fn put_role_policies(&self, spec: &RoleSpec) -> Result<(), DeployError>;

    /// Detach managed policies, drop inline policies, delete the role.
    async fn delete_role(&self, name: &str) -> Result<(), DeployError>;

    // ── Query ─────────────────────────────────────────────────

    async fn workgroup_exists(&self, name: &str) -> Result<bool, DeployError>;

    async fn create_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError>;

    async fn update_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError>;

    /// Recursive delete: saved queries and history go with it.
    async fn delete_workgroup(&self, name: &str) -> Result<(), DeployError>;
}
