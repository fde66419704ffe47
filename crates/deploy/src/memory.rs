//! In-memory [`CloudProvider`] for tests and dry runs.
//!
//! Records every mutating call in order and can be told to reject one named
//! operation, the way a missing IAM permission would.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use csvlake_core::stack::{BucketSpec, CrawlerSpec, RoleSpec, WorkGroupSpec};

use crate::error::DeployError;
use crate::provider::{CloudProvider, CrawlerDescription, CrawlerStatus};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub checksum: String,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, Option<BucketSpec>>,
    objects: BTreeMap<String, BTreeMap<String, StoredObject>>,
    databases: BTreeSet<String>,
    crawlers: BTreeMap<String, (CrawlerSpec, CrawlerStatus)>,
    roles: BTreeMap<String, (RoleSpec, String)>,
    workgroups: BTreeMap<String, WorkGroupSpec>,
    calls: Vec<String>,
    fail_on: Option<String>,
}

pub struct MemoryProvider {
    account_id: String,
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Reject every subsequent call to `operation` (e.g. `"glue:StartCrawler"`).
    pub fn fail_on(&self, operation: &str) {
        self.lock().fail_on = Some(operation.to_string());
    }

    pub fn clear_failure(&self) {
        self.lock().fail_on = None;
    }

    /// Mutating calls in order, as `operation name` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(operation))
            .count()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .get(bucket)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(bucket)?.get(key).cloned()
    }

    pub fn bucket_config(&self, bucket: &str) -> Option<BucketSpec> {
        self.lock().buckets.get(bucket).cloned().flatten()
    }

    pub fn crawler(&self, name: &str) -> Option<CrawlerSpec> {
        self.lock().crawlers.get(name).map(|(spec, _)| spec.clone())
    }

    pub fn role(&self, name: &str) -> Option<RoleSpec> {
        self.lock().roles.get(name).map(|(spec, _)| spec.clone())
    }

    pub fn workgroup(&self, name: &str) -> Option<WorkGroupSpec> {
        self.lock().workgroups.get(name).cloned()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.lock().databases.contains(name)
    }

    /// Move a running crawler back to READY with the given last-crawl outcome.
    pub fn finish_crawl(&self, name: &str, outcome: &str) {
        if let Some((_, status)) = self.lock().crawlers.get_mut(name) {
            status.state = "READY".into();
            status.last_crawl_status = Some(outcome.to_string());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; keep the data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `operation` and fail it if requested.
    fn record(&self, inner: &mut Inner, operation: &'static str, target: &str) -> Result<(), DeployError> {
        if inner.fail_on.as_deref() == Some(operation) {
            return Err(DeployError::AwsSdk {
                operation,
                message: format!("AccessDenied: not authorized to perform {operation} on {target}"),
            });
        }
        inner.calls.push(format!("{operation} {target}"));
        Ok(())
    }

    fn crawler_running(operation: &'static str, name: &str) -> DeployError {
        DeployError::AwsSdk {
            operation,
            message: format!("CrawlerRunningException: {name} is already running"),
        }
    }

    fn missing(operation: &'static str, what: &str) -> DeployError {
        DeployError::AwsSdk {
            operation,
            message: format!("EntityNotFound: {what} does not exist"),
        }
    }
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    async fn account_id(&self) -> Result<String, DeployError> {
        Ok(self.account_id.clone())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError> {
        Ok(self.lock().buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "s3:CreateBucket", bucket)?;
        if inner.buckets.contains_key(bucket) {
            return Err(DeployError::AwsSdk {
                operation: "s3:CreateBucket",
                message: format!("BucketAlreadyOwnedByYou: {bucket}"),
            });
        }
        inner.buckets.insert(bucket.to_string(), None);
        inner.objects.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn configure_bucket(&self, spec: &BucketSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "s3:PutBucketConfiguration", &spec.name)?;
        match inner.buckets.get_mut(&spec.name) {
            Some(slot) => {
                *slot = Some(spec.clone());
                Ok(())
            }
            None => Err(Self::missing("s3:PutBucketConfiguration", &spec.name)),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "s3:DeleteBucket", bucket)?;
        if inner.objects.get(bucket).map(|m| !m.is_empty()).unwrap_or(false) {
            return Err(DeployError::AwsSdk {
                operation: "s3:DeleteBucket",
                message: format!("BucketNotEmpty: {bucket}"),
            });
        }
        inner.buckets.remove(bucket);
        inner.objects.remove(bucket);
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, DeployError> {
        let inner = self.lock();
        let objects = inner
            .objects
            .get(bucket)
            .ok_or_else(|| Self::missing("s3:ListObjectsV2", bucket))?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn object_checksum(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<String>, DeployError> {
        Ok(self
            .lock()
            .objects
            .get(bucket)
            .and_then(|m| m.get(key))
            .map(|o| o.checksum.clone()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        checksum: &str,
    ) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "s3:PutObject", &format!("{bucket}/{key}"))?;
        let objects = inner
            .objects
            .get_mut(bucket)
            .ok_or_else(|| Self::missing("s3:PutObject", bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                checksum: checksum.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "s3:DeleteObjects", bucket)?;
        if let Some(objects) = inner.objects.get_mut(bucket) {
            for k in keys {
                objects.remove(k);
            }
        }
        Ok(())
    }

    async fn database_exists(&self, name: &str) -> Result<bool, DeployError> {
        Ok(self.lock().databases.contains(name))
    }

    async fn create_database(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:CreateDatabase", name)?;
        inner.databases.insert(name.to_string());
        Ok(())
    }

    async fn delete_database(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:DeleteDatabase", name)?;
        if !inner.databases.remove(name) {
            return Err(Self::missing("glue:DeleteDatabase", name));
        }
        Ok(())
    }

    async fn describe_crawler(
        &self,
        name: &str,
    ) -> Result<Option<CrawlerDescription>, DeployError> {
        Ok(self
            .lock()
            .crawlers
            .get(name)
            .map(|(spec, status)| CrawlerDescription {
                spec: spec.clone(),
                status: status.clone(),
            }))
    }

    async fn create_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:CreateCrawler", &spec.name)?;
        if !inner.databases.contains(&spec.database) {
            return Err(Self::missing("glue:CreateCrawler", &spec.database));
        }
        let status = CrawlerStatus {
            state: "READY".into(),
            last_crawl_status: None,
            last_crawl_error: None,
        };
        inner.crawlers.insert(spec.name.clone(), (spec.clone(), status));
        Ok(())
    }

    async fn update_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:UpdateCrawler", &spec.name)?;
        match inner.crawlers.get_mut(&spec.name) {
            Some((_, status)) if status.is_busy() => {
                Err(Self::crawler_running("glue:UpdateCrawler", &spec.name))
            }
            Some((existing, _)) => {
                *existing = spec.clone();
                Ok(())
            }
            None => Err(Self::missing("glue:UpdateCrawler", &spec.name)),
        }
    }

    async fn start_crawler(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:StartCrawler", name)?;
        match inner.crawlers.get_mut(name) {
            Some((_, status)) if status.is_busy() => {
                Err(Self::crawler_running("glue:StartCrawler", name))
            }
            Some((_, status)) => {
                status.state = "RUNNING".into();
                Ok(())
            }
            None => Err(Self::missing("glue:StartCrawler", name)),
        }
    }

    async fn delete_crawler(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "glue:DeleteCrawler", name)?;
        if inner.crawlers.get(name).is_some_and(|(_, s)| s.is_busy()) {
            return Err(Self::crawler_running("glue:DeleteCrawler", name));
        }
        inner
            .crawlers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::missing("glue:DeleteCrawler", name))
    }

    async fn role_arn(&self, name: &str) -> Result<Option<String>, DeployError> {
        Ok(self.lock().roles.get(name).map(|(_, arn)| arn.clone()))
    }

    async fn create_role(&self, spec: &RoleSpec) -> Result<String, DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "iam:CreateRole", &spec.name)?;
        let arn = format!("arn:aws:iam::{}:role/{}", self.account_id, spec.name);
        let stored = RoleSpec {
            managed_policy_arns: Vec::new(),
            inline_policies: Vec::new(),
            ..spec.clone()
        };
        inner.roles.insert(spec.name.clone(), (stored, arn.clone()));
        Ok(arn)
    }

    async fn update_role_trust(&self, spec: &RoleSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "iam:UpdateAssumeRolePolicy", &spec.name)?;
        match inner.roles.get_mut(&spec.name) {
            Some((existing, _)) => {
                existing.trust = spec.trust.clone();
                Ok(())
            }
            None => Err(Self::missing("iam:UpdateAssumeRolePolicy", &spec.name)),
        }
    }

    async fn put_role_policies(&self, spec: &RoleSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "iam:PutRolePolicies", &spec.name)?;
        match inner.roles.get_mut(&spec.name) {
            Some((existing, _)) => {
                existing.managed_policy_arns = spec.managed_policy_arns.clone();
                existing.inline_policies = spec.inline_policies.clone();
                Ok(())
            }
            None => Err(Self::missing("iam:PutRolePolicies", &spec.name)),
        }
    }

    async fn delete_role(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "iam:DeleteRole", name)?;
        inner
            .roles
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::missing("iam:DeleteRole", name))
    }

    async fn workgroup_exists(&self, name: &str) -> Result<bool, DeployError> {
        Ok(self.lock().workgroups.contains_key(name))
    }

    async fn create_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "athena:CreateWorkGroup", &spec.name)?;
        inner.workgroups.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn update_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "athena:UpdateWorkGroup", &spec.name)?;
        match inner.workgroups.get_mut(&spec.name) {
            Some(existing) => {
                *existing = spec.clone();
                Ok(())
            }
            None => Err(Self::missing("athena:UpdateWorkGroup", &spec.name)),
        }
    }

    async fn delete_workgroup(&self, name: &str) -> Result<(), DeployError> {
        let mut inner = self.lock();
        self.record(&mut inner, "athena:DeleteWorkGroup", name)?;
        inner
            .workgroups
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::missing("athena:DeleteWorkGroup", name))
    }
}
