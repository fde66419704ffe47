//! Deploy and destroy a [`Stack`] against a [`CloudProvider`].
//!
//! Resources are applied one at a time in dependency order. State is saved
//! after every resource so a failed run keeps what it already applied; there
//! is no rollback.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use csvlake_core::stack::{
    BucketSpec, CrawlerSpec, RemovalPolicy, Resource, ResourceKind, RoleSpec, Stack, StackOutput,
    TriggerSpec, WorkGroupSpec,
};

use crate::error::DeployError;
use crate::provider::CloudProvider;
use crate::seed::{SeedReport, Seeder};
use crate::state::{DeploymentState, StateStore};

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Unchanged,
    Seeded(SeedReport),
    /// The crawler-start call was made.
    Triggered,
    Deleted,
    Emptied { objects: usize },
    Retained,
    /// Nothing to tear down.
    Absent,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
            Action::Unchanged => write!(f, "unchanged"),
            Action::Seeded(r) => write!(
                f,
                "seeded ({} uploaded, {} unchanged, {} pruned)",
                r.uploaded, r.unchanged, r.pruned
            ),
            Action::Triggered => write!(f, "triggered"),
            Action::Deleted => write!(f, "deleted"),
            Action::Emptied { objects } => write!(f, "emptied ({objects} objects) and deleted"),
            Action::Retained => write!(f, "retained"),
            Action::Absent => write!(f, "absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAction {
    pub logical_id: String,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub actions: Vec<ResourceAction>,
    pub outputs: Vec<StackOutput>,
}

impl DeployReport {
    pub fn action(&self, logical_id: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.logical_id == logical_id)
            .map(|a| &a.action)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DestroyReport {
    pub actions: Vec<ResourceAction>,
}

impl DestroyReport {
    pub fn action(&self, logical_id: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.logical_id == logical_id)
            .map(|a| &a.action)
    }
}

/// The provisioning engine.
pub struct Deployer {
    provider: Arc<dyn CloudProvider>,
    store: StateStore,
}

impl Deployer {
    pub fn new(provider: Arc<dyn CloudProvider>, store: StateStore) -> Self {
        Self { provider, store }
    }

    /// Bring every resource to its desired state, then report outputs.
    pub async fn deploy(&self, stack: &Stack) -> Result<DeployReport, DeployError> {
        let order = stack.deploy_order()?;
        let mut state = self.store.load()?;
        if !state.stack_name.is_empty()
            && (state.account_id != stack.account_id || state.region != stack.region)
        {
            return Err(DeployError::Other(format!(
                "state file {} belongs to account {} in {}, not {} in {}",
                self.store.path().display(),
                state.account_id,
                state.region,
                stack.account_id,
                stack.region
            )));
        }
        state.stack_name = stack.name.clone();
        state.account_id = stack.account_id.clone();
        state.region = stack.region.clone();

        info!(
            stack = %stack.name,
            resources = order.len(),
            "deploy starting"
        );

        let mut actions = Vec::with_capacity(order.len());
        for resource in order {
            let action = self
                .apply(resource, &mut state)
                .await
                .map_err(|e| e.at(&resource.logical_id))?;
            info!(resource = %resource.logical_id, action = %action, "resource applied");
            actions.push(ResourceAction {
                logical_id: resource.logical_id.clone(),
                action,
            });
            self.store.save(&state)?;
        }

        info!(stack = %stack.name, "deploy complete");
        Ok(DeployReport {
            actions,
            outputs: stack.outputs.clone(),
        })
    }

    /// Tear everything down in reverse dependency order.
    pub async fn destroy(&self, stack: &Stack) -> Result<DestroyReport, DeployError> {
        let order = stack.teardown_order()?;
        let mut state = self.store.load()?;

        info!(stack = %stack.name, resources = order.len(), "destroy starting");

        let mut actions = Vec::with_capacity(order.len());
        for resource in order {
            let action = self
                .remove(resource, &mut state)
                .await
                .map_err(|e| e.at(&resource.logical_id))?;
            info!(resource = %resource.logical_id, action = %action, "resource removed");
            state.resources.remove(&resource.logical_id);
            actions.push(ResourceAction {
                logical_id: resource.logical_id.clone(),
                action,
            });
            self.store.save(&state)?;
        }

        self.store.remove()?;
        info!(stack = %stack.name, "destroy complete");
        Ok(DestroyReport { actions })
    }

    // ── Apply ─────────────────────────────────────────────────

    async fn apply(
        &self,
        resource: &Resource,
        state: &mut DeploymentState,
    ) -> Result<Action, DeployError> {
        let (physical_id, action) = match &resource.kind {
            ResourceKind::Bucket(spec) => (spec.name.clone(), self.apply_bucket(spec).await?),
            ResourceKind::BucketDeployment(spec) => {
                let report = Seeder::sync(self.provider.as_ref(), spec).await?;
                (
                    format!("s3://{}/{}", spec.bucket, spec.destination_prefix),
                    Action::Seeded(report),
                )
            }
            ResourceKind::GlueDatabase(spec) => {
                let action = if self.provider.database_exists(&spec.name).await? {
                    Action::Unchanged
                } else {
                    self.provider.create_database(&spec.name).await?;
                    Action::Created
                };
                (spec.name.clone(), action)
            }
            ResourceKind::IamRole(spec) => self.apply_role(spec).await?,
            ResourceKind::GlueCrawler(spec) => {
                let action = self.apply_crawler(spec).await?;
                if action == Action::Created {
                    // A new crawler has never run, whatever the state file says.
                    state.trigger_applied = None;
                }
                (spec.name.clone(), action)
            }
            ResourceKind::AthenaWorkGroup(spec) => {
                (spec.name.clone(), self.apply_workgroup(spec).await?)
            }
            ResourceKind::CrawlerTrigger(spec) => {
                (spec.physical_id.clone(), self.apply_trigger(spec, state).await?)
            }
        };

        state
            .resources
            .insert(resource.logical_id.clone(), physical_id);
        Ok(action)
    }

    async fn apply_bucket(&self, spec: &BucketSpec) -> Result<Action, DeployError> {
        let action = if self.provider.bucket_exists(&spec.name).await? {
            Action::Updated
        } else {
            self.provider.create_bucket(&spec.name).await?;
            Action::Created
        };
        self.provider.configure_bucket(spec).await?;
        Ok(action)
    }

    async fn apply_role(&self, spec: &RoleSpec) -> Result<(String, Action), DeployError> {
        let (arn, action) = match self.provider.role_arn(&spec.name).await? {
            Some(arn) => {
                self.provider.update_role_trust(spec).await?;
                (arn, Action::Updated)
            }
            None => (self.provider.create_role(spec).await?, Action::Created),
        };
        self.provider.put_role_policies(spec).await?;
        Ok((arn, action))
    }

    /// Update only on drift: Glue refuses `UpdateCrawler` mid-crawl.
    async fn apply_crawler(&self, spec: &CrawlerSpec) -> Result<Action, DeployError> {
        match self.provider.describe_crawler(&spec.name).await? {
            None => {
                self.provider.create_crawler(spec).await?;
                Ok(Action::Created)
            }
            Some(current) if crawler_matches(&current.spec, spec) => Ok(Action::Unchanged),
            Some(current) if current.status.is_busy() => Err(DeployError::CrawlerBusy {
                name: spec.name.clone(),
                state: current.status.state,
            }),
            Some(_) => {
                self.provider.update_crawler(spec).await?;
                Ok(Action::Updated)
            }
        }
    }

    async fn apply_workgroup(&self, spec: &WorkGroupSpec) -> Result<Action, DeployError> {
        if self.provider.workgroup_exists(&spec.name).await? {
            self.provider.update_workgroup(spec).await?;
            Ok(Action::Updated)
        } else {
            self.provider.create_workgroup(spec).await?;
            Ok(Action::Created)
        }
    }

    /// Fires once per distinct physical id. A rejected start call fails the
    /// deploy and leaves the trigger unrecorded, so the next run retries it.
    async fn apply_trigger(
        &self,
        spec: &TriggerSpec,
        state: &mut DeploymentState,
    ) -> Result<Action, DeployError> {
        if state.trigger_applied.as_deref() == Some(spec.physical_id.as_str()) {
            return Ok(Action::Unchanged);
        }
        self.provider.start_crawler(&spec.crawler_name).await?;
        state.trigger_applied = Some(spec.physical_id.clone());
        Ok(Action::Triggered)
    }

    // ── Remove ────────────────────────────────────────────────

    async fn remove(
        &self,
        resource: &Resource,
        state: &mut DeploymentState,
    ) -> Result<Action, DeployError> {
        match &resource.kind {
            ResourceKind::CrawlerTrigger(_) => {
                // Nothing to delete provider-side; forgetting it re-arms the trigger.
                Ok(if state.trigger_applied.take().is_some() {
                    Action::Deleted
                } else {
                    Action::Absent
                })
            }
            ResourceKind::AthenaWorkGroup(spec) => {
                if self.provider.workgroup_exists(&spec.name).await? {
                    self.provider.delete_workgroup(&spec.name).await?;
                    Ok(Action::Deleted)
                } else {
                    Ok(Action::Absent)
                }
            }
            ResourceKind::IamRole(spec) => {
                if self.provider.role_arn(&spec.name).await?.is_some() {
                    self.provider.delete_role(&spec.name).await?;
                    Ok(Action::Deleted)
                } else {
                    Ok(Action::Absent)
                }
            }
            ResourceKind::GlueCrawler(spec) => self.remove_crawler(&spec.name).await,
            ResourceKind::GlueDatabase(spec) => {
                if self.provider.database_exists(&spec.name).await? {
                    self.provider.delete_database(&spec.name).await?;
                    Ok(Action::Deleted)
                } else {
                    Ok(Action::Absent)
                }
            }
            // Seeded objects follow the bucket's own removal policy.
            ResourceKind::BucketDeployment(_) => Ok(Action::Retained),
            ResourceKind::Bucket(spec) => self.remove_bucket(spec).await,
        }
    }

    async fn remove_crawler(&self, name: &str) -> Result<Action, DeployError> {
        match self.provider.crawler_status(name).await? {
            None => Ok(Action::Absent),
            Some(status) if status.is_busy() => Err(DeployError::CrawlerBusy {
                name: name.to_string(),
                state: status.state,
            }),
            Some(_) => {
                self.provider.delete_crawler(name).await?;
                Ok(Action::Deleted)
            }
        }
    }

    async fn remove_bucket(&self, spec: &BucketSpec) -> Result<Action, DeployError> {
        if spec.removal_policy == RemovalPolicy::Retain {
            info!(bucket = %spec.name, "bucket retained by removal policy");
            return Ok(Action::Retained);
        }
        if !self.provider.bucket_exists(&spec.name).await? {
            return Ok(Action::Absent);
        }

        let keys = self.provider.list_objects(&spec.name, "").await?;
        if keys.is_empty() {
            self.provider.delete_bucket(&spec.name).await?;
            return Ok(Action::Deleted);
        }
        if !spec.auto_delete_objects {
            warn!(bucket = %spec.name, objects = keys.len(), "bucket not empty, refusing to delete");
            return Err(DeployError::BucketNotEmpty(spec.name.clone()));
        }

        warn!(bucket = %spec.name, objects = keys.len(), "deleting bucket contents");
        self.provider.delete_objects(&spec.name, &keys).await?;
        self.provider.delete_bucket(&spec.name).await?;
        Ok(Action::Emptied {
            objects: keys.len(),
        })
    }
}

/// Glue may report the role by name or by ARN.
fn crawler_matches(current: &CrawlerSpec, desired: &CrawlerSpec) -> bool {
    fn role_name(role: &str) -> &str {
        role.rsplit('/').next().unwrap_or(role)
    }
    let mut have = current.s3_targets.clone();
    let mut want = desired.s3_targets.clone();
    have.sort();
    want.sort();

    role_name(&current.role_arn) == role_name(&desired.role_arn)
        && current.database == desired.database
        && current.table_prefix == desired.table_prefix
        && have == want
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler() -> CrawlerSpec {
        CrawlerSpec {
            name: "lake-seed-crawler".into(),
            role_arn: "arn:aws:iam::123456789012:role/Lake-GlueCrawlerRole".into(),
            database: "lake_db".into(),
            s3_targets: vec!["s3://lake/seed/".into()],
            table_prefix: "seed_".into(),
        }
    }

    #[test]
    fn crawler_role_compares_by_name() {
        let mut reported = crawler();
        reported.role_arn = "Lake-GlueCrawlerRole".into();
        assert!(crawler_matches(&reported, &crawler()));
    }

    #[test]
    fn crawler_drift_is_detected() {
        let mut moved = crawler();
        moved.s3_targets = vec!["s3://lake/other/".into()];
        assert!(!crawler_matches(&moved, &crawler()));

        let mut renamed = crawler();
        renamed.table_prefix = "raw_".into();
        assert!(!crawler_matches(&renamed, &crawler()));
    }
}
