//! The desired-state resource graph.
//!
//! A [`Stack`] is a flat list of resources, each with explicit `depends_on`
//! edges and implicit `references` edges (a resource that embeds another's
//! name or ARN). Deploy order is a topological walk over both.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::StackConfig;
use crate::error::CoreError;
use crate::naming;

/// Logical ids of the resources in the stack.
pub mod logical {
    pub const BUCKET: &str = "CsvBucket";
    pub const SEED: &str = "UploadCsv";
    pub const DATABASE: &str = "GlueDatabase";
    pub const CRAWLER_ROLE: &str = "GlueCrawlerRole";
    pub const CRAWLER: &str = "GlueCrawler";
    pub const WORKGROUP: &str = "AthenaWorkGroup";
    pub const DEPLOY_ROLE: &str = "GitHubDeployRole";
    pub const TRIGGER: &str = "StartCrawlerOnDeploy";
}

pub const GLUE_SERVICE_ROLE_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AWSGlueServiceRole";
pub const ADMINISTRATOR_ACCESS_POLICY: &str = "arn:aws:iam::aws:policy/AdministratorAccess";
pub const START_CRAWLER_ACTION: &str = "glue:StartCrawler";

/// Bucket read grant: the object and bucket read/list action families.
const BUCKET_READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

// ── Resources ─────────────────────────────────────────────────

/// A single resource in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub logical_id: String,
    /// Explicit ordering edges.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Implicit edges through embedded names/ARNs.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(flatten)]
    pub kind: ResourceKind,
}

impl Resource {
    fn new(logical_id: &str, kind: ResourceKind) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            depends_on: Vec::new(),
            references: Vec::new(),
            kind,
        }
    }

    fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    fn references(mut self, ids: &[&str]) -> Self {
        self.references.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    /// Every edge, explicit first, without duplicates.
    pub fn edges(&self) -> impl Iterator<Item = &str> {
        let mut seen = BTreeSet::new();
        self.depends_on
            .iter()
            .chain(self.references.iter())
            .map(String::as_str)
            .filter(move |id| seen.insert(*id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceKind {
    #[serde(rename = "bucket")]
    Bucket(BucketSpec),
    #[serde(rename = "bucket_deployment")]
    BucketDeployment(BucketDeploymentSpec),
    #[serde(rename = "glue_database")]
    GlueDatabase(DatabaseSpec),
    #[serde(rename = "glue_crawler")]
    GlueCrawler(CrawlerSpec),
    #[serde(rename = "iam_role")]
    IamRole(RoleSpec),
    #[serde(rename = "athena_workgroup")]
    AthenaWorkGroup(WorkGroupSpec),
    #[serde(rename = "crawler_trigger")]
    CrawlerTrigger(TriggerSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    /// SSE-S3 (AES256) at rest.
    pub encrypted: bool,
    /// All four public-access-block flags.
    pub block_public_access: bool,
    pub removal_policy: RemovalPolicy,
    pub auto_delete_objects: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDeploymentSpec {
    pub source_dir: PathBuf,
    pub bucket: String,
    pub destination_prefix: String,
    /// Delete objects under the prefix that are not in the source.
    pub prune: bool,
    pub retain_on_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerSpec {
    pub name: String,
    pub role_arn: String,
    pub database: String,
    pub s3_targets: Vec<String>,
    pub table_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: String,
    pub trust: TrustPolicy,
    pub managed_policy_arns: Vec<String>,
    #[serde(default)]
    pub inline_policies: Vec<InlinePolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    Service(String),
    Federated(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// IAM condition operator, e.g. `StringEquals`.
    pub operator: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub principal: Principal,
    pub action: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl TrustPolicy {
    /// Render as an IAM assume-role policy document.
    pub fn to_document(&self) -> Value {
        let principal = match &self.principal {
            Principal::Service(s) => json!({ "Service": s }),
            Principal::Federated(arn) => json!({ "Federated": arn }),
        };

        let mut statement = json!({
            "Effect": "Allow",
            "Principal": principal,
            "Action": self.action,
        });

        if !self.conditions.is_empty() {
            let mut by_operator = serde_json::Map::new();
            for c in &self.conditions {
                let entry = by_operator
                    .entry(c.operator.clone())
                    .or_insert_with(|| json!({}));
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert(c.key.clone(), Value::String(c.value.clone()));
                }
            }
            statement["Condition"] = Value::Object(by_operator);
        }

        json!({ "Version": "2012-10-17", "Statement": [statement] })
    }

    pub fn condition(&self, operator: &str, key: &str) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| c.operator == operator && c.key == key)
            .map(|c| c.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePolicy {
    pub name: String,
    pub statements: Vec<PolicyStatement>,
}

impl InlinePolicy {
    pub fn to_document(&self) -> Value {
        let statements: Vec<Value> = self
            .statements
            .iter()
            .map(|s| {
                json!({
                    "Effect": "Allow",
                    "Action": s.actions,
                    "Resource": s.resources,
                })
            })
            .collect();
        json!({ "Version": "2012-10-17", "Statement": statements })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkGroupSpec {
    pub name: String,
    pub output_location: String,
    pub enforce_configuration: bool,
}

/// One-shot `StartCrawler` call fired after the crawler exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub crawler_name: String,
    /// Change-detection key: the trigger fires again only when this changes.
    pub physical_id: String,
    /// Permission the call needs.
    pub policy: PolicyStatement,
}

/// A named value reported after deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackOutput {
    pub name: String,
    pub value: String,
    pub description: String,
}

// ── Stack ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
    pub account_id: String,
    pub region: String,
    pub resources: Vec<Resource>,
    pub outputs: Vec<StackOutput>,
}

impl Stack {
    /// Build the desired-state graph for `config` in `account_id`.
    pub fn build(config: &StackConfig, account_id: &str) -> Result<Self, CoreError> {
        let repo = config.github_repo()?;
        let stack_name = config.stack_name.as_str();
        let region = config.region.as_str();

        let bucket = config
            .bucket_name
            .clone()
            .unwrap_or_else(|| naming::bucket_name(stack_name, account_id, region));
        let database = naming::database_name(stack_name);
        let crawler = naming::crawler_name(stack_name);
        let crawler_role = naming::crawler_role_name(stack_name);
        let bucket_arn = naming::bucket_arn(&bucket);

        let removal_policy = if config.is_production() {
            RemovalPolicy::Retain
        } else {
            RemovalPolicy::Destroy
        };

        let resources = vec![
            Resource::new(
                logical::BUCKET,
                ResourceKind::Bucket(BucketSpec {
                    name: bucket.clone(),
                    encrypted: true,
                    block_public_access: true,
                    removal_policy,
                    auto_delete_objects: config.auto_delete_objects(),
                }),
            ),
            Resource::new(
                logical::SEED,
                ResourceKind::BucketDeployment(BucketDeploymentSpec {
                    source_dir: config.data_dir.clone(),
                    bucket: bucket.clone(),
                    destination_prefix: naming::SEED_PREFIX.to_string(),
                    prune: true,
                    retain_on_delete: false,
                }),
            )
            .references(&[logical::BUCKET]),
            Resource::new(
                logical::DATABASE,
                ResourceKind::GlueDatabase(DatabaseSpec {
                    name: database.clone(),
                }),
            ),
            Resource::new(
                logical::CRAWLER_ROLE,
                ResourceKind::IamRole(RoleSpec {
                    name: crawler_role.clone(),
                    trust: TrustPolicy {
                        principal: Principal::Service("glue.amazonaws.com".into()),
                        action: "sts:AssumeRole".into(),
                        conditions: Vec::new(),
                    },
                    managed_policy_arns: vec![GLUE_SERVICE_ROLE_POLICY.to_string()],
                    inline_policies: vec![InlinePolicy {
                        name: "BucketRead".into(),
                        statements: vec![PolicyStatement {
                            actions: BUCKET_READ_ACTIONS.iter().map(|a| a.to_string()).collect(),
                            resources: vec![bucket_arn.clone(), format!("{bucket_arn}/*")],
                        }],
                    }],
                }),
            )
            .references(&[logical::BUCKET]),
            Resource::new(
                logical::CRAWLER,
                ResourceKind::GlueCrawler(CrawlerSpec {
                    name: crawler.clone(),
                    role_arn: naming::role_arn(account_id, &crawler_role),
                    database: database.clone(),
                    s3_targets: vec![naming::seed_target_path(&bucket)],
                    table_prefix: naming::TABLE_PREFIX.to_string(),
                }),
            )
            .depends_on(&[logical::DATABASE])
            .references(&[logical::CRAWLER_ROLE, logical::BUCKET]),
            Resource::new(
                logical::WORKGROUP,
                ResourceKind::AthenaWorkGroup(WorkGroupSpec {
                    name: naming::workgroup_name(stack_name),
                    output_location: naming::query_results_location(&bucket),
                    enforce_configuration: true,
                }),
            )
            .references(&[logical::BUCKET]),
            Resource::new(
                logical::DEPLOY_ROLE,
                ResourceKind::IamRole(RoleSpec {
                    name: naming::deploy_role_name(stack_name),
                    trust: TrustPolicy {
                        principal: Principal::Federated(naming::oidc_provider_arn(account_id)),
                        action: "sts:AssumeRoleWithWebIdentity".into(),
                        conditions: vec![
                            Condition {
                                operator: "StringEquals".into(),
                                key: format!("{}:aud", naming::OIDC_PROVIDER_HOST),
                                value: naming::OIDC_AUDIENCE.into(),
                            },
                            Condition {
                                operator: "StringLike".into(),
                                key: format!("{}:sub", naming::OIDC_PROVIDER_HOST),
                                value: repo.subject_pattern(),
                            },
                        ],
                    },
                    managed_policy_arns: vec![ADMINISTRATOR_ACCESS_POLICY.to_string()],
                    inline_policies: Vec::new(),
                }),
            ),
            Resource::new(
                logical::TRIGGER,
                ResourceKind::CrawlerTrigger(TriggerSpec {
                    crawler_name: crawler.clone(),
                    physical_id: naming::trigger_physical_id(&crawler),
                    policy: PolicyStatement {
                        actions: vec![START_CRAWLER_ACTION.to_string()],
                        resources: vec![naming::crawler_arn(region, account_id, &crawler)],
                    },
                }),
            )
            .depends_on(&[logical::CRAWLER]),
        ];

        let outputs = vec![
            StackOutput {
                name: "BucketName".into(),
                value: bucket.clone(),
                description: "Bucket holding seeded CSV data and query results".into(),
            },
            StackOutput {
                name: "GlueDatabaseName".into(),
                value: database,
                description: "Catalog database populated by the crawler".into(),
            },
            StackOutput {
                name: "AthenaQueryResults".into(),
                value: naming::query_results_location(&bucket),
                description: "Workgroup query result location".into(),
            },
        ];

        Ok(Self {
            name: stack_name.to_string(),
            account_id: account_id.to_string(),
            region: region.to_string(),
            resources,
            outputs,
        })
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }

    pub fn bucket(&self) -> Option<&BucketSpec> {
        match &self.resource(logical::BUCKET)?.kind {
            ResourceKind::Bucket(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn seeder(&self) -> Option<&BucketDeploymentSpec> {
        match &self.resource(logical::SEED)?.kind {
            ResourceKind::BucketDeployment(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn database(&self) -> Option<&DatabaseSpec> {
        match &self.resource(logical::DATABASE)?.kind {
            ResourceKind::GlueDatabase(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn crawler(&self) -> Option<&CrawlerSpec> {
        match &self.resource(logical::CRAWLER)?.kind {
            ResourceKind::GlueCrawler(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn workgroup(&self) -> Option<&WorkGroupSpec> {
        match &self.resource(logical::WORKGROUP)?.kind {
            ResourceKind::AthenaWorkGroup(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn role(&self, logical_id: &str) -> Option<&RoleSpec> {
        match &self.resource(logical_id)?.kind {
            ResourceKind::IamRole(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn trigger(&self) -> Option<&TriggerSpec> {
        match &self.resource(logical::TRIGGER)?.kind {
            ResourceKind::CrawlerTrigger(spec) => Some(spec),
            _ => None,
        }
    }

    /// Topological order over all edges. Ties keep declaration order.
    pub fn deploy_order(&self) -> Result<Vec<&Resource>, CoreError> {
        let index: HashMap<&str, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.logical_id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.resources.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.resources.len()];

        for (i, resource) in self.resources.iter().enumerate() {
            for dep in resource.edges() {
                let j = *index.get(dep).ok_or_else(|| CoreError::UnknownDependency {
                    resource: resource.logical_id.clone(),
                    dependency: dep.to_string(),
                })?;
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }

        // Ready set ordered by declaration index.
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.resources.len());

        while let Some(i) = ready.pop_first() {
            order.push(&self.resources[i]);
            for &k in &dependents[i] {
                in_degree[k] -= 1;
                if in_degree[k] == 0 {
                    ready.insert(k);
                }
            }
        }

        if order.len() != self.resources.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(i, _)| self.resources[i].logical_id.as_str())
                .collect();
            return Err(CoreError::DependencyCycle(stuck.join(", ")));
        }

        Ok(order)
    }

    /// Reverse of [`Stack::deploy_order`]: dependents go first.
    pub fn teardown_order(&self) -> Result<Vec<&Resource>, CoreError> {
        let mut order = self.deploy_order()?;
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StackConfig {
        StackConfig {
            profile: String::new(),
            stack_name: "CdkS3CsvStack".into(),
            region: "us-east-1".into(),
            account_id: None,
            data_dir: PathBuf::from("data"),
            bucket_name: Some("lake-bucket".into()),
            github_repo: Some("acme/lake".into()),
            auto_delete_objects: None,
            state_dir: PathBuf::from(".csvlake"),
        }
    }

    fn ids(order: &[&Resource]) -> Vec<String> {
        order.iter().map(|r| r.logical_id.clone()).collect()
    }

    #[test]
    fn build_requires_repo() {
        let mut cfg = config();
        cfg.github_repo = None;
        assert!(matches!(
            Stack::build(&cfg, "123456789012"),
            Err(CoreError::MissingSetting(_))
        ));
    }

    #[test]
    fn crawler_scans_the_seeded_prefix() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let crawler = stack.crawler().unwrap();
        let seeder = stack.seeder().unwrap();

        assert_eq!(crawler.s3_targets, vec!["s3://lake-bucket/seed/".to_string()]);
        assert_eq!(seeder.destination_prefix, "seed/");
        assert_eq!(seeder.bucket, "lake-bucket");
        assert_eq!(crawler.table_prefix, "seed_");
        assert_eq!(crawler.database, "cdks3csvstack_db");
        assert_eq!(
            crawler.role_arn,
            "arn:aws:iam::123456789012:role/CdkS3CsvStack-GlueCrawlerRole"
        );
    }

    #[test]
    fn outputs_are_declared() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        assert_eq!(stack.output("BucketName"), Some("lake-bucket"));
        assert_eq!(stack.output("GlueDatabaseName"), Some("cdks3csvstack_db"));
        assert_eq!(
            stack.output("AthenaQueryResults"),
            Some("s3://lake-bucket/athena-results/")
        );
    }

    #[test]
    fn derived_bucket_name_when_not_configured() {
        let mut cfg = config();
        cfg.bucket_name = None;
        let stack = Stack::build(&cfg, "123456789012").unwrap();
        assert_eq!(
            stack.bucket().unwrap().name,
            naming::bucket_name("CdkS3CsvStack", "123456789012", "us-east-1")
        );
    }

    #[test]
    fn production_retains_bucket() {
        let mut cfg = config();
        cfg.profile = "PROD".into();
        let stack = Stack::build(&cfg, "123456789012").unwrap();
        let bucket = stack.bucket().unwrap();
        assert_eq!(bucket.removal_policy, RemovalPolicy::Retain);
        assert!(!bucket.auto_delete_objects);

        let dev = Stack::build(&config(), "123456789012").unwrap();
        assert_eq!(dev.bucket().unwrap().removal_policy, RemovalPolicy::Destroy);
        assert!(dev.bucket().unwrap().auto_delete_objects);
    }

    #[test]
    fn deploy_order_respects_edges() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let order = ids(&stack.deploy_order().unwrap());

        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert_eq!(order.len(), 8);
        assert!(pos(logical::BUCKET) < pos(logical::SEED));
        assert!(pos(logical::DATABASE) < pos(logical::CRAWLER));
        assert!(pos(logical::CRAWLER_ROLE) < pos(logical::CRAWLER));
        assert!(pos(logical::CRAWLER) < pos(logical::TRIGGER));
        assert!(pos(logical::BUCKET) < pos(logical::WORKGROUP));
    }

    #[test]
    fn teardown_is_reverse_of_deploy() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let mut deploy = ids(&stack.deploy_order().unwrap());
        deploy.reverse();
        assert_eq!(ids(&stack.teardown_order().unwrap()), deploy);
        assert_eq!(deploy.first().map(String::as_str), Some(logical::TRIGGER));
    }

    #[test]
    fn trigger_depends_on_crawler_explicitly() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let trigger = stack.resource(logical::TRIGGER).unwrap();
        assert_eq!(trigger.depends_on, vec![logical::CRAWLER.to_string()]);
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let mut stack = Stack::build(&config(), "123456789012").unwrap();
        stack.resources[0].depends_on.push("Nope".into());
        assert!(matches!(
            stack.deploy_order(),
            Err(CoreError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn cycle_is_reported() {
        let mut stack = Stack::build(&config(), "123456789012").unwrap();
        stack.resources[0].depends_on.push(logical::SEED.into());
        let err = stack.deploy_order().unwrap_err();
        assert!(matches!(err, CoreError::DependencyCycle(_)));
        assert!(err.to_string().contains(logical::BUCKET));
    }

    #[test]
    fn deploy_role_trust_document() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let role = stack.role(logical::DEPLOY_ROLE).unwrap();
        let doc = role.trust.to_document();
        let stmt = &doc["Statement"][0];

        assert_eq!(stmt["Action"], "sts:AssumeRoleWithWebIdentity");
        assert_eq!(
            stmt["Principal"]["Federated"],
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
        );
        assert_eq!(
            stmt["Condition"]["StringEquals"]["token.actions.githubusercontent.com:aud"],
            "sts.amazonaws.com"
        );
        assert_eq!(
            stmt["Condition"]["StringLike"]["token.actions.githubusercontent.com:sub"],
            "repo:acme/lake:*"
        );
        assert_eq!(role.managed_policy_arns, vec![ADMINISTRATOR_ACCESS_POLICY]);
    }

    #[test]
    fn crawler_role_reads_bucket() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let role = stack.role(logical::CRAWLER_ROLE).unwrap();
        assert_eq!(role.trust.principal, Principal::Service("glue.amazonaws.com".into()));
        assert!(role.trust.to_document()["Statement"][0].get("Condition").is_none());

        let doc = role.inline_policies[0].to_document();
        let resources = doc["Statement"][0]["Resource"].as_array().unwrap();
        assert_eq!(resources[0], "arn:aws:s3:::lake-bucket");
        assert_eq!(resources[1], "arn:aws:s3:::lake-bucket/*");
    }

    #[test]
    fn serde_roundtrip_keeps_kind_tag() {
        let stack = Stack::build(&config(), "123456789012").unwrap();
        let value = serde_json::to_value(stack.resource(logical::DATABASE).unwrap()).unwrap();
        assert_eq!(value["type"], "glue_database");
        assert_eq!(value["name"], "cdks3csvstack_db");
    }
}
