//! [`CloudProvider`] backed by the AWS SDK.
//!
//! One client per service, all built from a single shared SDK config so the
//! region and credential chain are resolved once.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_types::region::Region;
use tracing::{debug, info};

use csvlake_core::stack::{BucketSpec, CrawlerSpec, RoleSpec, WorkGroupSpec};

use crate::error::DeployError;
use crate::provider::{CloudProvider, CrawlerDescription, CrawlerStatus};
use crate::seed::CHECKSUM_METADATA_KEY;

/// S3 `DeleteObjects` accepts at most this many keys per request.
const DELETE_BATCH: usize = 1000;

/// The region that rejects an explicit location constraint.
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Map an SDK error to [`DeployError::AwsSdk`], keeping the full provider
/// message (error code and text) rather than the top-level summary.
fn sdk_err<E: std::error::Error>(operation: &'static str) -> impl Fn(E) -> DeployError {
    move |e| DeployError::AwsSdk {
        operation,
        message: DisplayErrorContext(e).to_string(),
    }
}

pub struct AwsProvider {
    region: String,
    s3: aws_sdk_s3::Client,
    glue: aws_sdk_glue::Client,
    iam: aws_sdk_iam::Client,
    athena: aws_sdk_athena::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsProvider {
    /// Load the default credential chain for `region`.
    pub async fn new(region: &str) -> Self {
        let aws_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        info!(region = %region, "AWS provider initialised");

        Self {
            region: region.to_string(),
            s3: aws_sdk_s3::Client::new(&aws_cfg),
            glue: aws_sdk_glue::Client::new(&aws_cfg),
            iam: aws_sdk_iam::Client::new(&aws_cfg),
            athena: aws_sdk_athena::Client::new(&aws_cfg),
            sts: aws_sdk_sts::Client::new(&aws_cfg),
        }
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn account_id(&self) -> Result<String, DeployError> {
        let resp = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(sdk_err("sts:GetCallerIdentity"))?;

        resp.account()
            .map(str::to_string)
            .ok_or_else(|| DeployError::AwsSdk {
                operation: "sts:GetCallerIdentity",
                message: "no account in response".into(),
            })
    }

    // ── S3 ────────────────────────────────────────────────────

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, DeployError> {
        match self.s3.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(e) => Err(sdk_err("s3:HeadBucket")(e)),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

        let mut req = self.s3.create_bucket().bucket(bucket);
        if self.region != DEFAULT_S3_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        req.send().await.map_err(sdk_err("s3:CreateBucket"))?;

        info!(bucket = %bucket, region = %self.region, "bucket created");
        Ok(())
    }

    async fn configure_bucket(&self, spec: &BucketSpec) -> Result<(), DeployError> {
        use aws_sdk_s3::types::{
            PublicAccessBlockConfiguration, ServerSideEncryption, ServerSideEncryptionByDefault,
            ServerSideEncryptionConfiguration, ServerSideEncryptionRule,
        };

        if spec.encrypted {
            let by_default = ServerSideEncryptionByDefault::builder()
                .sse_algorithm(ServerSideEncryption::Aes256)
                .build()
                .map_err(sdk_err("s3:PutBucketEncryption"))?;
            let config = ServerSideEncryptionConfiguration::builder()
                .rules(
                    ServerSideEncryptionRule::builder()
                        .apply_server_side_encryption_by_default(by_default)
                        .build(),
                )
                .build()
                .map_err(sdk_err("s3:PutBucketEncryption"))?;

            self.s3
                .put_bucket_encryption()
                .bucket(&spec.name)
                .server_side_encryption_configuration(config)
                .send()
                .await
                .map_err(sdk_err("s3:PutBucketEncryption"))?;
        }

        if spec.block_public_access {
            self.s3
                .put_public_access_block()
                .bucket(&spec.name)
                .public_access_block_configuration(
                    PublicAccessBlockConfiguration::builder()
                        .block_public_acls(true)
                        .ignore_public_acls(true)
                        .block_public_policy(true)
                        .restrict_public_buckets(true)
                        .build(),
                )
                .send()
                .await
                .map_err(sdk_err("s3:PutPublicAccessBlock"))?;
        }

        debug!(
            bucket = %spec.name,
            encrypted = spec.encrypted,
            block_public_access = spec.block_public_access,
            "bucket configured"
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), DeployError> {
        self.s3
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(sdk_err("s3:DeleteBucket"))?;
        info!(bucket = %bucket, "bucket deleted");
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, DeployError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let resp = self
                .s3
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(sdk_err("s3:ListObjectsV2"))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|o| o.key().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(t) if resp.is_truncated().unwrap_or(false) => token = Some(t.to_string()),
                _ => break,
            }
        }

        debug!(bucket = %bucket, prefix = %prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    async fn object_checksum(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<String>, DeployError> {
        match self.s3.head_object().bucket(bucket).key(key).send().await {
            Ok(resp) => Ok(resp
                .metadata()
                .and_then(|m| m.get(CHECKSUM_METADATA_KEY))
                .cloned()),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                Ok(None)
            }
            Err(e) => Err(sdk_err("s3:HeadObject")(e)),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        checksum: &str,
    ) -> Result<(), DeployError> {
        let size = body.len();
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .metadata(CHECKSUM_METADATA_KEY, checksum)
            .send()
            .await
            .map_err(sdk_err("s3:PutObject"))?;
        debug!(bucket = %bucket, key = %key, size, "object uploaded");
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), DeployError> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        for chunk in keys.chunks(DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(sdk_err("s3:DeleteObjects"))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(sdk_err("s3:DeleteObjects"))?;

            let resp = self
                .s3
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(sdk_err("s3:DeleteObjects"))?;

            if let Some(err) = resp.errors().first() {
                return Err(DeployError::AwsSdk {
                    operation: "s3:DeleteObjects",
                    message: format!(
                        "{}: {} ({})",
                        err.key().unwrap_or("?"),
                        err.message().unwrap_or("unknown error"),
                        err.code().unwrap_or("no code"),
                    ),
                });
            }
            debug!(bucket = %bucket, count = chunk.len(), "objects deleted");
        }
        Ok(())
    }

    // ── Glue ──────────────────────────────────────────────────

    async fn database_exists(&self, name: &str) -> Result<bool, DeployError> {
        match self.glue.get_database().name(name).send().await {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_entity_not_found_exception())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(e) => Err(sdk_err("glue:GetDatabase")(e)),
        }
    }

    async fn create_database(&self, name: &str) -> Result<(), DeployError> {
        let input = aws_sdk_glue::types::DatabaseInput::builder()
            .name(name)
            .build()
            .map_err(sdk_err("glue:CreateDatabase"))?;
        self.glue
            .create_database()
            .database_input(input)
            .send()
            .await
            .map_err(sdk_err("glue:CreateDatabase"))?;
        info!(database = %name, "catalog database created");
        Ok(())
    }

    async fn delete_database(&self, name: &str) -> Result<(), DeployError> {
        self.glue
            .delete_database()
            .name(name)
            .send()
            .await
            .map_err(sdk_err("glue:DeleteDatabase"))?;
        info!(database = %name, "catalog database deleted");
        Ok(())
    }

    async fn describe_crawler(
        &self,
        name: &str,
    ) -> Result<Option<CrawlerDescription>, DeployError> {
        match self.glue.get_crawler().name(name).send().await {
            Ok(resp) => Ok(resp.crawler().map(|c| CrawlerDescription {
                spec: CrawlerSpec {
                    name: c.name().unwrap_or(name).to_string(),
                    role_arn: c.role().unwrap_or_default().to_string(),
                    database: c.database_name().unwrap_or_default().to_string(),
                    s3_targets: c
                        .targets()
                        .map(|t| {
                            t.s3_targets()
                                .iter()
                                .filter_map(|s| s.path().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default(),
                    table_prefix: c.table_prefix().unwrap_or_default().to_string(),
                },
                status: CrawlerStatus {
                    state: c
                        .state()
                        .map(|s| s.as_str().to_string())
                        .unwrap_or_else(|| "UNKNOWN".to_string()),
                    last_crawl_status: c
                        .last_crawl()
                        .and_then(|l| l.status())
                        .map(|s| s.as_str().to_string()),
                    last_crawl_error: c
                        .last_crawl()
                        .and_then(|l| l.error_message())
                        .map(str::to_string),
                },
            })),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_entity_not_found_exception())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_err("glue:GetCrawler")(e)),
        }
    }

    async fn create_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError> {
        self.glue
            .create_crawler()
            .name(&spec.name)
            .role(&spec.role_arn)
            .database_name(&spec.database)
            .table_prefix(&spec.table_prefix)
            .targets(crawler_targets(spec))
            .send()
            .await
            .map_err(sdk_err("glue:CreateCrawler"))?;
        info!(crawler = %spec.name, targets = ?spec.s3_targets, "crawler created");
        Ok(())
    }

    async fn update_crawler(&self, spec: &CrawlerSpec) -> Result<(), DeployError> {
        self.glue
            .update_crawler()
            .name(&spec.name)
            .role(&spec.role_arn)
            .database_name(&spec.database)
            .table_prefix(&spec.table_prefix)
            .targets(crawler_targets(spec))
            .send()
            .await
            .map_err(sdk_err("glue:UpdateCrawler"))?;
        info!(crawler = %spec.name, "crawler updated");
        Ok(())
    }

    async fn start_crawler(&self, name: &str) -> Result<(), DeployError> {
        self.glue
            .start_crawler()
            .name(name)
            .send()
            .await
            .map_err(sdk_err("glue:StartCrawler"))?;
        info!(crawler = %name, "crawler start requested");
        Ok(())
    }

    async fn delete_crawler(&self, name: &str) -> Result<(), DeployError> {
        self.glue
            .delete_crawler()
            .name(name)
            .send()
            .await
            .map_err(sdk_err("glue:DeleteCrawler"))?;
        info!(crawler = %name, "crawler deleted");
        Ok(())
    }

    // ── IAM ───────────────────────────────────────────────────

    async fn role_arn(&self, name: &str) -> Result<Option<String>, DeployError> {
        match self.iam.get_role().role_name(name).send().await {
            Ok(resp) => Ok(resp.role().map(|r| r.arn().to_string())),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_no_such_entity_exception())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_err("iam:GetRole")(e)),
        }
    }

    async fn create_role(&self, spec: &RoleSpec) -> Result<String, DeployError> {
        let resp = self
            .iam
            .create_role()
            .role_name(&spec.name)
            .assume_role_policy_document(spec.trust.to_document().to_string())
            .send()
            .await
            .map_err(sdk_err("iam:CreateRole"))?;

        let arn = resp
            .role()
            .map(|r| r.arn().to_string())
            .ok_or_else(|| DeployError::AwsSdk {
                operation: "iam:CreateRole",
                message: "no role in response".into(),
            })?;
        info!(role = %spec.name, arn = %arn, "role created");
        Ok(arn)
    }

    async fn update_role_trust(&self, spec: &RoleSpec) -> Result<(), DeployError> {
        self.iam
            .update_assume_role_policy()
            .role_name(&spec.name)
            .policy_document(spec.trust.to_document().to_string())
            .send()
            .await
            .map_err(sdk_err("iam:UpdateAssumeRolePolicy"))?;
        debug!(role = %spec.name, "trust policy updated");
        Ok(())
    }

    async fn put_role_policies(&self, spec: &RoleSpec) -> Result<(), DeployError> {
        for arn in &spec.managed_policy_arns {
            self.iam
                .attach_role_policy()
                .role_name(&spec.name)
                .policy_arn(arn)
                .send()
                .await
                .map_err(sdk_err("iam:AttachRolePolicy"))?;
        }
        for policy in &spec.inline_policies {
            self.iam
                .put_role_policy()
                .role_name(&spec.name)
                .policy_name(&policy.name)
                .policy_document(policy.to_document().to_string())
                .send()
                .await
                .map_err(sdk_err("iam:PutRolePolicy"))?;
        }
        debug!(
            role = %spec.name,
            managed = spec.managed_policy_arns.len(),
            inline = spec.inline_policies.len(),
            "role policies applied"
        );
        Ok(())
    }

    async fn delete_role(&self, name: &str) -> Result<(), DeployError> {
        let attached = self
            .iam
            .list_attached_role_policies()
            .role_name(name)
            .send()
            .await
            .map_err(sdk_err("iam:ListAttachedRolePolicies"))?;
        for policy in attached.attached_policies() {
            if let Some(arn) = policy.policy_arn() {
                self.iam
                    .detach_role_policy()
                    .role_name(name)
                    .policy_arn(arn)
                    .send()
                    .await
                    .map_err(sdk_err("iam:DetachRolePolicy"))?;
            }
        }

        let inline = self
            .iam
            .list_role_policies()
            .role_name(name)
            .send()
            .await
            .map_err(sdk_err("iam:ListRolePolicies"))?;
        for policy_name in inline.policy_names() {
            self.iam
                .delete_role_policy()
                .role_name(name)
                .policy_name(policy_name)
                .send()
                .await
                .map_err(sdk_err("iam:DeleteRolePolicy"))?;
        }

        self.iam
            .delete_role()
            .role_name(name)
            .send()
            .await
            .map_err(sdk_err("iam:DeleteRole"))?;
        info!(role = %name, "role deleted");
        Ok(())
    }

    // ── Athena ────────────────────────────────────────────────

    async fn workgroup_exists(&self, name: &str) -> Result<bool, DeployError> {
        let mut token: Option<String> = None;
        loop {
            let resp = self
                .athena
                .list_work_groups()
                .set_next_token(token.take())
                .send()
                .await
                .map_err(sdk_err("athena:ListWorkGroups"))?;

            if resp.work_groups().iter().any(|w| w.name() == Some(name)) {
                return Ok(true);
            }
            match resp.next_token() {
                Some(t) => token = Some(t.to_string()),
                None => return Ok(false),
            }
        }
    }

    async fn create_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError> {
        use aws_sdk_athena::types::{ResultConfiguration, WorkGroupConfiguration};

        let config = WorkGroupConfiguration::builder()
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&spec.output_location)
                    .build(),
            )
            .enforce_work_group_configuration(spec.enforce_configuration)
            .build();

        self.athena
            .create_work_group()
            .name(&spec.name)
            .configuration(config)
            .send()
            .await
            .map_err(sdk_err("athena:CreateWorkGroup"))?;
        info!(workgroup = %spec.name, output = %spec.output_location, "workgroup created");
        Ok(())
    }

    async fn update_workgroup(&self, spec: &WorkGroupSpec) -> Result<(), DeployError> {
        use aws_sdk_athena::types::{ResultConfigurationUpdates, WorkGroupConfigurationUpdates};

        let updates = WorkGroupConfigurationUpdates::builder()
            .result_configuration_updates(
                ResultConfigurationUpdates::builder()
                    .output_location(&spec.output_location)
                    .build(),
            )
            .enforce_work_group_configuration(spec.enforce_configuration)
            .build();

        self.athena
            .update_work_group()
            .work_group(&spec.name)
            .configuration_updates(updates)
            .send()
            .await
            .map_err(sdk_err("athena:UpdateWorkGroup"))?;
        info!(workgroup = %spec.name, "workgroup updated");
        Ok(())
    }

    async fn delete_workgroup(&self, name: &str) -> Result<(), DeployError> {
        self.athena
            .delete_work_group()
            .work_group(name)
            .recursive_delete_option(true)
            .send()
            .await
            .map_err(sdk_err("athena:DeleteWorkGroup"))?;
        info!(workgroup = %name, "workgroup deleted");
        Ok(())
    }
}

fn crawler_targets(spec: &CrawlerSpec) -> aws_sdk_glue::types::CrawlerTargets {
    use aws_sdk_glue::types::{CrawlerTargets, S3Target};

    CrawlerTargets::builder()
        .set_s3_targets(Some(
            spec.s3_targets
                .iter()
                .map(|path| S3Target::builder().path(path).build())
                .collect(),
        ))
        .build()
}
