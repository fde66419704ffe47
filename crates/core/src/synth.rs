//! Render a [`Stack`] as a CloudFormation-shaped JSON document for review.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::stack::{RemovalPolicy, ResourceKind, Stack};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub stack_name: String,
    pub resources: IndexMap<String, TemplateResource>,
    pub outputs: IndexMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: &'static str,
    pub properties: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: String,
    pub description: String,
}

/// Render every resource in declaration order. `DependsOn` lists explicit
/// edges only; reference edges are implied by the property values.
pub fn synth(stack: &Stack) -> Template {
    let resources = stack
        .resources
        .iter()
        .map(|r| {
            let (resource_type, properties, deletion_policy) = render_kind(&r.kind);
            (
                r.logical_id.clone(),
                TemplateResource {
                    resource_type,
                    properties,
                    depends_on: r.depends_on.clone(),
                    deletion_policy,
                },
            )
        })
        .collect();

    let outputs = stack
        .outputs
        .iter()
        .map(|o| {
            (
                o.name.clone(),
                TemplateOutput {
                    value: o.value.clone(),
                    description: o.description.clone(),
                },
            )
        })
        .collect();

    Template {
        stack_name: stack.name.clone(),
        resources,
        outputs,
    }
}

fn render_kind(kind: &ResourceKind) -> (&'static str, Value, Option<&'static str>) {
    match kind {
        ResourceKind::Bucket(b) => {
            let mut props = json!({
                "BucketName": b.name,
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": b.block_public_access,
                    "BlockPublicPolicy": b.block_public_access,
                    "IgnorePublicAcls": b.block_public_access,
                    "RestrictPublicBuckets": b.block_public_access,
                },
            });
            if b.encrypted {
                props["BucketEncryption"] = json!({
                    "ServerSideEncryptionConfiguration": [
                        { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                    ]
                });
            }
            if b.auto_delete_objects {
                props["Tags"] = json!([{ "Key": "csvlake:auto-delete-objects", "Value": "true" }]);
            }
            let policy = match b.removal_policy {
                RemovalPolicy::Destroy => "Delete",
                RemovalPolicy::Retain => "Retain",
            };
            ("AWS::S3::Bucket", props, Some(policy))
        }
        ResourceKind::BucketDeployment(d) => (
            "Custom::S3BucketDeployment",
            json!({
                "SourceDirectory": d.source_dir.display().to_string(),
                "DestinationBucketName": d.bucket,
                "DestinationBucketKeyPrefix": d.destination_prefix,
                "Prune": d.prune,
                "RetainOnDelete": d.retain_on_delete,
            }),
            None,
        ),
        ResourceKind::GlueDatabase(db) => (
            "AWS::Glue::Database",
            json!({ "DatabaseInput": { "Name": db.name } }),
            None,
        ),
        ResourceKind::GlueCrawler(c) => (
            "AWS::Glue::Crawler",
            json!({
                "Name": c.name,
                "Role": c.role_arn,
                "DatabaseName": c.database,
                "TablePrefix": c.table_prefix,
                "Targets": {
                    "S3Targets": c.s3_targets.iter().map(|p| json!({ "Path": p })).collect::<Vec<_>>(),
                },
            }),
            None,
        ),
        ResourceKind::IamRole(r) => {
            let policies: Vec<Value> = r
                .inline_policies
                .iter()
                .map(|p| json!({ "PolicyName": p.name, "PolicyDocument": p.to_document() }))
                .collect();
            (
                "AWS::IAM::Role",
                json!({
                    "RoleName": r.name,
                    "AssumeRolePolicyDocument": r.trust.to_document(),
                    "ManagedPolicyArns": r.managed_policy_arns,
                    "Policies": policies,
                }),
                None,
            )
        }
        ResourceKind::AthenaWorkGroup(w) => (
            "AWS::Athena::WorkGroup",
            json!({
                "Name": w.name,
                "RecursiveDeleteOption": true,
                "WorkGroupConfiguration": {
                    "EnforceWorkGroupConfiguration": w.enforce_configuration,
                    "ResultConfiguration": { "OutputLocation": w.output_location },
                },
            }),
            None,
        ),
        ResourceKind::CrawlerTrigger(t) => (
            "Custom::AWS",
            json!({
                "Create": {
                    "service": "Glue",
                    "action": "startCrawler",
                    "parameters": { "Name": t.crawler_name },
                    "physicalResourceId": t.physical_id,
                },
                "Policy": {
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": t.policy.actions,
                        "Resource": t.policy.resources,
                    }],
                },
            }),
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::StackConfig;
    use crate::stack::logical;

    fn stack() -> Stack {
        let cfg = StackConfig {
            profile: String::new(),
            stack_name: "CdkS3CsvStack".into(),
            region: "us-east-1".into(),
            account_id: None,
            data_dir: PathBuf::from("data"),
            bucket_name: Some("lake-bucket".into()),
            github_repo: Some("acme/lake".into()),
            auto_delete_objects: None,
            state_dir: PathBuf::from(".csvlake"),
        };
        Stack::build(&cfg, "123456789012").unwrap()
    }

    #[test]
    fn resources_keep_declaration_order() {
        let template = synth(&stack());
        let keys: Vec<&str> = template.resources.keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&logical::BUCKET));
        assert_eq!(keys.last(), Some(&logical::TRIGGER));
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn trigger_depends_on_crawler() {
        let template = synth(&stack());
        let trigger = &template.resources[logical::TRIGGER];
        assert_eq!(trigger.resource_type, "Custom::AWS");
        assert_eq!(trigger.depends_on, vec![logical::CRAWLER.to_string()]);
        assert_eq!(
            trigger.properties["Create"]["physicalResourceId"],
            "StartCrawler-cdks3csvstack-seed-crawler"
        );
    }

    #[test]
    fn bucket_properties() {
        let template = synth(&stack());
        let bucket = &template.resources[logical::BUCKET];
        assert_eq!(bucket.deletion_policy, Some("Delete"));
        assert_eq!(
            bucket.properties["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            "AES256"
        );
        assert_eq!(
            bucket.properties["PublicAccessBlockConfiguration"]["RestrictPublicBuckets"],
            true
        );
    }

    #[test]
    fn serialized_shape() {
        let value = serde_json::to_value(synth(&stack())).unwrap();
        assert_eq!(value["StackName"], "CdkS3CsvStack");
        assert_eq!(
            value["Resources"]["GlueCrawler"]["Properties"]["Targets"]["S3Targets"][0]["Path"],
            "s3://lake-bucket/seed/"
        );
        assert_eq!(value["Resources"]["GlueCrawler"]["DependsOn"][0], "GlueDatabase");
        assert!(value["Resources"]["GlueDatabase"].get("DependsOn").is_none());
        assert_eq!(
            value["Outputs"]["AthenaQueryResults"]["Value"],
            "s3://lake-bucket/athena-results/"
        );
    }
}
