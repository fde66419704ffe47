//! Config -> graph -> validation -> template, the path `synth` takes.

use std::path::PathBuf;

use csvlake_core::stack::logical;
use csvlake_core::{naming, synth, validate, CoreError, Stack, StackConfig, Violation};

const ACCOUNT: &str = "210987654321";

fn config(profile: &str) -> StackConfig {
    StackConfig {
        profile: profile.to_string(),
        stack_name: "CdkS3CsvStack".into(),
        region: "us-east-1".into(),
        account_id: Some(ACCOUNT.into()),
        data_dir: PathBuf::from("data"),
        bucket_name: None,
        github_repo: Some("octo-org/data-repo".into()),
        auto_delete_objects: None,
        state_dir: PathBuf::from(".csvlake"),
    }
}

#[test]
fn default_stack_is_valid_and_names_line_up() {
    let cfg = config("");
    let stack = Stack::build(&cfg, ACCOUNT).unwrap();
    validate(&stack, &cfg).unwrap();

    let bucket = stack.bucket().unwrap().name.clone();
    assert_eq!(bucket, naming::bucket_name("CdkS3CsvStack", ACCOUNT, "us-east-1"));
    assert!(bucket.starts_with("cdks3csvstack-csvbucket-"));
    assert!(bucket.len() <= 63);

    assert_eq!(stack.output("BucketName"), Some(bucket.as_str()));
    assert_eq!(stack.output("GlueDatabaseName"), Some("cdks3csvstack_db"));
    assert_eq!(
        stack.output("AthenaQueryResults").map(str::to_string),
        Some(format!("s3://{bucket}/athena-results/"))
    );
}

#[test]
fn template_carries_every_resource_and_output() {
    let cfg = config("");
    let stack = Stack::build(&cfg, ACCOUNT).unwrap();
    let value = serde_json::to_value(synth(&stack)).unwrap();

    let types: Vec<(&str, &str)> = value["Resources"]
        .as_object()
        .unwrap()
        .iter()
        .map(|(id, r)| (id.as_str(), r["Type"].as_str().unwrap()))
        .collect();
    assert_eq!(
        types,
        vec![
            (logical::BUCKET, "AWS::S3::Bucket"),
            (logical::SEED, "Custom::S3BucketDeployment"),
            (logical::DATABASE, "AWS::Glue::Database"),
            (logical::CRAWLER_ROLE, "AWS::IAM::Role"),
            (logical::CRAWLER, "AWS::Glue::Crawler"),
            (logical::WORKGROUP, "AWS::Athena::WorkGroup"),
            (logical::DEPLOY_ROLE, "AWS::IAM::Role"),
            (logical::TRIGGER, "Custom::AWS"),
        ]
    );

    let outputs: Vec<&String> = value["Outputs"].as_object().unwrap().keys().collect();
    assert_eq!(
        outputs,
        vec!["BucketName", "GlueDatabaseName", "AthenaQueryResults"]
    );
}

#[test]
fn production_retains_bucket_and_forbids_forced_auto_delete() {
    let cfg = config("PRODUCTION");
    let stack = Stack::build(&cfg, ACCOUNT).unwrap();
    validate(&stack, &cfg).unwrap();
    let value = serde_json::to_value(synth(&stack)).unwrap();
    assert_eq!(value["Resources"][logical::BUCKET]["DeletionPolicy"], "Retain");

    let mut forced = config("PRODUCTION");
    forced.auto_delete_objects = Some(true);
    let stack = Stack::build(&forced, ACCOUNT).unwrap();
    let violations = validate(&stack, &forced).unwrap_err();
    assert_eq!(
        violations,
        vec![Violation::AutoDeleteInProduction("PRODUCTION".into())]
    );
}

#[test]
fn missing_or_wildcard_repo_never_builds() {
    let mut cfg = config("");
    cfg.github_repo = None;
    assert!(matches!(
        Stack::build(&cfg, ACCOUNT),
        Err(CoreError::MissingSetting(_))
    ));

    cfg.github_repo = Some("octo-org/*".into());
    assert!(matches!(
        Stack::build(&cfg, ACCOUNT),
        Err(CoreError::InvalidRepo(_))
    ));
}

#[test]
fn deploy_order_respects_every_edge() {
    let stack = Stack::build(&config(""), ACCOUNT).unwrap();
    let order: Vec<&str> = stack
        .deploy_order()
        .unwrap()
        .iter()
        .map(|r| r.logical_id.as_str())
        .collect();

    for r in &stack.resources {
        let at = order.iter().position(|id| *id == r.logical_id).unwrap();
        for dep in r.edges() {
            let dep_at = order.iter().position(|id| *id == dep).unwrap();
            assert!(dep_at < at, "{dep} must come before {}", r.logical_id);
        }
    }
    assert_eq!(order.last(), Some(&logical::TRIGGER));
}
