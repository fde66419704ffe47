//! Configuration invariants checked against the rendered graph before any
//! provider call is made.

use thiserror::Error;

use crate::config::{GitHubRepo, StackConfig};
use crate::naming;
use crate::stack::{logical, Principal, Stack, START_CRAWLER_ACTION};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("resource {0} is missing from the stack")]
    Missing(&'static str),

    #[error("crawler targets {actual:?}, expected exactly [{expected}]")]
    CrawlerTarget { expected: String, actual: Vec<String> },

    #[error("seeder writes to s3://{bucket}/{prefix}, expected {expected}")]
    SeedDestination {
        bucket: String,
        prefix: String,
        expected: String,
    },

    #[error("database name {actual} should be {expected}")]
    DatabaseName { expected: String, actual: String },

    #[error("crawler writes to database {actual}, expected {expected}")]
    CrawlerDatabase { expected: String, actual: String },

    #[error("workgroup results go to {actual}, expected {expected}")]
    ResultsLocation { expected: String, actual: String },

    #[error("trigger must depend on {0} explicitly")]
    TriggerOrdering(&'static str),

    #[error("trigger starts crawler {actual}, stack crawler is {expected}")]
    TriggerTarget { expected: String, actual: String },

    #[error("trigger permission statement lacks glue:StartCrawler")]
    TriggerPermission,

    #[error("deploy role must be federated through the GitHub OIDC provider")]
    DeployRolePrincipal,

    #[error("deploy role audience condition must be StringEquals sts.amazonaws.com")]
    DeployRoleAudience,

    #[error("deploy role subject condition '{0}' is not scoped to a single repository")]
    DeployRoleSubject(String),

    #[error("auto-delete of bucket contents is enabled in production profile {0}")]
    AutoDeleteInProduction(String),

    #[error("dependency graph: {0}")]
    Graph(String),
}

/// Check every invariant; returns all violations, not just the first.
pub fn validate(stack: &Stack, config: &StackConfig) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    check_seed_and_crawler(stack, &mut violations);
    check_database(stack, config, &mut violations);
    check_workgroup(stack, &mut violations);
    check_trigger(stack, &mut violations);
    check_deploy_role(stack, &mut violations);

    if let Some(bucket) = stack.bucket() {
        if bucket.auto_delete_objects && config.is_production() {
            violations.push(Violation::AutoDeleteInProduction(
                config.profile_label().to_string(),
            ));
        }
    }

    if let Err(e) = stack.deploy_order() {
        violations.push(Violation::Graph(e.to_string()));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_seed_and_crawler(stack: &Stack, violations: &mut Vec<Violation>) {
    let Some(bucket) = stack.bucket() else {
        violations.push(Violation::Missing(logical::BUCKET));
        return;
    };
    let expected = naming::seed_target_path(&bucket.name);

    match stack.seeder() {
        Some(seeder) => {
            let prefix = format!("{}/", seeder.destination_prefix.trim_end_matches('/'));
            if seeder.bucket != bucket.name || format!("s3://{}/{}", seeder.bucket, prefix) != expected
            {
                violations.push(Violation::SeedDestination {
                    bucket: seeder.bucket.clone(),
                    prefix: seeder.destination_prefix.clone(),
                    expected: expected.clone(),
                });
            }
        }
        None => violations.push(Violation::Missing(logical::SEED)),
    }

    match stack.crawler() {
        Some(crawler) => {
            if crawler.s3_targets != [expected.clone()] {
                violations.push(Violation::CrawlerTarget {
                    expected,
                    actual: crawler.s3_targets.clone(),
                });
            }
        }
        None => violations.push(Violation::Missing(logical::CRAWLER)),
    }
}

fn check_database(stack: &Stack, config: &StackConfig, violations: &mut Vec<Violation>) {
    let expected = naming::database_name(&config.stack_name);
    let Some(database) = stack.database() else {
        violations.push(Violation::Missing(logical::DATABASE));
        return;
    };

    if database.name != expected {
        violations.push(Violation::DatabaseName {
            expected: expected.clone(),
            actual: database.name.clone(),
        });
    }
    if let Some(crawler) = stack.crawler() {
        if crawler.database != database.name {
            violations.push(Violation::CrawlerDatabase {
                expected: database.name.clone(),
                actual: crawler.database.clone(),
            });
        }
    }
}

fn check_workgroup(stack: &Stack, violations: &mut Vec<Violation>) {
    let Some(bucket) = stack.bucket() else {
        return;
    };
    let Some(workgroup) = stack.workgroup() else {
        violations.push(Violation::Missing(logical::WORKGROUP));
        return;
    };

    let expected = naming::query_results_location(&bucket.name);
    if workgroup.output_location != expected {
        violations.push(Violation::ResultsLocation {
            expected,
            actual: workgroup.output_location.clone(),
        });
    }
}

fn check_trigger(stack: &Stack, violations: &mut Vec<Violation>) {
    let (Some(resource), Some(trigger)) = (stack.resource(logical::TRIGGER), stack.trigger())
    else {
        violations.push(Violation::Missing(logical::TRIGGER));
        return;
    };

    if !resource.depends_on.iter().any(|d| d == logical::CRAWLER) {
        violations.push(Violation::TriggerOrdering(logical::CRAWLER));
    }
    if let Some(crawler) = stack.crawler() {
        if trigger.crawler_name != crawler.name {
            violations.push(Violation::TriggerTarget {
                expected: crawler.name.clone(),
                actual: trigger.crawler_name.clone(),
            });
        }
    }
    if !trigger.policy.actions.iter().any(|a| a == START_CRAWLER_ACTION) {
        violations.push(Violation::TriggerPermission);
    }
}

fn check_deploy_role(stack: &Stack, violations: &mut Vec<Violation>) {
    let Some(role) = stack.role(logical::DEPLOY_ROLE) else {
        violations.push(Violation::Missing(logical::DEPLOY_ROLE));
        return;
    };
    let trust = &role.trust;

    let expected_provider = naming::oidc_provider_arn(&stack.account_id);
    if trust.principal != Principal::Federated(expected_provider) {
        violations.push(Violation::DeployRolePrincipal);
    }

    let aud_key = format!("{}:aud", naming::OIDC_PROVIDER_HOST);
    if trust.condition("StringEquals", &aud_key) != Some(naming::OIDC_AUDIENCE) {
        violations.push(Violation::DeployRoleAudience);
    }

    let sub_key = format!("{}:sub", naming::OIDC_PROVIDER_HOST);
    match trust.condition("StringLike", &sub_key) {
        Some(subject) if subject_is_scoped(subject) => {}
        other => violations.push(Violation::DeployRoleSubject(
            other.unwrap_or("(none)").to_string(),
        )),
    }
}

/// `repo:<org>/<repo>:*` with a concrete org and repo.
fn subject_is_scoped(subject: &str) -> bool {
    subject
        .strip_prefix("repo:")
        .and_then(|rest| rest.strip_suffix(":*"))
        .map(|pair| GitHubRepo::parse(pair).is_ok())
        .unwrap_or(false)
}
