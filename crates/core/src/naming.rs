//! Deterministic physical names derived from the stack name.
//!
//! Every name here is a pure function of its inputs so that repeated deploys
//! of the same stack address the same resources.

use sha2::{Digest, Sha256};

/// Key prefix the seeder writes to and the crawler scans.
pub const SEED_PREFIX: &str = "seed/";

/// Prefix applied to every table the crawler creates.
pub const TABLE_PREFIX: &str = "seed_";

/// Key prefix for Athena query results.
pub const RESULTS_PREFIX: &str = "athena-results/";

/// Audience claim GitHub's OIDC tokens carry for STS.
pub const OIDC_AUDIENCE: &str = "sts.amazonaws.com";

/// Issuer host of GitHub Actions OIDC tokens.
pub const OIDC_PROVIDER_HOST: &str = "token.actions.githubusercontent.com";

const S3_BUCKET_NAME_MAX: usize = 63;
const IAM_ROLE_NAME_MAX: usize = 64;
const HASH_SUFFIX_LEN: usize = 8;

/// Glue database name: the stack name lowercased with `_db` appended.
pub fn database_name(stack_name: &str) -> String {
    format!("{}_db", stack_name.to_lowercase())
}

/// Globally unique bucket name: `<stack>-csvbucket-<hash>`.
///
/// The hash covers stack, account and region so the same stack deployed
/// into two accounts never collides.
pub fn bucket_name(stack_name: &str, account_id: &str, region: &str) -> String {
    let digest = Sha256::digest(format!("{stack_name}/{account_id}/{region}").as_bytes());
    let hex = format!("{digest:x}");
    let suffix = &hex[..HASH_SUFFIX_LEN];

    let mapped: String = stack_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let mut base = mapped.trim_matches('-');
    if base.is_empty() {
        base = "csvlake";
    }

    let max_base = S3_BUCKET_NAME_MAX - "-csvbucket-".len() - HASH_SUFFIX_LEN;
    if base.len() > max_base {
        base = base[..max_base].trim_end_matches('-');
    }

    format!("{base}-csvbucket-{suffix}")
}

pub fn crawler_name(stack_name: &str) -> String {
    format!("{}-seed-crawler", stack_name.to_lowercase())
}

pub fn workgroup_name(stack_name: &str) -> String {
    format!("{}-wg", stack_name.to_lowercase())
}

pub fn crawler_role_name(stack_name: &str) -> String {
    role_name(stack_name, "GlueCrawlerRole")
}

pub fn deploy_role_name(stack_name: &str) -> String {
    role_name(stack_name, "GitHubDeployRole")
}

fn role_name(stack_name: &str, suffix: &str) -> String {
    let full = format!("{stack_name}-{suffix}");
    full.chars().take(IAM_ROLE_NAME_MAX).collect()
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}

pub fn crawler_arn(region: &str, account_id: &str, crawler_name: &str) -> String {
    format!("arn:aws:glue:{region}:{account_id}:crawler/{crawler_name}")
}

pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// `s3://<bucket>/seed/`
pub fn seed_target_path(bucket: &str) -> String {
    format!("s3://{bucket}/{SEED_PREFIX}")
}

/// `s3://<bucket>/athena-results/`
pub fn query_results_location(bucket: &str) -> String {
    format!("s3://{bucket}/{RESULTS_PREFIX}")
}

/// ARN of the account's GitHub Actions identity provider.
pub fn oidc_provider_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:oidc-provider/{OIDC_PROVIDER_HOST}")
}

/// Physical id of the one-shot crawler trigger. Changing it re-fires the trigger.
pub fn trigger_physical_id(crawler_name: &str) -> String {
    format!("StartCrawler-{crawler_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_is_lowercased_with_suffix() {
        assert_eq!(database_name("CdkS3CsvStack"), "cdks3csvstack_db");
        assert_eq!(database_name("already_lower"), "already_lower_db");
    }

    #[test]
    fn bucket_name_is_stable_and_scoped() {
        let a = bucket_name("CdkS3CsvStack", "123456789012", "us-east-1");
        let b = bucket_name("CdkS3CsvStack", "123456789012", "us-east-1");
        let other_account = bucket_name("CdkS3CsvStack", "210987654321", "us-east-1");

        assert_eq!(a, b);
        assert_ne!(a, other_account);
        assert!(a.starts_with("cdks3csvstack-csvbucket-"));
        assert_eq!(a.len(), "cdks3csvstack-csvbucket-".len() + 8);
    }

    #[test]
    fn bucket_name_respects_s3_rules() {
        let long = "A".repeat(100);
        let name = bucket_name(&long, "123456789012", "eu-west-1");
        assert!(name.len() <= 63);

        let odd = bucket_name("My_Stack.Name", "1", "r");
        assert!(odd.starts_with("my-stack-name-csvbucket-"));
        assert!(odd
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));

        let empty = bucket_name("__", "1", "r");
        assert!(empty.starts_with("csvlake-csvbucket-"));
    }

    #[test]
    fn role_names_fit_iam_limit() {
        let name = deploy_role_name(&"S".repeat(80));
        assert_eq!(name.chars().count(), 64);
        assert_eq!(crawler_role_name("Lake"), "Lake-GlueCrawlerRole");
    }

    #[test]
    fn locations_share_the_bucket() {
        assert_eq!(seed_target_path("b"), "s3://b/seed/");
        assert_eq!(query_results_location("b"), "s3://b/athena-results/");
    }

    #[test]
    fn arns() {
        assert_eq!(
            oidc_provider_arn("123456789012"),
            "arn:aws:iam::123456789012:oidc-provider/token.actions.githubusercontent.com"
        );
        assert_eq!(role_arn("1", "r"), "arn:aws:iam::1:role/r");
        assert_eq!(
            crawler_arn("us-east-1", "1", "c"),
            "arn:aws:glue:us-east-1:1:crawler/c"
        );
    }
}
