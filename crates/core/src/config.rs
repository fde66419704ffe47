use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str) -> Option<bool> {
    profiled_env_opt(profile, key).map(|v| matches!(v.as_str(), "true" | "1"))
}

/// Stack name used when `STACK_NAME` is not set.
pub const DEFAULT_STACK_NAME: &str = "CdkS3CsvStack";

/// Profiles treated as production: no destructive teardown.
const PRODUCTION_PROFILES: &[&str] = &["PROD", "PRODUCTION"];

// ── GitHub repository ─────────────────────────────────────────

/// The `<org>/<repo>` pair allowed to assume the deploy role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub org: String,
    pub repo: String,
}

impl GitHubRepo {
    /// Parse `<org>/<repo>`. Wildcards and empty segments are rejected so the
    /// trust condition can never match more than one repository.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('/');
        let (org, repo) = match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(repo), None) => (org, repo),
            _ => return Err(CoreError::InvalidRepo(raw.to_string())),
        };

        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(org) || !valid(repo) {
            return Err(CoreError::InvalidRepo(raw.to_string()));
        }

        Ok(Self {
            org: org.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Subject claim pattern matched by the trust policy.
    pub fn subject_pattern(&self) -> String {
        format!("repo:{}/{}:*", self.org, self.repo)
    }
}

impl fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

// ── Stack config ──────────────────────────────────────────────

/// Inputs for building the stack's resource graph.
///
/// Reads from environment variables with an optional profile prefix.
/// When `CSVLAKE_PROFILE=PROD`, `PROD_STACK_NAME` is checked before `STACK_NAME`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Active profile name, upper-cased (empty = default).
    pub profile: String,
    pub stack_name: String,
    pub region: String,
    /// Resolved through STS when absent.
    pub account_id: Option<String>,
    /// Local directory mirrored under `seed/`.
    pub data_dir: PathBuf,
    /// Explicit bucket name; derived from the stack when absent.
    pub bucket_name: Option<String>,
    /// Raw `<org>/<repo>`; mandatory, parsed by [`StackConfig::github_repo`].
    pub github_repo: Option<String>,
    /// Explicit auto-delete setting; `None` means "profile decides".
    pub auto_delete_objects: Option<bool>,
    /// Where deployment state files live.
    pub state_dir: PathBuf,
}

impl StackConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let profile = env_or("CSVLAKE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            stack_name: profiled_env_or(p, "STACK_NAME", DEFAULT_STACK_NAME),
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            account_id: profiled_env_opt(p, "AWS_ACCOUNT_ID"),
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            bucket_name: profiled_env_opt(p, "BUCKET_NAME"),
            github_repo: profiled_env_opt(p, "GITHUB_REPO"),
            auto_delete_objects: profiled_env_bool(p, "AUTO_DELETE_OBJECTS"),
            state_dir: PathBuf::from(profiled_env_or(p, "STATE_DIR", ".csvlake")),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    pub fn is_production(&self) -> bool {
        PRODUCTION_PROFILES.contains(&self.profile.to_uppercase().as_str())
    }

    /// Whether teardown empties the bucket. Off in production unless forced,
    /// which validation then rejects.
    pub fn auto_delete_objects(&self) -> bool {
        self.auto_delete_objects.unwrap_or(!self.is_production())
    }

    /// The repository allowed to assume the deploy role. There is no default.
    pub fn github_repo(&self) -> Result<GitHubRepo, CoreError> {
        let raw = self
            .github_repo
            .as_deref()
            .ok_or_else(|| CoreError::MissingSetting("GITHUB_REPO".into()))?;
        GitHubRepo::parse(raw)
    }

    /// Path of this stack's state file, one per region.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(format!(
            "{}.{}.state.json",
            self.stack_name.to_lowercase(),
            self.region
        ))
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  stack:       name={}, region={}", self.stack_name, self.region);
        tracing::info!(
            "  account:     {}",
            self.account_id.as_deref().unwrap_or("(resolve via sts)")
        );
        tracing::info!("  data:        dir={}", self.data_dir.display());
        tracing::info!(
            "  bucket:      name={}, auto_delete={}",
            self.bucket_name.as_deref().unwrap_or("(derived)"),
            self.auto_delete_objects()
        );
        tracing::info!(
            "  github:      repo={}",
            self.github_repo.as_deref().unwrap_or("(unset)")
        );
        tracing::info!("  state:       dir={}", self.state_dir.display());
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-based tests must run serially to avoid interfering with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        let keys = [
            "CSVLAKE_PROFILE",
            "STACK_NAME",
            "AWS_REGION",
            "AWS_ACCOUNT_ID",
            "DATA_DIR",
            "BUCKET_NAME",
            "GITHUB_REPO",
            "AUTO_DELETE_OBJECTS",
            "STATE_DIR",
            "PROD_STACK_NAME",
            "PROD_GITHUB_REPO",
            "PROD_AUTO_DELETE_OBJECTS",
        ];
        for k in keys {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_when_no_env_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let cfg = StackConfig::for_profile("");

        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.stack_name, DEFAULT_STACK_NAME);
        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert!(cfg.account_id.is_none());
        assert!(cfg.bucket_name.is_none());
        assert!(cfg.auto_delete_objects());
        assert!(!cfg.is_production());
    }

    #[test]
    fn github_repo_is_mandatory() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let cfg = StackConfig::for_profile("");
        let err = cfg.github_repo().unwrap_err();
        assert!(err.to_string().contains("GITHUB_REPO"));

        env::set_var("GITHUB_REPO", "acme/lake");
        let cfg = StackConfig::for_profile("");
        assert_eq!(cfg.github_repo().unwrap().to_string(), "acme/lake");

        clear_env();
    }

    #[test]
    fn profiled_env_takes_precedence() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("STACK_NAME", "DevStack");
        env::set_var("PROD_STACK_NAME", "ProdStack");

        let cfg = StackConfig::for_profile("prod");
        assert_eq!(cfg.profile, "PROD");
        assert_eq!(cfg.stack_name, "ProdStack");

        let cfg = StackConfig::for_profile("");
        assert_eq!(cfg.stack_name, "DevStack");

        clear_env();
    }

    #[test]
    fn production_disables_auto_delete_by_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let cfg = StackConfig::for_profile("PRODUCTION");
        assert!(cfg.is_production());
        assert!(!cfg.auto_delete_objects());

        env::set_var("PROD_AUTO_DELETE_OBJECTS", "true");
        let cfg = StackConfig::for_profile("PROD");
        assert!(cfg.auto_delete_objects());

        clear_env();
    }

    #[test]
    fn explicit_auto_delete_off_in_dev() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("AUTO_DELETE_OBJECTS", "false");
        let cfg = StackConfig::for_profile("");
        assert!(!cfg.auto_delete_objects());

        clear_env();
    }

    #[test]
    fn state_file_is_per_stack_and_region() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("STACK_NAME", "MyStack");
        env::set_var("STATE_DIR", "/tmp/lake-state");
        let cfg = StackConfig::for_profile("");
        assert_eq!(
            cfg.state_file(),
            PathBuf::from("/tmp/lake-state/mystack.us-east-1.state.json")
        );

        env::set_var("AWS_REGION", "eu-west-1");
        let cfg = StackConfig::for_profile("");
        assert_eq!(
            cfg.state_file(),
            PathBuf::from("/tmp/lake-state/mystack.eu-west-1.state.json")
        );

        clear_env();
    }

    #[test]
    fn repo_parse_rejects_wildcards_and_bad_shapes() {
        assert!(GitHubRepo::parse("acme/*").is_err());
        assert!(GitHubRepo::parse("*/lake").is_err());
        assert!(GitHubRepo::parse("acme").is_err());
        assert!(GitHubRepo::parse("acme/lake/extra").is_err());
        assert!(GitHubRepo::parse("/lake").is_err());
        assert!(GitHubRepo::parse("acme/").is_err());

        let repo = GitHubRepo::parse(" acme-inc/csv.lake_v2 ").unwrap();
        assert_eq!(repo.org, "acme-inc");
        assert_eq!(repo.repo, "csv.lake_v2");
        assert_eq!(repo.subject_pattern(), "repo:acme-inc/csv.lake_v2:*");
    }
}
