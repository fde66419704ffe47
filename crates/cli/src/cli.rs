use std::path::PathBuf;

use clap::{Parser, Subcommand};

use csvlake_core::StackConfig;

/// Provision and operate an S3 CSV data lake: bucket, seed data, Glue
/// catalog, crawler, Athena workgroup and a GitHub OIDC deploy role.
///
/// Settings come from `.env` and the environment (`CSVLAKE_PROFILE=PROD`
/// reads `PROD_<KEY>` before `<KEY>`); flags override both.
#[derive(Parser, Debug)]
#[command(name = "csvlake", version, about = "S3 CSV data lake provisioning")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration profile (e.g. PROD)
    #[arg(long, global = true, env = "CSVLAKE_PROFILE")]
    pub profile: Option<String>,

    /// Stack name
    #[arg(long, global = true)]
    pub stack_name: Option<String>,

    /// AWS region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Local directory seeded under `seed/`
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Repository allowed to assume the deploy role, as ORG/REPO
    #[arg(long, global = true)]
    pub github_repo: Option<String>,

    /// Directory holding deployment state files
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the stack and print its synthesized template as JSON
    Synth,
    /// Check the stack's invariants; exits non-zero on any violation
    Validate,
    /// Create or update every resource, then print the stack outputs
    Deploy {
        /// Run against an in-memory provider instead of AWS
        #[arg(long)]
        dry_run: bool,
    },
    /// Tear the stack down
    Destroy,
    /// Print the stack outputs
    Outputs,
    /// Show the crawler's state and the local deployment record
    Status,
    /// Run SQL in the stack's Athena workgroup
    Query {
        /// SQL text
        sql: String,

        /// Give up (and cancel the query) after this many seconds
        #[arg(long)]
        timeout_secs: Option<u32>,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl CliArgs {
    /// Environment config for the selected profile with flag overrides applied.
    pub fn stack_config(&self) -> StackConfig {
        let mut config = match &self.profile {
            Some(p) => StackConfig::for_profile(p),
            None => StackConfig::from_env(),
        };
        if let Some(name) = &self.stack_name {
            config.stack_name = name.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(repo) = &self.github_repo {
            config.github_repo = Some(repo.clone());
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        config
    }
}
