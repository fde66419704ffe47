use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use csvlake_athena::{AthenaClient, AthenaConfig};
use csvlake_core::{synth, validate, Stack, StackConfig, StackOutput};
use csvlake_deploy::{
    AwsProvider, CloudProvider, DeployReport, Deployer, MemoryProvider, ResourceAction,
    StateStore,
};

/// Account used for dry runs when none is configured.
const DRY_RUN_ACCOUNT: &str = "000000000000";

/// Build the stack for `account_id` and refuse to continue on any violation.
fn checked_stack(config: &StackConfig, account_id: &str) -> Result<Stack> {
    let stack = Stack::build(config, account_id).context("failed to build stack")?;
    if let Err(violations) = validate(&stack, config) {
        for v in &violations {
            eprintln!("  - {v}");
        }
        bail!(
            "stack {} has {} invariant violation(s)",
            stack.name,
            violations.len()
        );
    }
    Ok(stack)
}

/// Account from `provider` via STS unless one is configured.
async fn account_for(config: &StackConfig, provider: &AwsProvider) -> Result<String> {
    if let Some(id) = &config.account_id {
        return Ok(id.clone());
    }
    let id = provider
        .account_id()
        .await
        .context("AWS_ACCOUNT_ID not set and STS lookup failed")?;
    info!(account = %id, "resolved account via STS");
    Ok(id)
}

async fn aws_with_account(config: &StackConfig) -> Result<(AwsProvider, String)> {
    let provider = AwsProvider::new(&config.region).await;
    let account = account_for(config, &provider).await?;
    Ok((provider, account))
}

/// Configured account, or the caller's account via STS.
async fn resolve_account(config: &StackConfig) -> Result<String> {
    match &config.account_id {
        Some(id) => Ok(id.clone()),
        None => Ok(aws_with_account(config).await?.1),
    }
}

fn print_actions(actions: &[ResourceAction]) {
    for a in actions {
        println!("{:<22} {}", a.logical_id, a.action);
    }
}

fn print_outputs(outputs: &[StackOutput]) {
    for o in outputs {
        println!("{:<20} {}", o.name, o.value);
    }
}

pub async fn synth_cmd(config: &StackConfig) -> Result<()> {
    let account = resolve_account(config).await?;
    let stack = checked_stack(config, &account)?;
    let template = synth(&stack);
    println!("{}", serde_json::to_string_pretty(&template)?);
    Ok(())
}

pub async fn validate_cmd(config: &StackConfig) -> Result<()> {
    let account = resolve_account(config).await?;
    checked_stack(config, &account)?;
    println!("stack {} is valid", config.stack_name);
    Ok(())
}

pub async fn deploy_cmd(config: &StackConfig, dry_run: bool) -> Result<()> {
    if dry_run {
        return dry_run_deploy(config).await;
    }

    let (provider, account) = aws_with_account(config).await?;
    let stack = checked_stack(config, &account)?;

    let deployer = Deployer::new(Arc::new(provider), StateStore::new(config.state_file()));
    let report = deployer
        .deploy(&stack)
        .await
        .with_context(|| format!("deploy of {} failed", stack.name))?;
    print_actions(&report.actions);
    println!();
    print_outputs(&report.outputs);
    Ok(())
}

async fn dry_run_deploy(config: &StackConfig) -> Result<()> {
    let report = dry_run_report(config).await?;
    print_actions(&report.actions);
    println!();
    print_outputs(&report.outputs);
    Ok(())
}

/// Deploy against [`MemoryProvider`] with a throwaway state file.
async fn dry_run_report(config: &StackConfig) -> Result<DeployReport> {
    let account = config
        .account_id
        .clone()
        .unwrap_or_else(|| DRY_RUN_ACCOUNT.to_string());
    warn!(account = %account, "dry run: no AWS calls will be made");

    let stack = checked_stack(config, &account)?;
    let scratch = tempfile::tempdir().context("failed to create scratch state dir")?;
    let provider: Arc<dyn CloudProvider> = Arc::new(MemoryProvider::new(&account));
    let deployer = Deployer::new(provider, StateStore::new(scratch.path().join("state.json")));

    deployer
        .deploy(&stack)
        .await
        .with_context(|| format!("dry run of {} failed", stack.name))
}

pub async fn destroy_cmd(config: &StackConfig) -> Result<()> {
    let (provider, account) = aws_with_account(config).await?;
    let stack = Stack::build(config, &account).context("failed to build stack")?;

    let deployer = Deployer::new(Arc::new(provider), StateStore::new(config.state_file()));
    let report = deployer
        .destroy(&stack)
        .await
        .with_context(|| format!("destroy of {} failed", stack.name))?;
    print_actions(&report.actions);
    Ok(())
}

pub async fn outputs_cmd(config: &StackConfig) -> Result<()> {
    let account = resolve_account(config).await?;
    let stack = Stack::build(config, &account).context("failed to build stack")?;
    print_outputs(&stack.outputs);
    Ok(())
}

pub async fn status_cmd(config: &StackConfig) -> Result<()> {
    let (provider, account) = aws_with_account(config).await?;
    let stack = Stack::build(config, &account).context("failed to build stack")?;

    let state = StateStore::new(config.state_file())
        .load()
        .context("failed to read deployment state")?;
    match state.updated_at {
        Some(at) => println!(
            "last deploy:  {} ({} resources recorded)",
            at.to_rfc3339(),
            state.resources.len()
        ),
        None => println!("last deploy:  never"),
    }
    println!(
        "trigger:      {}",
        state.trigger_applied.as_deref().unwrap_or("not fired")
    );

    let crawler = stack.crawler().context("stack has no crawler")?;
    match provider.crawler_status(&crawler.name).await? {
        Some(status) => {
            println!("crawler:      {} ({})", crawler.name, status.state);
            println!(
                "last crawl:   {}",
                status.last_crawl_status.as_deref().unwrap_or("none")
            );
            if let Some(err) = status.last_crawl_error {
                println!("crawl error:  {err}");
            }
        }
        None => println!("crawler:      {} (not deployed)", crawler.name),
    }
    Ok(())
}

pub async fn query_cmd(
    config: &StackConfig,
    sql: &str,
    timeout_secs: Option<u32>,
    json: bool,
) -> Result<()> {
    let account = resolve_account(config).await?;
    let stack = Stack::build(config, &account).context("failed to build stack")?;

    let mut athena = AthenaConfig::for_stack(&stack, &config.profile)?;
    if let Some(secs) = timeout_secs {
        athena = athena.with_timeout(secs);
    }

    let client = AthenaClient::new(athena).await;
    let result = client.execute_query_with_limit(sql).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json_rows())?);
    } else {
        println!("{result}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use csvlake_core::stack::logical;
    use csvlake_deploy::Action;

    fn config(data_dir: &Path, profile: &str) -> StackConfig {
        StackConfig {
            profile: profile.to_string(),
            stack_name: "LakeStack".into(),
            region: "eu-west-1".into(),
            account_id: Some("123456789012".into()),
            data_dir: data_dir.to_path_buf(),
            bucket_name: None,
            github_repo: Some("acme/lake".into()),
            auto_delete_objects: None,
            state_dir: PathBuf::from(".csvlake"),
        }
    }

    #[test]
    fn forced_auto_delete_in_production_is_refused() {
        let mut cfg = config(Path::new("data"), "PROD");
        cfg.auto_delete_objects = Some(true);

        let err = checked_stack(&cfg, "123456789012").unwrap_err();
        assert!(err.to_string().contains("1 invariant violation"));
    }

    #[test]
    fn valid_stack_passes_the_check() {
        let stack = checked_stack(&config(Path::new("data"), ""), "123456789012").unwrap();
        assert_eq!(stack.name, "LakeStack");
    }

    #[tokio::test]
    async fn dry_run_walks_the_whole_graph() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("people.csv"), "id,name\n1,ada\n").unwrap();
        let cfg = config(tmp.path(), "");

        let report = dry_run_report(&cfg).await.unwrap();

        let ids: Vec<&str> = report.actions.iter().map(|a| a.logical_id.as_str()).collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(ids.last(), Some(&logical::TRIGGER));
        assert_eq!(report.action(logical::BUCKET), Some(&Action::Created));
        assert_eq!(report.action(logical::TRIGGER), Some(&Action::Triggered));
        match report.action(logical::SEED) {
            Some(Action::Seeded(r)) => assert_eq!(r.uploaded, 1),
            other => panic!("unexpected seed action: {other:?}"),
        }
        assert!(!cfg.state_file().exists());
    }

    #[tokio::test]
    async fn dry_run_refuses_an_invalid_stack() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config(tmp.path(), "PRODUCTION");
        cfg.auto_delete_objects = Some(true);

        assert!(dry_run_report(&cfg).await.is_err());
    }
}
