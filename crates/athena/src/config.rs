use serde::{Deserialize, Serialize};

use csvlake_core::config::profiled_env_opt;
use csvlake_core::Stack;

use crate::client::AthenaError;

/// 10 GB in bytes (10 * 1024^3).
const DEFAULT_MAX_SCAN_BYTES: u64 = 10_737_418_240;

const DEFAULT_TIMEOUT_SECONDS: u32 = 300;

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── AthenaConfig ─────────────────────────────────────────────────

/// Where and how queries run.
///
/// Database, workgroup and result location come from the stack's resource
/// graph; only the limits are read from the environment
/// (`ATHENA_TIMEOUT_SECONDS`, `ATHENA_MAX_SCAN_BYTES`, profile-prefixed first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena queries.
    pub region: String,
    /// Catalog database the crawler populates.
    pub database: String,
    /// Provisioned workgroup.
    pub workgroup: String,
    /// S3 path for query results.
    pub output_location: String,
    /// Maximum bytes to scan per query (0 = unlimited).
    pub max_scan_bytes: u64,
    /// Query timeout in seconds.
    pub timeout_seconds: u32,
}

impl AthenaConfig {
    /// Derive the config from a built stack, reading limits for `profile`.
    pub fn for_stack(stack: &Stack, profile: &str) -> Result<Self, AthenaError> {
        let database = stack
            .database()
            .ok_or_else(|| AthenaError::NotProvisioned("Glue database".into()))?;
        let workgroup = stack
            .workgroup()
            .ok_or_else(|| AthenaError::NotProvisioned("Athena workgroup".into()))?;

        Ok(Self {
            region: stack.region.clone(),
            database: database.name.clone(),
            workgroup: workgroup.name.clone(),
            output_location: workgroup.output_location.clone(),
            max_scan_bytes: profiled_env_u64(
                profile,
                "ATHENA_MAX_SCAN_BYTES",
                DEFAULT_MAX_SCAN_BYTES,
            ),
            timeout_seconds: profiled_env_u32(
                profile,
                "ATHENA_TIMEOUT_SECONDS",
                DEFAULT_TIMEOUT_SECONDS,
            ),
        })
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Convenience: max scan budget expressed in gigabytes.
    pub fn max_scan_gb(&self) -> f64 {
        self.max_scan_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

// ── Tests ────────────────────────────────────────────────────────
