use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    /// An AWS API call failed; the provider's message is kept verbatim.
    #[error("{operation} failed: {message}")]
    AwsSdk {
        operation: &'static str,
        message: String,
    },

    #[error("{logical_id}: {source}")]
    Resource {
        logical_id: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("stack is invalid: {0}")]
    Invalid(String),

    #[error("core error: {0}")]
    Core(#[from] csvlake_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file {path}: {message}")]
    State { path: PathBuf, message: String },

    #[error("seed source directory not found: {0}")]
    SeedSourceMissing(PathBuf),

    #[error("bucket {0} is not empty and auto-delete is disabled")]
    BucketNotEmpty(String),

    #[error("crawler {name} is {state}; retry once the crawl finishes")]
    CrawlerBusy { name: String, state: String },

    #[error("{0}")]
    Other(String),
}

impl DeployError {
    /// Attach the failing resource's logical id.
    pub fn at(self, logical_id: &str) -> DeployError {
        DeployError::Resource {
            logical_id: logical_id.to_string(),
            source: Box::new(self),
        }
    }
}
