pub mod aws;
pub mod engine;
pub mod error;
pub mod memory;
pub mod provider;
pub mod seed;
pub mod state;

pub use aws::AwsProvider;
pub use engine::{Action, DeployReport, Deployer, DestroyReport, ResourceAction};
pub use error::DeployError;
pub use memory::MemoryProvider;
pub use provider::{CloudProvider, CrawlerDescription, CrawlerStatus};
pub use seed::{SeedReport, Seeder};
pub use state::{DeploymentState, StateStore};
