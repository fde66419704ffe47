pub mod config;
pub mod error;
pub mod naming;
pub mod stack;
pub mod synth;
pub mod validate;

pub use config::{GitHubRepo, StackConfig};
pub use error::*;
pub use stack::{Resource, ResourceKind, Stack, StackOutput};
pub use synth::{synth, Template};
pub use validate::{validate, Violation};
