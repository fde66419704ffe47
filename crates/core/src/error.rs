use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("invalid repository identifier '{0}': expected <org>/<repo>")]
    InvalidRepo(String),

    #[error("resource {resource} depends on unknown resource {dependency}")]
    UnknownDependency { resource: String, dependency: String },

    #[error("dependency cycle among: {0}")]
    DependencyCycle(String),

    #[error("{0}")]
    Other(String),
}
