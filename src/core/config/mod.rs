mod parsing;
mod scoring;
mod secret;
mod settings;
mod types;

pub(crate) use scoring::{PolicyError, ScoringPolicy};
pub(crate) use types::{ConfigError, Environment, Settings};
