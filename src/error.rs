pub use anyhow::{anyhow, Result};

use thiserror::Error as TError;

use crate::engine::Feature;

/// A single structural problem found in the values, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TError)]
pub enum ResolveError {
    #[error("{message}")]
    VersionGate { feature: Feature, message: String },
    #[error("{}", join_violations(.0))]
    Structural(Vec<Violation>),
}

impl ResolveError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            ResolveError::Structural(violations) => violations,
            ResolveError::VersionGate { .. } => &[],
        }
    }
}

impl From<Violation> for ResolveError {
    fn from(violation: Violation) -> Self {
        ResolveError::Structural(vec![violation])
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
