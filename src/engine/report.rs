use crate::error::{ResolveError, Violation};

/// Collects structural violations for one resolution pass so that every
/// problem in the values is reported at once, then fails the pass as a whole.
#[derive(Debug, Default)]
pub struct Report {
    violations: Vec<Violation>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn finish(self) -> Result<(), ResolveError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ResolveError::Structural(self.violations))
        }
    }
}
