//! Failures of collaborators during a dispatch.
use std::fmt;
use thiserror::Error;

/// Roles of the collaborators of [`EvalLogger`](super::EvalLogger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// The metrics logger.
    Metrics,

    /// The frame visualizer.
    Visualizer,

    /// The data saver.
    Storage,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Metrics => write!(f, "metrics logger"),
            Collaborator::Visualizer => write!(f, "frame visualizer"),
            Collaborator::Storage => write!(f, "data saver"),
        }
    }
}

/// A failure of one collaborator.
#[derive(Debug)]
pub struct CollaboratorFailure {
    /// Which collaborator failed.
    pub collaborator: Collaborator,

    /// What went wrong.
    pub error: anyhow::Error,
}

/// Failures collected while dispatching a call to all the collaborators.
///
/// Every collaborator is called even if an earlier one fails, so this error
/// may carry more than one failure.
#[derive(Error, Debug)]
#[error("{}", summarize(.failures))]
pub struct DispatchError {
    /// Failures in the order the collaborators were called.
    pub failures: Vec<CollaboratorFailure>,
}

fn summarize(failures: &[CollaboratorFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} failed: {:#}", f.collaborator, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DispatchError {
    /// Returns `true` if `collaborator` is among the failed ones.
    pub fn failed(&self, collaborator: Collaborator) -> bool {
        self.failures.iter().any(|f| f.collaborator == collaborator)
    }

    /// Returns the error of `collaborator`, if it failed.
    pub fn error_of(&self, collaborator: Collaborator) -> Option<&anyhow::Error> {
        self.failures
            .iter()
            .find(|f| f.collaborator == collaborator)
            .map(|f| &f.error)
    }
}

/// Collects failures of a dispatch.
#[derive(Default)]
pub(crate) struct Failures(Vec<CollaboratorFailure>);

impl Failures {
    pub(crate) fn push(&mut self, collaborator: Collaborator, error: anyhow::Error) {
        log::warn!("{} failed: {:#}", collaborator, error);
        self.0.push(CollaboratorFailure {
            collaborator,
            error,
        });
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, DispatchError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(DispatchError { failures: self.0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_failure() {
        let mut failures = Failures::default();
        failures.push(Collaborator::Metrics, anyhow::anyhow!("connection refused"));
        failures.push(Collaborator::Storage, anyhow::anyhow!("disk full"));
        let err = failures.into_result(()).unwrap_err();

        assert!(err.failed(Collaborator::Storage));
        assert!(!err.failed(Collaborator::Visualizer));
        assert_eq!(
            err.to_string(),
            "metrics logger failed: connection refused; data saver failed: disk full"
        );
    }
}
