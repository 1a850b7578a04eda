//! Error types shared by every model.

use good_lp::ResolutionError;

/// Error type for building, solving and reading back a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Instance data is malformed (wrong dimensions, negative sizes, ...).
    InvalidInstance(String),
    /// The instance file could not be read or parsed.
    Unreadable(String),
    /// The task precedence graph contains a cycle through the given task.
    CyclicPrecedence(usize),
    /// The solver proved the model infeasible.
    Infeasible,
    /// The solver proved the model unbounded.
    Unbounded,
    /// The solver stopped before proving optimality (time limit, user event).
    Stopped(String),
    /// Any other solver failure.
    Solver(String),
    /// The solver returned values that do not describe a valid solution.
    Readout(String),
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidInstance(_) => "INSTANCE_INVALID",
            ModelError::Unreadable(_) => "INSTANCE_UNREADABLE",
            ModelError::CyclicPrecedence(_) => "INSTANCE_CYCLIC",
            ModelError::Infeasible => "SOLVER_INFEASIBLE",
            ModelError::Unbounded => "SOLVER_UNBOUNDED",
            ModelError::Stopped(_) => "SOLVER_STOPPED",
            ModelError::Solver(_) => "SOLVER_INTERNAL",
            ModelError::Readout(_) => "SOLUTION_READOUT",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ModelError::InvalidInstance(msg.into())
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InvalidInstance(msg) => {
                write!(f, "[{}] Invalid instance: {}", self.code(), msg)
            }
            ModelError::Unreadable(msg) => {
                write!(f, "[{}] Cannot load instance: {}", self.code(), msg)
            }
            ModelError::CyclicPrecedence(task) => write!(
                f,
                "[{}] Precedence graph has a cycle through task {}",
                self.code(),
                task + 1
            ),
            ModelError::Infeasible => write!(f, "[{}] Model is infeasible", self.code()),
            ModelError::Unbounded => write!(f, "[{}] Model is unbounded", self.code()),
            ModelError::Stopped(reason) => {
                write!(f, "[{}] Solver stopped early: {}", self.code(), reason)
            }
            ModelError::Solver(msg) => write!(f, "[{}] Solver error: {}", self.code(), msg),
            ModelError::Readout(msg) => {
                write!(f, "[{}] Cannot read solution: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<ResolutionError> for ModelError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => ModelError::Infeasible,
            ResolutionError::Unbounded => ModelError::Unbounded,
            ResolutionError::Other(reason) => match reason {
                "Stopped" | "Abandoned" | "UserEvent" => ModelError::Stopped(reason.to_string()),
                other => ModelError::Solver(other.to_string()),
            },
            ResolutionError::Str(msg) => ModelError::Solver(msg),
            #[allow(unreachable_patterns)]
            other => ModelError::Solver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code() {
        let err = ModelError::invalid("matrix is 3x4");
        assert_eq!(err.to_string(), "[INSTANCE_INVALID] Invalid instance: matrix is 3x4");
    }

    #[test]
    fn unreadable_has_its_own_code() {
        let err = ModelError::Unreadable("missing.json: not found".into());
        assert_eq!(err.code(), "INSTANCE_UNREADABLE");
        assert!(err.to_string().starts_with("[INSTANCE_UNREADABLE] Cannot load instance"));
    }

    #[test]
    fn cyclic_task_is_one_based() {
        assert!(ModelError::CyclicPrecedence(2).to_string().contains("task 3"));
    }

    #[test]
    fn resolution_errors_map() {
        assert_eq!(ModelError::from(ResolutionError::Infeasible), ModelError::Infeasible);
        assert_eq!(ModelError::from(ResolutionError::Unbounded), ModelError::Unbounded);
        assert_eq!(
            ModelError::from(ResolutionError::Other("Stopped")).code(),
            "SOLVER_STOPPED"
        );
        assert_eq!(
            ModelError::from(ResolutionError::Str("boom".into())).code(),
            "SOLVER_INTERNAL"
        );
    }
}
