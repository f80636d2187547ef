//! Error types for kinodynamic_rrt

use std::fmt;

/// Main error type for the planner
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// Path planning failed (unknown node handle, empty tree, ...)
    PlanningError(String),
    /// Invalid parameter or argument
    InvalidParameter(String),
    /// Analytic or numerical computation failed to produce an answer
    NumericalError(String),
    /// A parent-pointer walk revisited a node
    CycleDetected(String),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::PlanningError(msg) => write!(f, "Planning error: {}", msg),
            PlannerError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlannerError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            PlannerError::CycleDetected(msg) => write!(f, "Cycle detected: {}", msg),
        }
    }
}

impl std::error::Error for PlannerError {}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::InvalidParameter("invalid gamma, must be >= 1.0".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid parameter: invalid gamma, must be >= 1.0"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(PlannerError::CycleDetected("node 3".to_string()));
        assert_eq!(err.to_string(), "Cycle detected: node 3");
    }
}
