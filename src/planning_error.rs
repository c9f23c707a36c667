//! Error handling for path loading, problem construction and solving

use std::io;

/// Unified error to report failures anywhere in the planning pipeline. Input and
/// configuration errors stop planning before the solver is invoked; `TrajectoryShape` and
/// `NonFiniteTrajectory` reject solver output. Solver non-convergence is not an error, it
/// is reported through [`crate::solver::OptStatus`].
#[derive(Debug)]
pub enum PlanningError {
    IoError(io::Error),
    /// Data row with the wrong number of fields or a field that is not a finite number.
    /// Line numbers are 1-based and count the header rows.
    MalformedInputRow { line: usize, reason: String },
    /// Surface normal of zero length, no tool frame can be built.
    DegenerateNormal { line: usize },
    MissingManipulator(String),
    MissingLink(String),
    /// Solver returned a vector that does not reshape into steps x joints.
    TrajectoryShape { expected: usize, found: usize },
    /// Solver returned infinity or NaN for this joint at this step.
    NonFiniteTrajectory { step: usize, joint: usize },
    ConfigError(String),
}

impl std::fmt::Display for PlanningError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PlanningError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            PlanningError::MalformedInputRow { line, ref reason } =>
                write!(f, "Malformed input row at line {}: {}", line, reason),
            PlanningError::DegenerateNormal { line } =>
                write!(f, "Degenerate (zero length) surface normal at line {}", line),
            PlanningError::MissingManipulator(ref name) =>
                write!(f, "Missing manipulator: {}", name),
            PlanningError::MissingLink(ref name) =>
                write!(f, "Missing link: {}", name),
            PlanningError::TrajectoryShape { expected, found } =>
                write!(f, "Trajectory shape mismatch: expected {} values, found {}", expected, found),
            PlanningError::NonFiniteTrajectory { step, joint } =>
                write!(f, "Trajectory value not finite at step {}, joint {}", step, joint),
            PlanningError::ConfigError(ref msg) =>
                write!(f, "Configuration Error: {}", msg),
        }
    }
}

impl std::error::Error for PlanningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanningError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PlanningError {
    fn from(err: io::Error) -> Self {
        PlanningError::IoError(err)
    }
}
