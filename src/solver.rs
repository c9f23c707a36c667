//! Interface to the external trust region solver (sequential convex optimization).
//! The solver works on the flat vector of all joint values, step after step.

use std::fmt;

use crate::kinematic_traits::Trajectory;
use crate::planning_error::PlanningError;
use crate::problem::ProblemDescription;

/// How the optimization ended. Only `Converged` means the constraints are known to hold;
/// everything else is reported to the caller, who decides if the trajectory is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptStatus {
    Converged,
    IterationLimit,
    PenaltyIterationLimit,
    ToleranceReached,
    UserInterrupted,
    Failed,
}

impl OptStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, OptStatus::Converged)
    }
}

impl fmt::Display for OptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OptStatus::Converged => "converged",
            OptStatus::IterationLimit => "iteration limit reached",
            OptStatus::PenaltyIterationLimit => "penalty iteration limit reached",
            OptStatus::ToleranceReached => "tolerance reached",
            OptStatus::UserInterrupted => "interrupted by user",
            OptStatus::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// State of the solver after an iteration, passed to the progress callback.
#[derive(Debug)]
pub struct IterationInfo<'a> {
    pub iteration: usize,
    pub merit: f64,
    pub trust_box_size: f64,
    /// Current solution, flat as [`trajectory_to_vec`] makes it
    pub x: &'a [f64],
}

pub type ProgressCallback<'a> = &'a mut dyn FnMut(&IterationInfo);

#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub x: Vec<f64>,
    pub status: OptStatus,
}

/// Trait for trust region solvers. Implementations take the tuning from
/// [`ProblemDescription::optimizer`]. The call blocks until the solver stops; cancellation,
/// if any, is up to the solver.
pub trait TrustRegionSolver {
    fn optimize(
        &mut self,
        problem: &ProblemDescription,
        initial: &[f64],
        callback: Option<ProgressCallback<'_>>,
    ) -> SolverResult;
}

/// Flatten the trajectory row by row (step after step).
pub fn trajectory_to_vec(trajectory: &Trajectory) -> Vec<f64> {
    trajectory.transpose().as_slice().to_vec()
}

/// Inverse of [`trajectory_to_vec`]. Values must all be finite.
pub fn vec_to_trajectory(x: &[f64], n_steps: usize, dof: usize) -> Result<Trajectory, PlanningError> {
    let expected = n_steps * dof;
    if x.len() != expected {
        return Err(PlanningError::TrajectoryShape { expected, found: x.len() });
    }
    if let Some(index) = x.iter().position(|value| !value.is_finite()) {
        return Err(PlanningError::NonFiniteTrajectory { step: index / dof, joint: index % dof });
    }
    Ok(Trajectory::from_row_slice(n_steps, dof, x))
}
