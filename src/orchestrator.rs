//! Solve and verify: continuous collision check of the initial guess, solver run,
//! continuous collision check of the result.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::kinematic_traits::Trajectory;
use crate::planning_error::PlanningError;
use crate::problem::ProblemDescription;
use crate::solver::{trajectory_to_vec, vec_to_trajectory, IterationInfo, OptStatus, TrustRegionSolver};

/// Everything the pipeline needs from the outside, passed explicitly.
pub struct PlanningContext<'a> {
    pub environment: &'a dyn Environment,

    /// Attach the progress callback and plot trajectories in the environment viewer
    pub plotting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub trajectory: Trajectory,
    pub status: OptStatus,
    /// Continuous collisions of the initial guess
    pub initial_collisions: usize,
    /// Continuous collisions of the solver result. Non zero means the trajectory should be
    /// rejected or replanned, it is not reported as an error.
    pub final_collisions: usize,
    pub planning_time: Duration,
}

impl SolveOutcome {
    /// Converged and collision free
    pub fn is_acceptable(&self) -> bool {
        self.status.is_converged() && self.final_collisions == 0
    }
}

/// Run the solver on the problem and verify the result. Nothing is retried. Errors are
/// only returned if the solver output cannot be read as a trajectory of the problem:
/// wrong length, or values that are not finite.
pub fn solve_and_verify(
    context: &PlanningContext,
    problem: &ProblemDescription,
    solver: &mut dyn TrustRegionSolver,
) -> Result<SolveOutcome, PlanningError> {
    let env = context.environment;
    let joint_names = &problem.manipulator.joint_names;
    let link_names = &problem.manipulator.link_names;

    let initial_collisions = env
        .continuous_collision_check(joint_names, link_names, &problem.init_trajectory)
        .len();
    info!("Initial trajectory number of continuous collisions: {}", initial_collisions);

    let initial = trajectory_to_vec(&problem.init_trajectory);
    let started = Instant::now();
    let result = if context.plotting {
        let mut plot = |progress: &IterationInfo| {
            debug!(
                "Iteration {}: merit {:.6}, trust box {:.6}",
                progress.iteration, progress.merit, progress.trust_box_size
            );
            // Intermediate solutions of wrong size are not plotted, the final one is checked below
            if let Ok(trajectory) = vec_to_trajectory(progress.x, problem.n_steps, problem.dof()) {
                env.plot_trajectory(joint_names, &trajectory);
            }
        };
        solver.optimize(problem, &initial, Some(&mut plot))
    } else {
        solver.optimize(problem, &initial, None)
    };
    let planning_time = started.elapsed();
    info!(
        "Optimization Status: {}, Planning time: {:.3}",
        result.status,
        planning_time.as_secs_f64()
    );
    if !result.status.is_converged() {
        warn!("Solver did not converge: {}", result.status);
    }

    if context.plotting {
        env.plot_clear();
    }

    let trajectory = vec_to_trajectory(&result.x, problem.n_steps, problem.dof())?;
    env.plot_trajectory(joint_names, &trajectory);

    let final_collisions = env
        .continuous_collision_check(joint_names, link_names, &trajectory)
        .len();
    info!("Final trajectory number of continuous collisions: {}", final_collisions);

    Ok(SolveOutcome {
        trajectory,
        status: result.status,
        initial_collisions,
        final_collisions,
        planning_time,
    })
}
