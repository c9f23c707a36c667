//! Construction of the trajectory optimization problem from the tool path.

use tracing::{debug, info};

use crate::config::{OptimizerSettings, PlannerConfig, SafetyMarginPolicy};
use crate::environment::Environment;
use crate::kinematic_traits::{replicate_joints, Manipulator, Trajectory};
use crate::planning_error::PlanningError;
use crate::terms::{
    uniform_safety_margins, CollisionAvoidanceTerm, JointSmoothnessTerm, PoseConstraintTerm,
    SafetyMargin, SmoothnessOrder, Term, TermType,
};
use crate::tool_path::ToolPath;

/// Complete description of one planning request, ready for the solver. Not modified
/// once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDescription {
    /// Number of trajectory steps, one per tool frame
    pub n_steps: usize,
    pub manipulator: Manipulator,
    /// If set, the first step is pinned to the initial trajectory
    pub start_fixed: bool,
    pub optimizer: OptimizerSettings,
    /// n_steps x dof initial guess
    pub init_trajectory: Trajectory,
    pub costs: Vec<Term>,
    pub constraints: Vec<Term>,
}

impl ProblemDescription {
    pub fn dof(&self) -> usize {
        self.manipulator.dof()
    }

    pub fn pose_constraints(&self) -> impl Iterator<Item = &PoseConstraintTerm> {
        self.constraints.iter().filter_map(Term::as_pose_constraint)
    }
}

/// Builds [`ProblemDescription`] for the given configuration.
pub struct ProblemBuilder<'a> {
    config: &'a PlannerConfig,
}

impl<'a> ProblemBuilder<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        ProblemBuilder { config }
    }

    /// Build the problem for the tool path in the current state of the environment.
    ///
    /// The initial guess repeats the current joint state at every step. It is not meant
    /// to follow the path: the solver finds the joint path from the Cartesian constraints
    /// alone, instead of starting from a possibly infeasible seed.
    pub fn build(
        &self,
        env: &dyn Environment,
        path: &ToolPath,
    ) -> Result<ProblemDescription, PlanningError> {
        let config = self.config;
        let manipulator = env.manipulator(&config.manipulator)?;
        let start = env.current_joint_state(&manipulator.name)?;
        let n_steps = path.len();
        let dof = manipulator.dof();

        // Resolved once: every waypoint tracks the same stationary frame.
        let stationary = env.link_transform(&config.stationary_link)?;

        let mut costs = Vec::with_capacity(4);
        for (order, coefficient) in [
            (SmoothnessOrder::Velocity, config.smoothness.velocity),
            (SmoothnessOrder::Acceleration, config.smoothness.acceleration),
            (SmoothnessOrder::Jerk, config.smoothness.jerk),
        ] {
            costs.push(Term::JointSmoothness(JointSmoothnessTerm::uniform(order, dof, coefficient)));
        }
        costs.push(Term::CollisionAvoidance(CollisionAvoidanceTerm {
            name: "collision".to_string(),
            term_type: TermType::Cost,
            continuous: false,
            step_range: n_steps.checked_sub(1).map(|last| (0, last)),
            gap: 1,
            margins: self.safety_margins(n_steps)?,
        }));

        let constraints = path
            .iter()
            .enumerate()
            .map(|(step, frame)| {
                Term::PoseConstraint(PoseConstraintTerm {
                    name: format!("waypoint_cart_{}", step),
                    term_type: TermType::Constraint,
                    link: config.held_link.clone(),
                    tcp: *frame,
                    timestep: step,
                    xyz: stationary.translation.vector,
                    rotation: stationary.rotation,
                    pos_coeffs: config.pose_weights.position,
                    rot_coeffs: config.pose_weights.orientation,
                })
            })
            .collect::<Vec<_>>();

        info!(
            "Problem for {}: {} steps, {} joints, {} costs, {} constraints",
            manipulator.name,
            n_steps,
            dof,
            costs.len(),
            constraints.len()
        );
        debug!("Initial joints {:?}", start.as_slice());

        Ok(ProblemDescription {
            n_steps,
            init_trajectory: replicate_joints(&start, n_steps),
            manipulator,
            start_fixed: false,
            optimizer: config.optimizer,
            costs,
            constraints,
        })
    }

    fn safety_margins(&self, n_steps: usize) -> Result<Vec<SafetyMargin>, PlanningError> {
        match &self.config.safety_margin {
            SafetyMarginPolicy::Uniform(margin) => Ok(uniform_safety_margins(n_steps, *margin)),
            SafetyMarginPolicy::PerStep(margins) if margins.len() == n_steps => Ok(margins.clone()),
            SafetyMarginPolicy::PerStep(margins) => Err(PlanningError::ConfigError(format!(
                "safety margin schedule has {} entries but the path has {} steps",
                margins.len(),
                n_steps
            ))),
        }
    }
}
