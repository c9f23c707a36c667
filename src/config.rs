//! Settings of a planning request. Defaults describe the surface following cell this planner
//! was made for: a 7 axis arm holding the part against a stationary grinder.

use std::collections::HashMap;
use nalgebra::Vector3;

use crate::planning_error::PlanningError;
use crate::terms::SafetyMargin;

/// Trust region solver tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub max_iterations: usize,
    /// Stop when the approximate merit improvement falls below this
    pub min_approx_improve: f64,
    /// Stop when the trust region shrinks below this
    pub min_trust_box_size: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            max_iterations: 200,
            min_approx_improve: 1e-3,
            min_trust_box_size: 1e-3,
        }
    }
}

/// Per joint coefficients of the smoothness costs. Higher derivatives are penalized more.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothnessCoefficients {
    pub velocity: f64,
    pub acceleration: f64,
    pub jerk: f64,
}

impl Default for SmoothnessCoefficients {
    fn default() -> Self {
        SmoothnessCoefficients { velocity: 1.0, acceleration: 2.0, jerk: 5.0 }
    }
}

/// Safety margin of the collision cost along the path.
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyMarginPolicy {
    /// Same margin at every step
    Uniform(SafetyMargin),
    /// Explicit margin per step. Must have as many entries as the path has steps.
    PerStep(Vec<SafetyMargin>),
}

/// 2.5 cm clearance, coefficient 20
pub const DEFAULT_SAFETY_MARGIN: SafetyMargin = SafetyMargin { distance: 0.025, coefficient: 20.0 };

impl Default for SafetyMarginPolicy {
    fn default() -> Self {
        SafetyMarginPolicy::Uniform(DEFAULT_SAFETY_MARGIN)
    }
}

/// Weights of the Cartesian pose constraint. The zero on the orientation Z leaves the
/// spin of the part about the tool approach axis free, the grinder is rotationally
/// symmetric. Position weights are the same on all axes; exactly one orientation
/// weight is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseWeights {
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
}

impl Default for PoseWeights {
    fn default() -> Self {
        PoseWeights {
            position: Vector3::new(10.0, 10.0, 10.0),
            orientation: Vector3::new(10.0, 10.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Manipulator (kinematic group) being planned
    pub manipulator: String,
    /// Link whose frame the tool path must track, does not move
    pub stationary_link: String,
    /// Link of the part held by the manipulator
    pub held_link: String,
    /// Attach the progress callback and plot trajectories
    pub plotting: bool,
    /// Joint values (radians) to set before planning
    pub initial_state: HashMap<String, f64>,
    pub smoothness: SmoothnessCoefficients,
    pub safety_margin: SafetyMarginPolicy,
    pub pose_weights: PoseWeights,
    pub optimizer: OptimizerSettings,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            manipulator: "manipulator".to_string(),
            stationary_link: "grinder_frame".to_string(),
            held_link: "part".to_string(),
            plotting: false,
            initial_state: HashMap::new(),
            smoothness: SmoothnessCoefficients::default(),
            safety_margin: SafetyMarginPolicy::default(),
            pose_weights: PoseWeights::default(),
            optimizer: OptimizerSettings::default(),
        }
    }
}

impl PlannerConfig {
    /// Check the values make sense. Called after loading from file; the builder trusts them.
    pub fn validate(&self) -> Result<(), PlanningError> {
        fn fail(msg: String) -> Result<(), PlanningError> {
            Err(PlanningError::ConfigError(msg))
        }
        fn non_negative(name: &str, value: f64) -> Result<(), PlanningError> {
            if !value.is_finite() || value < 0.0 {
                return fail(format!("{} must be finite and not negative (got {})", name, value));
            }
            Ok(())
        }

        for (name, value) in [
            ("manipulator", &self.manipulator),
            ("stationary_link", &self.stationary_link),
            ("held_link", &self.held_link),
        ] {
            if value.trim().is_empty() {
                return fail(format!("{} must not be empty", name));
            }
        }

        non_negative("smoothness.velocity", self.smoothness.velocity)?;
        non_negative("smoothness.acceleration", self.smoothness.acceleration)?;
        non_negative("smoothness.jerk", self.smoothness.jerk)?;

        let margins: &[SafetyMargin] = match &self.safety_margin {
            SafetyMarginPolicy::Uniform(margin) => std::slice::from_ref(margin),
            SafetyMarginPolicy::PerStep(margins) => margins,
        };
        for (step, margin) in margins.iter().enumerate() {
            non_negative(&format!("safety_margin[{}].distance", step), margin.distance)?;
            non_negative(&format!("safety_margin[{}].coefficient", step), margin.coefficient)?;
        }

        let position = &self.pose_weights.position;
        let orientation = &self.pose_weights.orientation;
        for axis in 0..3 {
            non_negative(&format!("pose_weights.position[{}]", axis), position[axis])?;
            non_negative(&format!("pose_weights.orientation[{}]", axis), orientation[axis])?;
        }
        if position.x <= 0.0 || position.x != position.y || position.x != position.z {
            return fail(format!(
                "pose_weights.position must be the same positive value on all axes (got {:?})",
                position.as_slice()
            ));
        }
        if orientation.iter().filter(|w| **w == 0.0).count() != 1 {
            return fail(format!(
                "pose_weights.orientation must be zero on exactly one axis, the tool spin axis (got {:?})",
                orientation.as_slice()
            ));
        }

        if self.optimizer.max_iterations == 0 {
            return fail("optimizer.max_iterations must be at least 1".to_string());
        }
        non_negative("optimizer.min_approx_improve", self.optimizer.min_approx_improve)?;
        non_negative("optimizer.min_trust_box_size", self.optimizer.min_trust_box_size)?;

        for (joint, value) in &self.initial_state {
            if !value.is_finite() {
                return fail(format!("initial_state.{} must be finite (got {})", joint, value));
            }
        }
        Ok(())
    }
}
