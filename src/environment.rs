//! The robotic cell as seen by the planner: joint state, link transforms, the kinematic
//! descriptor of the manipulator and continuous collision queries.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::collision_check::{check_trajectory, CollisionEvent, SegmentCollision};
use crate::kinematic_traits::{Joints, Manipulator, Pose, Trajectory};
use crate::planning_error::PlanningError;

pub trait Environment {
    /// Current values of the manipulator joints, in the order of its joint names.
    fn current_joint_state(&self, manipulator: &str) -> Result<Joints, PlanningError>;

    /// World transform of the named link in the current state.
    fn link_transform(&self, link: &str) -> Result<Pose, PlanningError>;

    fn manipulator(&self, name: &str) -> Result<Manipulator, PlanningError>;

    /// Collisions of the listed links along the swept motion of the trajectory. Columns of
    /// the trajectory follow `joint_names`.
    fn continuous_collision_check(
        &self,
        joint_names: &[String],
        link_names: &[String],
        trajectory: &Trajectory,
    ) -> Vec<CollisionEvent>;

    fn set_state(&mut self, joints: &HashMap<String, f64>);

    /// Show the trajectory, if the environment has a viewer.
    fn plot_trajectory(&self, _joint_names: &[String], _trajectory: &Trajectory) {}

    /// Remove anything plotted before.
    fn plot_clear(&self) {}
}

/// Environment defined by tables: manipulators by name, fixed link transforms and joint
/// values. Collision queries are delegated to the optional segment detector; without one,
/// the cell is considered empty and no collisions are ever reported.
#[derive(Default)]
pub struct StaticEnvironment {
    manipulators: HashMap<String, Manipulator>,
    link_transforms: HashMap<String, Pose>,
    joint_values: HashMap<String, f64>,
    detector: Option<Box<dyn SegmentCollision>>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the manipulator. Its joints start at zero unless already set.
    pub fn with_manipulator(mut self, manipulator: Manipulator) -> Self {
        for joint in &manipulator.joint_names {
            self.joint_values.entry(joint.clone()).or_insert(0.0);
        }
        self.manipulators.insert(manipulator.name.clone(), manipulator);
        self
    }

    pub fn with_link(mut self, name: &str, transform: Pose) -> Self {
        self.link_transforms.insert(name.to_string(), transform);
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn SegmentCollision>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn joint_value(&self, joint: &str) -> Option<f64> {
        self.joint_values.get(joint).copied()
    }
}

impl Environment for StaticEnvironment {
    fn current_joint_state(&self, manipulator: &str) -> Result<Joints, PlanningError> {
        let manipulator = self
            .manipulators
            .get(manipulator)
            .ok_or_else(|| PlanningError::MissingManipulator(manipulator.to_string()))?;
        Ok(Joints::from_iterator(
            manipulator.dof(),
            manipulator
                .joint_names
                .iter()
                .map(|joint| self.joint_values.get(joint).copied().unwrap_or(0.0)),
        ))
    }

    fn link_transform(&self, link: &str) -> Result<Pose, PlanningError> {
        self.link_transforms
            .get(link)
            .copied()
            .ok_or_else(|| PlanningError::MissingLink(link.to_string()))
    }

    fn manipulator(&self, name: &str) -> Result<Manipulator, PlanningError> {
        self.manipulators
            .get(name)
            .cloned()
            .ok_or_else(|| PlanningError::MissingManipulator(name.to_string()))
    }

    fn continuous_collision_check(
        &self,
        joint_names: &[String],
        link_names: &[String],
        trajectory: &Trajectory,
    ) -> Vec<CollisionEvent> {
        match &self.detector {
            Some(detector) => check_trajectory(detector.as_ref(), joint_names, link_names, trajectory),
            None => Vec::new(),
        }
    }

    fn set_state(&mut self, joints: &HashMap<String, f64>) {
        let known: Vec<&String> = self
            .manipulators
            .values()
            .flat_map(|m| m.joint_names.iter())
            .collect();
        for (joint, value) in joints {
            if !known.contains(&joint) {
                warn!("Setting value of joint {} that no manipulator has", joint);
            }
            debug!("{} = {:.4}", joint, value);
            self.joint_values.insert(joint.clone(), *value);
        }
    }
}
