//! Supports reading the planner configuration and the cell description from YAML file (optional)

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use nalgebra::{Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use serde_saphyr::Options;

use crate::config::{PlannerConfig, SafetyMarginPolicy, DEFAULT_SAFETY_MARGIN};
use crate::environment::StaticEnvironment;
use crate::kinematic_traits::{Manipulator, Pose};
use crate::planning_error::PlanningError;
use crate::terms::SafetyMargin;

#[derive(Deserialize, Default)]
#[serde(default)]
struct SmoothnessYaml {
    velocity: Option<f64>,
    acceleration: Option<f64>,
    jerk: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SafetyMarginYaml {
    distance: Option<f64>,
    coefficient: Option<f64>,
    /// [distance, coefficient] per path step
    schedule: Option<Vec<[f64; 2]>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PoseWeightsYaml {
    position: Option<[f64; 3]>,
    orientation: Option<[f64; 3]>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct OptimizerYaml {
    max_iterations: Option<usize>,
    min_approx_improve: Option<f64>,
    min_trust_box_size: Option<f64>,
}

#[derive(Deserialize)]
struct ManipulatorYaml {
    joints: Vec<String>,
    links: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LinkYaml {
    translation: [f64; 3],
    /// [x, y, z, w], identity if not given
    quaternion: Option<[f64; 4]>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CellYaml {
    manipulators: BTreeMap<String, ManipulatorYaml>,
    links: BTreeMap<String, LinkYaml>,
}

/// Whole file. Planner settings and the cell share it, each reader takes its part.
#[derive(Deserialize, Default)]
#[serde(default)]
struct Root {
    manipulator: Option<String>,
    stationary_link: Option<String>,
    held_link: Option<String>,
    plotting: Option<bool>,
    initial_state: HashMap<String, f64>,
    smoothness: SmoothnessYaml,
    safety_margin: Option<SafetyMarginYaml>,
    pose_weights: PoseWeightsYaml,
    optimizer: OptimizerYaml,
    cell: CellYaml,
}

impl PlannerConfig {
    /// Read the planner configuration from YAML file. All keys are optional, missing ones
    /// keep their defaults:
    /// ```yaml
    /// manipulator: manipulator
    /// stationary_link: grinder_frame
    /// held_link: part
    /// plotting: false
    /// initial_state:
    ///   joint_a1: deg(-45)
    ///   joint_a2: 0.4
    ///   joint_a4: -1.9
    ///   joint_a6: 1.0
    /// smoothness: { velocity: 1.0, acceleration: 2.0, jerk: 5.0 }
    /// safety_margin: { distance: 0.025, coefficient: 20 }
    /// pose_weights:
    ///   position: [10, 10, 10]
    ///   orientation: [10, 10, 0]
    /// optimizer: { max_iterations: 200, min_approx_improve: 1e-3, min_trust_box_size: 1e-3 }
    /// ```
    /// Joint values are radians; deg(angle) can be used to give them in degrees
    /// (serde_saphyr angle conversions).
    /// Instead of distance and coefficient, safety_margin may have `schedule`, a list of
    /// [distance, coefficient] pairs, one per path step.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanningError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, PlanningError> {
        let root = load_root(contents)?;
        let mut config = PlannerConfig::default();

        if let Some(value) = root.manipulator {
            config.manipulator = value;
        }
        if let Some(value) = root.stationary_link {
            config.stationary_link = value;
        }
        if let Some(value) = root.held_link {
            config.held_link = value;
        }
        if let Some(value) = root.plotting {
            config.plotting = value;
        }
        config.initial_state = root.initial_state;

        let smoothness = &mut config.smoothness;
        smoothness.velocity = root.smoothness.velocity.unwrap_or(smoothness.velocity);
        smoothness.acceleration = root.smoothness.acceleration.unwrap_or(smoothness.acceleration);
        smoothness.jerk = root.smoothness.jerk.unwrap_or(smoothness.jerk);

        if let Some(margin) = root.safety_margin {
            config.safety_margin = safety_margin(margin)?;
        }

        if let Some(position) = root.pose_weights.position {
            config.pose_weights.position = Vector3::from(position);
        }
        if let Some(orientation) = root.pose_weights.orientation {
            config.pose_weights.orientation = Vector3::from(orientation);
        }

        let optimizer = &mut config.optimizer;
        optimizer.max_iterations = root.optimizer.max_iterations.unwrap_or(optimizer.max_iterations);
        optimizer.min_approx_improve =
            root.optimizer.min_approx_improve.unwrap_or(optimizer.min_approx_improve);
        optimizer.min_trust_box_size =
            root.optimizer.min_trust_box_size.unwrap_or(optimizer.min_trust_box_size);

        config.validate()?;
        Ok(config)
    }
}

/// Robot description part of the configuration: manipulators and fixed link frames.
/// ```yaml
/// cell:
///   manipulators:
///     manipulator:
///       joints: [joint_a1, joint_a2, joint_a3, joint_a4, joint_a5, joint_a6, joint_a7]
///       links: [link_1, link_2, link_3, link_4, link_5, link_6, link_7, part]
///   links:
///     grinder_frame:
///       translation: [0.6, 0.0, 0.8]
///       quaternion: [0.0, 0.7071068, 0.0, 0.7071068] # [x, y, z, w]
/// ```
/// Manipulators and links are listed sorted by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellDescription {
    pub manipulators: Vec<Manipulator>,
    pub links: Vec<(String, Pose)>,
}

impl CellDescription {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanningError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, PlanningError> {
        let cell = load_root(contents)?.cell;

        let manipulators = cell
            .manipulators
            .into_iter()
            .map(|(name, body)| Manipulator { name, joint_names: body.joints, link_names: body.links })
            .collect();

        let mut links = Vec::with_capacity(cell.links.len());
        for (name, body) in cell.links {
            let rotation = match body.quaternion {
                None => UnitQuaternion::identity(),
                Some([x, y, z, w]) => {
                    let quaternion = Quaternion::new(w, x, y, z);
                    let norm = quaternion.norm();
                    if !norm.is_finite() || norm < 1e-9 {
                        return Err(PlanningError::ConfigError(format!(
                            "cell.links.{}.quaternion must be finite and not zero", name
                        )));
                    }
                    UnitQuaternion::from_quaternion(quaternion)
                }
            };
            let translation = Translation3::from(Vector3::from(body.translation));
            links.push((name, Pose::from_parts(translation, rotation)));
        }
        Ok(CellDescription { manipulators, links })
    }

    /// Environment with these manipulators and links, and no collision geometry.
    pub fn into_environment(self) -> StaticEnvironment {
        let mut env = StaticEnvironment::new();
        for manipulator in self.manipulators {
            env = env.with_manipulator(manipulator);
        }
        for (name, pose) in self.links {
            env = env.with_link(&name, pose);
        }
        env
    }
}

fn load_root(contents: &str) -> Result<Root, PlanningError> {
    // A file with comments only is an empty document, all defaults
    let blank = contents.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if blank {
        return Ok(Root::default());
    }
    serde_saphyr::from_str_with_options(
        contents,
        Options { angle_conversions: true, ..Default::default() },
    )
    .map_err(|e| PlanningError::ConfigError(format!("{}", e)))
}

fn safety_margin(margin: SafetyMarginYaml) -> Result<SafetyMarginPolicy, PlanningError> {
    match margin.schedule {
        Some(_) if margin.distance.is_some() || margin.coefficient.is_some() => {
            Err(PlanningError::ConfigError(
                "safety_margin takes either schedule or distance and coefficient, not both".to_string(),
            ))
        }
        Some(schedule) => Ok(SafetyMarginPolicy::PerStep(
            schedule
                .into_iter()
                .map(|[distance, coefficient]| SafetyMargin { distance, coefficient })
                .collect(),
        )),
        None => Ok(SafetyMarginPolicy::Uniform(SafetyMargin {
            distance: margin.distance.unwrap_or(DEFAULT_SAFETY_MARGIN.distance),
            coefficient: margin.coefficient.unwrap_or(DEFAULT_SAFETY_MARGIN.coefficient),
        })),
    }
}
