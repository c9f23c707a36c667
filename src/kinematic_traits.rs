extern crate nalgebra as na;

use na::{DMatrix, DVector, Isometry3};

/// Pose is used for link transforms and tool frames handed to the solver. It contains both
/// Cartesian position and rotation quaternion
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Joint values of the manipulator, in the order of [`Manipulator::joint_names`].
/// Unlike a fixed 6 axis arm, the planned manipulator may have any number of joints
/// (7 for the redundant arms this planner is usually used with).
pub type Joints = DVector<f64>;

/// Joint trajectory, one row per step and one column per joint.
pub type Trajectory = DMatrix<f64>;

/// Kinematic descriptor of the manipulator being planned for, as resolved from the
/// robot description.
#[derive(Debug, Clone, PartialEq)]
pub struct Manipulator {
    pub name: String,

    /// Names of the active joints, defines the column order of trajectories.
    pub joint_names: Vec<String>,

    /// Names of the links that move when the joints move. These are checked for collisions.
    pub link_names: Vec<String>,
}

impl Manipulator {
    pub fn new(name: &str, joint_names: &[&str], link_names: &[&str]) -> Self {
        Manipulator {
            name: name.to_string(),
            joint_names: joint_names.iter().map(|s| s.to_string()).collect(),
            link_names: link_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of degrees of freedom (active joints)
    pub fn dof(&self) -> usize {
        self.joint_names.len()
    }
}

/// Build the constant trajectory that repeats the given joint state at every step.
pub fn replicate_joints(joints: &Joints, n_steps: usize) -> Trajectory {
    Trajectory::from_fn(n_steps, joints.len(), |_, c| joints[c])
}
