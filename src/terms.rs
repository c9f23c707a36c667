//! Cost and constraint terms of the trajectory optimization problem.
//!
//! The set of terms is closed: joint smoothness (velocity, acceleration, jerk), collision
//! avoidance and Cartesian pose. Solver adapters match on [`Term`] exhaustively.

use crate::tool_path::ToolFrame;
use nalgebra::{UnitQuaternion, Vector3};
use std::fmt;

/// Cost terms are minimized, constraint terms must hold to solver tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    Cost,
    Constraint,
}

/// Derivative of the joint trajectory a smoothness term penalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothnessOrder {
    Velocity,
    Acceleration,
    Jerk,
}

impl SmoothnessOrder {
    /// Name of the term as the solver reports it
    pub fn term_name(&self) -> &'static str {
        match self {
            SmoothnessOrder::Velocity => "joint_vel",
            SmoothnessOrder::Acceleration => "joint_acc",
            SmoothnessOrder::Jerk => "joint_jerk",
        }
    }

    /// Number of consecutive steps the finite difference of this order spans.
    pub fn stencil(&self) -> usize {
        match self {
            SmoothnessOrder::Velocity => 2,
            SmoothnessOrder::Acceleration => 3,
            SmoothnessOrder::Jerk => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointSmoothnessTerm {
    pub name: String,
    pub term_type: TermType,
    pub order: SmoothnessOrder,
    /// One coefficient per joint
    pub coeffs: Vec<f64>,
}

impl JointSmoothnessTerm {
    /// Cost term with the same coefficient on every joint.
    pub fn uniform(order: SmoothnessOrder, dof: usize, coefficient: f64) -> Self {
        JointSmoothnessTerm {
            name: order.term_name().to_string(),
            term_type: TermType::Cost,
            order,
            coeffs: vec![coefficient; dof],
        }
    }
}

/// Clearance below which the collision term starts penalizing, and the penalty weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyMargin {
    /// Distance in meters
    pub distance: f64,
    pub coefficient: f64,
}

/// Same safety margin at every one of `n_steps` steps.
pub fn uniform_safety_margins(n_steps: usize, margin: SafetyMargin) -> Vec<SafetyMargin> {
    vec![margin; n_steps]
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionAvoidanceTerm {
    pub name: String,
    pub term_type: TermType,
    /// If set, the swept volume between steps is checked, otherwise only the steps.
    pub continuous: bool,
    /// First and last step covered, both inclusive. `None` when the problem has no steps.
    pub step_range: Option<(usize, usize)>,
    /// Check every `gap`-th step of the range
    pub gap: usize,
    /// Indexed by step
    pub margins: Vec<SafetyMargin>,
}

impl CollisionAvoidanceTerm {
    pub fn margin_at(&self, step: usize) -> Option<&SafetyMargin> {
        self.margins.get(step)
    }

    /// Steps this term applies to, in order.
    pub fn steps(&self) -> impl Iterator<Item = usize> {
        let range = match self.step_range {
            Some((first, last)) => first..last + 1,
            None => 0..0,
        };
        range.step_by(self.gap.max(1))
    }
}

/// Binds the tool frame at one step to the fixed stationary target. The held link
/// carries the workpiece; with the tcp offset applied it must coincide with the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseConstraintTerm {
    pub name: String,
    pub term_type: TermType,
    pub link: String,
    pub tcp: ToolFrame,
    pub timestep: usize,
    /// Target position in the world frame
    pub xyz: Vector3<f64>,
    /// Target orientation in the world frame
    pub rotation: UnitQuaternion<f64>,
    pub pos_coeffs: Vector3<f64>,
    /// A zero leaves the rotation about that axis free
    pub rot_coeffs: Vector3<f64>,
}

impl PoseConstraintTerm {
    /// Target orientation as [w, x, y, z], the ordering the solver expects
    pub fn wxyz(&self) -> [f64; 4] {
        let q = self.rotation.quaternion();
        [q.w, q.i, q.j, q.k]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    JointSmoothness(JointSmoothnessTerm),
    CollisionAvoidance(CollisionAvoidanceTerm),
    PoseConstraint(PoseConstraintTerm),
}

impl Term {
    pub fn name(&self) -> &str {
        match self {
            Term::JointSmoothness(term) => &term.name,
            Term::CollisionAvoidance(term) => &term.name,
            Term::PoseConstraint(term) => &term.name,
        }
    }

    pub fn term_type(&self) -> TermType {
        match self {
            Term::JointSmoothness(term) => term.term_type,
            Term::CollisionAvoidance(term) => term.term_type,
            Term::PoseConstraint(term) => term.term_type,
        }
    }

    pub fn as_pose_constraint(&self) -> Option<&PoseConstraintTerm> {
        match self {
            Term::PoseConstraint(term) => Some(term),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::JointSmoothness(term) => write!(
                f,
                "{} ({:?}): {:?} coeffs {:?}",
                term.name, term.term_type, term.order, term.coeffs
            ),
            Term::CollisionAvoidance(term) => {
                write!(f, "{} ({:?}): ", term.name, term.term_type)?;
                match term.step_range {
                    Some((first, last)) => write!(f, "steps {}..={}", first, last)?,
                    None => write!(f, "no steps")?,
                }
                write!(
                    f,
                    " gap {}, continuous {}, {} margins",
                    term.gap,
                    term.continuous,
                    term.margins.len()
                )
            }
            Term::PoseConstraint(term) => {
                let t = term.tcp.translation;
                write!(
                    f,
                    "{} ({:?}): link {} step {}, tcp [{:.4}, {:.4}, {:.4}]",
                    term.name, term.term_type, term.link, term.timestep, t.x, t.y, t.z
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_smoothness() {
        let term = JointSmoothnessTerm::uniform(SmoothnessOrder::Jerk, 7, 5.0);
        assert_eq!(term.name, "joint_jerk");
        assert_eq!(term.term_type, TermType::Cost);
        assert_eq!(term.coeffs, vec![5.0; 7]);
        assert_eq!(term.order.stencil(), 4);
    }

    #[test]
    fn test_collision_term_steps() {
        let margin = SafetyMargin { distance: 0.025, coefficient: 20.0 };
        let mut term = CollisionAvoidanceTerm {
            name: "collision".into(),
            term_type: TermType::Cost,
            continuous: false,
            step_range: Some((0, 4)),
            gap: 1,
            margins: uniform_safety_margins(5, margin),
        };
        assert_eq!(term.steps().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(term.margin_at(4), Some(&margin));
        assert_eq!(term.margin_at(5), None);

        term.gap = 2;
        assert_eq!(term.steps().collect::<Vec<_>>(), vec![0, 2, 4]);

        term.step_range = Some((1, 3));
        assert_eq!(term.steps().collect::<Vec<_>>(), vec![1, 3]);

        term.margins.clear();
        term.step_range = None;
        assert_eq!(term.steps().count(), 0);
        assert_eq!(
            format!("{}", Term::CollisionAvoidance(term)),
            "collision (Cost): no steps gap 2, continuous false, 0 margins"
        );
    }

    #[test]
    fn test_term_accessors() {
        let term = Term::JointSmoothness(JointSmoothnessTerm::uniform(
            SmoothnessOrder::Velocity, 3, 1.0));
        assert_eq!(term.name(), "joint_vel");
        assert_eq!(term.term_type(), TermType::Cost);
        assert!(term.as_pose_constraint().is_none());
        assert!(format!("{}", term).starts_with("joint_vel"));
    }
}
