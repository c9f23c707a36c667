//! Cartesian-constrained trajectory optimization for robots following scanned surfaces.
//!
//! The robot holds a part and moves it against a stationary tool (a grinder) so that the
//! tool traces a path scanned on the part surface. This crate builds the trajectory
//! optimization problem for that motion and runs the solve-and-verify cycle around an
//! external trust region solver:
//!
//! - **tool_path**: the scan (`x,y,z,i,j,k` rows, millimeters) becomes a sequence of
//!   oriented tool frames, surface normal as Z axis.
//! - **terms**: the cost and constraint terms: joint velocity, acceleration and jerk,
//!   collision avoidance with safety margin, Cartesian pose of the held part.
//! - **problem**: the problem description with a constant initial trajectory, one pose
//!   constraint per path step, all tracking the same stationary frame.
//! - **orchestrator**: continuous collision check of the initial guess, solver run,
//!   continuous collision check of the result. Status and collision counts are reported,
//!   the caller decides if the trajectory is good enough.
//!
//! The solver, the kinematic model and the collision geometry are not part of this crate.
//! They are plugged in through [`solver::TrustRegionSolver`] and
//! [`environment::Environment`]; [`environment::StaticEnvironment`] is a table driven
//! environment with a pluggable [`collision_check::SegmentCollision`] query.
//!
//! ## Example
//!
//! ```no_run
//! use rs_surface_trajopt::config::PlannerConfig;
//! use rs_surface_trajopt::environment::{Environment, StaticEnvironment};
//! use rs_surface_trajopt::kinematic_traits::{Manipulator, Pose};
//! use rs_surface_trajopt::problem::ProblemBuilder;
//! use rs_surface_trajopt::tool_path::ToolPath;
//!
//! let config = PlannerConfig::default();
//! let mut cell = StaticEnvironment::new()
//!     .with_manipulator(Manipulator::new("manipulator",
//!         &["joint_a1", "joint_a2", "joint_a3", "joint_a4", "joint_a5", "joint_a6", "joint_a7"],
//!         &["link_1", "link_2", "link_3", "link_4", "link_5", "link_6", "link_7", "part"]))
//!     .with_link("grinder_frame", Pose::translation(0.6, 0.0, 0.8));
//! cell.set_state(&config.initial_state);
//!
//! let path = ToolPath::from_file("puzzle_bent.csv").expect("readable scan");
//! let problem = ProblemBuilder::new(&config).build(&cell, &path).expect("problem");
//! println!("{} steps, {} constraints", problem.n_steps, problem.constraints.len());
//! ```

pub mod planning_error;

pub mod kinematic_traits;

pub mod tool_path;

pub mod terms;

pub mod config;

#[cfg(feature = "allow_filesystem")]
pub mod config_from_file;

pub mod collision_check;

pub mod environment;

pub mod problem;

pub mod solver;

pub mod orchestrator;
