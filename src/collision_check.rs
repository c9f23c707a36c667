//! Continuous collision checking of joint trajectories.
//!
//! A trajectory is checked segment by segment: segment `i` is the swept motion from
//! step `i` to step `i + 1`. With the `collisions` feature, segments are evaluated in
//! parallel, but events are always returned in segment order so the reported list does
//! not depend on scheduling.

#[cfg(feature = "collisions")]
use rayon::prelude::*;

use crate::kinematic_traits::Trajectory;

/// Two bodies closer than allowed (or interpenetrating, negative distance).
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub link_a: String,
    pub link_b: String,
    /// Signed distance in meters
    pub distance: f64,
}

/// Contact found on one segment of the trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// Index of the step the swept motion starts from
    pub segment: usize,
    pub contact: Contact,
}

/// Collision query over the swept motion between two joint states.
///
/// # Requirements
/// - Implementations of this trait must be `Send` and `Sync` as segments may be checked
///   concurrently.
pub trait SegmentCollision: Send + Sync {
    /// Contacts of the given links while the joints move from `from` to `to`. Both are in
    /// the order of `joint_names`. An empty vector means the motion is collision free.
    fn segment_contacts(
        &self,
        joint_names: &[String],
        link_names: &[String],
        from: &[f64],
        to: &[f64],
    ) -> Vec<Contact>;
}

/// Check all segments of the trajectory. A trajectory with a single step is checked as a
/// motionless segment, an empty trajectory has nothing to check.
pub fn check_trajectory(
    detector: &dyn SegmentCollision,
    joint_names: &[String],
    link_names: &[String],
    trajectory: &Trajectory,
) -> Vec<CollisionEvent> {
    let rows: Vec<Vec<f64>> = trajectory
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    let segments: Vec<(usize, usize)> = match rows.len() {
        0 => return Vec::new(),
        1 => vec![(0, 0)],
        n => (0..n - 1).map(|i| (i, i + 1)).collect(),
    };

    let check = |&(from, to): &(usize, usize)| -> Vec<CollisionEvent> {
        detector
            .segment_contacts(joint_names, link_names, &rows[from], &rows[to])
            .into_iter()
            .map(|contact| CollisionEvent { segment: from, contact })
            .collect()
    };

    #[cfg(feature = "collisions")]
    let per_segment: Vec<Vec<CollisionEvent>> = segments.par_iter().map(check).collect();

    #[cfg(not(feature = "collisions"))]
    let per_segment: Vec<Vec<CollisionEvent>> = segments.iter().map(check).collect();

    per_segment.into_iter().flatten().collect()
}

/// Approximates the continuous check by probing intermediate states of the segment.
/// The segment is split so that no joint moves more than `check_step_rad` between probes.
/// Objects thinner than what the links sweep over one probe step may not be noticed.
pub struct SampledSweep<F>
where
    F: Fn(&[String], &[String], &[f64]) -> Vec<Contact> + Send + Sync,
{
    /// Check step size in radians
    pub check_step_rad: f64,

    /// Discrete collision query for a single joint state
    pub probe: F,
}

/// Upper bound on discrete checks per segment, whatever the joint distance.
pub const MAX_SUBSTEPS: usize = 100_000;

impl<F> SampledSweep<F>
where
    F: Fn(&[String], &[String], &[f64]) -> Vec<Contact> + Send + Sync,
{
    pub fn new(check_step_rad: f64, probe: F) -> Self {
        SampledSweep { check_step_rad, probe }
    }

    fn substeps(&self, from: &[f64], to: &[f64]) -> usize {
        let largest = from
            .iter()
            .zip(to)
            .map(|(a, b)| (b - a).abs())
            .fold(0.0, f64::max);
        let steps = largest / self.check_step_rad;
        if steps.is_finite() && steps > 0.0 {
            (steps.ceil() as usize).clamp(1, MAX_SUBSTEPS)
        } else {
            // Zero span, bad step size or non-finite joint values: check the ends only
            1
        }
    }
}

impl<F> SegmentCollision for SampledSweep<F>
where
    F: Fn(&[String], &[String], &[f64]) -> Vec<Contact> + Send + Sync,
{
    fn segment_contacts(
        &self,
        joint_names: &[String],
        link_names: &[String],
        from: &[f64],
        to: &[f64],
    ) -> Vec<Contact> {
        let steps = self.substeps(from, to);
        let mut contacts: Vec<Contact> = Vec::new();
        let mut state = vec![0.0; from.len()];

        // Start and end poses are both probed
        for i in 0..=steps {
            let fraction = i as f64 / steps as f64;
            for (j, value) in state.iter_mut().enumerate() {
                *value = match i {
                    0 => from[j],
                    i if i == steps => to[j],
                    _ => from[j] + (to[j] - from[j]) * fraction,
                };
            }
            for contact in (self.probe)(joint_names, link_names, &state) {
                // One contact per link pair for the whole segment, the closest one.
                match contacts.iter_mut().find(|c| {
                    (c.link_a == contact.link_a && c.link_b == contact.link_b)
                        || (c.link_a == contact.link_b && c.link_b == contact.link_a)
                }) {
                    Some(known) if contact.distance < known.distance => *known = contact,
                    Some(_) => {}
                    None => contacts.push(contact),
                }
            }
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    /// Wall at joint 1 = 0.5 rad: anything beyond it touches
    fn wall(_joints: &[String], _links: &[String], state: &[f64]) -> Vec<Contact> {
        if state[0] >= 0.5 {
            vec![Contact {
                link_a: "link_7".into(),
                link_b: "wall".into(),
                distance: 0.5 - state[0],
            }]
        } else {
            vec![]
        }
    }

    /// Reports the segment it was called for, to check ordering
    struct EverySegment;

    impl SegmentCollision for EverySegment {
        fn segment_contacts(&self, _: &[String], _: &[String], from: &[f64], _: &[f64]) -> Vec<Contact> {
            vec![Contact { link_a: format!("{}", from[0]), link_b: "x".into(), distance: 0.0 }]
        }
    }

    #[test]
    fn test_events_in_segment_order() {
        let trajectory = Trajectory::from_fn(50, 2, |r, _| r as f64);
        let events = check_trajectory(&EverySegment, &names("j", 2), &names("l", 2), &trajectory);
        assert_eq!(events.len(), 49);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.segment, i);
            assert_eq!(event.contact.link_a, format!("{}", i as f64));
        }
    }

    #[test]
    fn test_single_and_empty_trajectory() {
        let empty = Trajectory::zeros(0, 3);
        assert!(check_trajectory(&EverySegment, &[], &[], &empty).is_empty());

        let single = Trajectory::zeros(1, 3);
        let events = check_trajectory(&EverySegment, &[], &[], &single);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].segment, 0);
    }

    #[test]
    fn test_sweep_detects_crossing_between_steps() {
        // Both steps are free, the motion between them crosses the wall region only
        // if it goes through. Here it stays below.
        let sweep = SampledSweep::new(0.01, wall);
        let free = sweep.segment_contacts(&names("j", 1), &names("l", 1), &[0.0], &[0.4]);
        assert!(free.is_empty());

        // Ends beyond the wall: a single contact, the deepest one
        let hit = sweep.segment_contacts(&names("j", 1), &names("l", 1), &[0.0], &[0.8]);
        assert_eq!(hit.len(), 1);
        assert!((hit[0].distance - (0.5 - 0.8)).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_through_thin_obstacle() {
        // Obstacle only between 0.45 and 0.55, both steps outside of it
        let thin = |_: &[String], _: &[String], state: &[f64]| -> Vec<Contact> {
            if (0.45..=0.55).contains(&state[0]) {
                vec![Contact { link_a: "tool".into(), link_b: "fixture".into(), distance: -0.001 }]
            } else {
                vec![]
            }
        };
        let sweep = SampledSweep::new(0.05, thin);
        let trajectory = Trajectory::from_row_slice(3, 1, &[0.0, 1.0, 1.2]);
        let events = check_trajectory(&sweep, &names("j", 1), &names("l", 1), &trajectory);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].segment, 0);

        // Too coarse probing steps over it
        let coarse = SampledSweep::new(2.0, thin);
        assert!(check_trajectory(&coarse, &names("j", 1), &names("l", 1), &trajectory).is_empty());
    }

    #[test]
    fn test_substeps() {
        let sweep = SampledSweep::new(0.1, wall);
        assert_eq!(sweep.substeps(&[0.0, 0.0], &[0.05, -0.35]), 4);
        assert_eq!(sweep.substeps(&[0.0], &[0.0]), 1);
        assert_eq!(sweep.substeps(&[0.0], &[1.0e9]), MAX_SUBSTEPS);
    }

    #[test]
    fn test_substeps_non_finite() {
        let sweep = SampledSweep::new(0.1, wall);
        assert_eq!(sweep.substeps(&[0.0], &[f64::INFINITY]), 1);
        assert_eq!(sweep.substeps(&[f64::NEG_INFINITY], &[f64::INFINITY]), 1);
        assert_eq!(sweep.substeps(&[0.0, f64::NAN], &[0.3, 0.0]), 3);

        let zero_step = SampledSweep::new(0.0, wall);
        assert_eq!(zero_step.substeps(&[0.0], &[1.0]), 1);

        // Finishes, the end state is checked as is
        let hit = sweep.segment_contacts(&names("j", 1), &names("l", 1), &[0.0], &[f64::INFINITY]);
        assert_eq!(hit.len(), 1);
    }
}
