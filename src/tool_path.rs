//! Tool path from the scanned surface.
//!
//! The scanner exports a comma separated table. The first two rows are header and
//! metadata, every following row is one surface sample `x,y,z,i,j,k`: the position
//! in millimeters and the (not normalized) surface normal. Each sample becomes an
//! oriented tool frame whose Z axis is the surface normal.

use crate::kinematic_traits::Pose;
use crate::planning_error::PlanningError;
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Index;
use std::path::Path;

/// Scan positions are exported in millimeters, everything downstream works in meters.
pub const MILLIMETERS_PER_METER: f64 = 1000.0;

/// Number of rows at the top of the scan file that do not carry samples.
pub const HEADER_ROWS: usize = 2;

/// Below this length a normal (or a reference axis) is considered zero.
const DEGENERATE_LENGTH: f64 = 1e-12;

/// One row of the scan file, as read (millimeters, normal not normalized).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub position: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl SurfaceSample {
    /// Parse the `x,y,z,i,j,k` row. `line` is only used for error reporting.
    pub fn parse(row: &str, line: usize) -> Result<Self, PlanningError> {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        let [x, y, z, i, j, k] = fields[..] else {
            return Err(PlanningError::MalformedInputRow {
                line,
                reason: format!("expected 6 fields (x,y,z,i,j,k), found {}", fields.len()),
            });
        };

        let number = |name: &str, text: &str| -> Result<f64, PlanningError> {
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(PlanningError::MalformedInputRow {
                    line,
                    reason: format!("field {} is not a finite number: '{}'", name, text),
                }),
            }
        };

        Ok(SurfaceSample {
            position: Vector3::new(number("x", x)?, number("y", y)?, number("z", z)?),
            normal: Vector3::new(number("i", i)?, number("j", j)?, number("k", k)?),
        })
    }
}

/// Oriented tool frame at one trajectory step. Columns of the rotation are the frame
/// axes, the third one being the surface normal. Translation is in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolFrame {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl ToolFrame {
    /// Build the frame from the sample. The normal becomes the Z axis. The reference
    /// direction points from the sample back to the origin; it only needs to be not
    /// parallel to the normal, so Y = normal x reference and X = Y x normal make the
    /// frame right-handed and orthonormal regardless.
    pub fn from_sample(sample: &SurfaceSample, line: usize) -> Result<Self, PlanningError> {
        let z_axis = sample
            .normal
            .try_normalize(DEGENERATE_LENGTH)
            .ok_or(PlanningError::DegenerateNormal { line })?;

        let translation = sample.position / MILLIMETERS_PER_METER;

        let y_axis = reference_candidates(&translation)
            .into_iter()
            .find_map(|reference| z_axis.cross(&reference).try_normalize(DEGENERATE_LENGTH))
            .ok_or(PlanningError::DegenerateNormal { line })?;
        let x_axis = y_axis.cross(&z_axis).normalize();

        Ok(ToolFrame {
            rotation: Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[
                x_axis, y_axis, z_axis,
            ])),
            translation,
        })
    }

    pub fn x_axis(&self) -> Vector3<f64> {
        self.rotation.matrix().column(0).into_owned()
    }

    pub fn y_axis(&self) -> Vector3<f64> {
        self.rotation.matrix().column(1).into_owned()
    }

    pub fn z_axis(&self) -> Vector3<f64> {
        self.rotation.matrix().column(2).into_owned()
    }

    /// The frame as isometry, the form solver adapters consume.
    pub fn to_pose(&self) -> Pose {
        Pose::from_parts(
            Translation3::from(self.translation),
            UnitQuaternion::from_rotation_matrix(&self.rotation),
        )
    }
}

/// Reference directions in the order of preference. The negated position is preferred,
/// world X and world Y only take over when it is zero or parallel to the normal.
fn reference_candidates(translation: &Vector3<f64>) -> Vec<Vector3<f64>> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(towards_origin) = (-translation).try_normalize(DEGENERATE_LENGTH) {
        candidates.push(towards_origin);
    }
    candidates.push(Vector3::x());
    candidates.push(Vector3::y());
    candidates
}

/// Ordered tool frames, one per data row of the scan. Index in the path is the step
/// index of the trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolPath {
    frames: Vec<ToolFrame>,
}

impl ToolPath {
    /// Read the scan file. Any malformed row fails the whole path: a skipped sample
    /// would silently shorten the planned trajectory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanningError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Same as [`ToolPath::from_file`] but for any buffered source. Header rows are
    /// skipped as raw bytes; scanner metadata is not always UTF-8.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, PlanningError> {
        let mut frames = Vec::new();
        for (idx, bytes) in reader.split(b'\n').enumerate() {
            let bytes = bytes?;
            let line = idx + 1;
            if line <= HEADER_ROWS {
                continue;
            }
            let row = std::str::from_utf8(&bytes).map_err(|e| PlanningError::MalformedInputRow {
                line,
                reason: format!("not valid UTF-8 text: {}", e),
            })?;
            if row.trim().is_empty() {
                continue;
            }
            let sample = SurfaceSample::parse(row, line)?;
            frames.push(ToolFrame::from_sample(&sample, line)?);
        }
        Ok(ToolPath { frames })
    }

    pub fn from_frames(frames: Vec<ToolFrame>) -> Self {
        ToolPath { frames }
    }

    pub fn frames(&self) -> &[ToolFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolFrame> {
        self.frames.iter()
    }
}

impl Index<usize> for ToolPath {
    type Output = ToolFrame;

    fn index(&self, step: usize) -> &ToolFrame {
        &self.frames[step]
    }
}

impl<'a> IntoIterator for &'a ToolPath {
    type Item = &'a ToolFrame;
    type IntoIter = std::slice::Iter<'a, ToolFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TOLERANCE: f64 = 1e-9;

    fn path_from(text: &str) -> Result<ToolPath, PlanningError> {
        ToolPath::from_reader(Cursor::new(text))
    }

    fn assert_orthonormal(frame: &ToolFrame) {
        let axes = [frame.x_axis(), frame.y_axis(), frame.z_axis()];
        for axis in &axes {
            assert!((axis.norm() - 1.0).abs() < TOLERANCE, "Axis not unit: {:?}", axis);
        }
        assert!(axes[0].dot(&axes[1]).abs() < TOLERANCE);
        assert!(axes[0].dot(&axes[2]).abs() < TOLERANCE);
        assert!(axes[1].dot(&axes[2]).abs() < TOLERANCE);
        // Right-handed
        assert!((axes[0].cross(&axes[1]) - axes[2]).norm() < TOLERANCE);
    }

    #[test]
    fn test_single_sample_at_origin() {
        let path = path_from("header\nmeta\n0,0,0,0,0,1\n").unwrap();
        assert_eq!(path.len(), 1);
        let frame = &path[0];
        assert_eq!(frame.translation, Vector3::zeros());
        assert_eq!(frame.z_axis(), Vector3::new(0.0, 0.0, 1.0));
        assert_orthonormal(frame);
    }

    #[test]
    fn test_frames_are_orthonormal() {
        let text = "x,y,z,i,j,k\nunits: mm\n\
            100.0,250.5,-30.0,0.1,0.2,3.0\n\
            -12.5,4.0,800.0,-1.0,0.0,0.0\n\
            300,0,0,1,0,0\n\
            0,0,500,0,0,-2\n\
            17.3,-45.1,12.9,0.577,-0.577,0.577\n";
        let path = path_from(text).unwrap();
        assert_eq!(path.len(), 5);
        for frame in &path {
            assert_orthonormal(frame);
        }
    }

    #[test]
    fn test_normal_becomes_z_axis() {
        let path = path_from("h\nh\n100,200,300,0,3,4\n").unwrap();
        let z = path[0].z_axis();
        assert!((z - Vector3::new(0.0, 0.6, 0.8)).norm() < TOLERANCE);
    }

    #[test]
    fn test_reference_axis_from_position() {
        // Reference points to the origin, -X here, so Y = Z x (-X) = -Y and X = (-Y) x Z = -X
        let path = path_from("h\nh\n1000,0,0,0,0,1\n").unwrap();
        let frame = &path[0];
        assert!((frame.y_axis() - Vector3::new(0.0, -1.0, 0.0)).norm() < TOLERANCE);
        assert!((frame.x_axis() - Vector3::new(-1.0, 0.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_position_scaled_to_meters() {
        let path = path_from("h\nh\n1234.5,-250,7,0,0,1\n").unwrap();
        let expected = Vector3::new(1234.5 / 1000.0, -250.0 / 1000.0, 7.0 / 1000.0);
        assert_eq!(path[0].translation, expected);
    }

    #[test]
    fn test_wrong_field_count() {
        let result = path_from("h\nh\n0,0,0,0,0,1\n1,2,3,4,5\n0,0,0,0,0,1\n");
        match result {
            Err(PlanningError::MalformedInputRow { line, .. }) => assert_eq!(line, 4),
            other => panic!("Expected MalformedInputRow, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_field() {
        let result = path_from("h\nh\n0,0,zero,0,0,1\n");
        match result {
            Err(PlanningError::MalformedInputRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("zero"), "{}", reason);
            }
            other => panic!("Expected MalformedInputRow, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_field() {
        let result = path_from("h\nh\n0,0,NaN,0,0,1\n");
        assert!(matches!(result, Err(PlanningError::MalformedInputRow { line: 3, .. })));
    }

    #[test]
    fn test_zero_normal() {
        let result = path_from("h\nh\n10,10,10,0,0,1\n10,10,10,0,0,0\n");
        assert!(matches!(result, Err(PlanningError::DegenerateNormal { line: 4 })));
    }

    #[test]
    fn test_normal_parallel_to_position() {
        // Reference direction is parallel to the normal, world X takes over
        let path = path_from("h\nh\n0,0,100,0,0,1\n").unwrap();
        assert_orthonormal(&path[0]);
        assert!((path[0].y_axis() - Vector3::new(0.0, 1.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_headers_only_and_blank_lines() {
        assert!(path_from("").unwrap().is_empty());
        assert!(path_from("h\n1,2,3\n").unwrap().is_empty());
        let path = path_from("h\nh\n\n0,0,0,0,0,1\n   \n1,1,1,0,1,0\n").unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_windows_line_endings_and_spaces() {
        let path = path_from("h\r\nh\r\n 1.0, 2.0 ,3.0,0,0,1\r\n").unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].translation, Vector3::new(0.001, 0.002, 0.003));
    }

    #[test]
    fn test_header_rows_not_decoded() {
        // Latin-1 micro sign in the metadata row
        let path = ToolPath::from_reader(&b"x,y,z,i,j,k\nunits: \xb5m scan\n0,0,0,0,0,1\n"[..]).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].z_axis(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_invalid_utf8_data_row() {
        let result = ToolPath::from_reader(&b"h\nh\n0,0,0,0,0,1\n1,2,\xb53,0,0,1\n"[..]);
        match result {
            Err(PlanningError::MalformedInputRow { line, .. }) => assert_eq!(line, 4),
            other => panic!("Expected MalformedInputRow, got {:?}", other),
        }
    }

    #[test]
    fn test_to_pose_matches_frame() {
        let path = path_from("h\nh\n100,200,300,0.3,-0.2,1\n").unwrap();
        let frame = &path[0];
        let pose = frame.to_pose();
        assert!((pose.translation.vector - frame.translation).norm() < TOLERANCE);
        let rotated_z = pose.rotation * Vector3::z();
        assert!((rotated_z - frame.z_axis()).norm() < TOLERANCE);
    }
}
