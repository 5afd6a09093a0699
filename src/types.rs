use std::collections::BTreeMap;

/// 3D vector in sensor camera space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Plane equation `ax + by + cz + w = 0`; the floor clip plane reported per body frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

/// Rotation quaternion [x, y, z, w].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Number of joints reported per body.
pub const JOINT_COUNT: usize = 25;

/// Skeletal joints tracked by the sensor, in driver order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JointType {
    SpineBase = 0,
    SpineMid = 1,
    Neck = 2,
    Head = 3,
    ShoulderLeft = 4,
    ElbowLeft = 5,
    WristLeft = 6,
    HandLeft = 7,
    ShoulderRight = 8,
    ElbowRight = 9,
    WristRight = 10,
    HandRight = 11,
    HipLeft = 12,
    KneeLeft = 13,
    AnkleLeft = 14,
    FootLeft = 15,
    HipRight = 16,
    KneeRight = 17,
    AnkleRight = 18,
    FootRight = 19,
    SpineShoulder = 20,
    HandTipLeft = 21,
    ThumbLeft = 22,
    HandTipRight = 23,
    ThumbRight = 24,
}

impl JointType {
    pub const ALL: [JointType; JOINT_COUNT] = [
        JointType::SpineBase,
        JointType::SpineMid,
        JointType::Neck,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
        JointType::SpineShoulder,
        JointType::HandTipLeft,
        JointType::ThumbLeft,
        JointType::HandTipRight,
        JointType::ThumbRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<JointType> {
        Self::ALL.get(index).copied()
    }
}

/// Tracking quality of a joint, ordered by confidence.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TrackingState {
    #[default]
    NotTracked = 0,
    Inferred = 1,
    Tracked = 2,
}

impl TrackingState {
    /// Map a raw driver value; anything unknown counts as not tracked.
    pub fn from_raw(raw: u8) -> TrackingState {
        match raw {
            1 => TrackingState::Inferred,
            2 => TrackingState::Tracked,
            _ => TrackingState::NotTracked,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub joint_type: JointType,
    /// Camera-space position in meters.
    pub position: Vec3,
    pub tracking_state: TrackingState,
}

impl Joint {
    pub fn new(joint_type: JointType, position: Vec3, tracking_state: TrackingState) -> Self {
        Self {
            joint_type,
            position,
            tracking_state,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointOrientation {
    pub joint_type: JointType,
    pub orientation: Quaternion,
}

impl JointOrientation {
    /// Euler angles [roll, pitch, yaw] in degrees.
    pub fn euler_deg(&self) -> [f64; 3] {
        let q = self.orientation;
        crate::protocol::quaternion_to_euler(q.w as f64, q.x as f64, q.y as f64, q.z as f64)
    }
}

/// Latest published skeleton of the selected body.
///
/// `joints` and `orientations` are empty until the first successful read and
/// hold the full joint set afterwards.
#[derive(Debug, Clone, Default)]
pub struct BodySnapshot {
    pub joints: BTreeMap<JointType, Joint>,
    pub orientations: BTreeMap<JointType, JointOrientation>,
    /// Aggregate tracking confidence in [0, 1].
    pub confidence: f32,
    /// Tracked bodies seen in the last body frame.
    pub body_count: usize,
    /// World time of the tick that published this snapshot.
    pub world_time: f32,
}

/// Sensor placement: position in millimeters and the detected floor plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorPose {
    pub position: Vec3,
    pub floor_plane: Vec4,
}

/// Everything a consumer needs to drive a skeletal overlay for one tick.
#[derive(Debug, Clone)]
pub struct DataFrame {
    pub joints: BTreeMap<JointType, Joint>,
    pub orientations: BTreeMap<JointType, JointOrientation>,
    pub confidence: f32,
    pub sensor_position: Vec3,
    pub floor_plane: Vec4,
}

bitflags::bitflags! {
    /// Operational and freshness state of the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[repr(C)]
    pub struct Status: u32 {
        const OPERATIONAL        = 1 << 0;
        const FRESH_JOINTS       = 1 << 1;
        const FRESH_ORIENTATIONS = 1 << 2;
        const FRESH_INFRARED     = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_type_index_round_trip() {
        for (i, joint) in JointType::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(JointType::from_index(i), Some(*joint));
        }
        assert_eq!(JointType::from_index(JOINT_COUNT), None);
    }

    #[test]
    fn test_tracking_state_ordering() {
        assert!(TrackingState::NotTracked < TrackingState::Inferred);
        assert!(TrackingState::Inferred < TrackingState::Tracked);
        assert_eq!(TrackingState::from_raw(2), TrackingState::Tracked);
        assert_eq!(TrackingState::from_raw(7), TrackingState::NotTracked);
    }

    #[test]
    fn test_identity_orientation_euler() {
        let o = JointOrientation {
            joint_type: JointType::Head,
            orientation: Quaternion::IDENTITY,
        };
        let euler = o.euler_deg();
        assert!(euler.iter().all(|a| a.abs() < 1e-9));
    }
}
