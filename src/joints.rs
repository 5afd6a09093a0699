use crate::config::FreshnessPolicy;
use crate::protocol::MM_TO_METRES;
use crate::source::Body;
use crate::types::{BodySnapshot, Joint, JointOrientation, JointType, Status, Vec3, JOINT_COUNT};
use std::collections::BTreeMap;

/// Confidence sum of a body whose joints are all fully tracked.
const FULL_CONFIDENCE_SCORE: f32 = (JOINT_COUNT * 2) as f32;

/// Turns the selected body into the published skeleton snapshot.
#[derive(Debug, Clone)]
pub struct JointProcessor {
    snapshot: BodySnapshot,
    fresh: Status,
    freshness: FreshnessPolicy,
}

impl JointProcessor {
    pub fn new(freshness: FreshnessPolicy) -> Self {
        Self {
            snapshot: BodySnapshot::default(),
            fresh: Status::empty(),
            freshness,
        }
    }

    /// Extract, compensate and publish the joints of `body`.
    ///
    /// `sensor_position` is in millimeters. Joint positions are shifted by it
    /// so they read as if the sensor sat at the world origin. If either the
    /// joint or the orientation query fails nothing is published and the
    /// previous snapshot stays visible.
    pub fn process<B: Body>(&mut self, body: &B, sensor_position: Vec3, world_time: f32) -> bool {
        let (joints, orientations) = match (body.joints(), body.joint_orientations()) {
            (Ok(j), Ok(o)) => (j, o),
            (Err(e), _) | (_, Err(e)) => {
                log::debug!("Body joint extraction failed: {}", e);
                return false;
            }
        };

        let offset = sensor_position.scaled(MM_TO_METRES);
        let mut joint_map = BTreeMap::new();
        let mut orientation_map = BTreeMap::new();
        let mut score = 0u32;

        // Slot i always carries JointType::ALL[i], whatever the body labels it.
        for (i, (joint, orientation)) in joints.iter().zip(orientations.iter()).enumerate() {
            let joint_type = JointType::ALL[i];
            score += joint.tracking_state.ordinal() as u32;

            joint_map.insert(
                joint_type,
                Joint::new(joint_type, joint.position + offset, joint.tracking_state),
            );
            orientation_map.insert(
                joint_type,
                JointOrientation {
                    joint_type,
                    orientation: orientation.orientation,
                },
            );
        }

        self.snapshot.joints = joint_map;
        self.snapshot.orientations = orientation_map;
        self.snapshot.confidence = score as f32 / FULL_CONFIDENCE_SCORE;
        self.snapshot.world_time = world_time;
        self.mark_fresh();
        true
    }

    pub fn set_body_count(&mut self, count: usize) {
        self.snapshot.body_count = count;
    }

    pub fn mark_fresh(&mut self) {
        self.fresh = Status::FRESH_JOINTS | Status::FRESH_ORIENTATIONS;
    }

    pub fn mark_stale(&mut self) {
        self.fresh = Status::empty();
    }

    /// Fresh flags currently pending (subset of the FRESH_* body bits).
    pub fn fresh(&self) -> Status {
        self.fresh
    }

    pub fn has_fresh_data(&self) -> bool {
        !self.fresh.is_empty()
    }

    /// Copy the published joints into `out` and consume the fresh flag.
    /// Returns false, leaving `out` untouched, when nothing fresh is pending.
    pub fn pull_joints(&mut self, out: &mut BTreeMap<JointType, Joint>) -> bool {
        if !self.consume(Status::FRESH_JOINTS) {
            return false;
        }
        out.extend(self.snapshot.joints.iter().map(|(k, v)| (*k, *v)));
        true
    }

    /// Orientation counterpart of [`JointProcessor::pull_joints`].
    pub fn pull_orientations(&mut self, out: &mut BTreeMap<JointType, JointOrientation>) -> bool {
        if !self.consume(Status::FRESH_ORIENTATIONS) {
            return false;
        }
        out.extend(self.snapshot.orientations.iter().map(|(k, v)| (*k, *v)));
        true
    }

    fn consume(&mut self, flag: Status) -> bool {
        if !self.fresh.contains(flag) {
            return false;
        }
        match self.freshness {
            FreshnessPolicy::Shared => self.fresh = Status::empty(),
            FreshnessPolicy::PerStream => self.fresh.remove(flag),
        }
        true
    }

    pub fn snapshot(&self) -> &BodySnapshot {
        &self.snapshot
    }

    pub fn confidence(&self) -> f32 {
        self.snapshot.confidence
    }

    pub fn body_count(&self) -> usize {
        self.snapshot.body_count
    }
}

impl Default for JointProcessor {
    fn default() -> Self {
        Self::new(FreshnessPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RecordedBody;
    use crate::error::ErrorCode;
    use crate::types::{Quaternion, TrackingState};

    struct FixedBody {
        state: TrackingState,
        position: Vec3,
        orientations_fail: bool,
    }

    impl FixedBody {
        fn new(state: TrackingState, position: Vec3) -> Self {
            Self {
                state,
                position,
                orientations_fail: false,
            }
        }
    }

    impl Body for FixedBody {
        fn is_tracked(&self) -> Result<bool, ErrorCode> {
            Ok(true)
        }

        fn joints(&self) -> Result<[Joint; JOINT_COUNT], ErrorCode> {
            Ok(JointType::ALL.map(|t| Joint::new(t, self.position, self.state)))
        }

        fn joint_orientations(&self) -> Result<[JointOrientation; JOINT_COUNT], ErrorCode> {
            if self.orientations_fail {
                return Err(ErrorCode::FAIL);
            }
            Ok(JointType::ALL.map(|t| JointOrientation {
                joint_type: t,
                orientation: Quaternion { x: 0.0, y: 0.0, z: 0.0, w: t.index() as f32 },
            }))
        }
    }

    fn tracked() -> FixedBody {
        FixedBody::new(TrackingState::Tracked, Vec3::default())
    }

    #[test]
    fn test_confidence_bounds() {
        let mut proc = JointProcessor::default();
        assert!(proc.process(&tracked(), Vec3::default(), 0.0));
        assert_eq!(proc.confidence(), 1.0);

        let lost = FixedBody::new(TrackingState::NotTracked, Vec3::default());
        assert!(proc.process(&lost, Vec3::default(), 0.0));
        assert_eq!(proc.confidence(), 0.0);

        let inferred = FixedBody::new(TrackingState::Inferred, Vec3::default());
        assert!(proc.process(&inferred, Vec3::default(), 0.0));
        assert!((proc.confidence() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_joint_slots_define_joint_types() {
        let mut proc = JointProcessor::default();
        let spine = Joint::new(JointType::SpineBase, Vec3::default(), TrackingState::Tracked);
        let mislabelled = RecordedBody::new([spine; JOINT_COUNT]);
        assert!(proc.process(&mislabelled, Vec3::default(), 0.0));

        let snapshot = proc.snapshot();
        assert_eq!(snapshot.joints.len(), JOINT_COUNT);
        assert_eq!(snapshot.orientations.len(), JOINT_COUNT);
        assert_eq!(snapshot.joints[&JointType::Head].joint_type, JointType::Head);
    }

    #[test]
    fn test_sensor_position_compensation() {
        let mut proc = JointProcessor::default();
        let body = FixedBody::new(TrackingState::Tracked, Vec3::new(10.0, 10.0, 2000.0));
        assert!(proc.process(&body, Vec3::new(0.0, 150.0, 0.0), 0.0));

        let head = proc.snapshot().joints[&JointType::Head];
        assert_eq!(head.position.x, 10.0);
        assert!((head.position.y - 10.15).abs() < 1e-5);
        assert_eq!(head.position.z, 2000.0);
    }

    #[test]
    fn test_full_joint_set_published() {
        let mut proc = JointProcessor::default();
        assert!(proc.snapshot().joints.is_empty());
        assert!(proc.snapshot().orientations.is_empty());

        proc.process(&tracked(), Vec3::default(), 4.5);
        let snapshot = proc.snapshot();
        assert_eq!(snapshot.joints.len(), JOINT_COUNT);
        assert!(snapshot.joints.keys().eq(snapshot.orientations.keys()));
        assert_eq!(snapshot.orientations[&JointType::ThumbRight].orientation.w, 24.0);
        assert_eq!(snapshot.world_time, 4.5);
    }

    #[test]
    fn test_failed_extraction_keeps_previous_snapshot() {
        let mut proc = JointProcessor::default();
        let body = FixedBody::new(TrackingState::Tracked, Vec3::new(1.0, 1.0, 1.0));
        proc.process(&body, Vec3::default(), 0.0);
        proc.mark_stale();

        let mut broken = FixedBody::new(TrackingState::NotTracked, Vec3::new(9.0, 9.0, 9.0));
        broken.orientations_fail = true;
        assert!(!proc.process(&broken, Vec3::default(), 1.0));

        assert!(!proc.has_fresh_data());
        assert_eq!(proc.confidence(), 1.0);
        assert_eq!(proc.snapshot().joints[&JointType::SpineBase].position.x, 1.0);
    }

    #[test]
    fn test_pull_is_one_shot() {
        let mut proc = JointProcessor::default();
        proc.process(&tracked(), Vec3::default(), 0.0);

        let mut joints = BTreeMap::new();
        assert!(proc.pull_joints(&mut joints));
        assert_eq!(joints.len(), JOINT_COUNT);

        let mut again = BTreeMap::new();
        assert!(!proc.pull_joints(&mut again));
        assert!(again.is_empty());
    }

    #[test]
    fn test_shared_freshness_couples_pulls() {
        let mut proc = JointProcessor::new(FreshnessPolicy::Shared);
        proc.process(&tracked(), Vec3::default(), 0.0);

        let mut joints = BTreeMap::new();
        assert!(proc.pull_joints(&mut joints));
        let mut orientations = BTreeMap::new();
        assert!(!proc.pull_orientations(&mut orientations));
        assert!(orientations.is_empty());
    }

    #[test]
    fn test_per_stream_freshness_is_independent() {
        let mut proc = JointProcessor::new(FreshnessPolicy::PerStream);
        proc.process(&tracked(), Vec3::default(), 0.0);

        let mut orientations = BTreeMap::new();
        assert!(proc.pull_orientations(&mut orientations));
        assert!(proc.has_fresh_data());

        let mut joints = BTreeMap::new();
        assert!(proc.pull_joints(&mut joints));
        assert!(!proc.has_fresh_data());
    }
}
