use crate::source::Body;
use crate::types::JointType;

/// Joint whose depth decides which body is nearest.
pub const REFERENCE_JOINT: JointType = JointType::SpineBase;

/// Count slots holding a body the driver reports as tracked.
pub fn count_tracked<B: Body>(candidates: &[Option<B>]) -> usize {
    candidates
        .iter()
        .flatten()
        .filter(|body| matches!(body.is_tracked(), Ok(true)))
        .count()
}

/// Pick the tracked body whose spine base is closest to the sensor.
///
/// Ties go to the first body seen. Bodies whose tracking or joint query
/// fails are skipped. Returns `None` when nobody is tracked.
pub fn select_nearest<B: Body>(candidates: &[Option<B>]) -> Option<&B> {
    let mut nearest: Option<(&B, f32)> = None;

    for body in candidates.iter().flatten() {
        if !matches!(body.is_tracked(), Ok(true)) {
            continue;
        }
        let joints = match body.joints() {
            Ok(joints) => joints,
            Err(e) => {
                log::trace!("Skipping body, joint query failed: {}", e);
                continue;
            }
        };
        let depth = joints[REFERENCE_JOINT.index()].position.z;
        if depth.is_nan() {
            continue;
        }
        if nearest.map_or(true, |(_, best)| depth < best) {
            nearest = Some((body, depth));
        }
    }

    nearest.map(|(body, _)| body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{Joint, JointOrientation, Quaternion, TrackingState, Vec3, JOINT_COUNT};

    struct TestBody {
        id: u32,
        tracked: Result<bool, ErrorCode>,
        depth: Result<f32, ErrorCode>,
    }

    impl TestBody {
        fn tracked(id: u32, depth: f32) -> Self {
            Self {
                id,
                tracked: Ok(true),
                depth: Ok(depth),
            }
        }

        fn untracked(id: u32, depth: f32) -> Self {
            Self {
                id,
                tracked: Ok(false),
                depth: Ok(depth),
            }
        }
    }

    impl Body for TestBody {
        fn is_tracked(&self) -> Result<bool, ErrorCode> {
            self.tracked
        }

        fn joints(&self) -> Result<[Joint; JOINT_COUNT], ErrorCode> {
            let depth = self.depth?;
            Ok(JointType::ALL.map(|t| {
                Joint::new(t, Vec3::new(0.0, 0.0, depth), TrackingState::Tracked)
            }))
        }

        fn joint_orientations(&self) -> Result<[JointOrientation; JOINT_COUNT], ErrorCode> {
            Ok(JointType::ALL.map(|t| JointOrientation {
                joint_type: t,
                orientation: Quaternion::IDENTITY,
            }))
        }
    }

    fn id_of(selected: Option<&TestBody>) -> Option<u32> {
        selected.map(|b| b.id)
    }

    #[test]
    fn test_picks_lowest_depth() {
        let bodies = vec![
            Some(TestBody::tracked(0, 3.1)),
            None,
            Some(TestBody::tracked(2, 1.4)),
            Some(TestBody::tracked(3, 2.2)),
        ];
        assert_eq!(id_of(select_nearest(&bodies)), Some(2));
    }

    #[test]
    fn test_single_tracked_body_wins_in_any_slot() {
        for slot in 0..6 {
            let bodies: Vec<Option<TestBody>> = (0..6)
                .map(|i| {
                    if i == slot {
                        Some(TestBody::tracked(i, 4.0))
                    } else {
                        Some(TestBody::untracked(i, 0.5))
                    }
                })
                .collect();
            assert_eq!(id_of(select_nearest(&bodies)), Some(slot));
        }
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let bodies = vec![
            Some(TestBody::tracked(0, 2.0)),
            Some(TestBody::tracked(1, 2.0)),
        ];
        assert_eq!(id_of(select_nearest(&bodies)), Some(0));
    }

    #[test]
    fn test_no_tracked_bodies() {
        let bodies = vec![Some(TestBody::untracked(0, 1.0)), None];
        assert!(select_nearest(&bodies).is_none());
        assert_eq!(count_tracked(&bodies), 0);

        let empty: Vec<Option<TestBody>> = Vec::new();
        assert!(select_nearest(&empty).is_none());
    }

    #[test]
    fn test_failed_queries_are_skipped() {
        let bodies = vec![
            Some(TestBody {
                id: 0,
                tracked: Ok(true),
                depth: Err(ErrorCode::FAIL),
            }),
            Some(TestBody {
                id: 1,
                tracked: Err(ErrorCode::POINTER),
                depth: Ok(0.1),
            }),
            Some(TestBody::tracked(2, 3.0)),
        ];
        assert_eq!(id_of(select_nearest(&bodies)), Some(2));
        assert_eq!(count_tracked(&bodies), 2);
    }
}
