//! C FFI layer for kinect2.
//!
//! Provides an opaque handle-based API for C/C++ engines. The engine owns the
//! driver session, pushes frames through a `K2Feed` and drives the pipeline
//! with `k2_pipeline_update`. The generated C header is written to
//! `include/kinect2.h` by cbindgen.

use crate::channel::{
    ChannelSource, FrameFeed, RecordedBody, RecordedBodyFrame, RecordedInfraredFrame,
};
use crate::config::Config;
use crate::error::{ErrorCode, Kinect2Error, LastError};
use crate::infrared::RenderTarget;
use crate::pipeline::Pipeline;
use crate::protocol::IR_FRAME_SIZE;
use crate::types::{
    Joint, JointOrientation, JointType, Quaternion, TrackingState, Vec3, Vec4, JOINT_COUNT,
};
use crate::FEED_CAPACITY;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque pipeline handle for C consumers.
pub struct K2Pipeline(Pipeline<ChannelSource>);

/// Opaque frame feed handle for C consumers.
pub struct K2Feed(FrameFeed);

/// Joint in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct K2Joint {
    /// Joint index, 0 (spine base) to 24 (right thumb).
    pub joint_type: u32,
    /// Camera-space position in meters.
    pub position: Vec3,
    /// 0 = not tracked, 1 = inferred, 2 = tracked.
    pub tracking_state: u8,
}

/// Joint orientation in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct K2Orientation {
    pub joint_type: u32,
    pub orientation: Quaternion,
}

/// One body slot pushed by the engine. Arrays are indexed by joint type.
#[repr(C)]
pub struct K2Body {
    pub tracked: bool,
    pub joints: [K2Joint; JOINT_COUNT],
    pub orientations: [Quaternion; JOINT_COUNT],
}

/// Stream selector for `k2_feed_fault`.
pub const K2_STREAM_BODY: c_int = 0;
pub const K2_STREAM_INFRARED: c_int = 1;

impl From<&Joint> for K2Joint {
    fn from(joint: &Joint) -> Self {
        K2Joint {
            joint_type: joint.joint_type as u32,
            position: joint.position,
            tracking_state: joint.tracking_state.ordinal(),
        }
    }
}

impl From<&K2Body> for RecordedBody {
    fn from(body: &K2Body) -> Self {
        RecordedBody {
            tracked: body.tracked,
            joints: JointType::ALL.map(|t| {
                let raw = &body.joints[t.index()];
                Joint::new(t, raw.position, TrackingState::from_raw(raw.tracking_state))
            }),
            orientations: JointType::ALL.map(|t| JointOrientation {
                joint_type: t,
                orientation: body.orientations[t.index()],
            }),
        }
    }
}

/// Render target over a caller-owned pixel buffer.
struct SliceTarget<'a>(&'a mut [u32]);

impl RenderTarget for SliceTarget<'_> {
    fn upload(&mut self, _width: usize, _height: usize, pixels: &[u32]) {
        let len = pixels.len().min(self.0.len());
        self.0[..len].copy_from_slice(&pixels[..len]);
    }
}

/// Create a pipeline and its frame feed, configured from `KINECT2_*` variables.
///
/// Writes the feed handle into `feed_out`. Returns NULL if `feed_out` is null.
///
/// # Safety
/// `feed_out` must be a valid pointer to writable storage, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_pipeline_create(feed_out: *mut *mut K2Feed) -> *mut K2Pipeline {
    if feed_out.is_null() {
        return std::ptr::null_mut();
    }
    let (source, feed) = ChannelSource::new(FEED_CAPACITY);
    feed_out.write(Box::into_raw(Box::new(K2Feed(feed))));
    Box::into_raw(Box::new(K2Pipeline(Pipeline::new(source, Config::from_env()))))
}

/// Open the sensor and frame readers. Returns false on failure (check k2_last_error()).
///
/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_pipeline_initialize(pipeline: *mut K2Pipeline) -> bool {
    if pipeline.is_null() {
        return false;
    }
    match (*pipeline).0.initialize() {
        Ok(()) => true,
        Err(e) => {
            LAST_ERROR.set(&e);
            false
        }
    }
}

/// Release the sensor and drop published state. The handle stays valid.
///
/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_pipeline_shutdown(pipeline: *mut K2Pipeline) {
    if !pipeline.is_null() {
        (*pipeline).0.shutdown();
    }
}

/// Shut down and free a pipeline.
///
/// # Safety
/// `pipeline` must be a pointer returned by `k2_pipeline_create`, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_pipeline_destroy(pipeline: *mut K2Pipeline) {
    if !pipeline.is_null() {
        drop(Box::from_raw(pipeline));
    }
}

/// Free a feed. The pipeline then reports the sensor as unavailable.
///
/// # Safety
/// `feed` must be a pointer written by `k2_pipeline_create`, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_feed_destroy(feed: *mut K2Feed) {
    if !feed.is_null() {
        drop(Box::from_raw(feed));
    }
}

/// Run one polling tick. Returns false if the pipeline is not initialized
/// (check k2_last_error()).
///
/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_pipeline_update(
    pipeline: *mut K2Pipeline,
    delta_time: f32,
    world_time: f32,
) -> bool {
    if pipeline.is_null() {
        return false;
    }
    let pipeline = &mut (*pipeline).0;
    if !pipeline.is_initialized() {
        LAST_ERROR.set(&Kinect2Error::NotInitialized);
        return false;
    }
    pipeline.update(delta_time, world_time);
    true
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_is_operational(pipeline: *const K2Pipeline) -> bool {
    !pipeline.is_null() && (*pipeline).0.is_operational()
}

/// Status bitmap: 1 = operational, 2 = fresh joints, 4 = fresh orientations, 8 = fresh IR.
///
/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_status(pipeline: *const K2Pipeline) -> u32 {
    if pipeline.is_null() {
        return 0;
    }
    (*pipeline).0.status().bits()
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_frame_rate(pipeline: *const K2Pipeline) -> c_int {
    if pipeline.is_null() {
        return 0;
    }
    (*pipeline).0.frame_rate() as c_int
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_poll_rate(pipeline: *const K2Pipeline) -> c_int {
    if pipeline.is_null() {
        return 0;
    }
    (*pipeline).0.poll_rate() as c_int
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_has_fresh_body_data(pipeline: *const K2Pipeline) -> bool {
    !pipeline.is_null() && (*pipeline).0.has_fresh_body_data()
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_has_fresh_ir_data(pipeline: *const K2Pipeline) -> bool {
    !pipeline.is_null() && (*pipeline).0.has_fresh_ir_data()
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_body_confidence(pipeline: *const K2Pipeline) -> f32 {
    if pipeline.is_null() {
        return 0.0;
    }
    (*pipeline).0.body_confidence()
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_body_count(pipeline: *const K2Pipeline) -> c_int {
    if pipeline.is_null() {
        return 0;
    }
    (*pipeline).0.body_count() as c_int
}

/// Set the sensor position in millimeters.
///
/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_set_sensor_position(pipeline: *mut K2Pipeline, position: Vec3) {
    if !pipeline.is_null() {
        (*pipeline).0.set_sensor_position(position);
    }
}

/// # Safety
/// `pipeline` must be a valid pipeline pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_sensor_position(pipeline: *const K2Pipeline) -> Vec3 {
    if pipeline.is_null() {
        return Vec3::default();
    }
    (*pipeline).0.sensor_position()
}

/// Copy the fresh joints into `out`, ordered by joint type.
/// `max` must be at least 25; returns false without consuming otherwise.
///
/// # Safety
/// `pipeline` must be valid or null; `out` must point to `max` writable elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn k2_pull_joints(
    pipeline: *mut K2Pipeline,
    out: *mut K2Joint,
    max: c_int,
) -> bool {
    if pipeline.is_null() || out.is_null() || (max as usize) < JOINT_COUNT || max < 0 {
        return false;
    }
    let mut joints = BTreeMap::new();
    if !(*pipeline).0.pull_joints(&mut joints) {
        return false;
    }
    for (i, joint) in joints.values().enumerate() {
        out.add(i).write(K2Joint::from(joint));
    }
    true
}

/// Copy the fresh orientations into `out`, ordered by joint type.
/// `max` must be at least 25; returns false without consuming otherwise.
///
/// # Safety
/// `pipeline` must be valid or null; `out` must point to `max` writable elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn k2_pull_orientations(
    pipeline: *mut K2Pipeline,
    out: *mut K2Orientation,
    max: c_int,
) -> bool {
    if pipeline.is_null() || out.is_null() || (max as usize) < JOINT_COUNT || max < 0 {
        return false;
    }
    let mut orientations = BTreeMap::new();
    if !(*pipeline).0.pull_orientations(&mut orientations) {
        return false;
    }
    for (i, o) in orientations.values().enumerate() {
        out.add(i).write(K2Orientation {
            joint_type: o.joint_type as u32,
            orientation: o.orientation,
        });
    }
    true
}

/// Render the fresh IR frame as 512x424 packed pixels into `out`.
/// `len` must be at least 512 * 424; returns false without consuming otherwise.
///
/// # Safety
/// `pipeline` must be valid or null; `out` must point to `len` writable elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn k2_render_infrared(
    pipeline: *mut K2Pipeline,
    out: *mut u32,
    len: usize,
) -> bool {
    if pipeline.is_null() || out.is_null() || len < IR_FRAME_SIZE {
        return false;
    }
    let mut target = SliceTarget(std::slice::from_raw_parts_mut(out, len));
    (*pipeline).0.render_infrared_to(&mut target)
}

/// Push a body frame. Returns 0 on success, -1 on error.
///
/// # Safety
/// `feed` must be valid or null; `bodies` must point to `count` elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn k2_feed_body_frame(
    feed: *const K2Feed,
    floor_clip_plane: Vec4,
    bodies: *const K2Body,
    count: c_int,
) -> c_int {
    if feed.is_null() || count < 0 || (bodies.is_null() && count > 0) {
        return -1;
    }
    let slots: Vec<RecordedBody> = if count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(bodies, count as usize)
            .iter()
            .map(RecordedBody::from)
            .collect()
    };
    match (*feed)
        .0
        .push_body(RecordedBodyFrame::with_bodies(floor_clip_plane, slots))
    {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Push an infrared frame. A null `samples` pushes a frame without data.
/// Returns 0 on success, -1 on error.
///
/// # Safety
/// `feed` must be valid or null; `samples` must point to `len` elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn k2_feed_infrared_frame(
    feed: *const K2Feed,
    samples: *const u16,
    len: usize,
) -> c_int {
    if feed.is_null() {
        return -1;
    }
    let samples = if samples.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts(samples, len).to_vec())
    };
    match (*feed).0.push_infrared(RecordedInfraredFrame { samples }) {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Make the next acquisition on `stream` (K2_STREAM_BODY or K2_STREAM_INFRARED)
/// fail with driver code `code`. Returns 0 on success, -1 on error.
///
/// # Safety
/// `feed` must be a valid feed pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn k2_feed_fault(feed: *const K2Feed, stream: c_int, code: i32) -> c_int {
    if feed.is_null() {
        return -1;
    }
    let feed = &(*feed).0;
    let result = match stream {
        K2_STREAM_BODY => feed.fault_body(ErrorCode(code)),
        K2_STREAM_INFRARED => feed.fault_infrared(ErrorCode(code)),
        _ => return -1,
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next kinect2 API call.
#[no_mangle]
pub extern "C" fn k2_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
