use crate::config::Config;
use crate::error::ErrorCode;
use crate::infrared::{InfraredProcessor, RenderTarget};
use crate::joints::JointProcessor;
use crate::protocol;
use crate::rate::RateTracker;
use crate::selector;
use crate::source::{Acquire, BodyFrame, InfraredFrame, SensorSource};
use crate::types::{
    BodySnapshot, DataFrame, Joint, JointOrientation, JointType, SensorPose, Status, Vec3, Vec4,
};
use crate::{Kinect2Error, Result};
use std::collections::BTreeMap;

/// State that only exists between `initialize` and `shutdown`.
struct Session {
    rate: RateTracker,
    joints: JointProcessor,
    infrared: InfraredProcessor,
    operational: bool,
    last_body_error: Option<ErrorCode>,
    last_infrared_error: Option<ErrorCode>,
    reported_errors: u32,
}

impl Session {
    fn new(config: &Config) -> Self {
        Self {
            rate: RateTracker::new(config.rate_window_s),
            joints: JointProcessor::new(config.freshness),
            infrared: InfraredProcessor::new(),
            operational: true,
            last_body_error: None,
            last_infrared_error: None,
            reported_errors: 0,
        }
    }
}

/// Polling pipeline turning sensor frames into consumable skeleton and IR state.
///
/// Drive it with [`Pipeline::update`] from the application loop; every call
/// polls the source once without blocking. Consumers read results through
/// the query methods. Pull methods consume the fresh flags, so when consumers
/// live on another thread wrap the pipeline in a `Mutex` and pull under one lock.
pub struct Pipeline<S: SensorSource> {
    source: S,
    config: Config,
    pose: SensorPose,
    session: Option<Session>,
}

impl<S: SensorSource> Pipeline<S> {
    /// Wrap `source`, handing it `config` before anything is opened.
    pub fn new(mut source: S, config: Config) -> Self {
        source.configure(&config);
        Self {
            source,
            config,
            pose: SensorPose::default(),
            session: None,
        }
    }

    /// Open the sensor and both frame readers.
    ///
    /// On failure everything opened so far is torn down again.
    pub fn initialize(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        if let Err(e) = self.open_source() {
            log::info!("Sensor pipeline failed to initialize: {}", e);
            self.shutdown();
            return Err(e);
        }
        self.session = Some(Session::new(&self.config));
        log::info!(
            "Sensor pipeline initialized (playback={} freshness={:?})",
            self.config.playback,
            self.config.freshness
        );
        Ok(())
    }

    fn open_source(&mut self) -> Result<()> {
        self.source.open().map_err(Kinect2Error::Open)?;
        self.source
            .open_body_reader()
            .map_err(Kinect2Error::BodyReader)?;
        self.source
            .open_infrared_reader()
            .map_err(Kinect2Error::InfraredReader)?;
        Ok(())
    }

    /// Release readers and the sensor and drop all published state.
    pub fn shutdown(&mut self) {
        let was_running = self.session.take().is_some();
        self.source.close_readers();
        if let Err(code) = self.source.close() {
            log::warn!("Failed to close sensor: {}", code);
        }
        self.pose = SensorPose::default();
        if was_running {
            log::info!("Sensor pipeline shut down");
        }
    }

    /// Run one polling tick.
    ///
    /// `delta_time` is the time since the previous call in seconds;
    /// `world_time` is stamped on any skeleton published during this tick.
    pub fn update(&mut self, delta_time: f32, world_time: f32) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.rate.tick(delta_time);

        session.operational = if self.config.playback {
            true
        } else {
            match self.source.is_available() {
                Ok(available) => available,
                Err(code) => {
                    log::debug!("Availability check failed: {}", code);
                    false
                }
            }
        };
        if !session.operational {
            return;
        }

        poll_body(&mut self.source, session, &mut self.pose, world_time);
        poll_infrared(&mut self.source, session);

        session.rate.maybe_publish();
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_operational(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.operational)
    }

    pub fn status(&self) -> Status {
        let Some(session) = self.session.as_ref() else {
            return Status::empty();
        };
        let mut status = session.joints.fresh();
        status.set(Status::OPERATIONAL, session.operational);
        status.set(Status::FRESH_INFRARED, session.infrared.has_fresh_data());
        status
    }

    /// Successful body reads in the last complete rate window.
    pub fn frame_rate(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.rate.frame_rate())
    }

    /// Polls in the last complete rate window.
    pub fn poll_rate(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.rate.poll_rate())
    }

    pub fn has_fresh_body_data(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.joints.has_fresh_data())
    }

    pub fn has_fresh_ir_data(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.infrared.has_fresh_data())
    }

    /// Copy the latest joints into `out` if they have not been pulled yet.
    pub fn pull_joints(&mut self, out: &mut BTreeMap<JointType, Joint>) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.joints.pull_joints(out))
    }

    /// Copy the latest orientations into `out` if they have not been pulled yet.
    pub fn pull_orientations(&mut self, out: &mut BTreeMap<JointType, JointOrientation>) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.joints.pull_orientations(out))
    }

    pub fn body_confidence(&self) -> f32 {
        self.session.as_ref().map_or(0.0, |s| s.joints.confidence())
    }

    pub fn body_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.joints.body_count())
    }

    /// Latest published skeleton, without consuming it.
    pub fn snapshot(&self) -> Option<&BodySnapshot> {
        self.session.as_ref().map(|s| s.joints.snapshot())
    }

    /// Bundle of the current skeleton and sensor placement, without consuming it.
    pub fn data_frame(&self) -> Option<DataFrame> {
        let snapshot = self.snapshot()?;
        Some(DataFrame {
            joints: snapshot.joints.clone(),
            orientations: snapshot.orientations.clone(),
            confidence: snapshot.confidence,
            sensor_position: self.pose.position,
            floor_plane: self.pose.floor_plane,
        })
    }

    /// Sensor position in millimeters. The y component is overwritten by the
    /// detected floor height whenever a body frame carries a usable floor plane.
    pub fn set_sensor_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    pub fn sensor_position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn floor_plane(&self) -> Vec4 {
        self.pose.floor_plane
    }

    /// Normalize the pending IR frame into `target`. False if none is pending.
    pub fn render_infrared_to<T: RenderTarget + ?Sized>(&mut self, target: &mut T) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.infrared.render_to(target))
    }

    /// Last unresolved body acquisition error, cleared by the next success.
    pub fn last_body_error(&self) -> Option<ErrorCode> {
        self.session.as_ref().and_then(|s| s.last_body_error)
    }

    /// Last unresolved infrared acquisition error, cleared by the next success.
    pub fn last_infrared_error(&self) -> Option<ErrorCode> {
        self.session.as_ref().and_then(|s| s.last_infrared_error)
    }

    /// Number of acquisition errors surfaced to the log since initialize.
    pub fn reported_errors(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.reported_errors)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: SensorSource> Drop for Pipeline<S> {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.shutdown();
        }
    }
}

/// Log `code` unless it repeats the last error seen on this stream.
fn report_once(last: &mut Option<ErrorCode>, reported: &mut u32, code: ErrorCode, stream: &str) {
    if *last == Some(code) {
        return;
    }
    log::warn!("Acquire latest {} frame failed: {}", stream, code);
    *last = Some(code);
    *reported += 1;
}

fn poll_body<S: SensorSource>(
    source: &mut S,
    session: &mut Session,
    pose: &mut SensorPose,
    world_time: f32,
) {
    let mut frame = match source.try_acquire_body_frame() {
        Acquire::Frame(frame) => frame,
        Acquire::Pending => {
            session.joints.mark_stale();
            return;
        }
        Acquire::Error(code) => {
            report_once(
                &mut session.last_body_error,
                &mut session.reported_errors,
                code,
                "body",
            );
            return;
        }
    };

    session.last_body_error = None;
    session.rate.record_success();
    session.joints.mark_fresh();

    let floor = frame.floor_clip_plane();
    pose.floor_plane = floor;
    if let Some(height) = protocol::sensor_height_mm(&floor) {
        pose.position.y = height;
    }

    let bodies = match frame.bodies() {
        Ok(bodies) => bodies,
        Err(code) => {
            report_once(
                &mut session.last_body_error,
                &mut session.reported_errors,
                code,
                "body data",
            );
            return;
        }
    };

    let tracked = selector::count_tracked(bodies);
    session.joints.set_body_count(tracked);
    if tracked == 0 {
        return;
    }
    match selector::select_nearest(bodies) {
        Some(body) => {
            session.joints.process(body, pose.position, world_time);
        }
        None => log::trace!("{} tracked bodies but none selectable", tracked),
    }
}

fn poll_infrared<S: SensorSource>(source: &mut S, session: &mut Session) {
    let frame = match source.try_acquire_infrared_frame() {
        Acquire::Frame(frame) => frame,
        Acquire::Pending => {
            session.infrared.mark_stale();
            return;
        }
        Acquire::Error(code) => {
            report_once(
                &mut session.last_infrared_error,
                &mut session.reported_errors,
                code,
                "infrared",
            );
            return;
        }
    };

    session.last_infrared_error = None;
    match frame.buffer() {
        Ok(buffer) => {
            session.infrared.ingest(buffer);
        }
        Err(code) => report_once(
            &mut session.last_infrared_error,
            &mut session.reported_errors,
            code,
            "infrared buffer",
        ),
    }
}
