//! Channel-backed sensor source.
//!
//! A producer (driver callback thread, recording player or C caller) pushes
//! frames into a [`FrameFeed`]; the pipeline polls the matching
//! [`ChannelSource`]. Acquisition drains the channel and keeps only the
//! newest event, matching "acquire latest frame" semantics.

use crate::config::Config;
use crate::device::PresenceProbe;
use crate::error::ErrorCode;
use crate::source::{Acquire, Body, BodyFrame, InfraredFrame, SensorSource};
use crate::protocol::BODY_COUNT;
use crate::types::{
    Joint, JointOrientation, JointType, Quaternion, TrackingState, Vec3, Vec4, JOINT_COUNT,
};
use crate::{Kinect2Error, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default queue depth per stream.
pub const FEED_CAPACITY: usize = 32;

/// A body captured by the driver, owned by the frame that carries it.
#[derive(Debug, Clone)]
pub struct RecordedBody {
    pub tracked: bool,
    pub joints: [Joint; JOINT_COUNT],
    pub orientations: [JointOrientation; JOINT_COUNT],
}

impl RecordedBody {
    /// Tracked body with the given joints and identity orientations.
    pub fn new(joints: [Joint; JOINT_COUNT]) -> Self {
        Self {
            tracked: true,
            joints,
            orientations: JointType::ALL.map(|t| JointOrientation {
                joint_type: t,
                orientation: Quaternion::IDENTITY,
            }),
        }
    }

    /// Tracked body with every joint at `position` in the same state.
    pub fn uniform(position: Vec3, state: TrackingState) -> Self {
        Self::new(JointType::ALL.map(|t| Joint::new(t, position, state)))
    }

    pub fn untracked() -> Self {
        let mut body = Self::uniform(Vec3::default(), TrackingState::NotTracked);
        body.tracked = false;
        body
    }
}

impl Body for RecordedBody {
    fn is_tracked(&self) -> std::result::Result<bool, ErrorCode> {
        Ok(self.tracked)
    }

    fn joints(&self) -> std::result::Result<[Joint; JOINT_COUNT], ErrorCode> {
        Ok(self.joints)
    }

    fn joint_orientations(
        &self,
    ) -> std::result::Result<[JointOrientation; JOINT_COUNT], ErrorCode> {
        Ok(self.orientations)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordedBodyFrame {
    pub floor_clip_plane: Vec4,
    pub bodies: Vec<Option<RecordedBody>>,
}

impl RecordedBodyFrame {
    /// Frame with `bodies` in the first slots and the rest empty.
    pub fn with_bodies(floor_clip_plane: Vec4, bodies: Vec<RecordedBody>) -> Self {
        let mut slots: Vec<Option<RecordedBody>> = bodies.into_iter().map(Some).collect();
        if slots.len() < BODY_COUNT {
            slots.resize(BODY_COUNT, None);
        }
        Self {
            floor_clip_plane,
            bodies: slots,
        }
    }
}

impl BodyFrame for RecordedBodyFrame {
    type Body = RecordedBody;

    fn floor_clip_plane(&self) -> Vec4 {
        self.floor_clip_plane
    }

    fn bodies(&mut self) -> std::result::Result<&[Option<RecordedBody>], ErrorCode> {
        Ok(&self.bodies)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordedInfraredFrame {
    /// `None` models a frame whose buffer carries no data.
    pub samples: Option<Vec<u16>>,
}

impl InfraredFrame for RecordedInfraredFrame {
    fn buffer(&self) -> std::result::Result<Option<&[u16]>, ErrorCode> {
        Ok(self.samples.as_deref())
    }
}

#[derive(Debug)]
enum FeedEvent<T> {
    Frame(T),
    Fault(ErrorCode),
}

/// Producer half: pushes frames and driver faults towards the pipeline.
pub struct FrameFeed {
    body: Sender<FeedEvent<RecordedBodyFrame>>,
    infrared: Sender<FeedEvent<RecordedInfraredFrame>>,
    connected: Arc<AtomicBool>,
}

impl FrameFeed {
    pub fn push_body(&self, frame: RecordedBodyFrame) -> Result<()> {
        send(&self.body, FeedEvent::Frame(frame), "body")
    }

    pub fn push_infrared(&self, frame: RecordedInfraredFrame) -> Result<()> {
        send(&self.infrared, FeedEvent::Frame(frame), "infrared")
    }

    /// Make the next body acquisition fail with `code`.
    pub fn fault_body(&self, code: ErrorCode) -> Result<()> {
        send(&self.body, FeedEvent::Fault(code), "body")
    }

    /// Make the next infrared acquisition fail with `code`.
    pub fn fault_infrared(&self, code: ErrorCode) -> Result<()> {
        send(&self.infrared, FeedEvent::Fault(code), "infrared")
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

fn send<T>(sender: &Sender<FeedEvent<T>>, event: FeedEvent<T>, stream: &str) -> Result<()> {
    match sender.try_send(event) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            log::trace!("{} feed full, dropping frame", stream);
            Ok(())
        }
        Err(TrySendError::Disconnected(_)) => Err(Kinect2Error::FeedDisconnected),
    }
}

/// Consumer half: a [`SensorSource`] over the feed's channels.
pub struct ChannelSource {
    body: Receiver<FeedEvent<RecordedBodyFrame>>,
    infrared: Receiver<FeedEvent<RecordedInfraredFrame>>,
    connected: Arc<AtomicBool>,
    usb_presence: bool,
    presence: Option<PresenceProbe>,
    open: bool,
    body_reader: bool,
    infrared_reader: bool,
}

impl ChannelSource {
    /// Create a connected source/feed pair holding up to `capacity` events per stream.
    pub fn new(capacity: usize) -> (ChannelSource, FrameFeed) {
        let (body_tx, body_rx) = crossbeam_channel::bounded(capacity);
        let (ir_tx, ir_rx) = crossbeam_channel::bounded(capacity);
        let connected = Arc::new(AtomicBool::new(true));

        let source = ChannelSource {
            body: body_rx,
            infrared: ir_rx,
            connected: connected.clone(),
            usb_presence: false,
            presence: None,
            open: false,
            body_reader: false,
            infrared_reader: false,
        };
        let feed = FrameFeed {
            body: body_tx,
            infrared: ir_tx,
            connected,
        };
        (source, feed)
    }

    /// Whether [`SensorSource::is_available`] also requires a Kinect v2 on the USB bus.
    pub fn usb_presence(&self) -> bool {
        self.usb_presence
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Drain `receiver`, keeping only the newest event.
fn take_latest<T>(receiver: &Receiver<FeedEvent<T>>) -> Acquire<T> {
    let mut latest = None;
    loop {
        match receiver.try_recv() {
            Ok(event) => latest = Some(event),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                if latest.is_none() {
                    return Acquire::Error(ErrorCode::ABORT);
                }
                break;
            }
        }
    }
    match latest {
        None => Acquire::Pending,
        Some(FeedEvent::Frame(frame)) => Acquire::Frame(frame),
        Some(FeedEvent::Fault(code)) => Acquire::from_result(Err(code)),
    }
}

impl SensorSource for ChannelSource {
    type BodyFrame = RecordedBodyFrame;
    type InfraredFrame = RecordedInfraredFrame;

    fn configure(&mut self, config: &Config) {
        self.usb_presence = config.usb_presence;
    }

    fn open(&mut self) -> std::result::Result<(), ErrorCode> {
        if !self.is_connected() {
            return Err(ErrorCode::ABORT);
        }
        if self.usb_presence && self.presence.is_none() {
            self.presence = Some(PresenceProbe::new());
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), ErrorCode> {
        self.close_readers();
        self.presence = None;
        self.open = false;
        Ok(())
    }

    fn open_body_reader(&mut self) -> std::result::Result<(), ErrorCode> {
        if !self.open {
            return Err(ErrorCode::NO_INTERFACE);
        }
        self.body_reader = true;
        Ok(())
    }

    fn open_infrared_reader(&mut self) -> std::result::Result<(), ErrorCode> {
        if !self.open {
            return Err(ErrorCode::NO_INTERFACE);
        }
        self.infrared_reader = true;
        Ok(())
    }

    fn close_readers(&mut self) {
        self.body_reader = false;
        self.infrared_reader = false;
    }

    fn is_available(&mut self) -> std::result::Result<bool, ErrorCode> {
        if !self.open || !self.is_connected() {
            return Ok(false);
        }
        match self.presence.as_mut() {
            Some(probe) => probe.is_present(),
            None => Ok(true),
        }
    }

    fn try_acquire_body_frame(&mut self) -> Acquire<RecordedBodyFrame> {
        if !self.body_reader {
            return Acquire::Error(ErrorCode::NO_INTERFACE);
        }
        take_latest(&self.body)
    }

    fn try_acquire_infrared_frame(&mut self) -> Acquire<RecordedInfraredFrame> {
        if !self.infrared_reader {
            return Acquire::Error(ErrorCode::NO_INTERFACE);
        }
        take_latest(&self.infrared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened(capacity: usize) -> (ChannelSource, FrameFeed) {
        let (mut source, feed) = ChannelSource::new(capacity);
        source.open().unwrap();
        source.open_body_reader().unwrap();
        source.open_infrared_reader().unwrap();
        (source, feed)
    }

    #[test]
    fn test_pending_when_nothing_queued() {
        let (mut source, _feed) = opened(4);
        assert!(matches!(source.try_acquire_body_frame(), Acquire::Pending));
        assert!(matches!(source.try_acquire_infrared_frame(), Acquire::Pending));
    }

    #[test]
    fn test_latest_frame_wins() {
        let (mut source, feed) = opened(4);
        for w in [1.0, 2.0, 3.0] {
            feed.push_body(RecordedBodyFrame::with_bodies(Vec4::new(0.0, 1.0, 0.0, w), vec![]))
                .unwrap();
        }
        match source.try_acquire_body_frame() {
            Acquire::Frame(frame) => {
                assert_eq!(frame.floor_clip_plane().w, 3.0);
                assert_eq!(frame.bodies.len(), BODY_COUNT);
            }
            _ => panic!("expected frame"),
        }
        assert!(matches!(source.try_acquire_body_frame(), Acquire::Pending));
    }

    #[test]
    fn test_fault_surfaces_as_error() {
        let (mut source, feed) = opened(4);
        feed.fault_infrared(ErrorCode::POINTER).unwrap();
        assert!(matches!(
            source.try_acquire_infrared_frame(),
            Acquire::Error(ErrorCode::POINTER)
        ));
    }

    #[test]
    fn test_pending_fault_reads_as_pending() {
        let (mut source, feed) = opened(4);
        feed.fault_body(ErrorCode::PENDING).unwrap();
        assert!(matches!(source.try_acquire_body_frame(), Acquire::Pending));
    }

    #[test]
    fn test_configure_applies_usb_presence() {
        let (mut source, _feed) = ChannelSource::new(4);
        assert!(!source.usb_presence());
        source.configure(&Config {
            usb_presence: true,
            ..Config::default()
        });
        assert!(source.usb_presence());
    }

    #[test]
    fn test_full_feed_drops_frames() {
        let (mut source, feed) = opened(1);
        feed.push_infrared(RecordedInfraredFrame { samples: Some(vec![1]) }).unwrap();
        feed.push_infrared(RecordedInfraredFrame { samples: Some(vec![2]) }).unwrap();
        match source.try_acquire_infrared_frame() {
            Acquire::Frame(frame) => assert_eq!(frame.buffer().unwrap(), Some(&[1u16][..])),
            _ => panic!("expected frame"),
        }
    }

    #[test]
    fn test_dropped_feed_is_unavailable() {
        let (mut source, feed) = opened(4);
        assert_eq!(source.is_available(), Ok(true));
        drop(feed);
        assert_eq!(source.is_available(), Ok(false));
        assert!(matches!(
            source.try_acquire_body_frame(),
            Acquire::Error(ErrorCode::ABORT)
        ));
    }

    #[test]
    fn test_open_fails_without_producer() {
        let (mut source, feed) = ChannelSource::new(4);
        drop(feed);
        assert_eq!(source.open(), Err(ErrorCode::ABORT));
        assert_eq!(source.open_body_reader(), Err(ErrorCode::NO_INTERFACE));
    }

    #[test]
    fn test_readers_required_for_acquisition() {
        let (mut source, _feed) = ChannelSource::new(4);
        source.open().unwrap();
        assert!(matches!(
            source.try_acquire_body_frame(),
            Acquire::Error(ErrorCode::NO_INTERFACE)
        ));
        source.close().unwrap();
        assert_eq!(source.is_available(), Ok(false));
    }
}
