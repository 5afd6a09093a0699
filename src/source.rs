//! Driver-facing abstraction the pipeline polls every tick.
//!
//! Frames and bodies are owned handles: whatever a tick acquires is dropped
//! (released back to the driver) before the tick returns, on every path.

use crate::config::Config;
use crate::error::ErrorCode;
use crate::types::{Joint, JointOrientation, Vec4, JOINT_COUNT};

/// Outcome of a non-blocking "acquire latest frame" call.
#[derive(Debug)]
pub enum Acquire<T> {
    /// A new frame since the last poll.
    Frame(T),
    /// Nothing new yet. Expected whenever polling outruns the sensor.
    Pending,
    /// Acquisition failed with a driver code.
    Error(ErrorCode),
}

impl<T> Acquire<T> {
    /// Map a driver result, folding the pending code into [`Acquire::Pending`].
    pub fn from_result(result: Result<T, ErrorCode>) -> Self {
        match result {
            Ok(frame) => Acquire::Frame(frame),
            Err(ErrorCode::PENDING) => Acquire::Pending,
            Err(code) => Acquire::Error(code),
        }
    }
}

/// One body slot of a body frame.
pub trait Body {
    fn is_tracked(&self) -> Result<bool, ErrorCode>;
    fn joints(&self) -> Result<[Joint; JOINT_COUNT], ErrorCode>;
    /// Orientations in the same order as [`Body::joints`].
    fn joint_orientations(&self) -> Result<[JointOrientation; JOINT_COUNT], ErrorCode>;
}

pub trait BodyFrame {
    type Body: Body;

    fn floor_clip_plane(&self) -> Vec4;

    /// Refresh and return the fixed-capacity body slots. Empty slots are `None`.
    fn bodies(&mut self) -> Result<&[Option<Self::Body>], ErrorCode>;
}

pub trait InfraredFrame {
    /// Raw 16-bit samples, or `None` when the frame carries no data.
    fn buffer(&self) -> Result<Option<&[u16]>, ErrorCode>;
}

/// A sensor session producing body and infrared frames.
pub trait SensorSource {
    type BodyFrame: BodyFrame;
    type InfraredFrame: InfraredFrame;

    /// Apply pipeline settings before the first `open`.
    fn configure(&mut self, _config: &Config) {}

    fn open(&mut self) -> Result<(), ErrorCode>;
    fn close(&mut self) -> Result<(), ErrorCode>;

    fn open_body_reader(&mut self) -> Result<(), ErrorCode>;
    fn open_infrared_reader(&mut self) -> Result<(), ErrorCode>;
    /// Drop both frame readers. Must be safe to call on readers never opened.
    fn close_readers(&mut self);

    /// Whether physical hardware is currently streaming.
    fn is_available(&mut self) -> Result<bool, ErrorCode>;

    fn try_acquire_body_frame(&mut self) -> Acquire<Self::BodyFrame>;
    fn try_acquire_infrared_frame(&mut self) -> Acquire<Self::InfraredFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result_folds_pending() {
        assert!(matches!(
            Acquire::<u8>::from_result(Err(ErrorCode::PENDING)),
            Acquire::Pending
        ));
        assert!(matches!(
            Acquire::<u8>::from_result(Err(ErrorCode::ABORT)),
            Acquire::Error(ErrorCode::ABORT)
        ));
        assert!(matches!(Acquire::from_result(Ok(5u8)), Acquire::Frame(5)));
    }
}
