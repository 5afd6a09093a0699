//! # kinect2 - frame pipeline for Kinect v2 body tracking
//!
//! Polls a depth/infrared body-tracking sensor once per application tick and
//! turns raw frames into state an application can consume:
//! - Nearest-body skeleton with sensor-position compensation and confidence
//! - Poll rate and frame rate per one-second window
//! - Normalized 8-bit infrared image, rendered on demand
//! - C FFI for integration with C/C++ engines
//!
//! ## Quick Start
//! ```no_run
//! use kinect2::{ChannelSource, Config, Pipeline, FEED_CAPACITY};
//! use std::collections::BTreeMap;
//!
//! let (source, feed) = ChannelSource::new(FEED_CAPACITY);
//! // Hand `feed` to the thread receiving driver frames.
//! let mut pipeline = Pipeline::new(source, Config::from_env());
//! pipeline.initialize().unwrap();
//!
//! let mut joints = BTreeMap::new();
//! for tick in 0..600 {
//!     pipeline.update(1.0 / 60.0, tick as f32 / 60.0);
//!     if pipeline.pull_joints(&mut joints) {
//!         println!("confidence: {:.2}", pipeline.body_confidence());
//!     }
//! }
//! drop(feed);
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod config;
pub mod source;
pub mod rate;
pub mod selector;
pub mod joints;
pub mod infrared;
pub mod pipeline;
pub mod channel;
pub mod device;
pub mod ffi;

pub use error::{ErrorCode, Kinect2Error};
pub use types::*;
pub use config::{Config, FreshnessPolicy};
pub use source::{Acquire, Body, BodyFrame, InfraredFrame, SensorSource};
pub use infrared::RenderTarget;
pub use pipeline::Pipeline;
pub use channel::{
    ChannelSource, FrameFeed, RecordedBody, RecordedBodyFrame, RecordedInfraredFrame,
    FEED_CAPACITY,
};

/// Result type alias for kinect2 operations.
pub type Result<T> = std::result::Result<T, Kinect2Error>;
