//! Drive the pipeline from a synthetic 30 Hz producer and poll it at 60 Hz.
//!
//! Usage: cargo run --example stream
//! Press Ctrl+C to stop.

use kinect2::protocol::IR_FRAME_SIZE;
use kinect2::{
    ChannelSource, Config, FrameFeed, JointType, Pipeline, RecordedBody, RecordedBodyFrame,
    RecordedInfraredFrame, TrackingState, Vec3, Vec4, FEED_CAPACITY,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Push a slowly swaying body and a gradient IR frame roughly every 33 ms.
fn produce(feed: FrameFeed) {
    let start = Instant::now();
    loop {
        let t = start.elapsed().as_secs_f32();
        let sway = Vec3::new((t * 0.5).sin() * 0.3, 0.0, 2.0 + (t * 0.2).cos() * 0.5);
        let near = RecordedBody::uniform(sway, TrackingState::Tracked);
        let far = RecordedBody::uniform(Vec3::new(-1.0, 0.0, 3.5), TrackingState::Inferred);
        let floor = Vec4::new(0.0, 1.0, 0.0, 0.8);

        let samples = (0..IR_FRAME_SIZE)
            .map(|i| ((i as u32 + (t * 1000.0) as u32) % 4096) as u16)
            .collect();

        let sent = feed
            .push_body(RecordedBodyFrame::with_bodies(floor, vec![far, near]))
            .and_then(|_| feed.push_infrared(RecordedInfraredFrame { samples: Some(samples) }));
        if let Err(e) = sent {
            eprintln!("Producer stopped: {}", e);
            return;
        }
        std::thread::sleep(Duration::from_millis(33));
    }
}

fn main() {
    env_logger::init();

    let (source, feed) = ChannelSource::new(FEED_CAPACITY);
    let mut pipeline = Pipeline::new(source, Config::from_env());

    if let Err(e) = pipeline.initialize() {
        eprintln!("Failed to initialize pipeline: {}", e);
        std::process::exit(1);
    }

    std::thread::spawn(move || produce(feed));

    println!("Polling at 60 Hz (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_report = Instant::now();
    let mut joints = BTreeMap::new();
    let mut image = Vec::new();

    loop {
        std::thread::sleep(Duration::from_micros(16_667));
        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;
        pipeline.update(dt, start.elapsed().as_secs_f32());

        pipeline.pull_joints(&mut joints);
        pipeline.render_infrared_to(&mut image);

        if now.duration_since(last_report) >= Duration::from_secs(1) {
            let head = joints.get(&JointType::Head).map(|j| j.position).unwrap_or_default();
            println!(
                "poll={:>3} Hz  frames={:>3} Hz  bodies={}  conf={:.2}  \
                 head=[{:+.3}, {:+.3}, {:+.3}]  status={:?}",
                pipeline.poll_rate(),
                pipeline.frame_rate(),
                pipeline.body_count(),
                pipeline.body_confidence(),
                head.x,
                head.y,
                head.z,
                pipeline.status(),
            );
            last_report = now;
        }
    }
}
