//! Stream the tracked skeleton as JSON lines.
//!
//! Outputs one JSON object per fresh body frame:
//!
//! {"t":1.234,"conf":0.92,"bodies":1,"joints":[{"type":0,"x":0.1,"y":0.8,"z":2.1,
//!  "state":2,"roll":0.0,"pitch":0.0,"yaw":0.0},...]}
//!
//! Frames come from a synthetic producer; an engine integration would push
//! driver frames through the same feed.
//!
//! Usage: cargo run --release --example stream_json

use kinect2::{
    ChannelSource, Config, Pipeline, RecordedBody, RecordedBodyFrame, TrackingState, Vec3, Vec4,
    FEED_CAPACITY,
};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let (source, feed) = ChannelSource::new(FEED_CAPACITY);
    let mut pipeline = Pipeline::new(source, Config::from_env());
    if let Err(e) = pipeline.initialize() {
        eprintln!("Failed to initialize pipeline: {}", e);
        std::process::exit(1);
    }

    std::thread::spawn(move || {
        let start = Instant::now();
        loop {
            let t = start.elapsed().as_secs_f32();
            let position = Vec3::new(t.sin() * 0.2, 0.0, 2.0);
            let body = RecordedBody::uniform(position, TrackingState::Tracked);
            let frame = RecordedBodyFrame::with_bodies(Vec4::new(0.0, 1.0, 0.0, 0.75), vec![body]);
            if feed.push_body(frame).is_err() {
                return;
            }
            std::thread::sleep(Duration::from_millis(33));
        }
    });

    eprintln!("Streaming JSON (Ctrl+C to stop)...");

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let start = Instant::now();
    let mut last_tick = Instant::now();
    let mut joints = BTreeMap::new();
    let mut orientations = BTreeMap::new();

    loop {
        std::thread::sleep(Duration::from_micros(16_667));
        let now = Instant::now();
        let world_time = start.elapsed().as_secs_f32();
        pipeline.update(now.duration_since(last_tick).as_secs_f32(), world_time);
        last_tick = now;

        if !pipeline.pull_joints(&mut joints) {
            continue;
        }
        pipeline.pull_orientations(&mut orientations);

        let _ = write!(
            out,
            "{{\"t\":{:.3},\"conf\":{:.2},\"bodies\":{},\"joints\":[",
            world_time,
            pipeline.body_confidence(),
            pipeline.body_count(),
        );
        for (i, (joint_type, joint)) in joints.iter().enumerate() {
            let euler = orientations
                .get(joint_type)
                .map(|o| o.euler_deg())
                .unwrap_or_default();
            let _ = write!(
                out,
                "{}{{\"type\":{},\"x\":{:.4},\"y\":{:.4},\"z\":{:.4},\"state\":{},\
                 \"roll\":{:.1},\"pitch\":{:.1},\"yaw\":{:.1}}}",
                if i == 0 { "" } else { "," },
                joint_type.index(),
                joint.position.x,
                joint.position.y,
                joint.position.z,
                joint.tracking_state.ordinal(),
                euler[0],
                euler[1],
                euler[2],
            );
        }
        let _ = writeln!(out, "]}}");
        let _ = out.flush();
    }
}
