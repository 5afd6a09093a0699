use crate::types::Vec4;

// -- USB identifiers --
pub const VID: u16 = 0x045E;
/// Kinect for Windows v2 and Xbox One Kinect product ids.
pub const PIDS: [u16; 2] = [0x02C4, 0x02D8];

// -- Frame geometry --
pub const IR_WIDTH: usize = 512;
pub const IR_HEIGHT: usize = 424;
pub const IR_FRAME_SIZE: usize = IR_WIDTH * IR_HEIGHT;

/// Body slots reported per body frame.
pub const BODY_COUNT: usize = 6;

// -- Unit conversion --
pub const METRES_TO_MM: f32 = 1000.0;
pub const MM_TO_METRES: f32 = 0.001;

/// Floor heights below this (mm) mean the floor plane has not been detected.
pub const MIN_SENSOR_HEIGHT_MM: f32 = 20.0;

// -- Infrared normalisation --
/// Visibility scale recommended by the SDK samples (0.08 * 3).
pub const IR_SCALE: f32 = 0.08 * 3.0;
pub const IR_MIN_RATIO: f32 = 0.01;
pub const IR_MAX_RATIO: f32 = 1.0;
/// Lowest channel value an IR pixel can take, ceil(IR_MIN_RATIO * 255).
pub const IR_MIN_CHANNEL: u8 = 3;

/// Map a raw 16-bit IR sample to an 8-bit intensity.
///
/// The sample is scaled to [0, 1], divided by [`IR_SCALE`] and clamped to
/// [`IR_MIN_RATIO`, `IR_MAX_RATIO`] so neither pure black nor washed-out
/// pixels appear, then truncated to a channel value.
pub fn ir_channel(sample: u16) -> u8 {
    let ratio = (sample as f32 / u16::MAX as f32) / IR_SCALE;
    let ratio = ratio.clamp(IR_MIN_RATIO, IR_MAX_RATIO);
    ((ratio * 255.0) as u8).max(IR_MIN_CHANNEL)
}

/// Pack an intensity into a grayscale pixel with full alpha.
/// Byte order in memory is [c, c, c, 0xFF].
pub fn pack_gray(channel: u8) -> u32 {
    u32::from_le_bytes([channel, channel, channel, 0xFF])
}

/// Sensor height above the floor in millimeters, if the plane is usable.
pub fn sensor_height_mm(floor: &Vec4) -> Option<f32> {
    let height = floor.w * METRES_TO_MM;
    if height.is_finite() && height >= MIN_SENSOR_HEIGHT_MM {
        Some(height)
    } else {
        None
    }
}

/// Convert quaternion [w, x, y, z] to Euler angles [roll, pitch, yaw] in degrees.
///
///   roll  = atan2(2(xy+wz), 1 - 2(x²+z²))
///   pitch = asin(2(yz-wx))
///   yaw   = atan2(-2(xz+wy), 1 - 2(x²+y²))
pub fn quaternion_to_euler(w: f64, x: f64, y: f64, z: f64) -> [f64; 3] {
    let roll = (2.0 * (x * y + w * z)).atan2(1.0 - 2.0 * (x * x + z * z));
    let pitch = (2.0 * (y * z - w * x)).clamp(-1.0, 1.0).asin();
    let yaw = (-2.0 * (x * z + w * y)).atan2(1.0 - 2.0 * (x * x + y * y));
    [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
}
