//! USB discovery of Kinect v2 sensors.
//!
//! The sensor streams over its own driver stack, so this only enumerates the
//! bus. It backs the hardware availability probe and the `enumerate` demo.

use crate::error::ErrorCode;
use crate::protocol::{PIDS, VID};
use crate::Result;
use rusb::UsbContext;
use std::time::{Duration, Instant};

/// A Kinect v2 found on the USB bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInfo {
    pub bus_number: u8,
    pub address: u8,
    pub product_id: u16,
}

/// Check whether a USB vendor/product pair is a Kinect v2 sensor.
pub fn is_kinect2(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == VID && PIDS.contains(&product_id)
}

/// List all connected Kinect v2 sensors.
pub fn list_sensors() -> Result<Vec<SensorInfo>> {
    let context = rusb::Context::new()?;
    Ok(scan(&context)?)
}

fn scan<T: UsbContext>(context: &T) -> rusb::Result<Vec<SensorInfo>> {
    let mut sensors = Vec::new();

    for device in context.devices()?.iter() {
        let desc = match device.device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                log::warn!(
                    "Failed to read descriptor at bus {} address {}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };
        if !is_kinect2(desc.vendor_id(), desc.product_id()) {
            continue;
        }
        sensors.push(SensorInfo {
            bus_number: device.bus_number(),
            address: device.address(),
            product_id: desc.product_id(),
        });
    }

    Ok(sensors)
}

/// Map a libusb failure onto the driver code space.
pub fn usb_error_code(err: rusb::Error) -> ErrorCode {
    match err {
        rusb::Error::NotSupported => ErrorCode::NOT_IMPL,
        rusb::Error::NoDevice | rusb::Error::NotFound => ErrorCode::NO_INTERFACE,
        rusb::Error::Interrupted => ErrorCode::ABORT,
        _ => ErrorCode::FAIL,
    }
}

/// Rate-limited "is a Kinect v2 plugged in" check over one libusb context.
///
/// The context is created once; the bus is rescanned at most once per
/// `interval` and the last answer (or failure) is returned in between.
pub struct PresenceProbe {
    context: std::result::Result<rusb::Context, ErrorCode>,
    interval: Duration,
    last: Option<(Instant, std::result::Result<bool, ErrorCode>)>,
}

impl PresenceProbe {
    pub const RESCAN_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        let context = rusb::Context::new().map_err(|e| {
            log::warn!("USB context unavailable, sensor presence unknown: {}", e);
            usb_error_code(e)
        });
        Self {
            context,
            interval: Self::RESCAN_INTERVAL,
            last: None,
        }
    }

    pub fn is_present(&mut self) -> std::result::Result<bool, ErrorCode> {
        if let Some((at, answer)) = self.last {
            if at.elapsed() < self.interval {
                return answer;
            }
        }
        let context = self.context.as_ref().map_err(|code| *code)?;
        let answer = scan(context)
            .map(|sensors| !sensors.is_empty())
            .map_err(usb_error_code);
        self.last = Some((Instant::now(), answer));
        answer
    }
}

impl Default for PresenceProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_kinect2() {
        assert!(is_kinect2(0x045E, 0x02C4));
        assert!(is_kinect2(0x045E, 0x02D8));
        assert!(!is_kinect2(0x045E, 0x02AE));
        assert!(!is_kinect2(0x040E, 0x02D8));
    }

    #[test]
    fn test_missing_context_reports_error() {
        let mut probe = PresenceProbe {
            context: Err(ErrorCode::FAIL),
            interval: Duration::from_secs(60),
            last: None,
        };
        assert_eq!(probe.is_present(), Err(ErrorCode::FAIL));
    }

    #[test]
    fn test_cached_answer_skips_rescan() {
        let mut probe = PresenceProbe {
            context: Err(ErrorCode::FAIL),
            interval: Duration::from_secs(60),
            last: Some((Instant::now(), Ok(true))),
        };
        assert_eq!(probe.is_present(), Ok(true));

        probe.interval = Duration::ZERO;
        assert_eq!(probe.is_present(), Err(ErrorCode::FAIL));
    }

    #[test]
    fn test_usb_error_mapping() {
        assert_eq!(usb_error_code(rusb::Error::NoDevice), ErrorCode::NO_INTERFACE);
        assert_eq!(usb_error_code(rusb::Error::NotSupported), ErrorCode::NOT_IMPL);
        assert_eq!(usb_error_code(rusb::Error::Access), ErrorCode::FAIL);
    }
}
