use crate::rate::RateTracker;

/// How joint and orientation pulls share the fresh-body flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreshnessPolicy {
    /// One flag: pulling joints also consumes orientations and vice versa.
    #[default]
    Shared,
    /// Joints and orientations are consumed independently.
    PerStream,
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Recorded-session mode: the sensor counts as available while the
    /// source is open, without asking the hardware.
    pub playback: bool,
    /// Rate sampling window in seconds.
    pub rate_window_s: f32,
    pub freshness: FreshnessPolicy,
    /// Require a Kinect v2 on the USB bus before reporting availability.
    pub usb_presence: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            playback: false,
            rate_window_s: RateTracker::DEFAULT_WINDOW_S,
            freshness: FreshnessPolicy::Shared,
            usb_presence: false,
        }
    }
}

impl Config {
    /// Read settings from `KINECT2_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup; unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let window_ms = read_u32(&lookup, "KINECT2_RATE_WINDOW_MS")
            .filter(|&ms| ms > 0)
            .map(|ms| ms as f32 / 1000.0);

        let freshness = match read_string(&lookup, "KINECT2_FRESHNESS").as_deref() {
            Some("shared") | None => FreshnessPolicy::Shared,
            Some("per-stream") | Some("per_stream") => FreshnessPolicy::PerStream,
            Some(other) => {
                log::warn!(
                    "Unknown KINECT2_FRESHNESS='{}', using shared (supported: shared|per-stream)",
                    other
                );
                FreshnessPolicy::Shared
            }
        };

        Self {
            playback: read_bool(&lookup, "KINECT2_PLAYBACK").unwrap_or(defaults.playback),
            rate_window_s: window_ms.unwrap_or(defaults.rate_window_s),
            freshness,
            usb_presence: read_bool(&lookup, "KINECT2_USB_PRESENCE")
                .unwrap_or(defaults.usb_presence),
        }
    }
}

fn read_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<bool> {
    lookup(name).and_then(|v| {
        let v = v.trim().to_ascii_lowercase();
        match v.as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    })
}

fn read_u32<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<u32> {
    lookup(name).and_then(|v| v.trim().parse::<u32>().ok())
}

fn read_string<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), Config::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = config_from(&[
            ("KINECT2_PLAYBACK", "yes"),
            ("KINECT2_RATE_WINDOW_MS", " 500 "),
            ("KINECT2_FRESHNESS", "Per-Stream"),
            ("KINECT2_USB_PRESENCE", "1"),
        ]);
        assert!(config.playback);
        assert_eq!(config.rate_window_s, 0.5);
        assert_eq!(config.freshness, FreshnessPolicy::PerStream);
        assert!(config.usb_presence);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("KINECT2_PLAYBACK", "maybe"),
            ("KINECT2_RATE_WINDOW_MS", "0"),
            ("KINECT2_FRESHNESS", "sometimes"),
        ]);
        assert_eq!(config, Config::default());
    }
}
