use std::fmt;

/// Result code reported by the sensor driver (HRESULT layout).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const PENDING: ErrorCode = ErrorCode(0x8000_000A_u32 as i32);
    pub const NOT_IMPL: ErrorCode = ErrorCode(0x8000_4001_u32 as i32);
    pub const NO_INTERFACE: ErrorCode = ErrorCode(0x8000_4002_u32 as i32);
    pub const POINTER: ErrorCode = ErrorCode(0x8000_4003_u32 as i32);
    pub const ABORT: ErrorCode = ErrorCode(0x8000_4004_u32 as i32);
    pub const FAIL: ErrorCode = ErrorCode(0x8000_4005_u32 as i32);

    /// Human-readable description for the known driver codes.
    pub fn description(self) -> Option<&'static str> {
        match self {
            Self::PENDING => Some("[E_PENDING] Pending - Data not available now"),
            Self::NOT_IMPL => Some("[E_NOTIMPL] Not implemented"),
            Self::NO_INTERFACE => Some("[E_NOINTERFACE] No such interface supported"),
            Self::POINTER => Some("[E_POINTER] Invalid Pointer"),
            Self::ABORT => Some("[E_ABORT] Operation aborted"),
            Self::FAIL => Some("[E_FAIL] Unspecified failure"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => f.write_str(text),
            None => write!(f, "Unknown (0x{:08X})", self.0 as u32),
        }
    }
}

/// Errors that can occur when bringing up or talking to the sensor.
#[derive(Debug, thiserror::Error)]
pub enum Kinect2Error {
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Sensor not found (VID=045E PID=02C4/02D8)")]
    SensorNotFound,

    #[error("Failed to open sensor: {0}")]
    Open(ErrorCode),

    #[error("Failed to open body frame reader: {0}")]
    BodyReader(ErrorCode),

    #[error("Failed to open infrared frame reader: {0}")]
    InfraredReader(ErrorCode),

    #[error("Pipeline not initialized")]
    NotInitialized,

    #[error("Frame feed disconnected")]
    FeedDisconnected,
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &Kinect2Error) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
