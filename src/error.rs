//! Error handling for the videoInput C API

use crate::types::DeviceId;
use std::os::raw::c_int;

/// Error types for videoInput operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViError {
    /// The capture engine has not been created with `init`
    #[error("capture engine is not initialized")]
    NotInitialized,

    /// The operation needs the engine to be torn down first
    #[error("capture engine is already initialized")]
    AlreadyInitialized,

    /// An allocation made by this library failed
    #[error("out of memory")]
    OutOfMemory,

    /// No capture engine exists for this build or platform
    #[error("capture engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Identifier outside `0..MAX_DEVICES` or unknown to the engine
    #[error("invalid device identifier {0}")]
    InvalidDevice(i32),

    /// Device has no active capture session
    #[error("device {0} is not initialized")]
    DeviceNotInitialized(DeviceId),

    /// Engine refused to set up the device
    #[error("failed to set up device {0}")]
    DeviceSetupFailed(DeviceId),

    /// Engine refused to restart the device
    #[error("failed to restart device {0}")]
    DeviceRestartFailed(DeviceId),

    /// Engine rejected the requested video format
    #[error("device {device} rejected video format {format}")]
    FormatRejected {
        /// Device the format was requested for
        device: DeviceId,
        /// Raw format value as passed by the caller
        format: i32,
    },

    /// Caller's pixel buffer cannot hold a frame
    #[error("pixel buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall {
        /// Bytes required by the current frame
        needed: usize,
        /// Bytes supplied by the caller
        actual: usize,
    },

    /// Engine could not deliver the current frame
    #[error("failed to read pixels from device {0}")]
    FrameGrabFailed(DeviceId),

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ViError {
    /// Stable numeric code reported through `VI_GetLastError`.
    pub fn code(&self) -> c_int {
        match self {
            ViError::NotInitialized => 1,
            ViError::AlreadyInitialized => 2,
            ViError::OutOfMemory => 3,
            ViError::EngineUnavailable(_) => 4,
            ViError::InvalidDevice(_) => 5,
            ViError::DeviceNotInitialized(_) => 6,
            ViError::DeviceSetupFailed(_) => 7,
            ViError::DeviceRestartFailed(_) => 8,
            ViError::FormatRejected { .. } => 9,
            ViError::BufferTooSmall { .. } => 10,
            ViError::FrameGrabFailed(_) => 11,
            ViError::InvalidParameter(_) => 12,
        }
    }
}

/// Result type for videoInput operations
pub type Result<T> = std::result::Result<T, ViError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let id = DeviceId::new(0).unwrap();
        let errors = [
            ViError::NotInitialized,
            ViError::AlreadyInitialized,
            ViError::OutOfMemory,
            ViError::EngineUnavailable(String::new()),
            ViError::InvalidDevice(20),
            ViError::DeviceNotInitialized(id),
            ViError::DeviceSetupFailed(id),
            ViError::DeviceRestartFailed(id),
            ViError::FormatRejected { device: id, format: 3 },
            ViError::BufferTooSmall { needed: 1, actual: 0 },
            ViError::FrameGrabFailed(id),
            ViError::InvalidParameter(String::new()),
        ];
        let mut codes: Vec<c_int> = errors.iter().map(ViError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn display_mentions_details() {
        let err = ViError::BufferTooSmall { needed: 921600, actual: 16 };
        let text = err.to_string();
        assert!(text.contains("921600"));
        assert!(text.contains("16"));
        assert_eq!(ViError::InvalidDevice(25).to_string(), "invalid device identifier 25");
    }
}
