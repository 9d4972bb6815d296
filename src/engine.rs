//! The seam between the C API and the capture engine doing the real work.
//!
//! A [`Backend`] answers the questions that need no engine instance (device
//! enumeration, process-wide flags) and creates [`CaptureEngine`]s. The engine
//! owns every device session; this crate never tracks session state itself.

use crate::error::{Result, ViError};
use crate::frame::PixelOptions;
use crate::types::DeviceId;
use std::ffi::{CStr, CString};

/// Device directory and engine factory.
///
/// Device names are the engine's bytes, not necessarily UTF-8.
pub trait Backend: Send {
    /// Toggle the engine's diagnostic output on stdout.
    fn set_verbose(&self, verbose: bool);

    /// Select the COM apartment model. Only effective before first engine use.
    fn set_com_multithreaded(&self, multithreaded: bool);

    /// Rescan attached devices and return how many were found.
    fn list_devices(&self, silent: bool) -> usize;

    /// Rescan attached devices and return their names in identifier order.
    fn device_list(&self) -> Vec<CString>;

    /// Name of `id` from the most recent scan.
    fn device_name(&self, id: DeviceId) -> Option<CString>;

    /// Identifier of the device called `name`.
    fn device_id_from_name(&self, name: &CStr) -> Option<DeviceId>;

    /// Create the engine instance.
    ///
    /// At most one engine per backend is alive at a time; while one is, this
    /// fails with `AlreadyInitialized`.
    fn create_engine(&self) -> Result<Box<dyn CaptureEngine>>;
}

/// Per-device capture sessions.
///
/// The `bool` returns are the engine's own success flags; `Context` turns them
/// into `ViError`s.
pub trait CaptureEngine: Send {
    /// Deliver frames through the graph callback instead of polling.
    fn set_use_callback(&mut self, use_callback: bool);

    /// Framerate requested by the next setup of `id`.
    fn set_ideal_framerate(&mut self, id: DeviceId, fps: i32);

    /// Restart `id` after `missed_frames` polls without a new frame.
    fn set_auto_reconnect_on_freeze(&mut self, id: DeviceId, reconnect: bool, missed_frames: i32);

    /// Set up `id` with the device defaults.
    fn setup_device(&mut self, id: DeviceId) -> bool;

    /// Set up `id` asking for a frame size.
    fn setup_device_with_size(&mut self, id: DeviceId, width: i32, height: i32) -> bool;

    /// Set up `id` on a physical connection.
    fn setup_device_with_connection(&mut self, id: DeviceId, connection: i32) -> bool;

    /// Set up `id` with both a frame size and a connection.
    fn setup_device_with_size_and_connection(
        &mut self,
        id: DeviceId,
        width: i32,
        height: i32,
        connection: i32,
    ) -> bool;

    /// Tear down the session of `id`, if any.
    fn stop_device(&mut self, id: DeviceId);

    /// Restart with the configuration of the last successful setup.
    fn restart_device(&mut self, id: DeviceId) -> bool;

    /// Whether `id` has a live session.
    fn is_device_setup(&self, id: DeviceId) -> bool;

    /// Select the analog video standard of `id`.
    fn set_format(&mut self, id: DeviceId, format: i32) -> bool;

    /// Encoding requested from devices set up afterwards.
    fn set_requested_media_subtype(&mut self, subtype: i32);

    /// Polls for a new frame. Also drives the engine's freeze detection, hence `&mut`.
    fn is_frame_new(&mut self, id: DeviceId) -> bool;

    /// Open the driver's property page for `id`.
    fn show_settings_window(&mut self, id: DeviceId);

    /// Frame width of `id`, 0 without a session.
    fn width(&self, id: DeviceId) -> u32;

    /// Frame height of `id`, 0 without a session.
    fn height(&self, id: DeviceId) -> u32;

    /// Bytes in one frame of `id`, 0 without a session.
    fn buffer_size(&self, id: DeviceId) -> usize;

    /// Copy the current frame into `buffer`, which holds at least
    /// `buffer_size(id)` bytes.
    fn get_pixels(&mut self, id: DeviceId, buffer: &mut [u8], options: PixelOptions) -> bool;
}

/// Backend used when no capture engine is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl UnavailableBackend {
    const REASON: &'static str = "videoInput is only built for Windows targets with the `videoinput` feature";
}

impl Backend for UnavailableBackend {
    fn set_verbose(&self, _verbose: bool) {}

    fn set_com_multithreaded(&self, _multithreaded: bool) {}

    fn list_devices(&self, silent: bool) -> usize {
        if !silent {
            log::info!("no capture devices: {}", Self::REASON);
        }
        0
    }

    fn device_list(&self) -> Vec<CString> {
        Vec::new()
    }

    fn device_name(&self, _id: DeviceId) -> Option<CString> {
        None
    }

    fn device_id_from_name(&self, _name: &CStr) -> Option<DeviceId> {
        None
    }

    fn create_engine(&self) -> Result<Box<dyn CaptureEngine>> {
        Err(ViError::EngineUnavailable(Self::REASON.to_string()))
    }
}

/// The engine this build talks to by default.
pub fn default_backend() -> Box<dyn Backend> {
    #[cfg(all(feature = "videoinput", target_os = "windows"))]
    {
        Box::new(crate::native::VideoInputBackend)
    }

    #[cfg(not(all(feature = "videoinput", target_os = "windows")))]
    {
        Box::new(UnavailableBackend)
    }
}
