//! Injectable handle to the capture engine.
//!
//! A [`Context`] pairs a [`Backend`] with at most one live engine instance.
//! The C API drives a single process-wide context; Rust callers can own
//! theirs and pass it around explicitly.

use crate::engine::{default_backend, Backend, CaptureEngine};
use crate::error::{Result, ViError};
use crate::frame::{FrameGeometry, PixelOptions};
use crate::types::{DeviceId, DeviceSettings, SetupRequest};
use std::ffi::CString;

/// A backend and the engine instance created from it, if any.
///
/// Only one engine per backend can be alive, so a second context over the
/// same backend fails to [`init`](Context::init) until the first lets go.
pub struct Context {
    backend: Box<dyn Backend>,
    engine: Option<Box<dyn CaptureEngine>>,
}

impl Default for Context {
    fn default() -> Self {
        Context::new(default_backend())
    }
}

impl Context {
    /// Create a context over `backend`. No engine exists until [`Context::init`].
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Context {
            backend,
            engine: None,
        }
    }

    /// Swap the backend. Only allowed while no engine is live.
    pub fn replace_backend(&mut self, backend: Box<dyn Backend>) -> Result<()> {
        if self.is_init() {
            return Err(ViError::AlreadyInitialized);
        }
        self.backend = backend;
        Ok(())
    }

    /// Toggle the engine's diagnostic output. Needs no engine.
    pub fn set_verbose(&self, verbose: bool) {
        self.backend.set_verbose(verbose);
    }

    /// Select the COM apartment model for device access.
    ///
    /// The engine only honours this before its first use.
    pub fn set_com_multithreaded(&self, multithreaded: bool) {
        if self.is_init() {
            log::warn!("COM threading mode changed after the engine was created, it has no effect");
        }
        self.backend.set_com_multithreaded(multithreaded);
    }

    /// Create the engine. Succeeds without side effects if it already exists.
    ///
    /// Fails with `AlreadyInitialized` while another context holds the
    /// backend's engine.
    pub fn init(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let engine = self.backend.create_engine().map_err(|e| {
            log::error!("failed to create capture engine: {}", e);
            e
        })?;
        self.engine = Some(engine);
        log::debug!("capture engine created");
        Ok(())
    }

    /// Drop the engine and every session it owns. No-op if not initialized.
    pub fn deinit(&mut self) {
        if self.engine.take().is_some() {
            log::debug!("capture engine released");
        }
    }

    /// Whether this context holds an engine.
    pub fn is_init(&self) -> bool {
        self.engine.is_some()
    }

    /// Rescan devices and return how many were found.
    pub fn enum_devices(&self, verbose: bool) -> usize {
        let count = self.backend.list_devices(!verbose);
        log::debug!("enumerated {} device(s)", count);
        count
    }

    /// Rescan devices and return their names in identifier order, as the
    /// engine reported them.
    pub fn device_names(&self) -> Vec<CString> {
        self.backend.device_list()
    }

    /// Name of `id` from the most recent enumeration.
    pub fn device_name(&self, id: i32) -> Result<CString> {
        let id = DeviceId::new(id)?;
        self.backend
            .device_name(id)
            .ok_or_else(|| ViError::InvalidDevice(id.raw()))
    }

    /// Identifier of the device whose name is exactly `name`; needs no
    /// prior enumeration.
    pub fn device_id(&self, name: &[u8]) -> Option<DeviceId> {
        // No device name contains a NUL.
        let name = CString::new(name).ok()?;
        self.backend.device_id_from_name(&name)
    }

    fn engine(&self) -> Result<&(dyn CaptureEngine + 'static)> {
        self.engine.as_deref().ok_or(ViError::NotInitialized)
    }

    fn engine_mut(&mut self) -> Result<&mut (dyn CaptureEngine + 'static)> {
        self.engine.as_deref_mut().ok_or(ViError::NotInitialized)
    }

    /// Choose between callback-driven and polled frame delivery.
    pub fn set_use_callback(&mut self, use_callback: bool) -> Result<()> {
        self.engine_mut()?.set_use_callback(use_callback);
        Ok(())
    }

    /// Request a framerate; takes effect on the next setup of `id`.
    pub fn set_framerate(&mut self, id: i32, fps: i32) -> Result<()> {
        let id = DeviceId::new(id)?;
        self.engine_mut()?.set_ideal_framerate(id, fps);
        Ok(())
    }

    /// Restart `id` automatically after `missed_frames` unsuccessful
    /// [`Context::has_new_frame`] polls.
    pub fn set_reconnect_on_freeze(&mut self, id: i32, reconnect: bool, missed_frames: i32) -> Result<()> {
        let id = DeviceId::new(id)?;
        self.engine_mut()?
            .set_auto_reconnect_on_freeze(id, reconnect, missed_frames);
        Ok(())
    }

    /// Start capturing on `id`. `None` selects the device defaults.
    pub fn setup_device(&mut self, id: i32, settings: Option<&DeviceSettings>) -> Result<()> {
        let id = DeviceId::new(id)?;
        let request = SetupRequest::from_settings(settings);
        let engine = self.engine_mut()?;

        let ok = match request {
            SetupRequest::Default => engine.setup_device(id),
            SetupRequest::Resolution { width, height } => engine.setup_device_with_size(id, width, height),
            SetupRequest::Connection(connection) => engine.setup_device_with_connection(id, connection),
            SetupRequest::ResolutionAndConnection {
                width,
                height,
                connection,
            } => engine.setup_device_with_size_and_connection(id, width, height, connection),
        };

        if !ok {
            return Err(ViError::DeviceSetupFailed(id));
        }
        log::debug!("device {} set up with {:?}", id, request);
        Ok(())
    }

    /// Tear down the capture session of `id`.
    pub fn stop_device(&mut self, id: i32) -> Result<()> {
        let id = DeviceId::new(id)?;
        self.engine_mut()?.stop_device(id);
        log::debug!("device {} stopped", id);
        Ok(())
    }

    /// Restart `id` keeping the configuration of its last setup.
    pub fn restart_device(&mut self, id: i32) -> Result<()> {
        let id = DeviceId::new(id)?;
        if self.engine_mut()?.restart_device(id) {
            Ok(())
        } else {
            Err(ViError::DeviceRestartFailed(id))
        }
    }

    /// False for unknown identifiers and before init.
    pub fn is_device_setup(&self, id: i32) -> bool {
        let Ok(id) = DeviceId::new(id) else {
            return false;
        };
        self.engine().map_or(false, |e| e.is_device_setup(id))
    }

    /// Select the analog video standard of `id`.
    pub fn set_format(&mut self, id: i32, format: i32) -> Result<()> {
        let device = DeviceId::new(id)?;
        if self.engine_mut()?.set_format(device, format) {
            Ok(())
        } else {
            Err(ViError::FormatRejected { device, format })
        }
    }

    /// Select the output encoding requested from subsequently set up devices.
    pub fn set_media_subtype(&mut self, subtype: i32) -> Result<()> {
        self.engine_mut()?.set_requested_media_subtype(subtype);
        Ok(())
    }

    /// Poll `id` for a frame not yet read with [`Context::get_pixels`].
    pub fn has_new_frame(&mut self, id: i32) -> bool {
        let Ok(id) = DeviceId::new(id) else {
            return false;
        };
        self.engine_mut().map_or(false, |e| e.is_frame_new(id))
    }

    /// Open the driver's configuration dialog, if the driver offers one.
    pub fn show_settings_window(&mut self, id: i32) -> Result<()> {
        let id = DeviceId::new(id)?;
        self.engine_mut()?.show_settings_window(id);
        Ok(())
    }

    /// Frame size of `id`; all zero when unavailable.
    pub fn frame_geometry(&self, id: i32) -> FrameGeometry {
        let (Ok(id), Ok(engine)) = (DeviceId::new(id), self.engine()) else {
            return FrameGeometry::default();
        };
        FrameGeometry {
            width: engine.width(id),
            height: engine.height(id),
            buffer_size: engine.buffer_size(id),
        }
    }

    /// Copy the current frame of `id` into `buffer`.
    pub fn get_pixels(&mut self, id: i32, buffer: &mut [u8], options: PixelOptions) -> Result<()> {
        let id = DeviceId::new(id)?;
        let engine = self.engine_mut()?;

        let needed = engine.buffer_size(id);
        if needed == 0 {
            return Err(ViError::DeviceNotInitialized(id));
        }
        if buffer.len() < needed {
            return Err(ViError::BufferTooSmall {
                needed,
                actual: buffer.len(),
            });
        }

        if engine.get_pixels(id, &mut buffer[..needed], options) {
            Ok(())
        } else {
            Err(ViError::FrameGrabFailed(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockBackend};
    use crate::types::DS_RESOLUTION;

    fn context(names: &[&str]) -> (Context, MockBackend) {
        let backend = MockBackend::with_devices(names);
        (Context::new(Box::new(backend.clone())), backend)
    }

    #[test]
    fn init_is_idempotent() {
        let (mut ctx, mock) = context(&["Cam A"]);
        ctx.init().unwrap();
        ctx.init().unwrap();
        assert!(ctx.is_init());
        assert_eq!(mock.state().engines_created, 1);
        assert_eq!(mock.state().engines_live, 1);

        ctx.deinit();
        assert!(!ctx.is_init());
        assert_eq!(mock.state().engines_live, 0);
    }

    #[test]
    fn deinit_without_init() {
        let (mut ctx, mock) = context(&[]);
        ctx.deinit();
        ctx.deinit();
        assert!(!ctx.is_init());
        assert_eq!(mock.state().engines_created, 0);
    }

    #[test]
    fn init_failure_is_reported() {
        let (mut ctx, mock) = context(&[]);
        mock.state().create_error = Some(ViError::OutOfMemory);
        assert_eq!(ctx.init(), Err(ViError::OutOfMemory));
        assert!(!ctx.is_init());
        ctx.init().unwrap();
    }

    #[test]
    fn device_ops_before_init() {
        let (mut ctx, _mock) = context(&["Cam A"]);
        assert_eq!(ctx.setup_device(0, None), Err(ViError::NotInitialized));
        assert_eq!(ctx.restart_device(0), Err(ViError::NotInitialized));
        assert!(!ctx.is_device_setup(0));
        assert!(!ctx.has_new_frame(0));
        assert_eq!(ctx.frame_geometry(0), FrameGeometry::default());
        let mut buf = [0u8; 4];
        assert_eq!(ctx.get_pixels(0, &mut buf, PixelOptions::default()), Err(ViError::NotInitialized));
    }

    #[test]
    fn one_engine_across_contexts() {
        let (mut first, mock) = context(&["Cam A"]);
        let mut second = Context::new(Box::new(mock.clone()));
        first.init().unwrap();
        assert_eq!(second.init(), Err(ViError::AlreadyInitialized));
        assert!(!second.is_init());
        assert_eq!(mock.state().engines_live, 1);

        first.deinit();
        second.init().unwrap();
        assert_eq!(mock.state().engines_created, 2);
    }

    #[test]
    fn names_are_bytes() {
        let backend = MockBackend::with_devices(&[&b"Cam\xE9ra"[..]]);
        let ctx = Context::new(Box::new(backend));
        assert_eq!(ctx.device_names()[0].as_bytes(), b"Cam\xE9ra");
        ctx.enum_devices(false);
        assert_eq!(ctx.device_name(0).unwrap().as_bytes(), b"Cam\xE9ra");
        assert_eq!(ctx.device_id(b"Cam\xE9ra"), DeviceId::new(0).ok());
        assert_eq!(ctx.device_id(b"Cam\xE9ra\0"), None);
    }

    #[test]
    fn device_name_range() {
        let (ctx, _mock) = context(&["Cam A"]);
        ctx.enum_devices(false);
        assert_eq!(ctx.device_name(0).unwrap().as_bytes(), b"Cam A");
        assert_eq!(ctx.device_name(1), Err(ViError::InvalidDevice(1)));
        assert_eq!(ctx.device_name(20), Err(ViError::InvalidDevice(20)));
        assert_eq!(ctx.device_name(-3), Err(ViError::InvalidDevice(-3)));
    }

    #[test]
    fn setup_dispatches_on_flags() {
        let (mut ctx, mock) = context(&["Cam A", "Cam B"]);
        ctx.init().unwrap();
        let settings = DeviceSettings {
            flags: DS_RESOLUTION,
            width: 320,
            height: 240,
            connection: 2,
        };
        ctx.setup_device(1, Some(&settings)).unwrap();
        assert_eq!(
            mock.calls(),
            vec![Call::Setup {
                id: DeviceId::new(1).unwrap(),
                request: SetupRequest::Resolution { width: 320, height: 240 },
            }]
        );
        let geometry = ctx.frame_geometry(1);
        assert_eq!((geometry.width, geometry.height, geometry.buffer_size), (320, 240, 320 * 240 * 3));
        assert_eq!(ctx.setup_device(1, None), Err(ViError::DeviceSetupFailed(DeviceId::new(1).unwrap())));
    }

    #[test]
    fn pixel_buffer_must_fit() {
        let (mut ctx, _mock) = context(&["Cam A"]);
        ctx.init().unwrap();
        let settings = DeviceSettings::default().with_resolution(4, 2);
        ctx.setup_device(0, Some(&settings)).unwrap();

        let mut small = vec![0u8; 23];
        assert_eq!(
            ctx.get_pixels(0, &mut small, PixelOptions::default()),
            Err(ViError::BufferTooSmall { needed: 24, actual: 23 })
        );
        let mut exact = vec![0u8; 24];
        ctx.get_pixels(0, &mut exact, PixelOptions::default()).unwrap();
        assert!(!ctx.has_new_frame(0));
    }

    #[test]
    fn stopped_device_has_no_frames() {
        let (mut ctx, _mock) = context(&["Cam A"]);
        ctx.init().unwrap();
        ctx.setup_device(0, None).unwrap();
        assert!(ctx.is_device_setup(0));
        assert!(ctx.has_new_frame(0));
        ctx.stop_device(0).unwrap();
        assert!(!ctx.is_device_setup(0));
        assert!(ctx.frame_geometry(0).is_empty());
        let mut buf = vec![0u8; 16];
        assert_eq!(
            ctx.get_pixels(0, &mut buf, PixelOptions::default()),
            Err(ViError::DeviceNotInitialized(DeviceId::new(0).unwrap()))
        );
    }

    #[test]
    fn backend_is_fixed_while_live() {
        let (mut ctx, _mock) = context(&[]);
        ctx.init().unwrap();
        assert_eq!(
            ctx.replace_backend(Box::new(MockBackend::new())),
            Err(ViError::AlreadyInitialized)
        );
        ctx.deinit();
        ctx.replace_backend(Box::new(MockBackend::new())).unwrap();
    }

    #[test]
    fn format_rejection_carries_values() {
        let (mut ctx, _mock) = context(&["Cam A"]);
        ctx.init().unwrap();
        ctx.set_format(0, 3).unwrap();
        assert_eq!(
            ctx.set_format(0, 99),
            Err(ViError::FormatRejected { device: DeviceId::new(0).unwrap(), format: 99 })
        );
    }
}
