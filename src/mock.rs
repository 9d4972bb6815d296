//! In-memory capture engine for exercising callers without camera hardware.
//!
//! [`MockBackend`] behaves like the videoInput engine as far as this crate
//! can observe: names resolve from the most recent enumeration, a session
//! has to be set up before it delivers frames, and `get_pixels` honours the
//! channel swap and vertical flip options on a synthetic RGB24 frame.

use crate::engine::{Backend, CaptureEngine};
use crate::error::{Result, ViError};
use crate::frame::PixelOptions;
use crate::types::{DeviceId, SetupRequest, NUM_VIDEO_FORMATS};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::sync::Arc;

const DEFAULT_SIZE: (u32, u32) = (640, 480);

/// Calls recorded by [`MockEngine`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UseCallback(bool),
    Framerate { id: DeviceId, fps: i32 },
    ReconnectOnFreeze { id: DeviceId, reconnect: bool, missed_frames: i32 },
    Setup { id: DeviceId, request: SetupRequest },
    Stop(DeviceId),
    Restart(DeviceId),
    SetFormat { id: DeviceId, format: i32 },
    MediaSubtype(i32),
    ShowSettings(DeviceId),
    GetPixels { id: DeviceId, options: PixelOptions },
}

/// Name bytes up to the first NUL, as the engine would report them.
fn device_name_bytes(name: &[u8]) -> CString {
    let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
    CString::new(&name[..end]).unwrap_or_default()
}

/// Capture session of one mock device.
#[derive(Debug, Clone)]
pub struct MockSession {
    /// Setup entry point that created the session.
    pub request: SetupRequest,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// A frame is waiting to be read.
    pub frame_new: bool,
}

impl MockSession {
    fn new(request: SetupRequest) -> Self {
        let (width, height) = match request {
            SetupRequest::Resolution { width, height }
            | SetupRequest::ResolutionAndConnection { width, height, .. } => {
                (width.max(0) as u32, height.max(0) as u32)
            }
            _ => DEFAULT_SIZE,
        };
        MockSession {
            request,
            width,
            height,
            frame_new: true,
        }
    }

    /// Bytes in one RGB24 frame.
    pub fn buffer_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// The frame in engine order: byte `i` has value `i % 256`.
    pub fn native_frame(&self) -> Vec<u8> {
        (0..self.buffer_size()).map(|i| i as u8).collect()
    }
}

/// Everything the mock knows, shared between backend, engines and tests.
#[derive(Debug, Default)]
pub struct MockState {
    /// Devices currently "attached".
    pub devices: Vec<CString>,
    /// Snapshot taken by the last `list_devices`.
    pub enumerated: Vec<CString>,
    /// Last value passed to `set_verbose`.
    pub verbose: bool,
    /// Last value passed to `set_com_multithreaded`.
    pub com_multithreaded: bool,
    /// Next `create_engine` fails with this error.
    pub create_error: Option<ViError>,
    /// Setups fail while set.
    pub reject_setup: bool,
    /// Engines created so far.
    pub engines_created: usize,
    /// Engines not dropped yet. Never above 1.
    pub engines_live: usize,
    /// Live sessions by device.
    pub sessions: HashMap<DeviceId, MockSession>,
    /// Every engine call in order.
    pub calls: Vec<Call>,
}

/// Backend over a shared [`MockState`]. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Backend with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with `names` attached, in identifier order. Names are raw
    /// bytes and end at the first NUL.
    pub fn with_devices<S: AsRef<[u8]>>(names: &[S]) -> Self {
        let backend = Self::new();
        backend.state().devices = names.iter().map(|n| device_name_bytes(n.as_ref())).collect();
        backend
    }

    /// Lock the shared state for inspection or fault injection.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    /// Mark a fresh frame as available on `id`.
    pub fn push_frame(&self, id: DeviceId) {
        if let Some(session) = self.state().sessions.get_mut(&id) {
            session.frame_new = true;
        }
    }

    /// Snapshot of the recorded engine calls.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }
}

impl Backend for MockBackend {
    fn set_verbose(&self, verbose: bool) {
        self.state().verbose = verbose;
    }

    fn set_com_multithreaded(&self, multithreaded: bool) {
        self.state().com_multithreaded = multithreaded;
    }

    fn list_devices(&self, silent: bool) -> usize {
        let mut state = self.state();
        state.enumerated = state.devices.clone();
        if !silent {
            for (i, name) in state.enumerated.iter().enumerate() {
                log::info!("{}: {}", i, name.to_string_lossy());
            }
        }
        state.enumerated.len()
    }

    fn device_list(&self) -> Vec<CString> {
        let mut state = self.state();
        state.enumerated = state.devices.clone();
        state.enumerated.clone()
    }

    fn device_name(&self, id: DeviceId) -> Option<CString> {
        self.state().enumerated.get(id.index()).cloned()
    }

    fn device_id_from_name(&self, name: &CStr) -> Option<DeviceId> {
        let state = self.state();
        let index = state.devices.iter().position(|d| d.as_c_str() == name)?;
        DeviceId::new(index as i32).ok()
    }

    fn create_engine(&self) -> Result<Box<dyn CaptureEngine>> {
        let mut state = self.state();
        if state.engines_live > 0 {
            return Err(ViError::AlreadyInitialized);
        }
        if let Some(err) = state.create_error.take() {
            return Err(err);
        }
        state.engines_created += 1;
        state.engines_live += 1;
        Ok(Box::new(MockEngine {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Engine instance created by [`MockBackend`].
#[derive(Debug)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    fn setup(&mut self, id: DeviceId, request: SetupRequest) -> bool {
        let mut state = self.state.lock();
        state.calls.push(Call::Setup { id, request });
        let attached = id.index() < state.devices.len();
        if state.reject_setup || !attached || state.sessions.contains_key(&id) {
            return false;
        }
        state.sessions.insert(id, MockSession::new(request));
        true
    }

    fn session<R>(&self, id: DeviceId, f: impl FnOnce(&MockSession) -> R) -> Option<R> {
        self.state.lock().sessions.get(&id).map(f)
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.engines_live -= 1;
        state.sessions.clear();
    }
}

impl CaptureEngine for MockEngine {
    fn set_use_callback(&mut self, use_callback: bool) {
        self.state.lock().calls.push(Call::UseCallback(use_callback));
    }

    fn set_ideal_framerate(&mut self, id: DeviceId, fps: i32) {
        self.state.lock().calls.push(Call::Framerate { id, fps });
    }

    fn set_auto_reconnect_on_freeze(&mut self, id: DeviceId, reconnect: bool, missed_frames: i32) {
        self.state.lock().calls.push(Call::ReconnectOnFreeze {
            id,
            reconnect,
            missed_frames,
        });
    }

    fn setup_device(&mut self, id: DeviceId) -> bool {
        self.setup(id, SetupRequest::Default)
    }

    fn setup_device_with_size(&mut self, id: DeviceId, width: i32, height: i32) -> bool {
        self.setup(id, SetupRequest::Resolution { width, height })
    }

    fn setup_device_with_connection(&mut self, id: DeviceId, connection: i32) -> bool {
        self.setup(id, SetupRequest::Connection(connection))
    }

    fn setup_device_with_size_and_connection(
        &mut self,
        id: DeviceId,
        width: i32,
        height: i32,
        connection: i32,
    ) -> bool {
        self.setup(
            id,
            SetupRequest::ResolutionAndConnection {
                width,
                height,
                connection,
            },
        )
    }

    fn stop_device(&mut self, id: DeviceId) {
        let mut state = self.state.lock();
        state.calls.push(Call::Stop(id));
        state.sessions.remove(&id);
    }

    fn restart_device(&mut self, id: DeviceId) -> bool {
        let mut state = self.state.lock();
        state.calls.push(Call::Restart(id));
        match state.sessions.get_mut(&id) {
            Some(session) => {
                *session = MockSession::new(session.request);
                true
            }
            None => false,
        }
    }

    fn is_device_setup(&self, id: DeviceId) -> bool {
        self.session(id, |_| ()).is_some()
    }

    fn set_format(&mut self, id: DeviceId, format: i32) -> bool {
        let mut state = self.state.lock();
        state.calls.push(Call::SetFormat { id, format });
        (0..NUM_VIDEO_FORMATS as i32).contains(&format)
    }

    fn set_requested_media_subtype(&mut self, subtype: i32) {
        self.state.lock().calls.push(Call::MediaSubtype(subtype));
    }

    fn is_frame_new(&mut self, id: DeviceId) -> bool {
        self.session(id, |s| s.frame_new).unwrap_or(false)
    }

    fn show_settings_window(&mut self, id: DeviceId) {
        self.state.lock().calls.push(Call::ShowSettings(id));
    }

    fn width(&self, id: DeviceId) -> u32 {
        self.session(id, |s| s.width).unwrap_or(0)
    }

    fn height(&self, id: DeviceId) -> u32 {
        self.session(id, |s| s.height).unwrap_or(0)
    }

    fn buffer_size(&self, id: DeviceId) -> usize {
        self.session(id, MockSession::buffer_size).unwrap_or(0)
    }

    fn get_pixels(&mut self, id: DeviceId, buffer: &mut [u8], options: PixelOptions) -> bool {
        let mut state = self.state.lock();
        state.calls.push(Call::GetPixels { id, options });
        let Some(session) = state.sessions.get_mut(&id) else {
            return false;
        };
        let size = session.buffer_size();
        if buffer.len() < size {
            return false;
        }

        let frame = session.native_frame();
        let row = session.width as usize * 3;
        let rows = session.height as usize;
        for y in 0..rows {
            let src_row = if options.flip_vertical { rows - 1 - y } else { y };
            let src = &frame[src_row * row..(src_row + 1) * row];
            let dst = &mut buffer[y * row..(y + 1) * row];
            dst.copy_from_slice(src);
            if options.swap_red_blue {
                for px in dst.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
            }
        }
        session.frame_new = false;
        true
    }
}
