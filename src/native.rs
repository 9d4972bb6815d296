//! The videoInput engine, reached through the `vi_bridge` shim.

use crate::engine::{Backend, CaptureEngine};
use crate::error::{Result, ViError};
use crate::frame::PixelOptions;
use crate::sys;
use crate::types::DeviceId;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::sync::atomic::{AtomicBool, Ordering};

// Set while a `VideoInputEngine` exists anywhere in the process.
static ENGINE_LIVE: AtomicBool = AtomicBool::new(false);

/// Static side of videoInput: enumeration and process-wide flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoInputBackend;

unsafe extern "C" fn collect_name(ctx: *mut c_void, name: *const c_char) {
    let names = &mut *(ctx as *mut Vec<CString>);
    if !name.is_null() {
        names.push(CStr::from_ptr(name).to_owned());
    }
}

impl Backend for VideoInputBackend {
    fn set_verbose(&self, verbose: bool) {
        unsafe { sys::vi_bridge_set_verbose(verbose as i32) }
    }

    fn set_com_multithreaded(&self, multithreaded: bool) {
        unsafe { sys::vi_bridge_set_com_multithreaded(multithreaded as i32) }
    }

    fn list_devices(&self, silent: bool) -> usize {
        let count = unsafe { sys::vi_bridge_list_devices(silent as i32) };
        count.max(0) as usize
    }

    fn device_list(&self) -> Vec<CString> {
        let mut names: Vec<CString> = Vec::new();
        unsafe {
            sys::vi_bridge_device_list(Some(collect_name), &mut names as *mut Vec<CString> as *mut c_void);
        }
        names
    }

    fn device_name(&self, id: DeviceId) -> Option<CString> {
        let name = unsafe { sys::vi_bridge_device_name(id.raw()) };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_owned())
    }

    fn device_id_from_name(&self, name: &CStr) -> Option<DeviceId> {
        let id = unsafe { sys::vi_bridge_device_id(name.as_ptr()) };
        DeviceId::new(id).ok()
    }

    fn create_engine(&self) -> Result<Box<dyn CaptureEngine>> {
        if ENGINE_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ViError::AlreadyInitialized);
        }
        let handle = unsafe { sys::vi_bridge_create() };
        if handle.is_null() {
            ENGINE_LIVE.store(false, Ordering::Release);
            return Err(ViError::OutOfMemory);
        }
        Ok(Box::new(VideoInputEngine { handle }))
    }
}

/// An owned `videoInput` instance. Only one exists per process.
pub struct VideoInputEngine {
    handle: *mut sys::vi_engine,
}

// videoInput instances are not tied to the thread that created them.
unsafe impl Send for VideoInputEngine {}

impl CaptureEngine for VideoInputEngine {
    fn set_use_callback(&mut self, use_callback: bool) {
        unsafe { sys::vi_bridge_set_use_callback(self.handle, use_callback as i32) }
    }

    fn set_ideal_framerate(&mut self, id: DeviceId, fps: i32) {
        unsafe { sys::vi_bridge_set_ideal_framerate(self.handle, id.raw(), fps) }
    }

    fn set_auto_reconnect_on_freeze(&mut self, id: DeviceId, reconnect: bool, missed_frames: i32) {
        unsafe { sys::vi_bridge_set_auto_reconnect(self.handle, id.raw(), reconnect as i32, missed_frames) }
    }

    fn setup_device(&mut self, id: DeviceId) -> bool {
        unsafe { sys::vi_bridge_setup_device(self.handle, id.raw()) != 0 }
    }

    fn setup_device_with_size(&mut self, id: DeviceId, width: i32, height: i32) -> bool {
        unsafe { sys::vi_bridge_setup_device_size(self.handle, id.raw(), width, height) != 0 }
    }

    fn setup_device_with_connection(&mut self, id: DeviceId, connection: i32) -> bool {
        unsafe { sys::vi_bridge_setup_device_connection(self.handle, id.raw(), connection) != 0 }
    }

    fn setup_device_with_size_and_connection(
        &mut self,
        id: DeviceId,
        width: i32,
        height: i32,
        connection: i32,
    ) -> bool {
        unsafe {
            sys::vi_bridge_setup_device_size_connection(self.handle, id.raw(), width, height, connection) != 0
        }
    }

    fn stop_device(&mut self, id: DeviceId) {
        unsafe { sys::vi_bridge_stop_device(self.handle, id.raw()) }
    }

    fn restart_device(&mut self, id: DeviceId) -> bool {
        unsafe { sys::vi_bridge_restart_device(self.handle, id.raw()) != 0 }
    }

    fn is_device_setup(&self, id: DeviceId) -> bool {
        unsafe { sys::vi_bridge_is_device_setup(self.handle, id.raw()) != 0 }
    }

    fn set_format(&mut self, id: DeviceId, format: i32) -> bool {
        unsafe { sys::vi_bridge_set_format(self.handle, id.raw(), format) != 0 }
    }

    fn set_requested_media_subtype(&mut self, subtype: i32) {
        unsafe { sys::vi_bridge_set_media_subtype(self.handle, subtype) }
    }

    fn is_frame_new(&mut self, id: DeviceId) -> bool {
        unsafe { sys::vi_bridge_is_frame_new(self.handle, id.raw()) != 0 }
    }

    fn show_settings_window(&mut self, id: DeviceId) {
        unsafe { sys::vi_bridge_show_settings_window(self.handle, id.raw()) }
    }

    fn width(&self, id: DeviceId) -> u32 {
        unsafe { sys::vi_bridge_width(self.handle, id.raw()) }.max(0) as u32
    }

    fn height(&self, id: DeviceId) -> u32 {
        unsafe { sys::vi_bridge_height(self.handle, id.raw()) }.max(0) as u32
    }

    fn buffer_size(&self, id: DeviceId) -> usize {
        unsafe { sys::vi_bridge_size(self.handle, id.raw()) }.max(0) as usize
    }

    fn get_pixels(&mut self, id: DeviceId, buffer: &mut [u8], options: PixelOptions) -> bool {
        if buffer.len() < self.buffer_size(id) {
            return false;
        }
        unsafe {
            sys::vi_bridge_get_pixels(
                self.handle,
                id.raw(),
                buffer.as_mut_ptr(),
                options.swap_red_blue as i32,
                options.flip_vertical as i32,
            ) != 0
        }
    }
}

impl Drop for VideoInputEngine {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                sys::vi_bridge_destroy(self.handle);
            }
            self.handle = std::ptr::null_mut();
            ENGINE_LIVE.store(false, Ordering::Release);
        }
    }
}
