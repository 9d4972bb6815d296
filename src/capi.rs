//! The C ABI, declared for C callers in `include/video_input.h`.
//!
//! Every function forwards to the process-wide [`Context`]. `VI_Init`,
//! `VI_InitDevice`, `VI_ReinitDevice` and `VI_SetFormat` return 0 on success,
//! predicates and `VI_GetPixels` return 1 for true. Calling a per-device
//! function before `VI_Init` fails like an unknown device instead of being
//! undefined.

#![allow(non_snake_case)]

use crate::context::Context;
use crate::error::{Result, ViError};
use crate::frame::PixelOptions;
use crate::global::with_global;
use crate::logging;
use crate::marshal::{copy_c_string, release_name_list, Allocator, CAllocator, NameList};
use crate::types::DeviceSettings;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar};
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

pub use crate::frame::{VI_NO_CHANNEL_SWAP, VI_VERTICAL_FLIP};
pub use crate::types::{DS_CONNECTION, DS_RESOLUTION};

/// `VI_GetLastError` before any failure.
pub const VI_ERROR_NONE: c_int = 0;
/// A per-device call was made before `VI_Init`.
pub const VI_ERROR_NOT_INITIALIZED: c_int = 1;
/// The engine is held elsewhere in the process.
pub const VI_ERROR_ALREADY_INITIALIZED: c_int = 2;
/// An allocation failed.
pub const VI_ERROR_OUT_OF_MEMORY: c_int = 3;
/// This build has no capture engine.
pub const VI_ERROR_ENGINE_UNAVAILABLE: c_int = 4;
/// Device identifier out of range or unknown.
pub const VI_ERROR_INVALID_DEVICE: c_int = 5;
/// The device has no capture session.
pub const VI_ERROR_DEVICE_NOT_INITIALIZED: c_int = 6;
/// `VI_InitDevice` was refused.
pub const VI_ERROR_DEVICE_SETUP_FAILED: c_int = 7;
/// `VI_ReinitDevice` was refused.
pub const VI_ERROR_DEVICE_RESTART_FAILED: c_int = 8;
/// `VI_SetFormat` was refused.
pub const VI_ERROR_FORMAT_REJECTED: c_int = 9;
/// The pixel buffer is shorter than `VI_GetBufferSize`.
pub const VI_ERROR_BUFFER_TOO_SMALL: c_int = 10;
/// The engine did not deliver a frame.
pub const VI_ERROR_FRAME_GRAB_FAILED: c_int = 11;
/// A required pointer was NULL.
pub const VI_ERROR_INVALID_PARAMETER: c_int = 12;

static LAST_ERROR: AtomicI32 = AtomicI32::new(VI_ERROR_NONE);

fn record(err: &ViError) {
    log::debug!("{}", err);
    LAST_ERROR.store(err.code(), Ordering::Relaxed);
}

/// 0 on success, 1 on failure.
fn status(result: Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => {
            record(&e);
            1
        }
    }
}

fn discard(result: Result<()>) {
    if let Err(e) = result {
        record(&e);
    }
}

fn to_c_int<T: TryInto<c_int>>(value: T) -> c_int {
    value.try_into().unwrap_or(c_int::MAX)
}

/// Controls whether the engine prints diagnostics to stdout. Needs no `VI_Init`.
#[no_mangle]
pub extern "C" fn VI_SetVerbose(verbose: c_int) {
    logging::init();
    with_global(|ctx| ctx.set_verbose(verbose != 0));
}

/// Selects the COM apartment model. Call before anything else touches COM.
#[no_mangle]
pub extern "C" fn VI_SetMultiThreadedCom(multi_threaded: c_int) {
    with_global(|ctx| ctx.set_com_multithreaded(multi_threaded != 0));
}

/// Rescans devices and returns their number. Needs no `VI_Init`.
#[no_mangle]
pub extern "C" fn VI_EnumDevices(verbose: c_int) -> c_int {
    with_global(|ctx| to_c_int(ctx.enum_devices(verbose != 0)))
}

pub(crate) unsafe fn device_names_into<A: Allocator>(
    ctx: &Context,
    num_devices: *mut c_int,
    allocator: A,
) -> *mut *mut c_char {
    let names = ctx.device_names();
    let bytes: Vec<&[u8]> = names.iter().map(|name| name.as_bytes()).collect();
    let (list, count) = match NameList::new(&bytes, allocator) {
        Ok(Some(list)) => list.into_raw(),
        Ok(None) => (ptr::null_mut(), 0),
        Err(e) => {
            log::warn!("failed to marshal {} device name(s): {}", names.len(), e);
            record(&e);
            if !num_devices.is_null() {
                *num_devices = -1;
            }
            return ptr::null_mut();
        }
    };
    if !num_devices.is_null() {
        *num_devices = to_c_int(count);
    }
    list
}

/// Returns the names of all devices, enumerating them first.
///
/// `*num_devices` (if not null) receives the count, 0 included, or -1 when
/// memory could not be allocated; NULL is returned in both of those cases.
/// Release the result with `free(names[0]); free(names);` or
/// `VI_FreeDeviceNames(names)`.
///
/// # Safety
///
/// `num_devices` is null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn VI_GetDeviceNames(num_devices: *mut c_int) -> *mut *mut c_char {
    with_global(|ctx| device_names_into(ctx, num_devices, CAllocator))
}

/// Releases a list returned by `VI_GetDeviceNames`. NULL is ignored.
///
/// # Safety
///
/// `names` is null or an unreleased result of `VI_GetDeviceNames`.
#[no_mangle]
pub unsafe extern "C" fn VI_FreeDeviceNames(names: *mut *mut c_char) {
    release_name_list(names, &CAllocator);
}

/// Returns a caller-owned copy of the name of `id` from the last
/// enumeration, byte for byte, or NULL for an unknown identifier or when
/// out of memory.
#[no_mangle]
pub extern "C" fn VI_GetDeviceName(id: c_int) -> *mut c_char {
    let name = match with_global(|ctx| ctx.device_name(id)) {
        Ok(name) => name,
        Err(e) => {
            record(&e);
            return ptr::null_mut();
        }
    };
    match copy_c_string(name.as_bytes(), &CAllocator) {
        Ok(copy) => copy.as_ptr(),
        Err(e) => {
            record(&e);
            ptr::null_mut()
        }
    }
}

/// Returns the identifier of the device whose name has exactly the bytes of
/// `name`, or -1.
///
/// # Safety
///
/// `name` is null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn VI_GetDeviceId(name: *const c_char) -> c_int {
    if name.is_null() {
        return -1;
    }
    let name = CStr::from_ptr(name).to_bytes();
    with_global(|ctx| ctx.device_id(name)).map_or(-1, |id| id.raw())
}

/// Creates the engine. Returns 0 on success or if already initialized.
/// On failure `VI_GetLastError` tells out-of-memory apart from other causes.
#[no_mangle]
pub extern "C" fn VI_Init() -> c_int {
    logging::init();
    status(with_global(Context::init))
}

/// Releases the engine. No effect if not initialized.
#[no_mangle]
pub extern "C" fn VI_Deinit() {
    with_global(Context::deinit);
}

/// Returns 1 while the engine exists.
#[no_mangle]
pub extern "C" fn VI_IsInit() -> c_int {
    with_global(|ctx| ctx.is_init()) as c_int
}

/// Code of the most recent failure (see `ViError::code`), 0 if none yet.
#[no_mangle]
pub extern "C" fn VI_GetLastError() -> c_int {
    LAST_ERROR.load(Ordering::Relaxed)
}

/// Chooses between callback-driven (blocking) and polled frame delivery.
#[no_mangle]
pub extern "C" fn VI_SetBlocking(blocking: c_int) {
    discard(with_global(|ctx| ctx.set_use_callback(blocking != 0)));
}

/// Requests a framerate for `id`; only affects later `VI_InitDevice` calls.
#[no_mangle]
pub extern "C" fn VI_SetFramerate(id: c_int, framerate: c_int) {
    discard(with_global(|ctx| ctx.set_framerate(id, framerate)));
}

/// Lets `VI_HasNewFrame` reinitialize `id` after `num_missed_frames`
/// unsuccessful checks.
#[no_mangle]
pub extern "C" fn VI_SetReconnectOnFreeze(id: c_int, reconnect: c_int, num_missed_frames: c_int) {
    discard(with_global(|ctx| {
        ctx.set_reconnect_on_freeze(id, reconnect != 0, num_missed_frames)
    }));
}

/// Starts capturing on `id`. NULL settings select the defaults.
/// Returns non-zero on failure, including when `id` is already initialized.
///
/// # Safety
///
/// `settings` is null or points to a valid `DEVICE_SETTINGS`.
#[no_mangle]
pub unsafe extern "C" fn VI_InitDevice(id: c_int, settings: *const DeviceSettings) -> c_int {
    let settings = settings.as_ref();
    status(with_global(|ctx| ctx.setup_device(id, settings)))
}

/// Stops capturing on `id`.
#[no_mangle]
pub extern "C" fn VI_DeinitDevice(id: c_int) {
    discard(with_global(|ctx| ctx.stop_device(id)));
}

/// Like `VI_InitDevice`, keeping the current configuration of `id`.
#[no_mangle]
pub extern "C" fn VI_ReinitDevice(id: c_int) -> c_int {
    status(with_global(|ctx| ctx.restart_device(id)))
}

/// Returns 1 if `id` is initialized for capture.
#[no_mangle]
pub extern "C" fn VI_IsDeviceInit(id: c_int) -> c_int {
    with_global(|ctx| ctx.is_device_setup(id)) as c_int
}

/// Selects the analog video standard of `id`. Returns 0 on success.
#[no_mangle]
pub extern "C" fn VI_SetFormat(id: c_int, format: c_int) -> c_int {
    status(with_global(|ctx| ctx.set_format(id, format)))
}

/// Selects the encoding requested by later `VI_InitDevice` calls.
#[no_mangle]
pub extern "C" fn VI_SetMediaSubType(sub_type: c_int) {
    discard(with_global(|ctx| ctx.set_media_subtype(sub_type)));
}

/// Returns 1 if `id` has a frame not yet read by `VI_GetPixels`.
#[no_mangle]
pub extern "C" fn VI_HasNewFrame(id: c_int) -> c_int {
    with_global(|ctx| ctx.has_new_frame(id)) as c_int
}

/// Opens the driver's configuration dialog. May have no effect.
#[no_mangle]
pub extern "C" fn VI_ShowSettingsWindow(id: c_int) {
    discard(with_global(|ctx| ctx.show_settings_window(id)));
}

/// Frame width of `id` in pixels, 0 if not initialized.
#[no_mangle]
pub extern "C" fn VI_GetFrameWidth(id: c_int) -> c_int {
    to_c_int(with_global(|ctx| ctx.frame_geometry(id)).width)
}

/// Frame height of `id` in pixels, 0 if not initialized.
#[no_mangle]
pub extern "C" fn VI_GetFrameHeight(id: c_int) -> c_int {
    to_c_int(with_global(|ctx| ctx.frame_geometry(id)).height)
}

/// Bytes `VI_GetPixels` writes for `id`, 0 if not initialized.
#[no_mangle]
pub extern "C" fn VI_GetBufferSize(id: c_int) -> c_int {
    to_c_int(with_global(|ctx| ctx.frame_geometry(id)).buffer_size)
}

/// Copies the current frame of `id` into `buffer`. Returns 1 on success.
///
/// `flags` combines `VI_NO_CHANNEL_SWAP` (keep the engine's channel order;
/// red and blue are swapped otherwise) and `VI_VERTICAL_FLIP`.
///
/// # Safety
///
/// `buffer` is valid for writes of `VI_GetBufferSize(id)` bytes.
#[no_mangle]
pub unsafe extern "C" fn VI_GetPixels(id: c_int, buffer: *mut c_uchar, flags: c_int) -> c_int {
    if buffer.is_null() {
        record(&ViError::InvalidParameter("null pixel buffer".to_string()));
        return 0;
    }
    let options = PixelOptions::from_flags(flags);
    let result = with_global(|ctx| {
        let size = ctx.frame_geometry(id).buffer_size;
        if size == 0 {
            // Let the context report why there is no frame.
            return ctx.get_pixels(id, &mut [], options);
        }
        ctx.get_pixels(id, std::slice::from_raw_parts_mut(buffer, size), options)
    });
    match result {
        Ok(()) => 1,
        Err(e) => {
            record(&e);
            0
        }
    }
}
