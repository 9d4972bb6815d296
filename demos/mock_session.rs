//! Drives the C API against the in-memory engine, the way a C caller would.

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr;
use video_input::capi::*;
use video_input::mock::MockBackend;
use video_input::{install_backend, DeviceSettings, Result};

fn main() -> Result<()> {
    install_backend(Box::new(MockBackend::with_devices(&["Mock Cam A", "Mock Cam B"])))?;

    let mut count: c_int = 0;
    let names = unsafe { VI_GetDeviceNames(&mut count) };
    if names.is_null() {
        if count == -1 {
            eprintln!("ERROR: Failed to allocate memory.");
        }
        return Ok(());
    }
    for i in 0..count as usize {
        let name = unsafe { CStr::from_ptr(*names.add(i)) };
        println!("Device #{}: {}", i, name.to_string_lossy());
    }
    unsafe { VI_FreeDeviceNames(names) };

    if VI_Init() != 0 {
        eprintln!("ERROR: VI_Init failed with code {}", VI_GetLastError());
        return Ok(());
    }

    let settings = DeviceSettings::default().with_resolution(4, 2);
    if unsafe { VI_InitDevice(1, &settings) } != 0 {
        eprintln!("ERROR: VI_InitDevice failed with code {}", VI_GetLastError());
    } else {
        let size = VI_GetBufferSize(1) as usize;
        let mut pixels = vec![0u8; size];
        if VI_HasNewFrame(1) != 0 && unsafe { VI_GetPixels(1, pixels.as_mut_ptr(), VI_VERTICAL_FLIP) } != 0 {
            println!(
                "Read {}x{} frame: {:?}",
                VI_GetFrameWidth(1),
                VI_GetFrameHeight(1),
                pixels
            );
        }
        VI_DeinitDevice(1);
    }

    // Out-of-range identifiers are rejected, not undefined
    assert!(VI_GetDeviceName(25).is_null());
    assert_eq!(unsafe { VI_GetPixels(25, ptr::null_mut(), 0) }, 0);

    VI_Deinit();
    Ok(())
}
