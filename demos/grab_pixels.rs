//! Polls the first capture device and reads frames into a buffer.

use std::thread;
use std::time::Duration;
use video_input::{Context, DeviceSettings, PixelOptions, Result};

fn main() -> Result<()> {
    let mut ctx = Context::default();

    let count = ctx.enum_devices(true);
    if count == 0 {
        eprintln!("No capture devices found.");
        return Ok(());
    }

    ctx.init()?;
    ctx.set_reconnect_on_freeze(0, true, 60)?;
    ctx.setup_device(0, Some(&DeviceSettings::default().with_resolution(640, 480)))?;

    let geometry = ctx.frame_geometry(0);
    println!(
        "Device 0 ({}) capturing at {}x{}, {} bytes per frame",
        ctx.device_name(0)?.to_string_lossy(),
        geometry.width,
        geometry.height,
        geometry.buffer_size
    );

    let mut buffer = vec![0u8; geometry.buffer_size];
    let mut grabbed = 0;
    for _ in 0..100 {
        if !ctx.has_new_frame(0) {
            // Small delay between polls
            thread::sleep(Duration::from_millis(30));
            continue;
        }

        match ctx.get_pixels(0, &mut buffer, PixelOptions::default()) {
            Ok(()) => {
                grabbed += 1;
                let mean = buffer.iter().map(|&b| b as u64).sum::<u64>() / buffer.len().max(1) as u64;
                println!("Frame {}: mean byte value {}", grabbed, mean);
            }
            Err(e) => eprintln!("Error reading frame: {}", e),
        }
        if grabbed == 5 {
            break;
        }
    }

    ctx.stop_device(0)?;
    ctx.deinit();
    println!("Capture stopped.");

    Ok(())
}
