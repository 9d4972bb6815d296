//! Basic device enumeration example
//!
//! Lists the capture devices the default engine can see.

use video_input::{Context, Result};

fn main() -> Result<()> {
    println!("videoInput C API - Device Discovery Example");
    println!("===========================================");

    let ctx = Context::default();

    println!("Discovering capture devices...");
    let names = ctx.device_names();
    if names.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Found {} capture device(s):", names.len());
    for (index, name) in names.iter().enumerate() {
        println!("  [{}] {}", index, name.to_string_lossy());
    }

    // Reverse lookup works without a prior enumeration
    if let Some(id) = ctx.device_id(names[0].as_bytes()) {
        println!();
        println!("'{}' has identifier {}", names[0].to_string_lossy(), id);
    }

    Ok(())
}
