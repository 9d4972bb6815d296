use std::env;
use std::path::{Path, PathBuf};

fn looks_like_videoinput_root(dir: &Path) -> bool {
    dir.join("videoInput.h").exists() && dir.join("videoInput.cpp").exists()
}

fn find_videoinput_root_from(start: &Path) -> Option<PathBuf> {
    // Walk up a reasonable number of parents looking for a videoInput checkout,
    // which keeps the sources under libs/videoInput.
    let mut cur = Some(start);
    for _ in 0..16 {
        let dir = cur?;
        let candidate = dir.join("libs").join("videoInput");
        if looks_like_videoinput_root(&candidate) {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=VIDEOINPUT_SOURCE_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let build_engine = env::var("CARGO_FEATURE_VIDEOINPUT").is_ok();

    // videoInput is DirectShow-based; other targets get the unavailable backend.
    if !build_engine || target_os != "windows" {
        return;
    }

    let manifest_path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Locate videoInput sources, in order:
    // 1) vendored ./native/videoInput
    // 2) VIDEOINPUT_SOURCE_DIR
    // 3) a parent directory containing libs/videoInput
    let vendored = manifest_path.join("native").join("videoInput");
    let vi_root = if looks_like_videoinput_root(&vendored) {
        vendored
    } else if let Ok(root) = env::var("VIDEOINPUT_SOURCE_DIR") {
        let root = PathBuf::from(root);
        if !looks_like_videoinput_root(&root) {
            panic!(
                "VIDEOINPUT_SOURCE_DIR is set but does not contain videoInput.h and videoInput.cpp: {}",
                root.display()
            );
        }
        root
    } else if let Some(root) = find_videoinput_root_from(&manifest_path) {
        root
    } else {
        panic!(
            "the videoinput feature is enabled, but the videoInput sources were not found.\n\
\n\
Tried (in order):\n\
  - ./native/videoInput (vendored) under the crate root\n\
  - VIDEOINPUT_SOURCE_DIR environment variable\n\
  - searching parent directories for libs/videoInput\n\
\n\
Vendor the sources into native/videoInput, set VIDEOINPUT_SOURCE_DIR, or build with --no-default-features."
        );
    };

    let bridge_dir = manifest_path.join("native");

    cc::Build::new()
        .cpp(true)
        .file(vi_root.join("videoInput.cpp"))
        .file(bridge_dir.join("vi_bridge.cpp"))
        .include(&vi_root)
        .include(&bridge_dir)
        .define("_CRT_SECURE_NO_WARNINGS", None)
        .warnings(false)
        .compile("videoinput");

    for lib in ["ole32", "oleaut32", "strmiids", "uuid"] {
        println!("cargo:rustc-link-lib={}", lib);
    }

    println!("cargo:rerun-if-changed={}", bridge_dir.join("vi_bridge.h").display());
    println!("cargo:rerun-if-changed={}", bridge_dir.join("vi_bridge.cpp").display());
    println!("cargo:rerun-if-changed={}", vi_root.join("videoInput.h").display());

    let bindings = bindgen::Builder::default()
        .header(bridge_dir.join("vi_bridge.h").to_string_lossy())
        .parse_callbacks(Box::new(bindgen::CargoCallbacks))
        .allowlist_function("vi_bridge_.*")
        .allowlist_type("vi_.*")
        .derive_debug(true)
        .generate()
        .expect("Unable to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}
