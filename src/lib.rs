//! # video_input - C API for the videoInput capture library
//!
//! Exposes webcam enumeration, per-device capture sessions and raw pixel
//! access as flat `VI_*` C functions (see `include/video_input.h`), and the
//! same operations to Rust through an injectable [`Context`].
//!
//! Capture itself is done by an engine behind the [`Backend`] and
//! [`CaptureEngine`] traits: videoInput on Windows, [`mock::MockBackend`] for
//! tests, or anything a Rust embedder installs with [`install_backend`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Low-level FFI bindings to the videoInput bridge
#[cfg(all(feature = "videoinput", target_os = "windows"))]
pub mod sys {
    #![allow(non_upper_case_globals)]
    #![allow(non_camel_case_types)]
    #![allow(non_snake_case)]
    #![allow(dead_code)]
    #![allow(missing_docs)]
    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
}

mod context;
mod engine;
mod error;
mod frame;
mod global;
mod logging;
mod marshal;
mod types;

#[cfg(all(feature = "videoinput", target_os = "windows"))]
mod native;

pub mod capi;
pub mod mock;

// Public re-exports
pub use context::Context;
pub use engine::{default_backend, Backend, CaptureEngine, UnavailableBackend};
pub use error::{Result, ViError};
pub use frame::*;
pub use global::{install_backend, with_global};
pub use marshal::{copy_c_string, release_name_list, Allocator, CAllocator, NameList};
pub use types::*;

#[cfg(all(feature = "videoinput", target_os = "windows"))]
pub use native::{VideoInputBackend, VideoInputEngine};
