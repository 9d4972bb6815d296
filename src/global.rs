//! The process-wide context behind the C API.

use crate::context::Context;
use crate::engine::Backend;
use crate::error::Result;
use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    // The lock only makes the static sound; call ordering stays with the caller.
    static ref CONTEXT: Mutex<Context> = Mutex::new(Context::default());
}

/// Run `f` on the process-wide context used by the `VI_*` functions.
pub fn with_global<R>(f: impl FnOnce(&mut Context) -> R) -> R {
    let mut ctx = CONTEXT.lock();
    f(&mut *ctx)
}

/// Replace the backend of the process-wide context.
///
/// Fails with `AlreadyInitialized` while `VI_Init` is in effect.
pub fn install_backend(backend: Box<dyn Backend>) -> Result<()> {
    with_global(|ctx| ctx.replace_backend(backend))
}
