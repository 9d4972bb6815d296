use std::sync::Once;

static INIT: Once = Once::new();

/// Install the `RUST_LOG`-driven logger once. Without the `env_logger`
/// feature the embedding application is expected to install its own.
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "env_logger")]
        {
            let _ = env_logger::builder().format_timestamp(None).try_init();
        }
    });
}
