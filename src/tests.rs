use std::sync::Once;

static LOGGER: Once = Once::new();

/// Route `net_debug!`/`net_trace!` output of the code under test to stderr.
///
/// Set `RUST_LOG=trace` to see it.
pub(crate) fn setup() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
