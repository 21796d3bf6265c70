use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// `BRAILLE_DEBUG` set in the environment: keep per-cell traces
pub(crate) fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var_os("BRAILLE_DEBUG").is_some())
}
