pub mod comparator;
pub mod compare;
pub mod config;
pub mod output;
pub mod runner;
pub mod verifier;
pub mod walker;

/// Returns `true` when `EVERIFY_DEBUG` is set; gates `[everify]` trace lines on stderr.
pub fn debug_enabled() -> bool {
    std::env::var_os("EVERIFY_DEBUG").is_some()
}
