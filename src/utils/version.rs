//! Version information

/// Crate version baked in at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version string reported by the server and the CLI
pub fn get_version() -> &'static str {
    VERSION
}
