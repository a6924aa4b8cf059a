//! Command-line entry points shared by the binaries

pub mod logging;
pub mod server;

pub use logging::init_tracing;
pub use server::{ServerArgs, run_server_mode};
