//! HTTP server
//!
//! Routes, handlers and the listening socket of the token API.

pub mod app;
pub mod handlers;
pub mod listener;

pub use app::{AppState, create_app};
pub use listener::{BindAddress, serve};
