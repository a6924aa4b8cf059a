//! Configuration management for the check-in token provider
//!
//! This module handles loading and managing configuration settings
//! for both the HTTP server and the one-shot generator.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::Settings;
