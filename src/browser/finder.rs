//! Chromium executable discovery

use std::path::{Path, PathBuf};

const UNIX_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "google-chrome",
    "headless_shell",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/snap/bin/chromium",
];

const MACOS_CANDIDATES: &[&str] = &[
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Locate a Chromium-family browser, preferring `configured` when given
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return resolve(&path.to_string_lossy());
    }

    let candidates = if cfg!(target_os = "macos") {
        MACOS_CANDIDATES
    } else {
        UNIX_CANDIDATES
    };

    candidates.iter().find_map(|candidate| resolve(candidate))
}

/// Absolute paths must exist; bare names are looked up on `PATH`
fn resolve(candidate: &str) -> Option<PathBuf> {
    if candidate.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(candidate);
        path.exists().then_some(path)
    } else {
        which::which(candidate).ok()
    }
}
