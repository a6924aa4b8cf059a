//! Chromium driven over the DevTools protocol
//!
//! Implements the browser capability used by the login escalation: a
//! throwaway headless Chromium per login, automated through a websocket
//! DevTools connection.

pub mod cdp;
pub mod finder;
pub mod launcher;
pub mod session;

pub use cdp::{CdpConnection, CdpEvent};
pub use finder::find_chromium;
pub use launcher::{BrowserProcess, ChromiumLauncher};
pub use session::CdpSession;
