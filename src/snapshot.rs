//! Snapshot driver interface
//!
//! The façade only needs "load this URL and give me a PNG of the map", so
//! browsers plug in behind the [`Snapshotter`] trait. The CDP backend lives in
//! [`crate::cdp`].

use std::path::PathBuf;

use crate::{scene, Result, Viewport};

/// How the driver decides the map has finished drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Poll the page's readiness flag until it is set or `timeout_ms` elapses
    ReadySignal { timeout_ms: u64 },
    /// Sleep for a fixed time after navigation
    FixedDelay { ms: u64 },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::ReadySignal { timeout_ms: 10_000 }
    }
}

/// Configuration for the snapshot driver
///
/// ```
/// let cfg = routeshot::SnapshotConfig::default();
/// assert_eq!(cfg.map_selector, "#map");
/// assert!(!cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Browser window size; should match the map container
    pub viewport: Viewport,
    /// CSS selector of the element to capture
    pub map_selector: String,
    /// Readiness detection
    pub wait: WaitStrategy,
    /// Timeout for navigation and element lookup in milliseconds
    pub navigation_timeout_ms: u64,
    /// Run Chrome with its sandbox enabled (fails when running as root)
    pub sandbox: bool,
    /// Explicit Chrome binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Forward page console messages to the log
    pub forward_console: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            map_selector: format!("#{}", scene::MAP_ELEMENT_ID),
            wait: WaitStrategy::default(),
            navigation_timeout_ms: 30_000,
            sandbox: false,
            chrome_path: None,
            forward_console: true,
        }
    }
}

/// Something that can turn a page URL into a PNG of its map element.
///
/// Implementations are blocking; use [`crate::async_api::capture`] from async
/// code. Every call must release whatever browser resources it acquired
/// before returning, on success and on error alike.
pub trait Snapshotter: Send + Sync {
    /// Load `url` and capture the map element as PNG bytes
    fn capture(&self, url: &str) -> Result<Vec<u8>>;
}
