//! Async bridge for blocking snapshotters.
//!
//! Browser drivers are synchronous, so each capture runs on its own worker
//! thread and reports back over a oneshot channel. The worker owns the
//! browser for the whole capture; if the awaiting task goes away the worker
//! still finishes and tears the browser down.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::{Error, Result, Snapshotter};

/// Run `snapshotter.capture(url)` off the async runtime
pub async fn capture(snapshotter: Arc<dyn Snapshotter>, url: String) -> Result<Vec<u8>> {
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("routeshot-capture".into())
        .spawn(move || {
            let started = Instant::now();
            let res = snapshotter.capture(&url);
            match &res {
                Ok(png) => debug!("Captured {} ({} bytes) in {:?}", url, png.len(), started.elapsed()),
                Err(e) => warn!("Capture of {} failed after {:?}: {}", url, started.elapsed(), e),
            }
            // The receiver is gone if the request was dropped; nothing left to do
            let _ = tx.send(res);
        })
        .map_err(|e| Error::Other(format!("Failed to spawn capture worker: {}", e)))?;

    rx.await
        .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
}
