//! Chrome DevTools Protocol snapshot backend

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};

use crate::{scene, Error, Result, SnapshotConfig, Snapshotter, WaitStrategy};

const CONSOLE_BINDING: &str = "__routeshotConsole";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Set on the outgoing document so the DOM check can't pass on it
const STALE_MARKER: &str = "__routeshotStale";

/// Snapshotter backed by the `headless_chrome` crate.
///
/// Every capture launches its own browser; the `Browser` value is owned by
/// the capture call, so the Chrome process is killed when it returns,
/// whichever way it returns.
pub struct CdpSnapshotter {
    config: SnapshotConfig,
}

impl CdpSnapshotter {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    fn launch(&self) -> Result<Browser> {
        let extra_args: Vec<&OsStr> = vec![OsStr::new("--hide-scrollbars")];
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.config.sandbox)
            .window_size(Some((self.config.viewport.width, self.config.viewport.height)))
            .path(self.config.chrome_path.clone())
            .args(extra_args)
            .build()
            .map_err(|e| Error::BrowserLaunch(format!("Failed to build launch options: {}", e)))?;

        Browser::new(launch_options).map_err(|e| Error::BrowserLaunch(format!("Failed to launch browser: {}", e)))
    }

    /// Navigate and return once the new document's DOM is parsed.
    ///
    /// Subresources (tiles, images) are not waited for; a hanging tile host
    /// must not hold up the capture.
    fn navigate(&self, tab: &Tab, url: &str) -> Result<()> {
        let _ = tab.evaluate(&format!("window.{} = true", STALE_MARKER), false);

        tab.navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        let expression = format!("!window.{} && document.readyState !== 'loading'", STALE_MARKER);
        let deadline = Instant::now() + Duration::from_millis(self.config.navigation_timeout_ms);
        loop {
            // The execution context is torn down mid-navigation; treat that as not yet parsed
            let parsed = match tab.evaluate(&expression, false) {
                Ok(result) => result.value.and_then(|v| v.as_bool()).unwrap_or(false),
                Err(e) => {
                    debug!("DOM check failed, retrying: {}", e);
                    false
                }
            };
            if parsed {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::LoadError(format!(
                    "{} not parsed within {}ms",
                    url, self.config.navigation_timeout_ms
                )));
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
    }

    fn wait_until_ready(&self, tab: &Tab) -> Result<()> {
        match self.config.wait {
            WaitStrategy::FixedDelay { ms } => {
                std::thread::sleep(Duration::from_millis(ms));
                Ok(())
            }
            WaitStrategy::ReadySignal { timeout_ms } => {
                let expression = format!("window.{} === true", scene::READY_FLAG);
                let deadline = Instant::now() + Duration::from_millis(timeout_ms);
                loop {
                    let ready = tab
                        .evaluate(&expression, false)
                        .map_err(|e| Error::RenderError(format!("Readiness check failed: {}", e)))?
                        .value
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    if ready {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        return Err(Error::RenderTimeout(timeout_ms));
                    }
                    std::thread::sleep(READY_POLL_INTERVAL);
                }
            }
        }
    }
}

impl Snapshotter for CdpSnapshotter {
    fn capture(&self, url: &str) -> Result<Vec<u8>> {
        let started = Instant::now();
        let browser = self.launch()?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::BrowserLaunch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(self.config.navigation_timeout_ms));

        if self.config.forward_console {
            forward_console(&tab);
        }

        self.navigate(&tab, url)?;
        debug!("DOM of {} parsed after {:?}", url, started.elapsed());

        self.wait_until_ready(&tab)?;

        let element = tab
            .wait_for_element(&self.config.map_selector)
            .map_err(|e| Error::ElementNotFound(format!("{}: {}", self.config.map_selector, e)))?;

        let png = element
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;

        info!("Map captured in {:?} ({} bytes)", started.elapsed(), png.len());
        Ok(png)
    }
}

/// Relay the page's console calls into the log.
///
/// Binding and wrapper must both be in place before navigation so messages
/// logged while the map script runs are not lost.
fn forward_console(tab: &Arc<Tab>) {
    let _ = tab
        .expose_function(
            CONSOLE_BINDING,
            Arc::new(|payload: serde_json::Value| {
                // The page sends a JSON string; tolerate a bare value too
                let msg = match payload.as_str() {
                    Some(s) => serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.to_string())),
                    None => payload,
                };

                let level = msg.get("level").and_then(|l| l.as_str()).unwrap_or("log");
                let text = match msg.get("args").and_then(|a| a.as_array()) {
                    Some(args) => args
                        .iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join(" "),
                    None => msg.to_string(),
                };

                match level {
                    "error" => log::error!(target: "routeshot::browser", "{}", text),
                    "warn" => log::warn!(target: "routeshot::browser", "{}", text),
                    _ => log::info!(target: "routeshot::browser", "{}", text),
                }
            }),
        )
        .map_err(|e| warn!("Failed to expose console binding: {}", e));

    let wrapper = r#"(function(){
        ['log','info','warn','error'].forEach(function(k){
            const orig = console[k];
            console[k] = function(...args){
                try { const bind = window.__routeshotConsole; if (bind) bind(JSON.stringify({ level: k, args: args.map(a => String(a)) })); } catch(e) {}
                try { orig.apply(console, args); } catch(e) {}
            };
        });
        window.addEventListener('error', function(ev){
            try { console.error(String(ev.message)); } catch(e) {}
        });
    })();"#;

    let _ = tab
        .call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: wrapper.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| warn!("Failed to inject console wrapper: {}", e));
}
