//! Monitor facade wiring dyld notifications into the dedup sink.

use anyhow::Result;
use log::info;
use std::sync::OnceLock;

use crate::sink::DedupLogSink;

/// Default unified-logging subsystem for the monitor's records.
pub const SUBSYSTEM: &str = "com.depmon.monitor";

/// Global dedup sink, initialized on first access and never torn down;
/// monitoring runs for the remaining lifetime of the process.
static SINK: OnceLock<DedupLogSink> = OnceLock::new();

fn sink() -> &'static DedupLogSink {
    SINK.get_or_init(DedupLogSink::new)
}

/// Logs binary images that are dynamically loaded into the runtime.
pub struct DependencyMonitor;

impl DependencyMonitor {
    /// Starts monitoring: logs every image already loaded, then keeps
    /// logging loads and tracking unloads until process exit.
    ///
    /// Safe to call more than once; repeated calls re-enumerate into the
    /// idempotent sink and leave the existing callback wiring in place.
    pub fn setup() {
        info!("DependencyMonitor started");

        #[cfg(any(target_os = "macos", target_os = "ios"))]
        crate::dyld::initialize(crate::dyld::ImageEventHandlers {
            on_load: Box::new(|path| {
                sink().log_once(path);
            }),
            on_unload: Box::new(|path| {
                sink().forget(path);
            }),
        });

        #[cfg(not(any(target_os = "macos", target_os = "ios")))]
        log::error!("Dynamic image monitoring is only available on Apple platforms");
    }
}

/// Installs a unified-logging backend for the `log` facade, tagged with the
/// given reverse-DNS subsystem.
///
/// Optional: a host application that already owns a `log` backend can skip
/// this and route the monitor's records itself.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn init_logging(subsystem: &str) -> Result<()> {
    if !subsystem.contains('.') {
        anyhow::bail!("Subsystem must be in reverse DNS format (e.g., 'com.example.app')");
    }

    let logger = oslog::OsLogger::new(subsystem);
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
    log::set_max_level(log::LevelFilter::Debug);

    Ok(())
}

/// Unified Logging is only available on Apple platforms.
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub fn init_logging(_subsystem: &str) -> Result<()> {
    Err(anyhow::anyhow!(
        "Unified Logging only available on macOS and iOS"
    ))
}
