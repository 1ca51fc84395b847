//! depmon - macOS/iOS dynamic image load monitor
//!
//! Logs the file paths of binary images (shared libraries, frameworks, the
//! main executable) as they are dynamically loaded into and unloaded from
//! the host process, using the dyld notification API. Observe-and-log only:
//! the monitor never influences loading and keeps no state beyond the set of
//! paths it has already logged.

pub mod dyld;
pub mod monitor;
pub mod resolver;
pub mod sink;

pub use monitor::{init_logging, DependencyMonitor};
pub use resolver::ResolutionError;
