//! Bridge to the dyld image load/unload notification API.
//!
//! Performs the point-in-time enumeration of images already loaded, then
//! registers persistent add/remove callbacks. dyld offers no unregistration,
//! so the installed callbacks and their handlers live until process exit.

#[cfg(any(target_os = "macos", target_os = "ios"))]
use std::sync::OnceLock;

/// Opaque mach header of a loaded binary image.
///
/// dyld hands callbacks a pointer to the image's in-memory header; the
/// monitor only ever passes it back to `dladdr`, so the layout stays opaque.
/// Valid only for the duration of the callback that supplied it.
#[repr(C)]
pub struct MachHeader {
    _opaque: [u8; 0],
}

/// Callbacks fed with image paths as load/unload events arrive.
pub struct ImageEventHandlers {
    pub on_load: Box<dyn Fn(&str) + Send + Sync>,
    pub on_unload: Box<dyn Fn(&str) + Send + Sync>,
}

/// Handler slot shared with the `extern "C"` trampolines, which cannot carry
/// closure state. Write-once for the process lifetime.
#[cfg(any(target_os = "macos", target_os = "ios"))]
static HANDLERS: OnceLock<ImageEventHandlers> = OnceLock::new();

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod ffi {
    use super::MachHeader;
    use libc::c_char;

    extern "C" {
        pub fn _dyld_image_count() -> u32;
        pub fn _dyld_get_image_name(image_index: u32) -> *const c_char;
        pub fn _dyld_register_func_for_add_image(
            func: extern "C" fn(mh: *const MachHeader, vmaddr_slide: isize),
        );
        pub fn _dyld_register_func_for_remove_image(
            func: extern "C" fn(mh: *const MachHeader, vmaddr_slide: isize),
        );
    }
}

/// Enumerates already-loaded images, then registers for add/remove events.
///
/// The snapshot completes before registration begins, so an image loading in
/// between can be reported by both passes; callers are expected to absorb
/// the duplicate. If handlers were installed by an earlier call, the new
/// ones are dropped and the existing wiring stays in place.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn initialize(handlers: ImageEventHandlers) {
    let _ = HANDLERS.set(handlers);

    replay_snapshot(&snapshot_paths(), |path| {
        if let Some(handlers) = HANDLERS.get() {
            (handlers.on_load)(path);
        }
    });

    unsafe {
        ffi::_dyld_register_func_for_add_image(add_image);
        ffi::_dyld_register_func_for_remove_image(remove_image);
    }
}

/// Paths of every image mapped at the moment of the call, in dyld order.
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn snapshot_paths() -> Vec<String> {
    use std::ffi::CStr;

    let count = unsafe { ffi::_dyld_image_count() };
    (0..count)
        .filter_map(|index| {
            let name = unsafe { ffi::_dyld_get_image_name(index) };
            if name.is_null() {
                return None;
            }
            let name = unsafe { CStr::from_ptr(name) };
            Some(name.to_string_lossy().into_owned())
        })
        .collect()
}

/// Feeds a snapshot of image paths to `on_load`, preserving snapshot order.
pub fn replay_snapshot<F: FnMut(&str)>(paths: &[String], mut on_load: F) {
    for path in paths {
        on_load(path);
    }
}

// Resolution failures are logged and swallowed at the trampoline boundary.
// Nothing here may panic or propagate into dyld.

#[cfg(any(target_os = "macos", target_os = "ios"))]
extern "C" fn add_image(mh: *const MachHeader, _vmaddr_slide: isize) {
    if let Some(handlers) = HANDLERS.get() {
        match crate::resolver::resolve(mh) {
            Ok(path) => (handlers.on_load)(&path),
            Err(err) => log::error!("Failed to resolve name of loaded image: {}", err),
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
extern "C" fn remove_image(mh: *const MachHeader, _vmaddr_slide: isize) {
    if let Some(handlers) = HANDLERS.get() {
        match crate::resolver::resolve(mh) {
            Ok(path) => (handlers.on_unload)(&path),
            Err(err) => log::error!("Failed to resolve name of unloaded image: {}", err),
        }
    }
}
