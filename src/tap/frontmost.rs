//! Frontmost application lookup
//!
//! Queries `NSWorkspace` through the Objective-C runtime. Workspace state is
//! only refreshed while a run loop is running on the calling thread, so
//! callers wait with [`run_loop_wait`] between polls instead of sleeping.

use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoopRunInMode};
use objc::rc::autoreleasepool;
use objc::runtime::{Class, Object};
use objc::{msg_send, sel, sel_impl};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::time::Duration;

/// Localized name of the frontmost application
pub fn frontmost_application_name() -> Option<String> {
    // returned objects are autoreleased and the polling thread has no AppKit pool
    autoreleasepool(|| unsafe {
        let workspace_class = Class::get("NSWorkspace")?;

        // [[NSWorkspace sharedWorkspace] frontmostApplication]
        let workspace: *mut Object = msg_send![workspace_class, sharedWorkspace];
        if workspace.is_null() {
            return None;
        }
        let app: *mut Object = msg_send![workspace, frontmostApplication];
        if app.is_null() {
            return None;
        }

        let name: *mut Object = msg_send![app, localizedName];
        if name.is_null() {
            return None;
        }
        let utf8: *const c_char = msg_send![name, UTF8String];
        if utf8.is_null() {
            return None;
        }
        Some(CStr::from_ptr(utf8).to_string_lossy().into_owned())
    })
}

/// Run the current thread's run loop for up to `duration`.
pub fn run_loop_wait(duration: Duration) {
    unsafe {
        CFRunLoopRunInMode(kCFRunLoopDefaultMode, duration.as_secs_f64(), 0);
    }
}

/// Tracks the frontmost application between polls
#[derive(Debug, Default)]
pub struct FrontmostWatcher {
    current: Option<String>,
}

impl FrontmostWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Record `name` as frontmost. Returns true if it changed.
    pub fn update(&mut self, name: Option<String>) -> bool {
        if self.current == name {
            return false;
        }
        self.current = name;
        true
    }

    /// Query the workspace and record the result.
    pub fn poll(&mut self) -> bool {
        self.update(frontmost_application_name())
    }
}
