//! Quartz Event Tap
//!
//! Installs a default (modifying) tap at the HID level on a dedicated
//! run-loop thread. Every scroll, click, drag and gesture event is converted,
//! run through the shared [`Dispatcher`] and replaced by its outputs: all
//! outputs but the last are posted right after the tap, the last one is
//! returned from the callback, and an empty output drops the event. An
//! event the chain leaves alone is returned as captured, and outputs
//! derived from it only carry the fields a mapping changed.
//!
//! # Permissions
//!
//! Requires Accessibility permissions in System Settings > Privacy & Security.

use super::convert::{self, CGEventRef};
use crate::chain::{is_handled_type, Dispatcher};
use crate::event::{Event, EventType};
use crate::time::timebase::{MachTimebase, Timestamp};
use core_foundation::base::{CFRelease, CFTypeRef, TCFType};
use core_foundation::runloop::kCFRunLoopCommonModes;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

type CGEventTapProxy = *const c_void;
type CGEventMask = u64;

#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code, clippy::enum_variant_names)]
enum CGEventTapLocation {
    HIDEventTap = 0,
    SessionEventTap = 1,
    AnnotatedSessionEventTap = 2,
}

#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code, clippy::enum_variant_names)]
enum CGEventTapPlacement {
    HeadInsertEventTap = 0,
    TailAppendEventTap = 1,
}

#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code)]
enum CGEventTapOptions {
    DefaultTap = 0,
    ListenOnly = 1,
}

/// Event types the tap asks for
const TAPPED_TYPES: [EventType; 11] = [
    EventType::LeftMouseDown,
    EventType::LeftMouseUp,
    EventType::RightMouseDown,
    EventType::RightMouseUp,
    EventType::LeftMouseDragged,
    EventType::RightMouseDragged,
    EventType::ScrollWheel,
    EventType::OtherMouseDown,
    EventType::OtherMouseUp,
    EventType::OtherMouseDragged,
    EventType::Gesture,
];

fn create_event_mask() -> CGEventMask {
    TAPPED_TYPES
        .iter()
        .filter(|t| is_handled_type(**t))
        .fold(0, |mask, t| mask | (1 << t.as_raw()))
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: CGEventTapPlacement,
        options: CGEventTapOptions,
        events_of_interest: CGEventMask,
        callback: extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef,
        user_info: *mut c_void,
    ) -> CFTypeRef;

    fn CGEventTapEnable(tap: CFTypeRef, enable: bool);
    fn CGEventTapPostEvent(proxy: CGEventTapProxy, event: CGEventRef);
    fn CGEventPost(tap: CGEventTapLocation, event: CGEventRef);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(allocator: CFTypeRef, port: CFTypeRef, order: i64) -> CFTypeRef;

    fn CFRunLoopGetCurrent() -> CFTypeRef;
    fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRun();
    fn CFRunLoopStop(rl: CFTypeRef);
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFTypeRef) -> bool;
}

/// Context for the event tap callback
struct EventTapContext {
    dispatcher: Arc<Mutex<Dispatcher>>,
    running: Arc<AtomicBool>,
    event_count: AtomicU64,
    posted_count: AtomicU64,
}

/// Global pointers for the callback, which cannot capture Rust state
static CONTEXT_PTR: AtomicPtr<EventTapContext> = AtomicPtr::new(ptr::null_mut());
static RUN_LOOP_PTR: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());
static TAP_PTR: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Quartz event tap feeding a [`Dispatcher`]
pub struct EventTap {
    thread_handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    retry_delay: Duration,
}

impl EventTap {
    /// Create a tap that retries installation every `retry_delay`.
    pub fn new(retry_delay: Duration) -> Self {
        MachTimebase::init();

        Self {
            thread_handle: None,
            running: Arc::new(AtomicBool::new(false)),
            retry_delay,
        }
    }

    /// Install the tap on its own run-loop thread.
    ///
    /// # Errors
    /// Fails if the tap is already running, Accessibility permissions are
    /// missing or the thread cannot be spawned. Tap creation failures on the
    /// thread are retried, not reported.
    pub fn start(&mut self, dispatcher: Arc<Mutex<Dispatcher>>) -> Result<(), crate::Error> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(crate::Error::Tap("Event tap already running".into()));
        }

        if !check_accessibility_permissions() {
            self.running.store(false, Ordering::SeqCst);
            return Err(crate::Error::Tap(
                "Accessibility permissions not granted. Please enable in System Settings > Privacy & Security > Accessibility".into(),
            ));
        }

        dispatcher.lock().set_reenable_callback(reenable_tap);

        let context = Box::new(EventTapContext {
            dispatcher,
            running: Arc::clone(&self.running),
            event_count: AtomicU64::new(0),
            posted_count: AtomicU64::new(0),
        });
        let context_ptr = Box::into_raw(context);
        CONTEXT_PTR.store(context_ptr, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let retry_delay = self.retry_delay;

        let handle = thread::Builder::new()
            .name("event-tap".into())
            .spawn(move || {
                if let Err(e) = run_event_tap_loop(running, retry_delay) {
                    error!("Event tap error: {}", e);
                }
            })
            .map_err(|e| {
                CONTEXT_PTR.store(ptr::null_mut(), Ordering::SeqCst);
                unsafe {
                    drop(Box::from_raw(context_ptr));
                }
                self.running.store(false, Ordering::SeqCst);
                crate::Error::Tap(format!("Failed to spawn event tap thread: {}", e))
            })?;

        self.thread_handle = Some(handle);
        info!("Event tap started");
        Ok(())
    }

    /// Remove the tap and join its thread.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let run_loop = RUN_LOOP_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
        if !run_loop.is_null() {
            unsafe {
                CFRunLoopStop(run_loop as _);
            }
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        let context_ptr = CONTEXT_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
        if !context_ptr.is_null() {
            let ctx = unsafe { Box::from_raw(context_ptr) };
            info!(
                "Event tap stopped after {} events ({} posted)",
                ctx.event_count.load(Ordering::Relaxed),
                ctx.posted_count.load(Ordering::Relaxed)
            );
        } else {
            info!("Event tap stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Events seen by the callback so far
    pub fn event_count(&self) -> u64 {
        let ctx = CONTEXT_PTR.load(Ordering::SeqCst);
        if ctx.is_null() {
            0
        } else {
            unsafe { (*ctx).event_count.load(Ordering::Relaxed) }
        }
    }
}

impl Drop for EventTap {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reenable_tap() {
    let tap = TAP_PTR.load(Ordering::SeqCst);
    if !tap.is_null() {
        unsafe {
            CGEventTapEnable(tap as CFTypeRef, true);
        }
    }
}

extern "C" fn event_tap_callback(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    let ctx = CONTEXT_PTR.load(Ordering::SeqCst);
    if ctx.is_null() {
        return event;
    }
    let context = unsafe { &*ctx };
    if !context.running.load(Ordering::Relaxed) {
        return event;
    }

    let Ok(kind) = EventType::try_from(event_type) else {
        return event;
    };

    if kind.is_tap_disabled() {
        context.dispatcher.lock().process(Event::new(kind, Timestamp::now()));
        return event;
    }

    let input = unsafe { convert::event_from_cg(event, kind) };
    let outputs = context.dispatcher.lock().process(input.clone());
    context.event_count.fetch_add(1, Ordering::Relaxed);

    // untouched events go back exactly as captured
    if matches!(outputs.as_slice(), [only] if *only == input) {
        return event;
    }

    let Some((last, rest)) = outputs.split_last() else {
        trace!("Dropped {:?}", kind);
        return ptr::null();
    };

    for output in rest {
        if let Some(cg) = unsafe { convert::event_to_cg(output, Some((event, &input))) } {
            unsafe {
                CGEventTapPostEvent(proxy, cg);
                CFRelease(cg);
            }
            context.posted_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    if last.synthetic {
        // Returned events are released by the event system
        unsafe { convert::event_to_cg(last, None) }.unwrap_or(ptr::null())
    } else {
        unsafe { convert::write_to_cg(last, event, last.changed_fields(&input)) };
        event
    }
}

/// Post events as new input at the session level, after the HID tap.
pub fn post_events(events: &[Event]) {
    for event in events {
        if let Some(cg) = unsafe { convert::event_to_cg(event, None) } {
            unsafe {
                CGEventPost(CGEventTapLocation::SessionEventTap, cg);
                CFRelease(cg);
            }
        }
    }
}

/// RAII guard for a CGEventTap handle. Disables and releases the tap on drop.
struct EventTapGuard(CFTypeRef);

impl Drop for EventTapGuard {
    fn drop(&mut self) {
        TAP_PTR.store(ptr::null_mut(), Ordering::SeqCst);
        unsafe {
            CGEventTapEnable(self.0, false);
            CFRelease(self.0);
        }
    }
}

/// RAII guard for a CFRunLoopSource. Releases the source on drop.
struct RunLoopSourceGuard(CFTypeRef);

impl Drop for RunLoopSourceGuard {
    fn drop(&mut self) {
        unsafe {
            CFRelease(self.0);
        }
    }
}

/// RAII guard that clears RUN_LOOP_PTR on drop.
struct RunLoopPtrGuard;

impl Drop for RunLoopPtrGuard {
    fn drop(&mut self) {
        RUN_LOOP_PTR.store(ptr::null_mut(), Ordering::SeqCst);
    }
}

/// Create the tap, retrying until it succeeds or the tap is stopped.
fn create_tap(running: &AtomicBool, retry_delay: Duration) -> Option<CFTypeRef> {
    let event_mask = create_event_mask();
    debug!("Event mask {:#x}", event_mask);

    while running.load(Ordering::SeqCst) {
        let tap = unsafe {
            CGEventTapCreate(
                CGEventTapLocation::HIDEventTap,
                CGEventTapPlacement::HeadInsertEventTap,
                CGEventTapOptions::DefaultTap,
                event_mask,
                event_tap_callback,
                ptr::null_mut(),
            )
        };
        if !tap.is_null() {
            return Some(tap);
        }

        warn!("Failed to create event tap, retrying in {:?}", retry_delay);
        thread::sleep(retry_delay);
    }
    None
}

fn run_event_tap_loop(running: Arc<AtomicBool>, retry_delay: Duration) -> Result<(), crate::Error> {
    info!("Event tap loop starting...");

    let Some(tap) = create_tap(&running, retry_delay) else {
        info!("Event tap stopped before it was created");
        return Ok(());
    };
    let _tap_guard = EventTapGuard(tap);
    TAP_PTR.store(tap as *mut c_void, Ordering::SeqCst);

    let run_loop_source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
    if run_loop_source.is_null() {
        return Err(crate::Error::Tap("Failed to create run loop source".into()));
    }
    let _source_guard = RunLoopSourceGuard(run_loop_source);

    let run_loop = unsafe { CFRunLoopGetCurrent() };
    RUN_LOOP_PTR.store(run_loop as *mut c_void, Ordering::SeqCst);
    let _ptr_guard = RunLoopPtrGuard;

    // stop() may have run while the tap was being created
    if !running.load(Ordering::SeqCst) {
        return Ok(());
    }

    unsafe {
        CFRunLoopAddSource(run_loop, run_loop_source, kCFRunLoopCommonModes as CFTypeRef);
        CGEventTapEnable(tap, true);
    }

    info!("Event tap loop running");

    // Returns when CFRunLoopStop is called
    unsafe {
        CFRunLoopRun();
    }

    info!("Event tap loop stopped");
    Ok(())
}

/// Check if accessibility permissions are granted
pub fn check_accessibility_permissions() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Request accessibility permissions (shows system dialog)
pub fn request_accessibility_permissions() -> bool {
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as CFTypeRef) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessibility_check() {
        // false in CI, but must not panic
        let _has_access = check_accessibility_permissions();
    }

    #[test]
    fn test_event_mask_creation() {
        let mask = create_event_mask();
        assert!(mask & (1 << 22) != 0);
        assert!(mask & (1 << 29) != 0);
        assert!(mask & (1 << 1) != 0);
        assert!(mask & (1 << 27) != 0);
        // mouse moved and keys are left alone
        assert_eq!(mask & (1 << 5), 0);
        assert_eq!(mask & (1 << 10), 0);
    }

    #[test]
    fn test_event_tap_creation() {
        let tap = EventTap::new(Duration::from_millis(1000));
        assert!(!tap.is_running());
        assert_eq!(tap.event_count(), 0);
    }
}
