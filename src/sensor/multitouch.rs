//! MultitouchSupport frame feed
//!
//! Registers a contact frame callback on every multitouch device (built-in
//! trackpad, Magic Trackpad, Magic Mouse) through the private
//! MultitouchSupport framework and forwards the finger counts to a shared
//! [`TouchState`].
//!
//! The framework callback carries no user data pointer, so the target state
//! and the device to surface table are process globals set once by
//! [`start`].

use super::{Surface, TouchState};
use crate::time::timebase::Timestamp;
use core_foundation::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

type MTDeviceRef = *mut c_void;
type MTContactCallback =
    extern "C" fn(device: MTDeviceRef, touches: *const c_void, num_touches: i32, timestamp: f64, frame: i32) -> i32;

#[link(name = "MultitouchSupport", kind = "framework")]
extern "C" {
    fn MTDeviceCreateList() -> CFArrayRef;
    fn MTRegisterContactFrameCallback(device: MTDeviceRef, callback: MTContactCallback);
    fn MTDeviceStart(device: MTDeviceRef, mode: i32) -> i32;
    fn MTDeviceGetFamilyID(device: MTDeviceRef, family_id: *mut i32) -> i32;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFPreferencesCopyAppValue(key: CFStringRef, application_id: CFStringRef) -> CFTypeRef;
}

/// Device family IDs of the Magic Mouse generations
const MAGIC_MOUSE_FAMILY_IDS: [i32; 2] = [112, 113];

static TARGET: OnceLock<Arc<TouchState>> = OnceLock::new();
static SURFACES: OnceLock<Mutex<HashMap<usize, Surface>>> = OnceLock::new();

extern "C" fn contact_frame_callback(
    device: MTDeviceRef,
    _touches: *const c_void,
    num_touches: i32,
    _timestamp: f64,
    _frame: i32,
) -> i32 {
    let (Some(state), Some(surfaces)) = (TARGET.get(), SURFACES.get()) else {
        return 0;
    };

    let surface = surfaces
        .lock()
        .get(&(device as usize))
        .copied()
        .unwrap_or(Surface::Trackpad);
    state.record_frame(surface, num_touches.max(0) as u32, Timestamp::now());
    0
}

/// Start feeding contact frames from all multitouch devices into `state`.
///
/// Returns the number of devices started.
///
/// # Errors
/// Fails if the feed was already started or no device is present.
pub fn start(state: Arc<TouchState>) -> Result<usize, crate::Error> {
    if TARGET.set(state).is_err() {
        return Err(crate::Error::Sensor("multitouch feed already started".into()));
    }
    let surfaces = SURFACES.get_or_init(|| Mutex::new(HashMap::new()));

    // The device list stays retained for the lifetime of the process; the
    // framework stops delivering frames once the devices are released.
    let devices = unsafe { MTDeviceCreateList() };
    if devices.is_null() {
        return Err(crate::Error::Sensor("cannot list multitouch devices".into()));
    }

    let count = unsafe { CFArrayGetCount(devices) }.max(0);
    for index in 0..count {
        let device = unsafe { CFArrayGetValueAtIndex(devices, index) } as MTDeviceRef;
        if device.is_null() {
            continue;
        }

        let mut family_id = 0;
        unsafe { MTDeviceGetFamilyID(device, &mut family_id) };
        let surface = if MAGIC_MOUSE_FAMILY_IDS.contains(&family_id) {
            Surface::Mousepad
        } else {
            Surface::Trackpad
        };
        surfaces.lock().insert(device as usize, surface);
        debug!("Multitouch device family {} as {:?}", family_id, surface);

        unsafe {
            MTRegisterContactFrameCallback(device, contact_frame_callback);
            MTDeviceStart(device, 0);
        }
    }

    if count == 0 {
        warn!("No multitouch devices found");
        return Err(crate::Error::Sensor("no multitouch devices found".into()));
    }

    info!("Multitouch feed started on {} device(s)", count);
    Ok(count as usize)
}

/// Read the trackpad "Tap to click" preference.
pub fn tap_to_click_preference() -> bool {
    let key = CFString::new("Clicking");
    let domain = CFString::new("com.apple.AppleMultitouchTrackpad");

    let value = unsafe { CFPreferencesCopyAppValue(key.as_concrete_TypeRef(), domain.as_concrete_TypeRef()) };
    if value.is_null() {
        return false;
    }

    // Safety: CFPreferencesCopyAppValue follows the create rule
    let value = unsafe { CFType::wrap_under_create_rule(value) };
    if let Some(flag) = value.downcast::<CFBoolean>() {
        bool::from(flag)
    } else if let Some(number) = value.downcast::<CFNumber>() {
        number.to_i64().is_some_and(|n| n != 0)
    } else {
        false
    }
}
