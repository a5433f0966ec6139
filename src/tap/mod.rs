//! macOS event tap adapter
//!
//! Connects the engine to the system: the Quartz event tap feeding the
//! dispatcher, CGEvent conversion, and the frontmost application lookup
//! used for preset switching.

pub mod convert;
pub mod event_tap;
pub mod frontmost;

pub use event_tap::{
    check_accessibility_permissions, post_events, request_accessibility_permissions, EventTap,
};
pub use frontmost::{frontmost_application_name, FrontmostWatcher};
