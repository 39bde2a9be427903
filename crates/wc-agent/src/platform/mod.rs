//! Platform window-system and capture backend implementations.
//!
//! Windows carries the real implementations; other platforms get stubs
//! that return typed errors, so the agent still serves its admin API
//! and sessions degrade gracefully.

#[cfg(target_os = "windows")]
mod win32;
#[cfg(not(target_os = "windows"))]
mod unsupported;

use std::sync::Arc;

use crate::capture::CaptureBackend;
use crate::window::WindowSystem;

#[cfg(target_os = "windows")]
pub fn window_system() -> Arc<dyn WindowSystem> {
    Arc::new(win32::Win32WindowSystem::new())
}

#[cfg(target_os = "windows")]
pub fn capture_backends() -> Vec<Box<dyn CaptureBackend>> {
    win32::capture_backends()
}

#[cfg(not(target_os = "windows"))]
pub fn window_system() -> Arc<dyn WindowSystem> {
    Arc::new(unsupported::StubWindowSystem)
}

#[cfg(not(target_os = "windows"))]
pub fn capture_backends() -> Vec<Box<dyn CaptureBackend>> {
    tracing::warn!("screen capture is only available on Windows");
    Vec::new()
}
