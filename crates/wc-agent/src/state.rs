//! Shared application state handed to every handler and session.

use std::sync::Arc;

use wc_common::AppConfig;
use wc_protocol::StatusResponse;

use crate::encoder::EncoderProbe;
use crate::tracker::WindowTracker;
use crate::window::WindowSystem;

pub struct AppState {
    pub config: AppConfig,
    pub tracker: WindowTracker,
    pub windows: Arc<dyn WindowSystem>,
    /// Startup encoder capability probe, never re-evaluated.
    pub probe: EncoderProbe,
}

impl AppState {
    /// Snapshot of the shared state for admin responses.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            lock: self.tracker.lock_info(),
            window: self.tracker.displayed_title(),
            fps: self.tracker.fps(),
            engine: self.tracker.engine().as_str().to_string(),
            encoder: self.probe.primary_id().to_string(),
        }
    }
}
