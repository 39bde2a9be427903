//! Target-window tracking: the auto-follow / soft-lock / hard-lock
//! state machine and per-cycle target resolution.
//!
//! The tracker is the only process-wide mutable state shared across
//! sessions (lock state, engine pin, frame cadence). Writes are rare
//! and user-triggered; reads happen once per frame, hence the RwLock.

use std::sync::RwLock;

use wc_common::config::TrackerConfig;
use wc_common::AppError;
use wc_protocol::{clamp_fps, LockInfo, LockMode};

use crate::capture::EngineKind;
use crate::window::{TargetWindow, WindowHandle, WindowSystem};

/// Target selection persistence policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// Follow the OS foreground window, excluding denylisted titles.
    AutoFollow,
    /// Implicit lock set by the first interaction while auto-following.
    /// Eligible for automatic release.
    SoftLocked(String),
    /// Explicit lock; only `unlock()` leaves this state.
    HardLocked(String),
}

impl LockState {
    pub fn locked_title(&self) -> Option<&str> {
        match self {
            Self::AutoFollow => None,
            Self::SoftLocked(t) | Self::HardLocked(t) => Some(t),
        }
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::AutoFollow)
    }

    pub fn info(&self) -> LockInfo {
        let (mode, title) = match self {
            Self::AutoFollow => (LockMode::Auto, None),
            Self::SoftLocked(t) => (LockMode::Soft, Some(t.clone())),
            Self::HardLocked(t) => (LockMode::Hard, Some(t.clone())),
        };
        LockInfo { mode, title }
    }
}

#[derive(Debug)]
struct TrackerState {
    lock: LockState,
    /// Title of the window most recently resolved for display.
    displayed: Option<String>,
    /// Native handle cached at resolution time; re-resolved by title
    /// only when it disappears from the enumeration.
    cached_handle: Option<WindowHandle>,
    /// Set by a fresh lock; consumed once by the session loop to bring
    /// the target to the foreground exactly once.
    pending_activation: bool,
    fps: u32,
    engine: EngineKind,
}

/// Process-wide target tracker. One instance per agent.
pub struct WindowTracker {
    cfg: TrackerConfig,
    state: RwLock<TrackerState>,
}

impl WindowTracker {
    pub fn new(cfg: TrackerConfig, fps: u32, engine: EngineKind) -> Self {
        Self {
            cfg,
            state: RwLock::new(TrackerState {
                lock: LockState::AutoFollow,
                displayed: None,
                cached_handle: None,
                pending_activation: false,
                fps: clamp_fps(fps),
                engine,
            }),
        }
    }

    // ─── Lock transitions ────────────────────────────────────────

    /// Explicit lock request.
    pub fn lock(&self, title: &str) {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!(title, "hard lock set");
        st.lock = LockState::HardLocked(title.to_string());
        st.cached_handle = None;
        st.pending_activation = true;
    }

    /// Lock onto whatever window is currently displayed.
    pub fn lock_current(&self) -> Result<String, AppError> {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        let title = st
            .displayed
            .clone()
            .ok_or_else(|| AppError::TargetNotFound("no window currently displayed".into()))?;
        tracing::info!(title, "hard lock set on current window");
        st.lock = LockState::HardLocked(title.clone());
        st.pending_activation = true;
        Ok(title)
    }

    /// Return to auto-follow from any state.
    pub fn unlock(&self) {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        if st.lock.is_locked() {
            tracing::info!("lock released");
        }
        st.lock = LockState::AutoFollow;
        st.cached_handle = None;
        st.pending_activation = false;
    }

    /// Record a user interaction. The first interaction while
    /// auto-following soft-locks the displayed window so the target
    /// cannot drift mid-gesture.
    pub fn note_interaction(&self) {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        if st.lock == LockState::AutoFollow {
            if let Some(title) = st.displayed.clone() {
                tracing::info!(title, "soft lock set by interaction");
                st.lock = LockState::SoftLocked(title);
            }
        }
    }

    /// Consume the pending-activation flag (true at most once per lock).
    pub fn take_pending_activation(&self) -> bool {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut st.pending_activation)
    }

    // ─── Shared settings ─────────────────────────────────────────

    pub fn set_fps(&self, fps: u32) -> u32 {
        let clamped = clamp_fps(fps);
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        st.fps = clamped;
        tracing::info!(fps = clamped, "frame rate updated");
        clamped
    }

    pub fn fps(&self) -> u32 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).fps
    }

    pub fn set_engine(&self, engine: EngineKind) {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!(engine = engine.as_str(), "capture engine pinned");
        st.engine = engine;
    }

    pub fn engine(&self) -> EngineKind {
        self.state.read().unwrap_or_else(|e| e.into_inner()).engine
    }

    pub fn lock_info(&self) -> LockInfo {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .lock
            .info()
    }

    pub fn is_locked(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .lock
            .is_locked()
    }

    pub fn displayed_title(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .displayed
            .clone()
    }

    // ─── Resolution ──────────────────────────────────────────────

    /// Resolve the current target window for this cycle.
    pub fn resolve(&self, ws: &dyn WindowSystem) -> Result<TargetWindow, AppError> {
        let foreground = ws.foreground_window();
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());

        // A soft lock releases as soon as a foreground window appears
        // whose title is neither denylisted nor the locked title.
        if self.cfg.auto_release {
            if let LockState::SoftLocked(locked) = &st.lock {
                if let Some(fg) = &foreground {
                    if !fg.title.is_empty()
                        && !self.is_denylisted(&fg.title)
                        && fg.title != *locked
                    {
                        tracing::info!(
                            from = locked.as_str(),
                            to = fg.title.as_str(),
                            "soft lock released by foreground change"
                        );
                        st.lock = LockState::AutoFollow;
                        st.cached_handle = None;
                    }
                }
            }
        }

        match st.lock.clone() {
            LockState::HardLocked(title) | LockState::SoftLocked(title) => {
                self.resolve_locked(&mut st, ws, &title)
            }
            LockState::AutoFollow => self.resolve_auto(&mut st, ws, foreground),
        }
    }

    /// Locked resolution: exact title match first, then substring.
    /// Never falls back to anything else.
    fn resolve_locked(
        &self,
        st: &mut TrackerState,
        ws: &dyn WindowSystem,
        title: &str,
    ) -> Result<TargetWindow, AppError> {
        let windows = self.enumerate(ws);

        // Handle cache: keep following the same window through title
        // changes until it disappears.
        if let Some(handle) = st.cached_handle {
            if let Some(win) = windows.iter().find(|w| w.handle == handle) {
                st.displayed = Some(win.title.clone());
                return Ok(win.clone());
            }
            st.cached_handle = None;
        }

        let found = windows
            .iter()
            .find(|w| w.title == title)
            .or_else(|| windows.iter().find(|w| w.title.contains(title)));

        match found {
            Some(win) => {
                st.cached_handle = Some(win.handle);
                st.displayed = Some(win.title.clone());
                Ok(win.clone())
            }
            None => Err(AppError::TargetNotFound(title.to_string())),
        }
    }

    /// Auto-follow resolution: accept the foreground window unless it
    /// is denylisted, untitled or too small; otherwise stick with the
    /// previously displayed window.
    fn resolve_auto(
        &self,
        st: &mut TrackerState,
        ws: &dyn WindowSystem,
        foreground: Option<TargetWindow>,
    ) -> Result<TargetWindow, AppError> {
        if let Some(fg) = foreground {
            let acceptable = !fg.title.is_empty()
                && !self.is_denylisted(&fg.title)
                && fg.rect.width >= self.cfg.min_window_width
                && !fg.minimized;
            if acceptable {
                st.displayed = Some(fg.title.clone());
                st.cached_handle = Some(fg.handle);
                return Ok(fg);
            }
        }

        // Stickiness: the rejected foreground (often the control
        // surface itself) must not hijack the target.
        let windows = self.enumerate(ws);
        if let Some(handle) = st.cached_handle {
            if let Some(win) = windows.iter().find(|w| w.handle == handle) {
                st.displayed = Some(win.title.clone());
                return Ok(win.clone());
            }
            st.cached_handle = None;
        }
        if let Some(prev) = st.displayed.clone() {
            if let Some(win) = windows.iter().find(|w| w.title == prev) {
                st.cached_handle = Some(win.handle);
                return Ok(win.clone());
            }
        }

        Err(AppError::TargetNotFound("no acceptable foreground window".into()))
    }

    /// Enumerate candidate windows, dropping tooltips/menus below the
    /// minimum width.
    fn enumerate(&self, ws: &dyn WindowSystem) -> Vec<TargetWindow> {
        ws.list_windows()
            .into_iter()
            .filter(|w| w.rect.width >= self.cfg.min_window_width)
            .collect()
    }

    /// Candidate windows for the admin listing endpoint.
    pub fn list_candidates(&self, ws: &dyn WindowSystem) -> Vec<TargetWindow> {
        self.enumerate(ws)
    }

    fn is_denylisted(&self, title: &str) -> bool {
        self.cfg.denylist.iter().any(|d| title.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Rect;
    use std::sync::Mutex;

    struct MockWindows {
        windows: Mutex<Vec<TargetWindow>>,
        foreground: Mutex<Option<TargetWindow>>,
    }

    impl MockWindows {
        fn new() -> Self {
            Self {
                windows: Mutex::new(Vec::new()),
                foreground: Mutex::new(None),
            }
        }

        fn add(&self, title: &str, handle: WindowHandle, width: i32) -> TargetWindow {
            let win = TargetWindow {
                title: title.to_string(),
                handle,
                rect: Rect::new(0, 0, width, 600),
                foreground: false,
                minimized: false,
            };
            self.windows.lock().unwrap().push(win.clone());
            win
        }

        fn set_foreground(&self, win: Option<TargetWindow>) {
            *self.foreground.lock().unwrap() = win;
        }

        fn remove(&self, handle: WindowHandle) {
            self.windows.lock().unwrap().retain(|w| w.handle != handle);
        }
    }

    impl WindowSystem for MockWindows {
        fn list_windows(&self) -> Vec<TargetWindow> {
            self.windows.lock().unwrap().clone()
        }
        fn foreground_window(&self) -> Option<TargetWindow> {
            self.foreground.lock().unwrap().clone()
        }
        fn activate(&self, _: WindowHandle) -> anyhow::Result<()> {
            Ok(())
        }
        fn move_window(&self, _: WindowHandle, _: Rect) -> anyhow::Result<()> {
            Ok(())
        }
        fn close_window(&self, _: WindowHandle) -> anyhow::Result<()> {
            Ok(())
        }
        fn work_area_at(&self, _: i32, _: i32) -> Rect {
            Rect::new(0, 0, 1920, 1080)
        }
    }

    fn tracker() -> WindowTracker {
        WindowTracker::new(TrackerConfig::default(), 15, EngineKind::Auto)
    }

    #[test]
    fn test_auto_follow_accepts_foreground() {
        let ws = MockWindows::new();
        let win = ws.add("Editor", 1, 800);
        ws.set_foreground(Some(win.clone()));

        let t = tracker();
        assert_eq!(t.resolve(&ws).unwrap().title, "Editor");
        assert_eq!(t.displayed_title().as_deref(), Some("Editor"));
    }

    #[test]
    fn test_auto_follow_rejects_denylisted_with_stickiness() {
        let ws = MockWindows::new();
        let editor = ws.add("Editor", 1, 800);
        let shell = ws.add("Program Manager", 2, 1920);
        ws.set_foreground(Some(editor.clone()));

        let t = tracker();
        t.resolve(&ws).unwrap();

        // Control surface grabs focus; target must not flip.
        ws.set_foreground(Some(shell));
        assert_eq!(t.resolve(&ws).unwrap().title, "Editor");
        assert_eq!(t.lock_info().mode, LockMode::Auto);
    }

    #[test]
    fn test_hard_lock_survives_foreground_changes() {
        let ws = MockWindows::new();
        ws.add("Editor", 1, 800);
        let other = ws.add("Browser", 2, 800);

        let t = tracker();
        t.lock("Editor");
        for _ in 0..10 {
            ws.set_foreground(Some(other.clone()));
            assert_eq!(t.resolve(&ws).unwrap().title, "Editor");
            assert_eq!(t.lock_info().mode, LockMode::Hard);
        }

        t.unlock();
        assert_eq!(t.lock_info().mode, LockMode::Auto);
    }

    #[test]
    fn test_soft_lock_set_by_first_interaction_only_while_auto() {
        let ws = MockWindows::new();
        let editor = ws.add("Editor", 1, 800);
        ws.set_foreground(Some(editor));

        let t = tracker();
        t.resolve(&ws).unwrap();
        t.note_interaction();
        assert_eq!(t.lock_info().mode, LockMode::Soft);
        assert_eq!(t.lock_info().title.as_deref(), Some("Editor"));

        // A second interaction must not re-lock or change the title.
        t.lock("Editor");
        t.note_interaction();
        assert_eq!(t.lock_info().mode, LockMode::Hard);
    }

    #[test]
    fn test_soft_lock_auto_releases_on_foreign_foreground() {
        let ws = MockWindows::new();
        let editor = ws.add("Editor", 1, 800);
        let browser = ws.add("Browser", 2, 800);
        ws.set_foreground(Some(editor));

        let t = tracker();
        t.resolve(&ws).unwrap();
        t.note_interaction();
        assert_eq!(t.lock_info().mode, LockMode::Soft);

        // Denylisted foreground does not release the soft lock.
        ws.set_foreground(Some(TargetWindow {
            title: "Program Manager".into(),
            handle: 9,
            rect: Rect::new(0, 0, 1920, 1080),
            foreground: true,
            minimized: false,
        }));
        t.resolve(&ws).unwrap();
        assert_eq!(t.lock_info().mode, LockMode::Soft);

        // A genuine new foreground window releases it.
        ws.set_foreground(Some(browser));
        assert_eq!(t.resolve(&ws).unwrap().title, "Browser");
        assert_eq!(t.lock_info().mode, LockMode::Auto);
    }

    #[test]
    fn test_soft_release_policy_can_be_disabled() {
        let cfg = TrackerConfig {
            auto_release: false,
            ..TrackerConfig::default()
        };
        let ws = MockWindows::new();
        let editor = ws.add("Editor", 1, 800);
        let browser = ws.add("Browser", 2, 800);
        ws.set_foreground(Some(editor));

        let t = WindowTracker::new(cfg, 15, EngineKind::Auto);
        t.resolve(&ws).unwrap();
        t.note_interaction();

        ws.set_foreground(Some(browser));
        assert_eq!(t.resolve(&ws).unwrap().title, "Editor");
        assert_eq!(t.lock_info().mode, LockMode::Soft);
    }

    #[test]
    fn test_locked_resolution_prefers_exact_match() {
        let ws = MockWindows::new();
        ws.add("Untitled - Notepad", 1, 800);
        ws.add("Notepad", 2, 800);

        let t = tracker();
        t.lock("Notepad");
        let resolved = t.resolve(&ws).unwrap();
        assert_eq!(resolved.title, "Notepad");
        assert_eq!(resolved.handle, 2);
    }

    #[test]
    fn test_locked_resolution_substring_fallback_then_not_found() {
        let ws = MockWindows::new();
        ws.add("Untitled - Notepad", 1, 800);

        let t = tracker();
        t.lock("Notepad");
        assert_eq!(t.resolve(&ws).unwrap().handle, 1);

        ws.remove(1);
        assert!(matches!(
            t.resolve(&ws),
            Err(AppError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_locked_resolution_follows_cached_handle_through_retitle() {
        let ws = MockWindows::new();
        ws.add("report.txt - Notepad", 1, 800);

        let t = tracker();
        t.lock("Notepad");
        assert_eq!(t.resolve(&ws).unwrap().handle, 1);

        // Same window, new title: the cached handle keeps it resolved
        // even though the locked title no longer matches.
        ws.remove(1);
        ws.add("draft.md - Editor", 1, 800);
        assert_eq!(t.resolve(&ws).unwrap().title, "draft.md - Editor");
    }

    #[test]
    fn test_enumeration_filters_narrow_windows() {
        let ws = MockWindows::new();
        ws.add("Tooltip", 1, 40);
        ws.add("Editor", 2, 800);

        let t = tracker();
        let listed = t.list_candidates(&ws);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Editor");
    }

    #[test]
    fn test_lock_current_requires_displayed_window() {
        let ws = MockWindows::new();
        let t = tracker();
        assert!(t.lock_current().is_err());

        let editor = ws.add("Editor", 1, 800);
        ws.set_foreground(Some(editor));
        t.resolve(&ws).unwrap();
        assert_eq!(t.lock_current().unwrap(), "Editor");
        assert_eq!(t.lock_info().mode, LockMode::Hard);
    }

    #[test]
    fn test_pending_activation_consumed_once() {
        let t = tracker();
        t.lock("Editor");
        assert!(t.take_pending_activation());
        assert!(!t.take_pending_activation());
    }

    #[test]
    fn test_fps_clamped() {
        let t = tracker();
        assert_eq!(t.set_fps(0), 1);
        assert_eq!(t.set_fps(120), 60);
        assert_eq!(t.fps(), 60);
    }
}
