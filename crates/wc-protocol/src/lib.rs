//! # wc-protocol
//!
//! Shared wire types for Windowcast: per-frame metadata, inbound control
//! commands, and the admin request/response bodies. Everything is plain
//! JSON — frames travel as one metadata text message immediately
//! followed by one binary payload.

use serde::{Deserialize, Serialize};

/// Protocol version constant — bump on breaking wire changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum message size (10 MB).
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Window titles in frame metadata are truncated to this many characters.
pub const MAX_TITLE_LEN: usize = 50;

/// Frame-rate bounds enforced on every set-fps path.
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;

/// Clamp a requested frame rate into the supported range.
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(MIN_FPS, MAX_FPS)
}

// ─── Lock state ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    Auto,
    Soft,
    Hard,
}

/// Lock state as reported on the wire and by `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub mode: LockMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ─── Frames ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    Jpeg,
    H264,
}

impl FrameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::H264 => "h264",
        }
    }
}

/// Metadata record preceding every binary frame payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Window title, truncated to [`MAX_TITLE_LEN`] characters.
    pub window: String,
    pub width: u32,
    pub height: u32,
    pub lock: LockInfo,
    /// Human-readable encoder id ("nvenc", "ffmpeg", "jpeg").
    pub encoder: String,
    pub format: FrameFormat,
}

impl FrameMeta {
    /// Build metadata, applying the title length bound.
    pub fn new(
        title: &str,
        width: u32,
        height: u32,
        lock: LockInfo,
        encoder: &str,
        format: FrameFormat,
    ) -> Self {
        Self {
            window: truncate_title(title),
            width,
            height,
            lock,
            encoder: encoder.to_string(),
            format,
        }
    }
}

/// Truncate a title to [`MAX_TITLE_LEN`] characters (not bytes).
pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LEN).collect()
}

/// Messages the agent sends on the stream socket besides binary frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Frame(FrameMeta),
    /// Per-command failure report; the stream itself continues.
    CommandError { action: CommandAction, message: String },
    Status(StatusResponse),
}

// ─── Commands ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Move,
    Click,
    DoubleClick,
    RightClick,
    MouseDown,
    MouseUp,
    Drag,
    Scroll,
    Type,
    Key,
    Hotkey,
    CloseWindow,
    OpenApp,
    AdaptPhone,
    ResizeWindow,
    RestoreWindow,
    Lock,
    LockCurrent,
    Unlock,
    SetFps,
    SetEngine,
}

/// One logical user input event, window-relative coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub action: CommandAction,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Free-form payload: typed text, scroll amount, "dx,dy" drag delta,
    /// hotkey combo, lock title or fps value depending on `action`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ControlCommand {
    /// Scroll amount carried in `text`; negative scrolls down.
    pub fn scroll_amount(&self) -> i32 {
        self.text
            .as_deref()
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or(-3)
    }

    /// Drag delta carried in `text` as "dx,dy".
    pub fn drag_delta(&self) -> Option<(i32, i32)> {
        let text = self.text.as_deref()?;
        let (dx, dy) = text.split_once(',')?;
        Some((dx.trim().parse().ok()?, dy.trim().parse().ok()?))
    }

    /// Window dimensions carried in `text` as "w,h"; both must be
    /// strictly positive.
    pub fn dimensions(&self) -> Option<(i32, i32)> {
        let text = self.text.as_deref()?;
        let (w, h) = text.split_once(',')?;
        let (w, h): (i32, i32) = (w.trim().parse().ok()?, h.trim().parse().ok()?);
        (w > 0 && h > 0).then_some((w, h))
    }

    /// Frame rate carried in `text`, clamped to the supported range.
    pub fn fps(&self) -> Option<u32> {
        self.text
            .as_deref()
            .and_then(|t| t.trim().parse().ok())
            .map(clamp_fps)
    }
}

// ─── Admin API bodies ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FpsRequest {
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRequest {
    pub engine: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub lock: LockInfo,
    /// Title of the window currently being displayed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub fps: u32,
    pub engine: String,
    pub encoder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowEntry {
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub foreground: bool,
    pub minimized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsResponse {
    pub windows: Vec<WindowEntry>,
}
