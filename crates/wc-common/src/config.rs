use serde::Deserialize;

/// Top-level application configuration.
/// Loaded from environment variables and/or config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Frame streaming settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Target tracking settings
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Capture backend settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP API / stream port (default: 8060)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Frames per second for continuous streaming (default: 15)
    #[serde(default = "default_fps")]
    pub default_fps: u32,
    /// JPEG quality for continuous streaming (default: 60)
    #[serde(default = "default_stream_quality")]
    pub stream_quality: u8,
    /// JPEG quality for one-shot snapshots (default: 85)
    #[serde(default = "default_snapshot_quality")]
    pub snapshot_quality: u8,
    /// Inbound command queue capacity per session (default: 64)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Titles never accepted as auto-follow targets. Matching is
    /// substring-based so localized decorations still hit.
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
    /// Windows narrower than this are excluded from enumeration
    /// (tooltips, menus). Default: 100.
    #[serde(default = "default_min_window_width")]
    pub min_window_width: i32,
    /// Whether a soft lock releases automatically when a new foreground
    /// window appears (default: true).
    #[serde(default = "default_auto_release")]
    pub auto_release: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Pinned capture engine: "auto", "duplication", "region",
    /// "compositor" or "bitmap" (default: auto).
    #[serde(default = "default_engine")]
    pub engine: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    /// Explicit path to the external encoder binary. When unset, PATH
    /// is searched for `ffmpeg`.
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

impl AppConfig {
    /// Load config from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("WC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            default_fps: default_fps(),
            stream_quality: default_stream_quality(),
            snapshot_quality: default_snapshot_quality(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            denylist: default_denylist(),
            min_window_width: default_min_window_width(),
            auto_release: default_auto_release(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { ffmpeg_path: None }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8060
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_fps() -> u32 {
    15
}
fn default_stream_quality() -> u8 {
    60
}
fn default_snapshot_quality() -> u8 {
    85
}
fn default_queue_capacity() -> usize {
    64
}
fn default_denylist() -> Vec<String> {
    vec!["Windowcast".to_string(), "Program Manager".to_string()]
}
fn default_min_window_width() -> i32 {
    100
}
fn default_auto_release() -> bool {
    true
}
fn default_engine() -> String {
    "auto".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").expect("empty config deserializes");
        assert_eq!(cfg.server.port, 8060);
        assert_eq!(cfg.stream.default_fps, 15);
        assert_eq!(cfg.stream.stream_quality, 60);
        assert_eq!(cfg.stream.snapshot_quality, 85);
        assert!(cfg.tracker.auto_release);
        assert_eq!(cfg.capture.engine, "auto");
        assert!(cfg
            .tracker
            .denylist
            .iter()
            .any(|t| t == "Program Manager"));
    }
}
