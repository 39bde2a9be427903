//! Frame encoding: an ordered chain of encoders with transparent
//! per-frame fallback to a baseline JPEG tier.
//!
//! Capabilities are probed once at startup ([`EncoderProbe`]). The
//! upper tiers are ffmpeg subprocesses (NVENC when the GPU encoder is
//! listed, libx264 otherwise); each owns its own frame-submission pipe
//! and is restarted when frame dimensions change. Any tier failure for
//! a given frame falls back to baseline for that frame only.

use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;

use wc_common::config::EncoderConfig;
use wc_protocol::FrameFormat;

use crate::capture::{Frame, PixelFormat};
use crate::ffmpeg;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The tier cannot serve this frame yet (pipeline warming up or
    /// re-initializing after a dimension change).
    #[error("encoder not ready")]
    NotReady,
    #[error("{0}")]
    Failed(String),
}

pub trait FrameEncoder: Send {
    fn id(&self) -> &'static str;
    fn format(&self) -> FrameFormat;
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>, EncodeError>;
    /// Adopt a new frame rate. Rate-sensitive tiers restart their
    /// pipeline; the baseline ignores this.
    fn set_fps(&mut self, _fps: u32) {}
    fn cleanup(&mut self) {}
}

/// Encoded output plus the identity of the tier that produced it.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub format: FrameFormat,
    pub encoder: &'static str,
}

// ─── Startup capability probe ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EncoderProbe {
    pub ffmpeg: Option<PathBuf>,
    pub nvenc: bool,
}

impl EncoderProbe {
    /// Probe once; not re-evaluated per frame.
    pub fn run(cfg: &EncoderConfig) -> Self {
        let ffmpeg = ffmpeg::locate(cfg.ffmpeg_path.as_deref());
        let nvenc = ffmpeg
            .as_deref()
            .map(ffmpeg::supports_nvenc)
            .unwrap_or(false);
        match &ffmpeg {
            Some(path) => {
                tracing::info!(path = %path.display(), nvenc, "external encoder available")
            }
            None => tracing::info!("no external encoder found, baseline JPEG only"),
        }
        Self { ffmpeg, nvenc }
    }

    /// Id of the best tier, for status reporting.
    pub fn primary_id(&self) -> &'static str {
        if self.nvenc {
            "nvenc"
        } else if self.ffmpeg.is_some() {
            "ffmpeg"
        } else {
            "jpeg"
        }
    }
}

// ─── Baseline JPEG tier ──────────────────────────────────────────

pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }
}

impl FrameEncoder for JpegEncoder {
    fn id(&self) -> &'static str {
        "jpeg"
    }

    fn format(&self) -> FrameFormat {
        FrameFormat::Jpeg
    }

    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        let rgb = to_rgb(frame);
        let mut buf = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode(
                &rgb,
                frame.width,
                frame.height,
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| EncodeError::Failed(e.to_string()))?;
        if buf.is_empty() {
            return Err(EncodeError::Failed("empty jpeg output".into()));
        }
        Ok(buf)
    }
}

/// Normalize a frame to tightly packed RGB8.
fn to_rgb(frame: &Frame) -> Cow<'_, [u8]> {
    match frame.format {
        PixelFormat::Rgb8 => Cow::Borrowed(&frame.data),
        PixelFormat::Bgra8 => {
            let mut rgb = Vec::with_capacity(frame.data.len() / 4 * 3);
            for px in frame.data.chunks_exact(4) {
                rgb.push(px[2]);
                rgb.push(px[1]);
                rgb.push(px[0]);
            }
            Cow::Owned(rgb)
        }
    }
}

// ─── External H.264 tiers ────────────────────────────────────────

pub struct FfmpegEncoder {
    path: PathBuf,
    codec: &'static str,
    id: &'static str,
    fps: u32,
    width: u32,
    height: u32,
    child: Option<Child>,
    output: Option<mpsc::Receiver<Vec<u8>>>,
}

impl FfmpegEncoder {
    pub fn new(path: PathBuf, codec: &'static str, id: &'static str, fps: u32) -> Self {
        Self {
            path,
            codec,
            id,
            fps,
            width: 0,
            height: 0,
            child: None,
            output: None,
        }
    }

    /// Start or restart the subprocess when dimensions change.
    fn ensure_process(&mut self, width: u32, height: u32) -> Result<(), EncodeError> {
        if self.child.is_some() && (self.width != width || self.height != height) {
            tracing::debug!(
                from = %format_args!("{}x{}", self.width, self.height),
                to = %format_args!("{width}x{height}"),
                "frame dimensions changed, restarting encoder"
            );
            self.cleanup();
        }

        if self.child.is_none() {
            self.width = width;
            self.height = height;
            let mut child = Command::new(&self.path)
                .args([
                    "-y",
                    "-f",
                    "rawvideo",
                    "-pix_fmt",
                    "rgb24",
                    "-s",
                    &format!("{width}x{height}"),
                    "-r",
                    &self.fps.to_string(),
                    "-i",
                    "-",
                    "-c:v",
                    self.codec,
                    "-preset",
                    "ultrafast",
                    "-tune",
                    "zerolatency",
                    "-f",
                    "h264",
                    "-",
                ])
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| EncodeError::Failed(format!("spawn {}: {e}", self.codec)))?;

            let mut stdout = child
                .stdout
                .take()
                .ok_or_else(|| EncodeError::Failed("no encoder stdout".into()))?;

            // Pump encoded output on a dedicated thread so encode()
            // never blocks on the pipe.
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let mut buf = [0u8; 64 * 1024];
                loop {
                    match stdout.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                    }
                }
            });

            self.child = Some(child);
            self.output = Some(rx);
        }

        Ok(())
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn id(&self) -> &'static str {
        self.id
    }

    fn format(&self) -> FrameFormat {
        FrameFormat::H264
    }

    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        self.ensure_process(frame.width, frame.height)?;
        let rgb = to_rgb(frame);

        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .ok_or_else(|| EncodeError::Failed("no encoder stdin".into()))?;
        if let Err(e) = stdin.write_all(&rgb).and_then(|_| stdin.flush()) {
            self.cleanup();
            return Err(EncodeError::Failed(format!("frame submission: {e}")));
        }

        // Drain whatever the encoder has produced so far. Nothing yet
        // means the pipeline is still priming for these dimensions.
        let rx = self
            .output
            .as_ref()
            .ok_or_else(|| EncodeError::Failed("no encoder output".into()))?;
        let mut out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            out.extend_from_slice(&chunk);
        }
        if out.is_empty() {
            return Err(EncodeError::NotReady);
        }
        Ok(out)
    }

    fn set_fps(&mut self, fps: u32) {
        if fps != self.fps {
            self.fps = fps;
            // The input rate is a spawn argument; a running subprocess
            // keeps the stale rate until restarted.
            if self.child.is_some() {
                tracing::debug!(fps, codec = self.codec, "frame rate changed, restarting encoder");
                self.cleanup();
            }
        }
    }

    fn cleanup(&mut self) {
        if let Some(mut child) = self.child.take() {
            // Closing stdin lets the process drain; kill bounds the
            // shutdown regardless.
            drop(child.stdin.take());
            let _ = child.kill();
            let _ = child.wait();
        }
        self.output = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ─── Chain ───────────────────────────────────────────────────────

pub struct EncoderChain {
    tiers: Vec<Box<dyn FrameEncoder>>,
    baseline: JpegEncoder,
}

impl EncoderChain {
    pub fn new(tiers: Vec<Box<dyn FrameEncoder>>, baseline_quality: u8) -> Self {
        Self {
            tiers,
            baseline: JpegEncoder::new(baseline_quality),
        }
    }

    /// Build the chain from the startup probe: NVENC when available,
    /// then software H.264, with baseline JPEG always last.
    pub fn from_probe(probe: &EncoderProbe, baseline_quality: u8, fps: u32) -> Self {
        let mut tiers: Vec<Box<dyn FrameEncoder>> = Vec::new();
        if let Some(path) = &probe.ffmpeg {
            if probe.nvenc {
                tiers.push(Box::new(FfmpegEncoder::new(
                    path.clone(),
                    "h264_nvenc",
                    "nvenc",
                    fps,
                )));
            }
            tiers.push(Box::new(FfmpegEncoder::new(
                path.clone(),
                "libx264",
                "ffmpeg",
                fps,
            )));
        }
        Self::new(tiers, baseline_quality)
    }

    /// Encode one frame. Never fails as long as the baseline holds:
    /// every tier error falls through for this frame only.
    pub fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        for tier in &mut self.tiers {
            match tier.encode(frame) {
                Ok(bytes) if !bytes.is_empty() => {
                    return Ok(EncodedFrame {
                        bytes,
                        format: tier.format(),
                        encoder: tier.id(),
                    });
                }
                Ok(_) => continue,
                Err(EncodeError::NotReady) => {
                    tracing::trace!(encoder = tier.id(), "tier not ready, using baseline");
                }
                Err(e) => {
                    tracing::debug!(encoder = tier.id(), error = %e, "tier failed, using baseline");
                }
            }
        }

        let bytes = self.baseline.encode(frame)?;
        Ok(EncodedFrame {
            bytes,
            format: FrameFormat::Jpeg,
            encoder: "jpeg",
        })
    }

    /// Propagate a frame-rate change to every rate-sensitive tier.
    pub fn set_fps(&mut self, fps: u32) {
        for tier in &mut self.tiers {
            tier.set_fps(fps);
        }
    }

    pub fn cleanup(&mut self) {
        for tier in &mut self.tiers {
            tier.cleanup();
        }
    }
}
