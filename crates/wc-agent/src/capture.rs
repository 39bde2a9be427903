//! Multi-backend capture with ordered per-call fallback.
//!
//! Backends differ in speed and occlusion tolerance: duplication is the
//! fastest but single-monitor and bounds-sensitive; region grab crosses
//! monitors but not occluders; compositor capture and the legacy bitmap
//! copy tolerate occlusion at increasing cost. A backend failure falls
//! through to the next backend for that call only — the pinned engine
//! setting is never downgraded by a transient failure.

use crate::window::{Rect, WindowHandle};

// ─── Engine selection ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Try every backend in priority order.
    Auto,
    Duplication,
    Region,
    Compositor,
    Bitmap,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Duplication => "duplication",
            Self::Region => "region",
            Self::Compositor => "compositor",
            Self::Bitmap => "bitmap",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "duplication" => Some(Self::Duplication),
            "region" => Some(Self::Region),
            "compositor" => Some(Self::Compositor),
            "bitmap" => Some(Self::Bitmap),
            _ => None,
        }
    }
}

// ─── Frames and failures ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    /// Native layout of the duplication surface; only produced in fast
    /// mode.
    Bgra8,
}

/// A captured pixel buffer, rows tightly packed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Normalized RGB output.
    Default,
    /// Native raw layout, streaming sub-mode. Only honored by the
    /// duplication backend.
    Fast,
}

/// What to capture this cycle.
#[derive(Debug, Clone, Copy)]
pub struct CaptureRequest {
    pub handle: WindowHandle,
    pub rect: Rect,
    pub fast: bool,
    /// Explicitly locked targets tolerate darker legitimate content.
    pub locked: bool,
}

/// Typed capture failure. Callers treat any of these as "reuse the
/// previous frame", never as fatal.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture rectangle outside backend surface")]
    OutOfBounds,
    #[error("no new frame available")]
    NoNewFrame,
    #[error("degenerate capture rectangle")]
    DegenerateRect,
    #[error("frame rejected as black (mean luma {0:.1})")]
    BlackFrame(f32),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Backend(String),
}

// ─── Backend contract ────────────────────────────────────────────

pub trait CaptureBackend: Send {
    fn kind(&self) -> EngineKind;

    /// Capturable surface in desktop coordinates, for bounds prechecks.
    /// `None` means unbounded (window-relative backends).
    fn surface(&self) -> Option<Rect> {
        None
    }

    fn capture(&mut self, req: &CaptureRequest, mode: CaptureMode) -> Result<Frame, CaptureError>;
}

// ─── Selector ────────────────────────────────────────────────────

/// Mean-luminance thresholds for validating legacy bitmap output.
/// Locked targets may legitimately be dark; opportunistic captures of
/// a black frame almost always mean the blit silently failed.
const BLACK_LUMA_LOCKED: f32 = 2.0;
const BLACK_LUMA_AUTO: f32 = 10.0;

pub struct CaptureSelector {
    backends: Vec<Box<dyn CaptureBackend>>,
}

impl CaptureSelector {
    /// Backends must be supplied in priority order.
    pub fn new(backends: Vec<Box<dyn CaptureBackend>>) -> Self {
        Self { backends }
    }

    /// Capture the requested rectangle, trying backends in order.
    ///
    /// `engine` pins a single backend as the first candidate; `Auto`
    /// keeps the supplied priority order. Fallback applies to this call
    /// only.
    pub fn capture(
        &mut self,
        req: &CaptureRequest,
        engine: EngineKind,
    ) -> Result<Frame, CaptureError> {
        if req.rect.is_degenerate() {
            return Err(CaptureError::DegenerateRect);
        }

        let order = self.order_for(engine);
        let mut last = CaptureError::Unavailable("no capture backends".into());

        for idx in order {
            let backend = &mut self.backends[idx];
            let kind = backend.kind();

            // Bounds precheck: never even call the duplication backend
            // for a rectangle outside its surface.
            if let Some(surface) = backend.surface() {
                if !surface.contains(&req.rect) {
                    last = CaptureError::OutOfBounds;
                    continue;
                }
            }

            let mode = if req.fast && kind == EngineKind::Duplication {
                CaptureMode::Fast
            } else {
                CaptureMode::Default
            };

            match backend.capture(req, mode) {
                Ok(frame) => {
                    if kind == EngineKind::Bitmap {
                        let threshold = if req.locked {
                            BLACK_LUMA_LOCKED
                        } else {
                            BLACK_LUMA_AUTO
                        };
                        let luma = mean_luma(&frame);
                        if luma < threshold {
                            tracing::debug!(luma, threshold, "bitmap capture rejected as black");
                            last = CaptureError::BlackFrame(luma);
                            continue;
                        }
                    }
                    return Ok(frame);
                }
                // The streaming sub-mode legitimately has nothing new;
                // the caller reuses its previous frame rather than
                // paying for a slower backend.
                Err(CaptureError::NoNewFrame) => return Err(CaptureError::NoNewFrame),
                Err(e) => {
                    tracing::debug!(backend = kind.as_str(), error = %e, "capture fallthrough");
                    last = e;
                }
            }
        }

        Err(last)
    }

    /// Candidate indices for this call: the pinned backend first, then
    /// the remaining ones in priority order.
    fn order_for(&self, engine: EngineKind) -> Vec<usize> {
        match engine {
            EngineKind::Auto => (0..self.backends.len()).collect(),
            pinned => {
                let mut order: Vec<usize> = Vec::with_capacity(self.backends.len());
                order.extend(
                    self.backends
                        .iter()
                        .enumerate()
                        .filter(|(_, b)| b.kind() == pinned)
                        .map(|(i, _)| i),
                );
                order.extend(
                    self.backends
                        .iter()
                        .enumerate()
                        .filter(|(_, b)| b.kind() != pinned)
                        .map(|(i, _)| i),
                );
                order
            }
        }
    }
}

/// Mean luminance over the frame, sampling every 16th pixel.
pub fn mean_luma(frame: &Frame) -> f32 {
    let bpp = match frame.format {
        PixelFormat::Rgb8 => 3,
        PixelFormat::Bgra8 => 4,
    };
    let mut sum = 0u64;
    let mut count = 0u64;
    for px in frame.data.chunks_exact(bpp).step_by(16) {
        // Channel order does not matter for an unweighted mean.
        sum += px[0] as u64 + px[1] as u64 + px[2] as u64;
        count += 3;
    }
    if count == 0 {
        return 0.0;
    }
    sum as f32 / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeBackend {
        kind: EngineKind,
        surface: Option<Rect>,
        result: Box<dyn FnMut() -> Result<Frame, CaptureError> + Send>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        fn build(
            kind: EngineKind,
            surface: Option<Rect>,
            result: impl FnMut() -> Result<Frame, CaptureError> + Send + 'static,
        ) -> (Box<dyn CaptureBackend>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    kind,
                    surface,
                    result: Box::new(result),
                    calls: calls.clone(),
                }),
                calls,
            )
        }

        fn new(
            kind: EngineKind,
            result: impl FnMut() -> Result<Frame, CaptureError> + Send + 'static,
        ) -> (Box<dyn CaptureBackend>, Arc<AtomicUsize>) {
            Self::build(kind, None, result)
        }

        fn with_surface(
            kind: EngineKind,
            surface: Rect,
            result: impl FnMut() -> Result<Frame, CaptureError> + Send + 'static,
        ) -> (Box<dyn CaptureBackend>, Arc<AtomicUsize>) {
            Self::build(kind, Some(surface), result)
        }
    }

    impl CaptureBackend for FakeBackend {
        fn kind(&self) -> EngineKind {
            self.kind
        }
        fn surface(&self) -> Option<Rect> {
            self.surface
        }
        fn capture(&mut self, _: &CaptureRequest, _: CaptureMode) -> Result<Frame, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn frame_with_luma(value: u8) -> Frame {
        Frame {
            data: vec![value; 64 * 64 * 3],
            width: 64,
            height: 64,
            format: PixelFormat::Rgb8,
        }
    }

    fn request(rect: Rect) -> CaptureRequest {
        CaptureRequest {
            handle: 1,
            rect,
            fast: false,
            locked: false,
        }
    }

    #[test]
    fn test_out_of_bounds_never_reaches_duplication() {
        let (dup, dup_calls) = FakeBackend::with_surface(
            EngineKind::Duplication,
            Rect::new(0, 0, 1920, 1080),
            || Ok(frame_with_luma(128)),
        );
        let (region, region_calls) =
            FakeBackend::new(EngineKind::Region, || Ok(frame_with_luma(128)));
        let mut sel = CaptureSelector::new(vec![dup, region]);

        // Rectangle straddles the surface edge: duplication must be
        // short-circuited, region must serve the call.
        let out = sel
            .capture(&request(Rect::new(1800, 0, 400, 300)), EngineKind::Auto)
            .unwrap();
        assert_eq!(out.width, 64);
        assert_eq!(dup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(region_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fallback_is_per_call_only() {
        let mut fail_once = true;
        let (dup, dup_calls) = FakeBackend::with_surface(
            EngineKind::Duplication,
            Rect::new(0, 0, 1920, 1080),
            move || {
                if std::mem::take(&mut fail_once) {
                    Err(CaptureError::Backend("device lost".into()))
                } else {
                    Ok(frame_with_luma(128))
                }
            },
        );
        let (region, region_calls) =
            FakeBackend::new(EngineKind::Region, || Ok(frame_with_luma(128)));
        let mut sel = CaptureSelector::new(vec![dup, region]);
        let req = request(Rect::new(0, 0, 800, 600));

        // First call falls through to region.
        sel.capture(&req, EngineKind::Auto).unwrap();
        assert_eq!(region_calls.load(Ordering::SeqCst), 1);

        // Second call retries duplication — no permanent downgrade.
        sel.capture(&req, EngineKind::Auto).unwrap();
        assert_eq!(dup_calls.load(Ordering::SeqCst), 2);
        assert_eq!(region_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pinned_engine_tried_first_then_falls_through() {
        let (dup, dup_calls) = FakeBackend::new(EngineKind::Duplication, || {
            Ok(frame_with_luma(128))
        });
        let (bitmap, bitmap_calls) = FakeBackend::new(EngineKind::Bitmap, || {
            Err(CaptureError::Backend("blit failed".into()))
        });
        let mut sel = CaptureSelector::new(vec![dup, bitmap]);

        let out = sel.capture(&request(Rect::new(0, 0, 100, 100)), EngineKind::Bitmap);
        assert!(out.is_ok());
        assert_eq!(bitmap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dup_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_black_frame_threshold_depends_on_lock() {
        // Luma 5 sits between the locked (2) and opportunistic (10)
        // thresholds.
        let (bitmap, _) = FakeBackend::new(EngineKind::Bitmap, || Ok(frame_with_luma(5)));
        let mut sel = CaptureSelector::new(vec![bitmap]);

        let mut req = request(Rect::new(0, 0, 100, 100));
        req.locked = true;
        assert!(sel.capture(&req, EngineKind::Auto).is_ok());

        req.locked = false;
        assert!(matches!(
            sel.capture(&req, EngineKind::Auto),
            Err(CaptureError::BlackFrame(_))
        ));
    }

    #[test]
    fn test_no_new_frame_short_circuits_fallback() {
        let (dup, _) = FakeBackend::with_surface(
            EngineKind::Duplication,
            Rect::new(0, 0, 1920, 1080),
            || Err(CaptureError::NoNewFrame),
        );
        let (region, region_calls) =
            FakeBackend::new(EngineKind::Region, || Ok(frame_with_luma(128)));
        let mut sel = CaptureSelector::new(vec![dup, region]);

        assert!(matches!(
            sel.capture(&request(Rect::new(0, 0, 100, 100)), EngineKind::Auto),
            Err(CaptureError::NoNewFrame)
        ));
        assert_eq!(region_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_degenerate_rect_rejected_before_backends() {
        let (dup, calls) = FakeBackend::new(EngineKind::Duplication, || {
            Ok(frame_with_luma(128))
        });
        let mut sel = CaptureSelector::new(vec![dup]);
        assert!(matches!(
            sel.capture(&request(Rect::new(0, 0, 0, 100)), EngineKind::Auto),
            Err(CaptureError::DegenerateRect)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fast_mode_only_honored_by_duplication() {
        struct ModeProbe {
            kind: EngineKind,
            seen: Arc<Mutex<Vec<CaptureMode>>>,
        }
        use std::sync::Mutex;
        impl CaptureBackend for ModeProbe {
            fn kind(&self) -> EngineKind {
                self.kind
            }
            fn capture(
                &mut self,
                _: &CaptureRequest,
                mode: CaptureMode,
            ) -> Result<Frame, CaptureError> {
                self.seen.lock().unwrap().push(mode);
                Err(CaptureError::Backend("probe".into()))
            }
        }

        let dup_seen = Arc::new(Mutex::new(Vec::new()));
        let region_seen = Arc::new(Mutex::new(Vec::new()));
        let mut sel = CaptureSelector::new(vec![
            Box::new(ModeProbe {
                kind: EngineKind::Duplication,
                seen: dup_seen.clone(),
            }),
            Box::new(ModeProbe {
                kind: EngineKind::Region,
                seen: region_seen.clone(),
            }),
        ]);

        let mut req = request(Rect::new(0, 0, 100, 100));
        req.fast = true;
        let _ = sel.capture(&req, EngineKind::Auto);

        assert_eq!(dup_seen.lock().unwrap().as_slice(), &[CaptureMode::Fast]);
        assert_eq!(
            region_seen.lock().unwrap().as_slice(),
            &[CaptureMode::Default]
        );
    }

    #[test]
    fn test_mean_luma() {
        assert!(mean_luma(&frame_with_luma(0)) < 0.5);
        let mid = mean_luma(&frame_with_luma(100));
        assert!((mid - 100.0).abs() < 0.5);
    }
}
