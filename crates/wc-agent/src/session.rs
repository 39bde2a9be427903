//! Per-connection streaming session.
//!
//! Two tasks joined by one bounded queue: a receiver parsing inbound
//! command messages (producer) and the capture-encode-send loop
//! (consumer). Each cycle drains every queued command so a burst lands
//! within a single frame interval, then sends one frame and sleeps the
//! remainder of the cadence. Only transport disconnect ends a session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use wc_common::AppError;
use wc_protocol::{CommandAction, ControlCommand, FrameMeta, StreamMessage};

use crate::capture::{CaptureError, CaptureRequest, CaptureSelector, EngineKind};
use crate::encoder::{EncodedFrame, EncoderChain};
use crate::input::{EnigoBackend, InputInjector};
use crate::platform;
use crate::state::AppState;

type WsSender = futures_util::stream::SplitSink<WebSocket, Message>;

/// Backoff after a failed cycle before trying again.
const CYCLE_BACKOFF: Duration = Duration::from_millis(100);

/// Per-session capture-and-encode stage. Both halves block (duplication
/// frame waits, GDI blits, subprocess pipe writes), so the session ships
/// the whole stage to the blocking pool each cycle.
struct FramePipeline {
    selector: CaptureSelector,
    encoders: EncoderChain,
}

impl FramePipeline {
    /// Capture and encode one frame. `Ok(None)` means skip this cycle:
    /// nothing new, or a transient capture failure.
    fn produce(
        &mut self,
        req: &CaptureRequest,
        engine: EngineKind,
        fps: u32,
    ) -> Result<Option<(EncodedFrame, u32, u32)>, AppError> {
        let frame = match self.selector.capture(req, engine) {
            Ok(frame) => frame,
            // Nothing new or a transient failure: the client keeps its
            // previous frame.
            Err(CaptureError::NoNewFrame) => return Ok(None),
            Err(e) => {
                tracing::debug!(error = %e, "capture failed, skipping frame");
                return Ok(None);
            }
        };

        self.encoders.set_fps(fps);
        let encoded = self
            .encoders
            .encode(&frame)
            .map_err(|e| AppError::EncodeFailed(e.to_string()))?;
        Ok(Some((encoded, frame.width, frame.height)))
    }
}

pub struct StreamSession {
    id: Uuid,
    state: Arc<AppState>,
    /// Taken for the duration of each blocking capture+encode hop.
    pipeline: Option<FramePipeline>,
    injector: Option<InputInjector>,
}

impl StreamSession {
    pub fn new(state: Arc<AppState>) -> Self {
        let pipeline = FramePipeline {
            selector: CaptureSelector::new(platform::capture_backends()),
            encoders: EncoderChain::from_probe(
                &state.probe,
                state.config.stream.stream_quality,
                state.tracker.fps(),
            ),
        };
        let injector = match EnigoBackend::new() {
            Ok(backend) => Some(InputInjector::new(Box::new(backend))),
            Err(e) => {
                tracing::warn!(error = %e, "input backend unavailable, commands will be rejected");
                None
            }
        };

        Self {
            id: Uuid::new_v4(),
            state,
            pipeline: Some(pipeline),
            injector,
        }
    }

    pub async fn run(mut self, socket: WebSocket) {
        tracing::info!(session = %self.id, "stream session opened");

        let (mut sender, mut receiver) = socket.split();

        // Initial status snapshot so the client can render lock/fps
        // state before the first frame arrives.
        let status = StreamMessage::Status(self.state.status());
        if self.send_json(&mut sender, &status).await.is_err() {
            tracing::info!(session = %self.id, "stream session closed before status snapshot");
            return;
        }

        let (tx, mut rx) =
            mpsc::channel::<ControlCommand>(self.state.config.stream.queue_capacity);

        // Receiver task: parse inbound commands onto the bounded queue.
        // Overflow rejects the new command; the receiver never blocks.
        let recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ControlCommand>(text.as_str()) {
                            Ok(cmd) => {
                                if let Err(mpsc::error::TrySendError::Full(cmd)) = tx.try_send(cmd)
                                {
                                    tracing::warn!(
                                        action = ?cmd.action,
                                        "command queue full, dropping command"
                                    );
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "ignoring unparseable command message")
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        });

        loop {
            let cycle_start = Instant::now();

            match self.cycle(&mut rx, &mut sender).await {
                Ok(()) => {}
                Err(AppError::TransportClosed) => break,
                Err(e) => {
                    // Any in-cycle failure is non-fatal: log, back off
                    // briefly, keep streaming.
                    tracing::warn!(session = %self.id, error = %e, "cycle error");
                    tokio::time::sleep(CYCLE_BACKOFF).await;
                }
            }

            let interval = frame_interval(self.state.tracker.fps());
            tokio::time::sleep(pace(interval, cycle_start.elapsed())).await;
        }

        recv_task.abort();
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.encoders.cleanup();
        }
        tracing::info!(session = %self.id, "stream session closed");
    }

    /// One cycle: drain all queued commands, then capture and send one
    /// frame.
    async fn cycle(
        &mut self,
        rx: &mut mpsc::Receiver<ControlCommand>,
        sender: &mut WsSender,
    ) -> Result<(), AppError> {
        while let Ok(cmd) = rx.try_recv() {
            if let Err(e) = self.handle_command(&cmd) {
                // Per-command failure, reported and non-fatal.
                tracing::warn!(session = %self.id, action = ?cmd.action, error = %e, "command failed");
                let report = StreamMessage::CommandError {
                    action: cmd.action,
                    message: e.to_string(),
                };
                self.send_json(sender, &report).await?;
            }
        }

        self.send_frame(sender).await
    }

    fn handle_command(&mut self, cmd: &ControlCommand) -> Result<(), AppError> {
        let tracker = &self.state.tracker;
        match cmd.action {
            CommandAction::Lock => {
                let title = cmd
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| AppError::BadRequest("lock requires a title".into()))?;
                tracker.lock(title);
                Ok(())
            }
            CommandAction::LockCurrent => tracker.lock_current().map(|_| ()),
            CommandAction::Unlock => {
                tracker.unlock();
                Ok(())
            }
            CommandAction::SetFps => {
                let fps = cmd.fps().ok_or_else(|| {
                    AppError::BadRequest("set_fps requires a numeric text value".into())
                })?;
                tracker.set_fps(fps);
                Ok(())
            }
            CommandAction::SetEngine => {
                let engine = cmd
                    .text
                    .as_deref()
                    .and_then(EngineKind::parse)
                    .ok_or_else(|| {
                        AppError::BadRequest("set_engine requires a valid engine name".into())
                    })?;
                tracker.set_engine(engine);
                Ok(())
            }
            // Launches an application; needs no resolved target and must
            // not soft-lock the window being left behind.
            CommandAction::OpenApp => {
                let injector = self.injector.as_mut().ok_or_else(|| {
                    AppError::InjectionFailed("input backend unavailable".into())
                })?;
                injector.open_app(cmd)
            }
            _ => {
                // Input commands soft-lock the displayed window on the
                // first interaction while auto-following.
                tracker.note_interaction();
                let target = tracker.resolve(self.state.windows.as_ref())?;
                let injector = self.injector.as_mut().ok_or_else(|| {
                    AppError::InjectionFailed("input backend unavailable".into())
                })?;
                injector.apply(cmd, &target, self.state.windows.as_ref())
            }
        }
    }

    async fn send_frame(&mut self, sender: &mut WsSender) -> Result<(), AppError> {
        let tracker = &self.state.tracker;

        let target = match tracker.resolve(self.state.windows.as_ref()) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(session = %self.id, error = %e, "no target this cycle");
                return Ok(());
            }
        };

        // Bring a freshly locked target to the foreground exactly once;
        // repeating this every cycle would keep stealing OS focus.
        if tracker.take_pending_activation() {
            if let Err(e) = self.state.windows.activate(target.handle) {
                tracing::warn!(session = %self.id, error = %e, "activation after lock failed");
            }
        }

        let engine = tracker.engine();
        let fps = tracker.fps();
        let req = CaptureRequest {
            handle: target.handle,
            rect: target.rect,
            // The raw fast path is only meaningful when the duplication
            // backend is pinned.
            fast: engine == EngineKind::Duplication,
            locked: tracker.is_locked(),
        };

        // Capture and encode stall for tens of milliseconds; run them on
        // the blocking pool so async workers keep serving other sessions.
        let mut pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("frame pipeline missing")))?;
        let (pipeline, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = pipeline.produce(&req, engine, fps);
            (pipeline, outcome)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
        self.pipeline = Some(pipeline);

        let Some((encoded, width, height)) = outcome? else {
            return Ok(());
        };

        let meta = FrameMeta::new(
            &target.title,
            width,
            height,
            tracker.lock_info(),
            encoded.encoder,
            encoded.format,
        );

        // Fixed wire order: metadata first, then exactly one binary
        // payload.
        self.send_json(sender, &StreamMessage::Frame(meta)).await?;
        sender
            .send(Message::Binary(encoded.bytes.into()))
            .await
            .map_err(|_| AppError::TransportClosed)?;
        Ok(())
    }

    async fn send_json(&mut self, sender: &mut WsSender, msg: &StreamMessage) -> Result<(), AppError> {
        let json = serde_json::to_string(msg).map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| AppError::TransportClosed)
    }
}

fn frame_interval(fps: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(fps.max(1)))
}

/// Self-correcting cadence: sleep whatever remains of the interval,
/// never a negative duration.
fn pace(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}
