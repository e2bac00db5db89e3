//! Off-engine-thread render channels.
//!
//! A render worker owns a canvas moved to it in the first [`WorkerMessage::Render`]
//! and reports failures back as [`WorkerEvent`]s whose type is `[error]`. The
//! engine never shares memory with a worker beyond the canvas it handed over.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use super::mode::{RendererConfig, RendererKind};
use super::renderers::{self, Renderer};
use crate::constants::WORKER_ERROR_TYPE;
use crate::platform::surface::{Canvas, Rect};
use crate::platform::thread::spawn_named_thread;

/// Errors raised while talking to a worker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The worker has stopped.
    #[error("Render worker for {0} is gone")]
    Closed(RendererKind),
}

/// Messages accepted by a render worker.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Render `config`. The first render of a worker carries the canvas.
    Render {
        /// Canvas transferred to the worker.
        canvas: Option<Canvas>,
        /// Renderer parameters.
        config: RendererConfig,
        /// Device pixel ratio.
        device_pixel_ratio: f64,
    },
    /// Host region changed size.
    Resize {
        /// New width in CSS pixels.
        width: f64,
        /// New height in CSS pixels.
        height: f64,
    },
}

/// Event emitted by a render worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEvent {
    /// Event type. `[error]` signals failure.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

impl WorkerEvent {
    /// Builds an error event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: WORKER_ERROR_TYPE.to_string(),
            message: message.into(),
        }
    }

    /// Whether this event reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool { self.kind == WORKER_ERROR_TYPE }
}

/// Engine-side end of a render worker.
///
/// Dropping the channel stops the worker.
#[derive(Debug)]
pub struct WorkerChannel {
    kind: RendererKind,
    sender: mpsc::UnboundedSender<WorkerMessage>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl WorkerChannel {
    /// Wraps the two ends of a worker connection.
    #[must_use]
    pub const fn new(
        kind: RendererKind,
        sender: mpsc::UnboundedSender<WorkerMessage>,
        events: mpsc::UnboundedReceiver<WorkerEvent>,
    ) -> Self {
        Self { kind, sender, events }
    }

    /// Renderer running in the worker.
    #[must_use]
    pub const fn kind(&self) -> RendererKind { self.kind }

    /// Posts a message.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the worker has stopped.
    pub fn post(&self, message: WorkerMessage) -> Result<(), ChannelError> {
        self.sender.send(message).map_err(|_| ChannelError::Closed(self.kind))
    }

    /// Waits for the next event. `None` once the worker has stopped.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> { self.events.recv().await }
}

/// Creates render workers.
pub trait WorkerSpawner: Send + Sync {
    /// Whether off-engine-thread rendering is available at all.
    fn offscreen_supported(&self) -> bool;

    /// Starts a worker for `kind`. `None` when the renderer has no worker module.
    fn spawn(&self, kind: RendererKind) -> Option<WorkerChannel>;
}

/// Runs each worker on its own named OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadWorkerSpawner;

impl WorkerSpawner for ThreadWorkerSpawner {
    fn offscreen_supported(&self) -> bool { true }

    fn spawn(&self, kind: RendererKind) -> Option<WorkerChannel> {
        let factory = renderers::worker_module(kind)?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let (event_sender, events) = mpsc::unbounded_channel();
        let thread_name = format!("render-{}", kind.name().to_lowercase());

        spawn_named_thread(&thread_name, move || run_worker(factory(), receiver, &event_sender))?;

        Some(WorkerChannel::new(kind, sender, events))
    }
}

/// Worker loop. Exits when the engine drops its end of the channel.
///
/// Renderer failures, panics included, are reported as `[error]` events.
fn run_worker(
    mut renderer: Box<dyn Renderer>,
    mut receiver: mpsc::UnboundedReceiver<WorkerMessage>,
    events: &mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut canvas: Option<Canvas> = None;
    let mut device_pixel_ratio = 1.0;

    while let Some(message) = receiver.blocking_recv() {
        let result = match message {
            WorkerMessage::Render {
                canvas: transferred,
                config,
                device_pixel_ratio: ratio,
            } => {
                device_pixel_ratio = ratio;
                if transferred.is_some() {
                    canvas = transferred;
                }
                canvas
                    .as_ref()
                    .map(|canvas| renderers::guarded(|| renderer.render(canvas, &config)))
            }
            WorkerMessage::Resize { width, height } => canvas.as_ref().map(|canvas| {
                let (width, height) =
                    Rect::sized(width * device_pixel_ratio, height * device_pixel_ratio).pixel_size();
                renderers::guarded(|| renderer.resize(canvas, width, height))
            }),
        };

        if let Some(Err(err)) = result {
            tracing::debug!(renderer = %renderer.kind(), error = %err, "render worker failed");
            if events.send(WorkerEvent::error(err.to_string())).is_err() {
                break;
            }
        }
    }

    let kind = renderer.kind();
    if renderers::guarded(|| {
        renderer.destroy();
        Ok(())
    })
    .is_err()
    {
        tracing::debug!(renderer = %kind, "renderer teardown panicked");
    }
    tracing::trace!(renderer = %kind, "render worker stopped");
}

#[derive(Debug, Default)]
struct ScriptedState {
    spawned: Vec<RendererKind>,
    inboxes: Vec<mpsc::UnboundedReceiver<WorkerMessage>>,
    outboxes: Vec<mpsc::UnboundedSender<WorkerEvent>>,
}

/// Workers that never render and let the caller drive events.
///
/// Every posted message is kept for inspection, and events can be injected
/// into any spawned worker. Useful for headless hosts and tests.
#[derive(Debug, Clone)]
pub struct ScriptedWorkers {
    supported: bool,
    state: Arc<Mutex<ScriptedState>>,
}

impl Default for ScriptedWorkers {
    fn default() -> Self { Self::new(true) }
}

impl ScriptedWorkers {
    /// Creates a spawner. `supported = false` simulates a host without
    /// off-thread rendering.
    #[must_use]
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            state: Arc::new(Mutex::new(ScriptedState::default())),
        }
    }

    /// Renderers spawned so far, in order.
    #[must_use]
    pub fn spawned(&self) -> Vec<RendererKind> { self.state.lock().spawned.clone() }

    /// Drains messages posted to the `index`th worker.
    #[must_use]
    pub fn take_messages(&self, index: usize) -> Vec<WorkerMessage> {
        let mut state = self.state.lock();
        let Some(inbox) = state.inboxes.get_mut(index) else {
            return Vec::new();
        };

        let mut messages = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Emits `event` from the `index`th worker. Returns whether anyone listened.
    pub fn emit(&self, index: usize, event: WorkerEvent) -> bool {
        self.state
            .lock()
            .outboxes
            .get(index)
            .is_some_and(|outbox| outbox.send(event).is_ok())
    }
}

impl WorkerSpawner for ScriptedWorkers {
    fn offscreen_supported(&self) -> bool { self.supported }

    fn spawn(&self, kind: RendererKind) -> Option<WorkerChannel> {
        renderers::worker_module(kind)?;

        let (sender, inbox) = mpsc::unbounded_channel();
        let (outbox, events) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.spawned.push(kind);
        state.inboxes.push(inbox);
        state.outboxes.push(outbox);

        Some(WorkerChannel::new(kind, sender, events))
    }
}
