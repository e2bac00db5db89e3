//! Procedural rendering dispatch.
//!
//! A procedural load prefers a render worker that owns a transferred canvas.
//! When workers are unsupported, or once a worker failed to obtain a drawing
//! context, renderers run on the engine thread instead. Renderers without a
//! module get the literal-text builtin.
//!
//! A worker failing for any other reason sends the engine to the slideshow
//! once. From then on this dispatcher keeps renderers on the engine thread,
//! so an empty slideshow falling back to the primary renderer settles there.

use std::sync::Arc;

use super::mode::{RendererConfig, RendererKind, SLIDESHOW_KEYWORD};
use super::renderers::{self, BUILTIN_TEXT, Renderer};
use super::shared::SharedState;
use super::worker::{WorkerChannel, WorkerEvent, WorkerMessage, WorkerSpawner};
use crate::constants::CONTEXT_FAILURE_MARKER;
use crate::platform::surface::{Canvas, HostSurface, Rect};

/// Result of a dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A render worker is drawing.
    Offscreen,
    /// A renderer module is drawing on the engine thread.
    SameThread,
    /// The literal-text builtin is shown.
    Builtin,
    /// Rendering failed; switch the session to this selector.
    Degrade(&'static str),
    /// Rendering failed and there is nothing safer to switch to.
    Failed,
}

enum Active {
    Worker {
        kind: RendererKind,
        channel: WorkerChannel,
        config: RendererConfig,
        events_open: bool,
    },
    SameThread {
        renderer: Box<dyn Renderer>,
        canvas: Canvas,
    },
}

/// Owns the active procedural renderer of one engine.
pub struct ProceduralDispatch {
    surface: Arc<dyn HostSurface>,
    workers: Arc<dyn WorkerSpawner>,
    shared: Arc<SharedState>,
    device_pixel_ratio: f64,
    worker_failed: bool,
    active: Option<Active>,
}

impl ProceduralDispatch {
    /// Creates a dispatcher with nothing rendered.
    #[must_use]
    pub fn new(
        surface: Arc<dyn HostSurface>,
        workers: Arc<dyn WorkerSpawner>,
        shared: Arc<SharedState>,
        device_pixel_ratio: f64,
    ) -> Self {
        Self {
            surface,
            workers,
            shared,
            device_pixel_ratio,
            worker_failed: false,
            active: None,
        }
    }

    /// Renderer currently drawing, and whether it runs on a worker.
    #[must_use]
    pub fn active(&self) -> Option<(RendererKind, bool)> {
        match &self.active {
            Some(Active::Worker { kind, .. }) => Some((*kind, true)),
            Some(Active::SameThread { renderer, .. }) => Some((renderer.kind(), false)),
            None => None,
        }
    }

    /// Renders `config` with `kind`.
    ///
    /// With `keep_existing_surface`, a matching active renderer is updated in
    /// place: a worker only receives the new config.
    pub fn render(
        &mut self,
        kind: RendererKind,
        config: &RendererConfig,
        keep_existing_surface: bool,
    ) -> DispatchOutcome {
        if keep_existing_surface && let Some(outcome) = self.update_in_place(kind, config) {
            return outcome;
        }

        self.teardown();

        if self.workers.offscreen_supported() && !self.shared.offscreen_failed() && !self.worker_failed {
            if let Some(channel) = self.workers.spawn(kind) {
                let canvas = self.surface.create_canvas();
                let message = WorkerMessage::Render {
                    canvas: Some(canvas),
                    config: config.clone(),
                    device_pixel_ratio: self.device_pixel_ratio,
                };

                match channel.post(message) {
                    Ok(()) => {
                        tracing::debug!(renderer = %kind, "rendering on worker");
                        self.active = Some(Active::Worker {
                            kind,
                            channel,
                            config: config.clone(),
                            events_open: true,
                        });
                        return DispatchOutcome::Offscreen;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "worker rejected canvas, rendering in place");
                        self.surface.remove_canvas();
                    }
                }
            }
        } else {
            tracing::trace!(renderer = %kind, "off-thread rendering unavailable");
        }

        self.render_same_thread(kind, config)
    }

    fn update_in_place(&mut self, kind: RendererKind, config: &RendererConfig) -> Option<DispatchOutcome> {
        match self.active.as_mut()? {
            Active::Worker {
                kind: active_kind,
                channel,
                config: active_config,
                ..
            } if *active_kind == kind => {
                let message = WorkerMessage::Render {
                    canvas: None,
                    config: config.clone(),
                    device_pixel_ratio: self.device_pixel_ratio,
                };
                match channel.post(message) {
                    Ok(()) => {
                        *active_config = config.clone();
                        Some(DispatchOutcome::Offscreen)
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "worker gone, rendering from scratch");
                        None
                    }
                }
            }
            Active::SameThread { renderer, canvas } if renderer.kind() == kind => {
                match renderers::guarded(|| renderer.render(canvas, config)) {
                    Ok(()) => Some(DispatchOutcome::SameThread),
                    Err(err) => {
                        tracing::debug!(error = %err, "in-place update failed, rendering from scratch");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn render_same_thread(&mut self, kind: RendererKind, config: &RendererConfig) -> DispatchOutcome {
        let (mut renderer, builtin) = match renderers::same_thread_module(kind) {
            Some(factory) => (factory(), false),
            None => (renderers::text_banner(BUILTIN_TEXT), true),
        };
        let canvas = self.surface.create_canvas();

        match renderers::guarded(|| renderer.render(&canvas, config)) {
            Ok(()) => {
                tracing::debug!(renderer = %kind, builtin, "rendering on engine thread");
                self.active = Some(Active::SameThread { renderer, canvas });
                if builtin { DispatchOutcome::Builtin } else { DispatchOutcome::SameThread }
            }
            Err(err) => {
                let _ = renderers::guarded(|| {
                    renderer.destroy();
                    Ok(())
                });
                self.surface.remove_canvas();

                if kind == RendererKind::PRIMARY {
                    tracing::error!(renderer = %kind, error = %err, "primary renderer failed");
                    DispatchOutcome::Failed
                } else {
                    tracing::warn!(renderer = %kind, error = %err, "renderer failed, using primary");
                    DispatchOutcome::Degrade(RendererKind::PRIMARY.name())
                }
            }
        }
    }

    /// Waits for the next event from the active worker.
    ///
    /// A worker that stops while still active is reported as an error event.
    /// Never resolves while no worker is listening.
    pub async fn next_worker_event(&mut self) -> WorkerEvent {
        if let Some(Active::Worker {
            kind,
            channel,
            events_open,
            ..
        }) = self.active.as_mut()
            && *events_open
        {
            if let Some(event) = channel.next_event().await {
                return event;
            }
            *events_open = false;
            return WorkerEvent::error(format!("Render worker for {kind} stopped unexpectedly"));
        }

        futures::future::pending().await
    }

    /// Reacts to a worker event.
    ///
    /// A drawing-context failure disables workers for the process and renders
    /// again on the engine thread. The retry never reaches a worker, so it
    /// happens at most once. Any other failure degrades to the slideshow and
    /// keeps this dispatcher off workers. Returns `None` when the event needs
    /// no action.
    pub fn on_worker_event(&mut self, event: &WorkerEvent) -> Option<DispatchOutcome> {
        if !event.is_error() {
            tracing::trace!(kind = %event.kind, "ignoring worker event");
            return None;
        }

        let Some(Active::Worker { kind, config, .. }) = &self.active else {
            return None;
        };
        let (kind, config) = (*kind, config.clone());

        if !event.message.contains(CONTEXT_FAILURE_MARKER) {
            tracing::warn!(renderer = %kind, message = %event.message, "render worker failed");
            self.worker_failed = true;
            self.teardown();
            return Some(DispatchOutcome::Degrade(SLIDESHOW_KEYWORD));
        }

        if self.shared.mark_offscreen_failed() {
            tracing::warn!(message = %event.message, "worker has no drawing context, disabling off-thread rendering");
        }

        self.teardown();
        Some(self.render_same_thread(kind, &config))
    }

    /// Forwards a new host size to the active worker.
    ///
    /// Only the canvas presentation size changes on the host side. Returns
    /// whether anything was forwarded.
    pub fn resize(&self, bounds: Rect) -> bool {
        let Some(Active::Worker { channel, .. }) = &self.active else {
            return false;
        };

        let message = WorkerMessage::Resize {
            width: bounds.width,
            height: bounds.height,
        };
        if let Err(err) = channel.post(message) {
            tracing::debug!(error = %err, "resize not delivered");
        }
        self.surface.resize_canvas_presentation(bounds.width, bounds.height);
        true
    }

    /// Removes the canvas and runs the active renderer's teardown hook.
    pub fn teardown(&mut self) {
        match self.active.take() {
            Some(Active::SameThread { mut renderer, .. }) => renderer.destroy(),
            // Dropping the channel stops the worker, which tears its renderer down.
            Some(Active::Worker { .. }) | None => {}
        }
        self.surface.remove_canvas();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::surface::MemorySurface;
    use crate::wallpaper::mode::{GlyphConfig, WavesConfig};
    use crate::wallpaper::worker::ScriptedWorkers;

    struct Fixture {
        surface: MemorySurface,
        workers: ScriptedWorkers,
        shared: Arc<SharedState>,
        dispatch: ProceduralDispatch,
    }

    fn fixture(offscreen: bool) -> Fixture {
        let surface = MemorySurface::new(64.0, 48.0);
        let workers = ScriptedWorkers::new(offscreen);
        let shared = Arc::new(SharedState::new());
        let dispatch = ProceduralDispatch::new(
            Arc::new(surface.clone()),
            Arc::new(workers.clone()),
            Arc::clone(&shared),
            1.0,
        );
        Fixture {
            surface,
            workers,
            shared,
            dispatch,
        }
    }

    fn waves() -> RendererConfig { RendererConfig::Waves(WavesConfig::default()) }

    #[test]
    fn test_worker_receives_canvas_and_config() {
        let mut f = fixture(true);
        assert_eq!(f.dispatch.render(RendererKind::Vanta, &waves(), false), DispatchOutcome::Offscreen);

        let messages = f.workers.take_messages(0);
        assert_eq!(messages.len(), 1);
        let WorkerMessage::Render {
            canvas,
            device_pixel_ratio,
            ..
        } = &messages[0]
        else {
            panic!("expected render message");
        };
        assert!(canvas.is_some());
        assert!((device_pixel_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(f.dispatch.active(), Some((RendererKind::Vanta, true)));
    }

    #[test]
    fn test_keep_existing_surface_posts_config_only() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);
        f.workers.take_messages(0);

        assert_eq!(f.dispatch.render(RendererKind::Vanta, &waves(), true), DispatchOutcome::Offscreen);
        let messages = f.workers.take_messages(0);
        assert!(matches!(messages.as_slice(), [WorkerMessage::Render { canvas: None, .. }]));
        assert_eq!(f.surface.snapshot().canvases_created, 1);
        assert_eq!(f.workers.spawned().len(), 1);
    }

    #[test]
    fn test_unsupported_offscreen_renders_in_place() {
        let mut f = fixture(false);
        assert_eq!(f.dispatch.render(RendererKind::Vanta, &waves(), false), DispatchOutcome::SameThread);
        assert!(f.workers.spawned().is_empty());
        assert!(f.surface.snapshot().canvas.is_some());
    }

    #[test]
    fn test_same_thread_only_renderer_skips_worker() {
        let mut f = fixture(true);
        let outcome = f.dispatch.render(RendererKind::Hexells, &RendererConfig::None, false);
        assert_eq!(outcome, DispatchOutcome::SameThread);
        assert!(f.workers.spawned().is_empty());
    }

    #[test]
    fn test_missing_module_uses_text_builtin() {
        let mut f = fixture(true);
        let outcome = f.dispatch.render(RendererKind::L33t, &RendererConfig::None, false);
        assert_eq!(outcome, DispatchOutcome::Builtin);
        let canvas = f.surface.snapshot().canvas.unwrap();
        assert_eq!(canvas.pixels().caption(), Some(BUILTIN_TEXT));
    }

    #[test]
    fn test_context_failure_downgrades_once() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);

        let outcome = f
            .dispatch
            .on_worker_event(&WorkerEvent::error("Failed to execute 'getContext'"));
        assert_eq!(outcome, Some(DispatchOutcome::SameThread));
        assert!(f.shared.offscreen_failed());
        assert_eq!(f.dispatch.active(), Some((RendererKind::Vanta, false)));
        assert_eq!(f.surface.snapshot().canvases_created, 2);

        // Later loads stay on the engine thread.
        f.dispatch.render(RendererKind::Matrix, &RendererConfig::Glyphs(GlyphConfig {
            animation_speed: 1.0,
            volumetric: true,
            fall_speed: None,
            forward_speed: None,
        }), false);
        assert_eq!(f.workers.spawned(), vec![RendererKind::Vanta]);
    }

    #[test]
    fn test_other_worker_errors_degrade_to_slideshow() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Matrix, &RendererConfig::None, false);
        let outcome = f.dispatch.on_worker_event(&WorkerEvent::error("shader compile failed"));
        assert_eq!(outcome, Some(DispatchOutcome::Degrade("SLIDESHOW")));
        assert!(!f.shared.offscreen_failed());
    }

    #[test]
    fn test_failed_worker_keeps_later_renders_in_place() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Matrix, &RendererConfig::None, false);
        f.dispatch.on_worker_event(&WorkerEvent::error("WebGL not supported"));
        assert!(f.surface.snapshot().canvas.is_none());

        // The slideshow came up empty and the engine asked for the primary renderer.
        assert_eq!(f.dispatch.render(RendererKind::Vanta, &waves(), false), DispatchOutcome::SameThread);
        assert_eq!(f.workers.spawned(), vec![RendererKind::Matrix]);
        assert!(!f.shared.offscreen_failed());
    }

    #[test]
    fn test_events_after_context_downgrade_are_ignored() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);
        f.dispatch.on_worker_event(&WorkerEvent::error("getContext returned null"));

        assert!(!f.workers.emit(0, WorkerEvent::error("getContext returned null")));
        assert_eq!(f.dispatch.on_worker_event(&WorkerEvent::error("getContext returned null")), None);
        assert_eq!(f.dispatch.active(), Some((RendererKind::Vanta, false)));
        assert_eq!(f.surface.snapshot().canvases_created, 2);
    }

    /// Spawns workers that accept messages but never report back.
    #[derive(Default)]
    struct VanishingWorkers {
        inboxes: parking_lot::Mutex<Vec<tokio::sync::mpsc::UnboundedReceiver<WorkerMessage>>>,
    }

    impl WorkerSpawner for VanishingWorkers {
        fn offscreen_supported(&self) -> bool { true }

        fn spawn(&self, kind: RendererKind) -> Option<WorkerChannel> {
            let (sender, inbox) = tokio::sync::mpsc::unbounded_channel();
            let (_, events) = tokio::sync::mpsc::unbounded_channel();
            self.inboxes.lock().push(inbox);
            Some(WorkerChannel::new(kind, sender, events))
        }
    }

    #[tokio::test]
    async fn test_stopped_worker_is_reported_as_error() {
        let surface = MemorySurface::new(64.0, 48.0);
        let mut dispatch = ProceduralDispatch::new(
            Arc::new(surface),
            Arc::new(VanishingWorkers::default()),
            Arc::new(SharedState::new()),
            1.0,
        );
        assert_eq!(dispatch.render(RendererKind::Vanta, &waves(), false), DispatchOutcome::Offscreen);

        let event = dispatch.next_worker_event().await;
        assert!(event.is_error());
        assert_eq!(
            dispatch.on_worker_event(&event),
            Some(DispatchOutcome::Degrade("SLIDESHOW"))
        );
    }

    #[test]
    fn test_non_error_events_are_ignored() {
        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);
        let event = WorkerEvent {
            kind: "[ready]".to_string(),
            message: String::new(),
        };
        assert_eq!(f.dispatch.on_worker_event(&event), None);
    }

    #[test]
    fn test_same_thread_failure_degrades_to_primary() {
        let surface = MemorySurface::new(0.0, 0.0);
        let mut dispatch = ProceduralDispatch::new(
            Arc::new(surface.clone()),
            Arc::new(ScriptedWorkers::new(false)),
            Arc::new(SharedState::new()),
            1.0,
        );

        let outcome = dispatch.render(RendererKind::Hexells, &RendererConfig::None, false);
        assert_eq!(outcome, DispatchOutcome::Degrade("VANTA"));
        assert_eq!(dispatch.render(RendererKind::Vanta, &waves(), false), DispatchOutcome::Failed);
        assert!(surface.snapshot().canvas.is_none());
    }

    #[test]
    fn test_resize_only_reaches_workers() {
        let mut f = fixture(false);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);
        assert!(!f.dispatch.resize(Rect::sized(100.0, 100.0)));

        let mut f = fixture(true);
        f.dispatch.render(RendererKind::Vanta, &waves(), false);
        f.workers.take_messages(0);
        assert!(f.dispatch.resize(Rect::sized(100.0, 80.0)));
        assert!(matches!(
            f.workers.take_messages(0).as_slice(),
            [WorkerMessage::Resize { width, height }] if (*width - 100.0).abs() < f64::EPSILON && (*height - 80.0).abs() < f64::EPSILON
        ));
        assert_eq!(f.surface.snapshot().canvas_presentation, Some((100.0, 80.0)));
    }

    #[test]
    fn test_teardown_removes_canvas() {
        let mut f = fixture(false);
        f.dispatch.render(RendererKind::CoastalLandscape, &RendererConfig::None, false);
        f.dispatch.teardown();
        assert!(f.surface.snapshot().canvas.is_none());
        assert_eq!(f.dispatch.active(), None);
    }
}
