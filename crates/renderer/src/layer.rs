//! Async heatmap layer.
//!
//! One tokio task owns a [`HeatmapRenderer`]; any number of cloned
//! [`LayerHandle`]s drive it over a command channel. Each command renders
//! the fast pass right away and restarts the refinement deadline, so a
//! burst of edits produces one refined frame once the edits stop.
//!
//! Frames are published on a `watch` channel (latest wins) and render
//! events on a `broadcast` channel.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use field_common::{BoundaryShape, DataContainer, FieldError, FieldResult, PointSet, SubscriptionId};
use interpolation::{CacheStats, Kernel};

use crate::config::HeatmapConfig;
use crate::heatmap::{HeatmapImage, HeatmapRenderer, RenderEvent};
use crate::quality::Quality;
use crate::refine::RefinementTimer;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Heatmap layer has shut down")]
    Closed,
}

pub type LayerResult<T> = std::result::Result<T, LayerError>;

type Reply<T> = oneshot::Sender<T>;

/// Latest published frame, `None` while nothing can be rendered.
pub type Frame = Option<Arc<HeatmapImage>>;

enum Command {
    SetData(PointSet),
    SetBoundary(BoundaryShape, Reply<FieldResult<()>>),
    SetAutoFit(bool),
    SetColorRange(f64, f64, Reply<FieldResult<()>>),
    SetAutoColorRange,
    SetColormap(String, Reply<FieldResult<()>>),
    SetNeighbors(Option<usize>, Reply<FieldResult<()>>),
    SetKernel(Kernel),
    SetEpsilon(f64, Reply<FieldResult<()>>),
    SetQuality(Quality),
    SetTargetRenderTime(f64, Reply<FieldResult<()>>),
    SetExcludedIndices(Vec<usize>),
    AddExcludedIndex(usize),
    RemoveExcludedIndex(usize),
    ClearExcludedIndices,
    RefineNow(Reply<Option<RenderEvent>>),
    CacheStats(Reply<CacheStats>),
    AdaptiveGridSize(Reply<f64>),
    Shutdown(Reply<()>),
}

pub struct HeatmapLayer {
    renderer: HeatmapRenderer,
    timer: RefinementTimer<Instant>,
    commands: mpsc::UnboundedReceiver<Command>,
    frames: watch::Sender<Frame>,
    events: broadcast::Sender<RenderEvent>,
}

impl HeatmapLayer {
    /// Validate `config` and start the layer task on the current runtime.
    pub fn spawn(config: HeatmapConfig) -> FieldResult<LayerHandle> {
        let delay = Duration::from_millis(config.refine_delay_ms);
        let renderer = HeatmapRenderer::new(config)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(None);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let layer = HeatmapLayer {
            renderer,
            timer: RefinementTimer::new(delay),
            commands: command_rx,
            frames: frame_tx,
            events: event_tx.clone(),
        };
        tokio::spawn(layer.run());

        Ok(LayerHandle {
            commands: command_tx,
            frames: frame_rx,
            events: event_tx,
        })
    }

    async fn run(mut self) {
        info!(delay_ms = self.timer.delay().as_millis() as u64, "Heatmap layer started");

        loop {
            let deadline = self.timer.deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.timer.fire_if_due(Instant::now()) {
                        let event = self.renderer.refine();
                        self.publish(event);
                    }
                }
            }
        }

        info!("Heatmap layer stopped");
    }

    fn handle(&mut self, command: Command) {
        let r = &mut self.renderer;
        let event = match command {
            Command::SetData(data) => r.update_data(data),
            Command::SetBoundary(shape, reply) => respond(r.set_boundary(&shape), reply),
            Command::SetAutoFit(enabled) => r.set_auto_fit(enabled),
            Command::SetColorRange(min, max, reply) => respond(r.set_color_range(min, max), reply),
            Command::SetAutoColorRange => r.set_auto_color_range(),
            Command::SetColormap(name, reply) => respond(r.set_colormap(&name), reply),
            Command::SetNeighbors(k, reply) => respond(r.set_neighbors(k), reply),
            Command::SetKernel(kernel) => r.set_kernel(kernel),
            Command::SetEpsilon(eps, reply) => respond(r.set_epsilon(eps), reply),
            Command::SetQuality(quality) => r.set_quality(quality),
            Command::SetTargetRenderTime(ms, reply) => respond(r.set_target_render_time(ms), reply),
            Command::SetExcludedIndices(indices) => r.set_excluded_indices(indices),
            Command::AddExcludedIndex(i) => r.add_excluded_index(i),
            Command::RemoveExcludedIndex(i) => r.remove_excluded_index(i),
            Command::ClearExcludedIndices => r.clear_excluded_indices(),
            Command::RefineNow(reply) => {
                self.timer.cancel();
                let _ = r.take_refinement_request();
                let event = r.refine();
                let _ = reply.send(event);
                event
            }
            Command::CacheStats(reply) => {
                let _ = reply.send(r.cache_stats());
                return;
            }
            Command::AdaptiveGridSize(reply) => {
                let _ = reply.send(r.controller().adaptive_size());
                return;
            }
            Command::Shutdown(_) => return,
        };

        if self.renderer.take_refinement_request() {
            let deadline = self.timer.schedule(Instant::now());
            debug!(?deadline, "Refinement rescheduled");
        }
        self.publish(event);
    }

    fn publish(&self, event: Option<RenderEvent>) {
        match event {
            Some(event) => {
                let frame = self.renderer.image().cloned().map(Arc::new);
                self.frames.send_replace(frame);
                // No subscribers is fine
                let _ = self.events.send(event);
            }
            None if self.renderer.image().is_none() => {
                self.frames.send_if_modified(|frame| frame.take().is_some());
            }
            None => {}
        }
    }
}

/// Forward a setter's outcome to the caller; an error renders nothing.
fn respond(
    result: FieldResult<Option<RenderEvent>>,
    reply: Reply<FieldResult<()>>,
) -> Option<RenderEvent> {
    match result {
        Ok(event) => {
            let _ = reply.send(Ok(()));
            event
        }
        Err(e) => {
            let _ = reply.send(Err(e));
            None
        }
    }
}

/// Cloneable handle to a running [`HeatmapLayer`].
#[derive(Clone)]
pub struct LayerHandle {
    commands: mpsc::UnboundedSender<Command>,
    frames: watch::Receiver<Frame>,
    events: broadcast::Sender<RenderEvent>,
}

impl LayerHandle {
    fn send(&self, command: Command) -> LayerResult<()> {
        self.commands.send(command).map_err(|_| LayerError::Closed)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> LayerResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(command(tx))?;
        rx.await.map_err(|_| LayerError::Closed)
    }

    async fn apply(&self, command: impl FnOnce(Reply<FieldResult<()>>) -> Command) -> LayerResult<()> {
        Ok(self.request(command).await??)
    }

    pub fn set_data(&self, data: PointSet) -> LayerResult<()> {
        self.send(Command::SetData(data))
    }

    /// Push the container's current data and forward every later change.
    pub fn attach(&self, container: &mut DataContainer) -> LayerResult<SubscriptionId> {
        self.set_data(container.snapshot())?;
        let commands = self.commands.clone();
        Ok(container.subscribe(move |data, version| {
            if commands.send(Command::SetData(data.clone())).is_err() {
                debug!(version, "Layer closed, dropping data update");
            }
        }))
    }

    pub async fn set_boundary(&self, shape: BoundaryShape) -> LayerResult<()> {
        self.apply(|reply| Command::SetBoundary(shape, reply)).await
    }

    pub fn set_auto_fit(&self, enabled: bool) -> LayerResult<()> {
        self.send(Command::SetAutoFit(enabled))
    }

    pub async fn set_color_range(&self, min: f64, max: f64) -> LayerResult<()> {
        self.apply(|reply| Command::SetColorRange(min, max, reply)).await
    }

    pub fn set_auto_color_range(&self) -> LayerResult<()> {
        self.send(Command::SetAutoColorRange)
    }

    pub async fn set_colormap(&self, name: impl Into<String>) -> LayerResult<()> {
        let name = name.into();
        self.apply(|reply| Command::SetColormap(name, reply)).await
    }

    pub async fn set_neighbors(&self, neighbors: Option<usize>) -> LayerResult<()> {
        self.apply(|reply| Command::SetNeighbors(neighbors, reply)).await
    }

    pub fn set_kernel(&self, kernel: Kernel) -> LayerResult<()> {
        self.send(Command::SetKernel(kernel))
    }

    pub async fn set_epsilon(&self, epsilon: f64) -> LayerResult<()> {
        self.apply(|reply| Command::SetEpsilon(epsilon, reply)).await
    }

    pub fn set_quality(&self, quality: Quality) -> LayerResult<()> {
        self.send(Command::SetQuality(quality))
    }

    pub async fn set_target_render_time(&self, ms: f64) -> LayerResult<()> {
        self.apply(|reply| Command::SetTargetRenderTime(ms, reply)).await
    }

    pub fn set_excluded_indices(&self, indices: impl IntoIterator<Item = usize>) -> LayerResult<()> {
        self.send(Command::SetExcludedIndices(indices.into_iter().collect()))
    }

    pub fn add_excluded_index(&self, index: usize) -> LayerResult<()> {
        self.send(Command::AddExcludedIndex(index))
    }

    pub fn remove_excluded_index(&self, index: usize) -> LayerResult<()> {
        self.send(Command::RemoveExcludedIndex(index))
    }

    pub fn clear_excluded_indices(&self) -> LayerResult<()> {
        self.send(Command::ClearExcludedIndices)
    }

    /// Skip the debounce and render the refined pass now.
    pub async fn refine_now(&self) -> LayerResult<Option<RenderEvent>> {
        self.request(Command::RefineNow).await
    }

    pub async fn cache_stats(&self) -> LayerResult<CacheStats> {
        self.request(Command::CacheStats).await
    }

    pub async fn adaptive_grid_size(&self) -> LayerResult<f64> {
        self.request(Command::AdaptiveGridSize).await
    }

    /// Watch receiver for published frames.
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    pub fn latest_frame(&self) -> Frame {
        self.frames.borrow().clone()
    }

    /// Subscribe to render events emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<RenderEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Stop the layer task and wait for it to exit.
    pub async fn shutdown(&self) -> LayerResult<()> {
        self.request(Command::Shutdown).await
    }
}

impl std::fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
