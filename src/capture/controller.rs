use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::capture::backend::CaptureBackend;
use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{
    CaptureDevice, CaptureInput, GraphSnapshot, InputId, OutputId, SessionConfiguration,
    SessionPreset,
};
use crate::output::{OutputAttachment, PhotoDelegate, PhotoRequestId};

const CONTROLLER: &str = "capture graph controller";

enum Command {
    AddInput(CaptureInput, oneshot::Sender<bool>),
    RemoveInput(InputId, oneshot::Sender<bool>),
    AddOutput(OutputAttachment, oneshot::Sender<bool>),
    RemoveOutput(OutputId, oneshot::Sender<bool>),
    ApplyPreset(SessionPreset, oneshot::Sender<bool>),
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<GraphSnapshot>),
    Devices(oneshot::Sender<Result<Vec<CaptureDevice>>>),
    CapturePhoto(PhotoRequestId, PhotoDelegate, oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Serialized owner of one capture graph.
///
/// The backend lives on a dedicated `capture-graph` thread; every public
/// method queues a command and awaits its reply, so configuration brackets
/// never overlap no matter how many tasks call in concurrently.
///
/// Rejected configuration is not an error: the graph stays as it was, a
/// warning is logged, and the call resolves to `Ok(false)`.
pub struct CaptureController {
    commands: mpsc::UnboundedSender<Command>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureController {
    /// Move `backend` onto a new worker thread and apply the initial
    /// configuration.
    pub fn spawn(backend: Box<dyn CaptureBackend>, config: SessionConfiguration) -> Result<Self> {
        let (commands, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(backend.is_running()));
        let worker = {
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("capture-graph".to_string())
                .spawn(move || run_worker(backend, config, rx, running))
                .map_err(|e| CaptureError::Worker(e.to_string()))?
        };
        Ok(Self {
            commands,
            running,
            worker: Some(worker),
        })
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| CaptureError::Closed(CONTROLLER))?;
        rx.await.map_err(|_| CaptureError::Closed(CONTROLLER))
    }

    /// Add an input. Resolves to `false` if the graph rejected it.
    pub async fn add_input(&self, input: CaptureInput) -> Result<bool> {
        self.request(|tx| Command::AddInput(input, tx)).await
    }

    /// Remove an input. Resolves to `false` if it was not in the graph.
    pub async fn remove_input(&self, id: InputId) -> Result<bool> {
        self.request(|tx| Command::RemoveInput(id, tx)).await
    }

    pub async fn add_output(&self, output: OutputAttachment) -> Result<bool> {
        self.request(|tx| Command::AddOutput(output, tx)).await
    }

    pub async fn remove_output(&self, id: OutputId) -> Result<bool> {
        self.request(|tx| Command::RemoveOutput(id, tx)).await
    }

    /// Switch presets if the graph supports `preset`.
    pub async fn apply_preset(&self, preset: SessionPreset) -> Result<bool> {
        self.request(|tx| Command::ApplyPreset(preset, tx)).await
    }

    /// Start the graph. Starting a running graph does nothing.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Stop the graph. Stopping a stopped graph does nothing.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        self.request(Command::Snapshot).await
    }

    pub async fn devices(&self) -> Result<Vec<CaptureDevice>> {
        self.request(Command::Devices).await?
    }

    /// Ask the backend for a still photo. On failure the request is also
    /// completed without a value so its waiter wakes.
    pub async fn capture_photo(
        &self,
        request: PhotoRequestId,
        delegate: PhotoDelegate,
    ) -> Result<()> {
        let fallback = delegate.clone();
        let result = async {
            self.request(|tx| Command::CapturePhoto(request, delegate, tx))
                .await?
        }
        .await;
        if let Err(e) = &result {
            fallback.fail(request, e.to_string());
        }
        result
    }

    /// Last running state reported by the worker.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop the graph and wait for the worker thread to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| CaptureError::Worker(e.to_string()))?
                .map_err(|_| CaptureError::Worker("capture-graph thread panicked".to_string()))?;
        }
        Ok(())
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(
    mut backend: Box<dyn CaptureBackend>,
    config: SessionConfiguration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    running: Arc<AtomicBool>,
) {
    info!(target: "capture::controller", "capture-graph worker starting");
    if let Some(preset) = config.preset {
        apply_preset(backend.as_mut(), preset);
    }

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::AddInput(input, reply) => {
                let _ = reply.send(add_input(backend.as_mut(), input));
            }
            Command::RemoveInput(id, reply) => {
                let _ = reply.send(remove_input(backend.as_mut(), id));
            }
            Command::AddOutput(output, reply) => {
                let _ = reply.send(add_output(backend.as_mut(), output));
            }
            Command::RemoveOutput(id, reply) => {
                let _ = reply.send(remove_output(backend.as_mut(), id));
            }
            Command::ApplyPreset(preset, reply) => {
                let _ = reply.send(apply_preset(backend.as_mut(), preset));
            }
            Command::Start(reply) => {
                if backend.is_running() {
                    debug!(target: "capture::controller", "start ignored, already running");
                } else {
                    backend.start_running();
                    info!(target: "capture::controller", "capture graph started");
                }
                running.store(backend.is_running(), Ordering::Release);
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                stop(backend.as_mut(), &running);
                let _ = reply.send(());
            }
            Command::Snapshot(reply) => {
                let mut snapshot = backend.snapshot();
                snapshot.interrupted = backend.is_interrupted();
                let _ = reply.send(snapshot);
            }
            Command::Devices(reply) => {
                let _ = reply.send(backend.devices());
            }
            Command::CapturePhoto(request, delegate, reply) => {
                debug!(target: "capture::controller", "capturing {request}");
                let _ = reply.send(backend.capture_photo(request, delegate));
            }
            Command::Shutdown => break,
        }
    }

    stop(backend.as_mut(), &running);
    info!(target: "capture::controller", "capture-graph worker exiting");
}

fn stop(backend: &mut dyn CaptureBackend, running: &AtomicBool) {
    if backend.is_running() {
        backend.stop_running();
        info!(target: "capture::controller", "capture graph stopped");
    }
    running.store(backend.is_running(), Ordering::Release);
}

/// Run `mutate` inside one configuration bracket.
fn configure(backend: &mut dyn CaptureBackend, mutate: impl FnOnce(&mut dyn CaptureBackend)) {
    backend.begin_configuration();
    mutate(&mut *backend);
    backend.commit_configuration();
}

fn add_input(backend: &mut dyn CaptureBackend, input: CaptureInput) -> bool {
    if !backend.can_add_input(&input) {
        warn!(
            target: "capture::controller",
            "input {} ({}) rejected by current configuration", input.id, input.device.id
        );
        return false;
    }
    let (id, device) = (input.id, input.device.id.clone());
    configure(backend, |b| b.add_input(input));
    info!(target: "capture::controller", "added input {id} ({device})");
    true
}

fn remove_input(backend: &mut dyn CaptureBackend, id: InputId) -> bool {
    if !backend.contains_input(id) {
        debug!(target: "capture::controller", "remove ignored, {id} not in graph");
        return false;
    }
    configure(backend, |b| b.remove_input(id));
    info!(target: "capture::controller", "removed input {id}");
    true
}

fn add_output(backend: &mut dyn CaptureBackend, output: OutputAttachment) -> bool {
    let descriptor = output.descriptor;
    if !backend.can_add_output(&descriptor) {
        warn!(
            target: "capture::controller",
            "{:?} output {} rejected by current configuration", descriptor.kind, descriptor.id
        );
        return false;
    }
    configure(backend, |b| b.add_output(output));
    info!(target: "capture::controller", "added {:?} output {}", descriptor.kind, descriptor.id);
    true
}

fn remove_output(backend: &mut dyn CaptureBackend, id: OutputId) -> bool {
    if !backend.contains_output(id) {
        debug!(target: "capture::controller", "remove ignored, {id} not in graph");
        return false;
    }
    configure(backend, |b| b.remove_output(id));
    info!(target: "capture::controller", "removed output {id}");
    true
}

fn apply_preset(backend: &mut dyn CaptureBackend, preset: SessionPreset) -> bool {
    if !backend.can_set_preset(preset) {
        warn!(
            target: "capture::controller",
            "preset {} not supported, keeping current", preset.as_id_str()
        );
        return false;
    }
    configure(backend, |b| b.set_preset(preset));
    info!(target: "capture::controller", "applied preset {}", preset.as_id_str());
    true
}
