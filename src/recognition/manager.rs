use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, trace};

use crate::capture::error::{CaptureError, Result};
use crate::geometry::{CoordinateTransform, Placement, SensorOrigin, Size};
use crate::output::{DetectionEvent, DetectionKind, OutputStream};
use crate::recognition::identity::{Identity, IdentityPolicy, DEFAULT_FALLBACK_IDENTITY};
use crate::recognition::set::{RecognitionMode, RecognizedEntry, RecognizedSet, Sighting};

const MANAGER: &str = "recognition manager";

/// Expiry used by [`RecognitionConfig::single`].
pub const SINGLE_EXPIRY: Duration = Duration::from_millis(1000);
/// Expiry used by [`RecognitionConfig::multi`].
pub const MULTI_EXPIRY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub mode: RecognitionMode,
    /// How long an identity survives without a new sighting.
    pub expiry: Duration,
    pub fallback_identity: String,
    /// Ignore every kind except machine-readable codes.
    pub codes_only: bool,
}

impl RecognitionConfig {
    pub fn single() -> Self {
        Self {
            mode: RecognitionMode::Single,
            expiry: SINGLE_EXPIRY,
            fallback_identity: DEFAULT_FALLBACK_IDENTITY.to_string(),
            codes_only: false,
        }
    }

    pub fn multi() -> Self {
        Self {
            mode: RecognitionMode::Multi,
            expiry: MULTI_EXPIRY,
            fallback_identity: DEFAULT_FALLBACK_IDENTITY.to_string(),
            codes_only: false,
        }
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_codes_only(mut self, codes_only: bool) -> Self {
        self.codes_only = codes_only;
        self
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::multi()
    }
}

enum Message {
    Observe(DetectionEvent),
    Expire(Identity, u64),
    Settled(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// One pending expiry per identity.
///
/// Dropping the map aborts every timer, so a torn-down worker leaves none
/// behind.
#[derive(Default)]
struct ExpiryTimers {
    pending: HashMap<Identity, (u64, AbortHandle)>,
}

impl ExpiryTimers {
    fn schedule(
        &mut self,
        identity: Identity,
        generation: u64,
        after: Duration,
        messages: mpsc::WeakUnboundedSender<Message>,
    ) {
        let fired = identity.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(messages) = messages.upgrade() {
                let _ = messages.send(Message::Expire(fired, generation));
            }
        });
        if let Some((_, previous)) = self
            .pending
            .insert(identity, (generation, task.abort_handle()))
        {
            previous.abort();
        }
    }

    fn cancel(&mut self, identity: &Identity) {
        if let Some((_, timer)) = self.pending.remove(identity) {
            timer.abort();
        }
    }

    /// Forget a timer that has fired, unless it was already replaced.
    fn fired(&mut self, identity: &Identity, generation: u64) {
        if self
            .pending
            .get(identity)
            .is_some_and(|(pending, _)| *pending == generation)
        {
            self.pending.remove(identity);
        }
    }

    fn cancel_all(&mut self) {
        for (_, (_, timer)) in self.pending.drain() {
            timer.abort();
        }
    }

    fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ExpiryTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct Worker {
    config: RecognitionConfig,
    policy: IdentityPolicy,
    set: RecognizedSet,
    timers: ExpiryTimers,
    published: watch::Sender<Vec<RecognizedEntry>>,
    pending_timers: watch::Sender<usize>,
    messages: mpsc::WeakUnboundedSender<Message>,
}

impl Worker {
    fn publish(&self) {
        self.published.send_replace(self.set.entries().to_vec());
        self.pending_timers.send_replace(self.timers.len());
    }

    fn observe(&mut self, event: DetectionEvent) {
        if self.config.codes_only && event.kind() != DetectionKind::MachineReadableCode {
            trace!(target: "recognition", "ignoring {} detection", event.kind());
            return;
        }
        let identity = self.policy.identify(&event);
        let sighting = self.set.observe(identity.clone(), event);
        match &sighting {
            Sighting::Inserted { evicted, .. } => {
                if let Some(evicted) = evicted {
                    self.timers.cancel(evicted);
                    debug!(target: "recognition", "{evicted} replaced by {identity}");
                }
                info!(target: "recognition", "recognized {identity}");
            }
            Sighting::Refreshed { .. } => {
                trace!(target: "recognition", "refreshed {identity}");
            }
        }
        self.timers.schedule(
            identity,
            sighting.generation(),
            self.config.expiry,
            self.messages.clone(),
        );
        self.publish();
    }

    fn expire(&mut self, identity: Identity, generation: u64) {
        self.timers.fired(&identity, generation);
        if self.set.expire(&identity, generation) {
            info!(target: "recognition", "{identity} expired");
            self.publish();
        } else {
            trace!(target: "recognition", "stale expiry for {identity} ignored");
        }
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.set.clear();
        self.publish();
        debug!(target: "recognition", "recognition worker torn down");
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = rx.recv().await {
            match message {
                Message::Observe(event) => self.observe(event),
                Message::Expire(identity, generation) => self.expire(identity, generation),
                Message::Settled(reply) => {
                    let _ = reply.send(());
                }
                Message::Shutdown(reply) => {
                    self.teardown();
                    let _ = reply.send(());
                    return;
                }
            }
        }
        self.teardown();
    }
}

/// Tracks which objects are currently recognized.
///
/// A single worker task owns the recognized set and one expiry timer per
/// identity; everything else talks to it through messages, and reads the
/// published snapshot. Every sighting resets its identity's timer, and a
/// timer only removes the entry if no sighting happened since it was armed.
pub struct RecognitionManager {
    config: RecognitionConfig,
    messages: mpsc::UnboundedSender<Message>,
    published: watch::Receiver<Vec<RecognizedEntry>>,
    pending_timers: watch::Receiver<usize>,
    runtime: Handle,
    worker: JoinHandle<()>,
    feeders: Mutex<Vec<JoinHandle<()>>>,
}

impl RecognitionManager {
    /// Start the worker on the current Tokio runtime.
    pub fn spawn(config: RecognitionConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| CaptureError::Worker(e.to_string()))?;
        let (messages, rx) = mpsc::unbounded_channel();
        let (published_tx, published) = watch::channel(Vec::new());
        let (timers_tx, pending_timers) = watch::channel(0);
        let worker = Worker {
            policy: IdentityPolicy::new(config.fallback_identity.clone()),
            set: RecognizedSet::new(config.mode),
            timers: ExpiryTimers::default(),
            published: published_tx,
            pending_timers: timers_tx,
            messages: messages.downgrade(),
            config: config.clone(),
        };
        info!(
            target: "recognition",
            "recognition started ({:?}, expiry {:?})", config.mode, config.expiry
        );
        Ok(Self {
            worker: runtime.spawn(worker.run(rx)),
            runtime,
            config,
            messages,
            published,
            pending_timers,
            feeders: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Queue a detection.
    pub fn observe(&self, event: DetectionEvent) -> Result<()> {
        self.messages
            .send(Message::Observe(event))
            .map_err(|_| CaptureError::Closed(MANAGER))
    }

    /// Drain `stream` into this manager on a background task until the
    /// stream ends or the manager goes away. Callable from any thread; the
    /// feeder runs on the runtime the manager was spawned on.
    pub fn attach(&self, mut stream: OutputStream<DetectionEvent>) {
        let messages = self.messages.downgrade();
        let feeder = self.runtime.spawn(async move {
            while let Some(event) = stream.next().await {
                let Some(messages) = messages.upgrade() else {
                    break;
                };
                if messages.send(Message::Observe(event)).is_err() {
                    break;
                }
            }
            debug!(target: "recognition", "detection feed for {} ended", stream.label());
        });
        self.feeders.lock().push(feeder);
    }

    /// Resolves once every message queued before this call is processed.
    pub async fn settled(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.messages
            .send(Message::Settled(tx))
            .map_err(|_| CaptureError::Closed(MANAGER))?;
        rx.await.map_err(|_| CaptureError::Closed(MANAGER))
    }

    /// Recognized entries in first-seen order.
    pub fn entries(&self) -> Vec<RecognizedEntry> {
        self.published.borrow().clone()
    }

    /// The most recently recognized entry.
    pub fn current(&self) -> Option<RecognizedEntry> {
        self.published.borrow().last().cloned()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.published
            .borrow()
            .iter()
            .any(|e| &e.identity == identity)
    }

    pub fn get(&self, identity: &Identity) -> Option<RecognizedEntry> {
        self.published
            .borrow()
            .iter()
            .find(|e| &e.identity == identity)
            .cloned()
    }

    /// Snapshots published after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<RecognizedEntry>> {
        self.published.clone()
    }

    /// Expiry timers currently armed.
    pub fn pending_timers(&self) -> usize {
        *self.pending_timers.borrow()
    }

    /// Where `identity` should be drawn, computed fresh from its latest
    /// detection. `None` if it is not recognized or the view is unmeasured.
    pub fn placement(
        &self,
        identity: &Identity,
        transform: &CoordinateTransform,
        view: Option<Size>,
    ) -> Option<Placement> {
        let bounds = self.get(identity)?.event.bounds();
        transform.placement(bounds, SensorOrigin::TopLeft, view?)
    }

    pub fn current_placement(
        &self,
        transform: &CoordinateTransform,
        view: Option<Size>,
    ) -> Option<Placement> {
        let bounds = self.current()?.event.bounds();
        transform.placement(bounds, SensorOrigin::TopLeft, view?)
    }

    /// Cancel every timer, clear the set, and wait for the worker to exit.
    pub async fn shutdown(self) -> Result<()> {
        for feeder in self.feeders.lock().drain(..) {
            feeder.abort();
        }
        let (tx, rx) = oneshot::channel();
        if self.messages.send(Message::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
        info!(target: "recognition", "recognition stopped");
        Ok(())
    }
}

impl Drop for RecognitionManager {
    fn drop(&mut self) {
        for feeder in self.feeders.get_mut().drain(..) {
            feeder.abort();
        }
        self.worker.abort();
    }
}
