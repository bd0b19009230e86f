use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{OutputDescriptor, OutputId, OutputKind};
use crate::output::bridge::{OutputBridge, OutputSink, OutputStream};

/// Identifier of one still-photo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhotoRequestId(u64);

impl fmt::Display for PhotoRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "photo#{}", self.0)
    }
}

struct PhotoState {
    pending: HashMap<PhotoRequestId, OutputSink<Vec<u8>>>,
    torn_down: bool,
}

/// Still-photo output. Every request gets its own single-shot bridge.
pub struct PhotoOutput {
    id: OutputId,
    next_request: AtomicU64,
    state: Arc<Mutex<PhotoState>>,
}

impl PhotoOutput {
    pub fn new() -> Self {
        Self {
            id: OutputId::next(),
            next_request: AtomicU64::new(1),
            state: Arc::new(Mutex::new(PhotoState {
                pending: HashMap::new(),
                torn_down: false,
            })),
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn descriptor(&self) -> OutputDescriptor {
        OutputDescriptor {
            id: self.id,
            kind: OutputKind::Photo,
        }
    }

    /// Register a new request. The backend completes it through
    /// [`PhotoDelegate::deliver`].
    pub fn request(&self) -> Result<PendingPhoto> {
        let request = PhotoRequestId(self.next_request.fetch_add(1, Ordering::Relaxed));
        let bridge = OutputBridge::new(request.to_string(), 1);
        let stream = bridge.subscribe()?;
        {
            let mut state = self.state.lock();
            if state.torn_down {
                return Err(CaptureError::Closed("photo output"));
            }
            state.pending.insert(request, bridge.sink());
        }
        tracing::debug!(target: "output::photo", "{} registered {request}", self.id);
        Ok(PendingPhoto {
            request,
            state: Arc::clone(&self.state),
            _bridge: bridge,
            stream,
        })
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn delegate(&self) -> PhotoDelegate {
        PhotoDelegate {
            state: Arc::clone(&self.state),
        }
    }

    /// Fail every outstanding request and refuse new ones.
    pub fn teardown(&self) {
        let pending: Vec<_> = {
            let mut state = self.state.lock();
            state.torn_down = true;
            state.pending.drain().collect()
        };
        for (request, sink) in pending {
            tracing::debug!(target: "output::photo", "{request} cancelled by teardown");
            sink.close();
        }
    }
}

impl Default for PhotoOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion handle handed to the backend.
#[derive(Clone)]
pub struct PhotoDelegate {
    state: Arc<Mutex<PhotoState>>,
}

impl PhotoDelegate {
    /// Complete a request. An error completes it without a value.
    pub fn deliver(&self, request: PhotoRequestId, result: std::result::Result<Vec<u8>, String>) {
        let Some(sink) = self.state.lock().pending.remove(&request) else {
            tracing::debug!(target: "output::photo", "{request} already completed");
            return;
        };
        match result {
            Ok(data) => {
                tracing::debug!(target: "output::photo", "{request} delivered {} bytes", data.len());
                sink.push(data);
            }
            Err(e) => tracing::warn!(target: "output::photo", "{request} failed: {e}"),
        }
        sink.close();
    }

    pub fn fail(&self, request: PhotoRequestId, reason: impl Into<String>) {
        self.deliver(request, Err(reason.into()));
    }
}

/// A photo that has been requested but not yet received.
///
/// Dropping it abandons the request; a later completion is ignored.
pub struct PendingPhoto {
    request: PhotoRequestId,
    state: Arc<Mutex<PhotoState>>,
    _bridge: OutputBridge<Vec<u8>>,
    stream: OutputStream<Vec<u8>>,
}

impl PendingPhoto {
    pub fn request(&self) -> PhotoRequestId {
        self.request
    }

    /// Wait for the encoded photo. Completion without a value is a capture
    /// failure.
    pub async fn wait(mut self) -> Result<Vec<u8>> {
        self.stream.next().await.ok_or_else(|| {
            CaptureError::CaptureFailed(format!("{} completed without a photo", self.request))
        })
    }
}

impl Drop for PendingPhoto {
    fn drop(&mut self) {
        if self.state.lock().pending.remove(&self.request).is_some() {
            tracing::debug!(target: "output::photo", "{} abandoned", self.request);
        }
    }
}
