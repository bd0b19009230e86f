use tokio::sync::watch;

use super::types::Size;

/// Latest measured size of the consuming view.
///
/// Layout arrives asynchronously from the rendering side; until the first
/// measurement `size()` is `None` and transforms report unavailable.
pub struct ViewLayout {
    size: watch::Sender<Option<Size>>,
}

impl ViewLayout {
    pub fn new() -> Self {
        let (size, _) = watch::channel(None);
        Self { size }
    }

    /// Record a new measurement. Empty sizes are ignored.
    pub fn update(&self, size: Size) {
        if size.is_empty() {
            tracing::debug!(target: "geometry::layout", "ignoring empty layout {size:?}");
            return;
        }
        self.size.send_if_modified(|current| {
            if *current == Some(size) {
                return false;
            }
            *current = Some(size);
            true
        });
    }

    pub fn size(&self) -> Option<Size> {
        *self.size.borrow()
    }

    /// Subscribe to layout changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Size>> {
        self.size.subscribe()
    }

    /// Wait until the view has been measured at least once.
    pub async fn wait_for_measurement(&self) -> Size {
        let mut rx = self.size.subscribe();
        // The sender lives as long as `self`, so `wait_for` cannot observe a
        // closed channel here.
        let measured = rx
            .wait_for(Option::is_some)
            .await
            .map(|size| (*size).unwrap_or_default());
        measured.unwrap_or_default()
    }
}

impl Default for ViewLayout {
    fn default() -> Self {
        Self::new()
    }
}
