use std::sync::Arc;

use crate::capture::authorization::{AuthorizationProvider, AuthorizationStatus};
use crate::capture::backend::CaptureBackend;
use crate::capture::controller::CaptureController;
use crate::capture::error::Result;
use crate::capture::types::{default_device, MediaType};
use crate::geometry::{Placement, Rect, RegionOfInterest, SensorOrigin, Size};
use crate::output::{DetectionEvent, DetectionKind, MetadataOutput, OutputStream};
use crate::recognition::{Identity, RecognitionConfig, RecognitionManager};
use crate::session::preview::{PreviewHandle, PreviewLayer};
use crate::session::shared::SessionCore;
use crate::settings::types::ScanConfig;

/// Live detection session: the default camera feeding a metadata output.
pub struct MetadataScanSession {
    core: SessionCore,
    output: MetadataOutput,
    recognition: RecognitionConfig,
}

impl MetadataScanSession {
    /// Build the graph: default video device, metadata output restricted to
    /// `kinds` (every available kind when empty), preset from `config`.
    ///
    /// Fails with `DeviceUnavailable` when no video device exists. The graph
    /// is not started until [`activate`](Self::activate).
    pub async fn new(
        backend: Box<dyn CaptureBackend>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: &ScanConfig,
        kinds: &[DetectionKind],
    ) -> Result<Self> {
        let core = SessionCore::build(
            backend,
            authorization,
            config.session.preset,
            config.session.transform(),
            |devices| default_device(devices, MediaType::Video),
        )
        .await?;

        let output = MetadataOutput::new(config.bridge.capacity);
        if !kinds.is_empty() {
            output.set_requested_kinds(kinds);
        }
        core.controller.add_output(output.attachment()).await?;

        Ok(Self {
            core,
            output,
            recognition: config.recognition.to_config(),
        })
    }

    /// Request camera access if needed, then start the graph. A refusal is
    /// returned as the status and leaves the graph stopped.
    pub async fn activate(&self) -> Result<AuthorizationStatus> {
        self.core.activate().await
    }

    pub async fn deactivate(&self) -> Result<()> {
        self.core.deactivate().await
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.core.authorization_status()
    }

    /// The single detection sequence of this session.
    pub fn events(&self) -> Result<OutputStream<DetectionEvent>> {
        self.output.stream()
    }

    pub fn metadata_output(&self) -> &MetadataOutput {
        &self.output
    }

    pub fn controller(&self) -> &CaptureController {
        &self.core.controller
    }

    pub fn preview(&self) -> &PreviewLayer {
        &self.core.preview
    }

    pub fn preview_handle(&self) -> PreviewHandle {
        self.core.preview_handle()
    }

    /// Restrict scanning to the sensor region under `view_rect`.
    ///
    /// Returns the applied region, or `None` (leaving the current one) when
    /// `view_size` is empty.
    pub fn set_region_of_interest(
        &self,
        view_rect: Rect,
        view_size: Size,
    ) -> Option<RegionOfInterest> {
        let region = self
            .core
            .preview
            .transform()
            .sensor_region(view_rect, view_size)?;
        self.output.set_rect_of_interest(region);
        Some(region)
    }

    /// Like [`set_region_of_interest`](Self::set_region_of_interest), using
    /// the last measured layout.
    pub fn set_view_rect_of_interest(&self, view_rect: Rect) -> Option<RegionOfInterest> {
        let view_size = self.core.preview.view_size()?;
        self.set_region_of_interest(view_rect, view_size)
    }

    pub fn region_of_interest(&self) -> RegionOfInterest {
        self.output.rect_of_interest()
    }

    /// Where `event` should be drawn in the preview.
    pub fn placement(&self, event: &DetectionEvent) -> Option<Placement> {
        self.core
            .preview
            .placement_for(event.bounds(), SensorOrigin::TopLeft)
    }

    /// Start tracking this session's detections with the configured
    /// recognition settings.
    pub fn recognize(&self) -> Result<RecognitionManager> {
        self.recognize_with(self.recognition.clone())
    }

    /// Start tracking with explicit settings. Takes the detection sequence,
    /// so [`events`](Self::events) is unavailable while the manager lives.
    pub fn recognize_with(&self, config: RecognitionConfig) -> Result<RecognitionManager> {
        let stream = self.output.stream()?;
        let manager = RecognitionManager::spawn(config)?;
        manager.attach(stream);
        Ok(manager)
    }

    /// Preview placement of a recognized identity.
    pub fn recognized_placement(
        &self,
        manager: &RecognitionManager,
        identity: &Identity,
    ) -> Option<Placement> {
        manager.placement(
            identity,
            &self.core.preview.transform(),
            self.core.preview.view_size(),
        )
    }

    /// Complete the detection sequence and stop the graph.
    pub async fn shutdown(self) -> Result<()> {
        self.output.teardown();
        self.core.controller.shutdown().await
    }
}
