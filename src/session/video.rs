use std::sync::Arc;

use crate::capture::authorization::{AuthorizationProvider, AuthorizationStatus};
use crate::capture::backend::CaptureBackend;
use crate::capture::controller::CaptureController;
use crate::capture::error::Result;
use crate::capture::types::{default_device, MediaType};
use crate::geometry::{Placement, Rect, SensorOrigin, VideoOrientation};
use crate::output::{Frame, OutputStream, VideoOutput};
use crate::session::preview::{PreviewHandle, PreviewLayer};
use crate::session::shared::SessionCore;
use crate::settings::types::ScanConfig;

/// Raw frame session for classifier pipelines. Frames are presented in
/// portrait regardless of the configured orientation.
pub struct VideoCaptureSession {
    core: SessionCore,
    output: VideoOutput,
}

impl VideoCaptureSession {
    pub async fn new(
        backend: Box<dyn CaptureBackend>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: &ScanConfig,
    ) -> Result<Self> {
        let transform = config
            .session
            .transform()
            .with_orientation(VideoOrientation::Portrait);
        let core = SessionCore::build(
            backend,
            authorization,
            config.session.preset,
            transform,
            |devices| default_device(devices, MediaType::Video),
        )
        .await?;

        let output = VideoOutput::new(config.bridge.capacity);
        core.controller.add_output(output.attachment()).await?;

        Ok(Self { core, output })
    }

    pub async fn activate(&self) -> Result<AuthorizationStatus> {
        self.core.activate().await
    }

    pub async fn deactivate(&self) -> Result<()> {
        self.core.deactivate().await
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.core.authorization_status()
    }

    /// The single frame sequence of this session.
    pub fn frames(&self) -> Result<OutputStream<Frame>> {
        self.output.stream()
    }

    pub fn video_output(&self) -> &VideoOutput {
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

    /// Preview placement of a classifier bounding box, normalized to the
    /// portrait frames this session delivers with a bottom-left origin.
    pub fn placement_for_normalized(&self, rect: Rect) -> Option<Placement> {
        self.core
            .preview
            .placement_for_display(rect, SensorOrigin::BottomLeft)
    }

    pub async fn shutdown(self) -> Result<()> {
        self.output.teardown();
        self.core.controller.shutdown().await
    }
}
