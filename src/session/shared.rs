use std::sync::Arc;

use crate::capture::authorization::{
    AuthorizationProvider, AuthorizationService, AuthorizationStatus,
};
use crate::capture::backend::CaptureBackend;
use crate::capture::controller::CaptureController;
use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{
    CaptureDevice, CaptureInput, MediaType, SessionConfiguration, SessionPreset,
};
use crate::geometry::CoordinateTransform;
use crate::session::preview::{PreviewHandle, PreviewLayer};

/// Shared plumbing of every session: controller, device input, permission
/// gate, and preview.
pub(crate) struct SessionCore {
    pub(crate) controller: CaptureController,
    pub(crate) input: CaptureInput,
    pub(crate) preview: PreviewLayer,
    authorization: AuthorizationService,
}

impl SessionCore {
    pub(crate) async fn build(
        backend: Box<dyn CaptureBackend>,
        provider: Arc<dyn AuthorizationProvider>,
        preset: SessionPreset,
        transform: CoordinateTransform,
        select: impl FnOnce(&[CaptureDevice]) -> Option<&CaptureDevice>,
    ) -> Result<Self> {
        let controller =
            CaptureController::spawn(backend, SessionConfiguration::with_preset(preset))?;
        let devices = controller.devices().await?;
        let device = select(&devices)
            .cloned()
            .ok_or_else(|| CaptureError::DeviceUnavailable(MediaType::Video.to_string()))?;
        tracing::info!(target: "session", "using {} ({})", device.name, device.id);

        let input = CaptureInput::new(device);
        controller.add_input(input.clone()).await?;

        Ok(Self {
            controller,
            input,
            preview: PreviewLayer::new(transform),
            authorization: AuthorizationService::new(provider, MediaType::Video),
        })
    }

    /// Check the permission gate, then start the graph if granted.
    pub(crate) async fn activate(&self) -> Result<AuthorizationStatus> {
        let status = self.authorization.request_authorization().await?;
        if !status.is_granted() {
            tracing::warn!(target: "session", "camera access {status:?}, not starting");
            return Ok(status);
        }
        self.controller.start().await?;
        Ok(status)
    }

    pub(crate) async fn deactivate(&self) -> Result<()> {
        self.controller.stop().await
    }

    pub(crate) fn authorization_status(&self) -> AuthorizationStatus {
        self.authorization.status()
    }

    pub(crate) fn preview_handle(&self) -> PreviewHandle {
        self.preview
            .handle(self.input.id, self.controller.running_flag())
    }
}
