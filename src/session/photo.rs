use std::sync::Arc;

use crate::capture::authorization::{AuthorizationProvider, AuthorizationStatus};
use crate::capture::backend::CaptureBackend;
use crate::capture::controller::CaptureController;
use crate::capture::error::Result;
use crate::capture::types::{
    default_device, devices_of, CaptureDevice, DeviceKind, DevicePosition, MediaType,
    SessionPreset,
};
use crate::geometry::ContentMode;
use crate::output::PhotoOutput;
use crate::session::preview::{PreviewHandle, PreviewLayer};
use crate::session::shared::SessionCore;
use crate::settings::types::ScanConfig;

const FRONT_CAMERA_KINDS: [DeviceKind; 2] = [DeviceKind::TrueDepth, DeviceKind::WideAngle];

/// Still-photo session at the photo preset, previewed aspect-fit.
pub struct PhotoCaptureSession {
    core: SessionCore,
    output: PhotoOutput,
}

impl PhotoCaptureSession {
    /// Session on the default (back-facing when available) camera.
    pub async fn new_default(
        backend: Box<dyn CaptureBackend>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: &ScanConfig,
    ) -> Result<Self> {
        Self::build(backend, authorization, config, |devices| {
            default_device(devices, MediaType::Video)
        })
        .await
    }

    /// Session on the front-facing camera, depth-capable one first.
    pub async fn new_front_facing(
        backend: Box<dyn CaptureBackend>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: &ScanConfig,
    ) -> Result<Self> {
        Self::build(backend, authorization, config, |devices| {
            FRONT_CAMERA_KINDS.iter().find_map(|kind| {
                devices_of(
                    devices,
                    &[*kind],
                    Some(MediaType::Video),
                    DevicePosition::Front,
                )
                .into_iter()
                .next()
            })
        })
        .await
    }

    async fn build(
        backend: Box<dyn CaptureBackend>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: &ScanConfig,
        select: impl FnOnce(&[CaptureDevice]) -> Option<&CaptureDevice>,
    ) -> Result<Self> {
        let transform = config
            .session
            .transform()
            .with_content_mode(ContentMode::AspectFit);
        let core = SessionCore::build(
            backend,
            authorization,
            SessionPreset::Photo,
            transform,
            select,
        )
        .await?;

        let output = PhotoOutput::new();
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

    /// The camera this session captures from.
    pub fn device(&self) -> &CaptureDevice {
        &self.core.input.device
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

    /// Capture one photo and return its encoded bytes.
    ///
    /// A failed capture fails only this request; the session stays usable.
    pub async fn capture_photo(&self) -> Result<Vec<u8>> {
        let pending = self.output.request()?;
        tracing::debug!(target: "session", "requesting {}", pending.request());
        self.core
            .controller
            .capture_photo(pending.request(), self.output.delegate())
            .await?;
        pending.wait().await
    }

    pub async fn shutdown(self) -> Result<()> {
        self.output.teardown();
        self.core.controller.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::authorization::FixedAuthorization;
    use crate::capture::dummy::DummyBackend;
    use crate::capture::error::CaptureError;

    fn granted() -> Arc<dyn AuthorizationProvider> {
        Arc::new(FixedAuthorization::granted())
    }

    async fn default_session(backend: DummyBackend) -> PhotoCaptureSession {
        PhotoCaptureSession::new_default(Box::new(backend), granted(), &ScanConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn default_session_uses_back_camera_at_photo_preset() {
        let session = default_session(DummyBackend::new()).await;
        assert_eq!(session.device().id, DummyBackend::back_device_id());
        let snapshot = session.controller().snapshot().await.unwrap();
        assert_eq!(snapshot.preset, Some(SessionPreset::Photo));
        assert_eq!(
            session.preview_handle().content_mode(),
            ContentMode::AspectFit
        );
    }

    #[tokio::test]
    async fn front_facing_session_picks_front_camera() {
        let session = PhotoCaptureSession::new_front_facing(
            Box::new(DummyBackend::new()),
            granted(),
            &ScanConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(session.device().id, DummyBackend::front_device_id());
    }

    #[tokio::test]
    async fn captures_photo_while_running() {
        let session = default_session(DummyBackend::new()).await;
        session.activate().await.unwrap();
        let photo = session.capture_photo().await.unwrap();
        assert_eq!(photo, DummyBackend::test_photo());
        assert_eq!(&photo[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn failed_capture_leaves_session_usable() {
        let session = default_session(DummyBackend::new()).await;
        // Not started yet.
        assert!(matches!(
            session.capture_photo().await,
            Err(CaptureError::CaptureFailed(_))
        ));

        session.activate().await.unwrap();
        assert!(session.capture_photo().await.is_ok());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn injected_failure_is_reported() {
        let backend = DummyBackend::new().with_photo_failure("sensor busy");
        let session = default_session(backend).await;
        session.activate().await.unwrap();
        assert!(matches!(
            session.capture_photo().await,
            Err(CaptureError::CaptureFailed(_))
        ));
    }
}
