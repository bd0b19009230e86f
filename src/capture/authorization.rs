use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::capture::error::{CaptureError, Result};
use crate::capture::types::MediaType;

/// Platform permission state for a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_granted(self) -> bool {
        self == Self::Authorized
    }
}

/// The platform permission gate.
pub trait AuthorizationProvider: Send + Sync {
    fn status(&self, media: MediaType) -> AuthorizationStatus;

    /// Prompt for access. May block until the user answers.
    fn request_access(&self, media: MediaType) -> bool;
}

/// Caches a provider's answer and only prompts while the status is still
/// undetermined. A denial is reported, never retried.
pub struct AuthorizationService {
    provider: Arc<dyn AuthorizationProvider>,
    media: MediaType,
    status: Mutex<AuthorizationStatus>,
}

impl AuthorizationService {
    pub fn new(provider: Arc<dyn AuthorizationProvider>, media: MediaType) -> Self {
        let status = provider.status(media);
        Self {
            provider,
            media,
            status: Mutex::new(status),
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    /// Resolve the status, prompting at most once.
    pub async fn request_authorization(&self) -> Result<AuthorizationStatus> {
        let current = self.status();
        if current != AuthorizationStatus::NotDetermined {
            return Ok(current);
        }

        let provider = Arc::clone(&self.provider);
        let media = self.media;
        let status = tokio::task::spawn_blocking(move || {
            provider.request_access(media);
            provider.status(media)
        })
        .await
        .map_err(|e| CaptureError::Worker(e.to_string()))?;

        tracing::info!(target: "capture::authorization", "{media} access: {status:?}");
        *self.status.lock() = status;
        Ok(status)
    }
}

/// Provider with a scripted answer, for the dummy backend and tests.
pub struct FixedAuthorization {
    status: Mutex<AuthorizationStatus>,
    grant_on_request: bool,
    prompts: Mutex<u32>,
}

impl FixedAuthorization {
    pub fn granted() -> Self {
        Self::new(AuthorizationStatus::Authorized, true)
    }

    pub fn denied() -> Self {
        Self::new(AuthorizationStatus::Denied, false)
    }

    /// Undetermined until asked; the prompt answers with `grant`.
    pub fn undetermined(grant: bool) -> Self {
        Self::new(AuthorizationStatus::NotDetermined, grant)
    }

    fn new(status: AuthorizationStatus, grant_on_request: bool) -> Self {
        Self {
            status: Mutex::new(status),
            grant_on_request,
            prompts: Mutex::new(0),
        }
    }

    /// How many times the user was prompted.
    pub fn prompts(&self) -> u32 {
        *self.prompts.lock()
    }
}

impl AuthorizationProvider for FixedAuthorization {
    fn status(&self, _media: MediaType) -> AuthorizationStatus {
        *self.status.lock()
    }

    fn request_access(&self, _media: MediaType) -> bool {
        *self.prompts.lock() += 1;
        let mut status = self.status.lock();
        if *status == AuthorizationStatus::NotDetermined {
            *status = if self.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
        }
        status.is_granted()
    }
}
