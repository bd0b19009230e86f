//! Drives a simulated metadata scan session through a scripted burst of
//! detections and logs the recognized set as it changes.
//!
//! `SCAN_CONFIG=path/to/scan.json` loads settings, writing the defaults there
//! first if the file does not exist. `RUST_LOG` sets verbosity.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use scan_lib::capture::{CaptureError, DummyBackend, FixedAuthorization};
use scan_lib::geometry::{Rect, Size};
use scan_lib::output::{DetectionEvent, DetectionKind, Symbology};
use scan_lib::settings::ConfigStore;
use scan_lib::{logging, MetadataScanSession, Result};

/// Portrait phone-sized preview surface.
const VIEW_SIZE: Size = Size {
    width: 390.0,
    height: 844.0,
};

/// How long to watch after the last scripted detection.
const LINGER: Duration = Duration::from_millis(1500);

fn script() -> Vec<(Duration, Vec<DetectionEvent>)> {
    let abc = DetectionEvent::code(Symbology::Qr, "ABC", Rect::new(0.40, 0.40, 0.20, 0.20));
    let moved = DetectionEvent::code(Symbology::Qr, "ABC", Rect::new(0.45, 0.42, 0.20, 0.20));
    let ean = DetectionEvent::code(
        Symbology::Ean13,
        "4006381333931",
        Rect::new(0.30, 0.55, 0.30, 0.10),
    );
    // Outside the region of interest set below.
    let stray = DetectionEvent::code(
        Symbology::Code128,
        "stray",
        Rect::new(0.0, 0.0, 0.1, 0.1),
    );

    vec![
        (Duration::ZERO, vec![abc]),
        (Duration::from_millis(100), vec![ean.clone(), stray]),
        (Duration::from_millis(200), vec![moved]),
        (Duration::from_millis(300), vec![ean]),
    ]
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os("SCAN_CONFIG").map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = match config_path() {
        Some(path) => {
            let store = ConfigStore::open(path)?;
            if !store.path().exists() {
                store.save()?;
                tracing::info!(
                    target: "scan_demo",
                    "wrote default settings to {}",
                    store.path().display()
                );
            }
            store.config()
        }
        None => Default::default(),
    };
    if !DummyBackend::is_enabled() {
        tracing::info!(
            target: "scan_demo",
            "DUMMY_CAMERA not set, using the simulated camera anyway"
        );
    }

    let backend = DummyBackend::new();
    let feed = backend.feed();
    let session = MetadataScanSession::new(
        Box::new(backend),
        Arc::new(FixedAuthorization::granted()),
        &config,
        &[DetectionKind::MachineReadableCode],
    )
    .await?;

    session.preview().update_layout(VIEW_SIZE);
    let cutout = Rect::new(
        VIEW_SIZE.width * 0.1,
        VIEW_SIZE.height * 0.25,
        VIEW_SIZE.width * 0.8,
        VIEW_SIZE.height * 0.5,
    );
    if let Some(region) = session.set_view_rect_of_interest(cutout) {
        tracing::info!(target: "scan_demo", "region of interest {:?}", region.rect());
    }

    let status = session.activate().await?;
    if !status.is_granted() {
        tracing::warn!(target: "scan_demo", "camera access {status:?}");
        return session.shutdown().await;
    }

    let manager = session.recognize()?;
    let mut updates = manager.subscribe();

    let player = std::thread::Builder::new()
        .name("detection-script".to_string())
        .spawn(move || {
            for (delay, events) in script() {
                std::thread::sleep(delay);
                let queued = feed.emit_detections(&events);
                tracing::debug!(
                    target: "scan_demo",
                    "queued {queued} of {} detections",
                    events.len()
                );
            }
        })
        .map_err(|e| CaptureError::Worker(e.to_string()))?;

    let script_length: Duration = script().iter().map(|(delay, _)| *delay).sum();
    let deadline = tokio::time::Instant::now() + script_length + LINGER;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let entries = updates.borrow_and_update().clone();
                if entries.is_empty() {
                    tracing::info!(target: "scan_demo", "nothing recognized");
                }
                for entry in &entries {
                    let placement = session.recognized_placement(&manager, &entry.identity);
                    tracing::info!(
                        target: "scan_demo",
                        "{} (seen {}x) at {:?}",
                        entry.identity,
                        entry.sightings,
                        placement.map(|p| p.center)
                    );
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    tokio::task::spawn_blocking(move || player.join())
        .await
        .map_err(|e| CaptureError::Worker(e.to_string()))?
        .map_err(|_| CaptureError::Worker("detection-script thread panicked".to_string()))?;

    tracing::info!(
        target: "scan_demo",
        "metadata output: {:?}",
        session.metadata_output().diagnostics()
    );
    manager.shutdown().await?;
    session.shutdown().await
}
