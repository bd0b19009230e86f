use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::types::InputId;
use crate::geometry::{
    ContentMode, CoordinateTransform, Placement, Rect, RegionOfInterest, SensorOrigin, Size,
    VideoOrientation, ViewLayout,
};

/// The view-facing half of a session: how the feed is presented and the
/// latest measured size of the surface showing it.
pub struct PreviewLayer {
    transform: Arc<Mutex<CoordinateTransform>>,
    layout: ViewLayout,
}

impl PreviewLayer {
    pub fn new(transform: CoordinateTransform) -> Self {
        Self {
            transform: Arc::new(Mutex::new(transform)),
            layout: ViewLayout::new(),
        }
    }

    pub fn transform(&self) -> CoordinateTransform {
        *self.transform.lock()
    }

    pub fn set_content_mode(&self, content_mode: ContentMode) {
        let mut transform = self.transform.lock();
        *transform = transform.with_content_mode(content_mode);
    }

    pub fn set_orientation(&self, orientation: VideoOrientation) {
        let mut transform = self.transform.lock();
        *transform = transform.with_orientation(orientation);
    }

    /// Handle for a renderer showing `input`. It follows later content
    /// mode and orientation changes made through this layer.
    pub(crate) fn handle(&self, input: InputId, running: Arc<AtomicBool>) -> PreviewHandle {
        PreviewHandle {
            input,
            running,
            transform: Arc::clone(&self.transform),
        }
    }

    /// Record the surface's measured size.
    pub fn update_layout(&self, size: Size) {
        self.layout.update(size);
    }

    pub fn view_size(&self) -> Option<Size> {
        self.layout.size()
    }

    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    /// View-space placement of a sensor-normalized rectangle, `None` until
    /// the surface has been measured.
    pub fn placement_for(&self, bounds: Rect, origin: SensorOrigin) -> Option<Placement> {
        self.transform().placement(bounds, origin, self.view_size()?)
    }

    /// View-space placement of a rectangle normalized to the frame as
    /// displayed, for sources that already see rotated frames.
    pub fn placement_for_display(&self, bounds: Rect, origin: SensorOrigin) -> Option<Placement> {
        self.transform()
            .display_placement(bounds, origin, self.view_size()?)
    }

    /// Sensor region covered by a view-space rectangle.
    pub fn sensor_region(&self, view_rect: Rect) -> Option<RegionOfInterest> {
        self.transform().sensor_region(view_rect, self.view_size()?)
    }

    /// Part of the sensor frame actually visible in the surface.
    pub fn visible_region(&self) -> Option<RegionOfInterest> {
        self.transform().visible_region(self.view_size()?)
    }
}

/// Opaque handle a renderer attaches to in order to show the live feed.
#[derive(Clone)]
pub struct PreviewHandle {
    input: InputId,
    running: Arc<AtomicBool>,
    transform: Arc<Mutex<CoordinateTransform>>,
}

impl PreviewHandle {
    /// The graph input whose frames this handle shows.
    pub fn input(&self) -> InputId {
        self.input
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn content_mode(&self) -> ContentMode {
        self.transform.lock().content_mode
    }

    pub fn orientation(&self) -> VideoOrientation {
        self.transform.lock().orientation
    }
}
