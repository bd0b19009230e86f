//! Conversions between sensor-normalized, display-normalized and view space.
//!
//! Sensor-normalized rectangles live in the sensor's native (landscape)
//! frame with values in `[0,1]`. Display-normalized rectangles are the same
//! frame rotated to the preview's video orientation. View space is the
//! preview's pixel grid after the content mode has fitted the rotated frame
//! into the view.

use serde::{Deserialize, Serialize};

use super::types::{Placement, Rect, RegionOfInterest, Size};

/// How the rotated sensor frame is fitted into the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Fill the view, cropping the overflowing axis.
    #[default]
    AspectFill,
    /// Fit inside the view, letterboxing the short axis.
    AspectFit,
    /// Scale each axis independently.
    Stretch,
}

/// Orientation the preview presents the sensor frame in.
///
/// The sensor's native orientation is `LandscapeRight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl VideoOrientation {
    /// Clockwise quarter turns from the sensor frame to the display frame.
    fn quarter_turns(self) -> u8 {
        match self {
            Self::LandscapeRight => 0,
            Self::Portrait => 1,
            Self::LandscapeLeft => 2,
            Self::PortraitUpsideDown => 3,
        }
    }

    fn swaps_axes(self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

/// Vertical axis convention of a detection source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorOrigin {
    /// Metadata output convention.
    #[default]
    TopLeft,
    /// Classifier convention (y grows upward).
    BottomLeft,
}

/// Rotate a normalized rectangle clockwise by `turns` quarter turns.
fn rotate_normalized(rect: Rect, turns: u8) -> Rect {
    match turns % 4 {
        0 => rect,
        1 => Rect::new(1.0 - rect.max_y(), rect.x, rect.height, rect.width),
        2 => Rect::new(1.0 - rect.max_x(), 1.0 - rect.max_y(), rect.width, rect.height),
        _ => Rect::new(rect.y, 1.0 - rect.max_x(), rect.height, rect.width),
    }
}

fn flip_vertical(rect: Rect) -> Rect {
    Rect::new(rect.x, 1.0 - rect.max_y(), rect.width, rect.height)
}

/// Scale and offset that place the display frame inside a view.
#[derive(Debug, Clone, Copy)]
struct Fit {
    content: Size,
    offset_x: f64,
    offset_y: f64,
}

/// Pure description of how a preview presents the sensor frame.
///
/// Holds no layout: every call takes the view size it should map into, so
/// results always follow the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    /// Sensor frame dimensions in its native orientation.
    pub frame_size: Size,
    pub content_mode: ContentMode,
    pub orientation: VideoOrientation,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            frame_size: Size::new(1920.0, 1080.0),
            content_mode: ContentMode::AspectFill,
            orientation: VideoOrientation::Portrait,
        }
    }
}

impl CoordinateTransform {
    pub fn new(frame_size: Size, content_mode: ContentMode, orientation: VideoOrientation) -> Self {
        Self {
            frame_size,
            content_mode,
            orientation,
        }
    }

    pub fn with_content_mode(self, content_mode: ContentMode) -> Self {
        Self {
            content_mode,
            ..self
        }
    }

    pub fn with_orientation(self, orientation: VideoOrientation) -> Self {
        Self {
            orientation,
            ..self
        }
    }

    /// Sensor frame size once rotated to the display orientation.
    pub fn display_frame_size(&self) -> Size {
        if self.orientation.swaps_axes() {
            Size::new(self.frame_size.height, self.frame_size.width)
        } else {
            self.frame_size
        }
    }

    fn fit(&self, view: Size) -> Fit {
        let frame = self.display_frame_size();
        let content = if frame.is_empty() {
            view
        } else {
            let sx = view.width / frame.width;
            let sy = view.height / frame.height;
            match self.content_mode {
                ContentMode::AspectFill => {
                    let s = sx.max(sy);
                    Size::new(frame.width * s, frame.height * s)
                }
                ContentMode::AspectFit => {
                    let s = sx.min(sy);
                    Size::new(frame.width * s, frame.height * s)
                }
                ContentMode::Stretch => view,
            }
        };
        Fit {
            content,
            offset_x: (view.width - content.width) / 2.0,
            offset_y: (view.height - content.height) / 2.0,
        }
    }

    /// Map a sensor-normalized rectangle to display-normalized space.
    pub fn display_normalized(&self, sensor_rect: Rect, origin: SensorOrigin) -> Rect {
        let top_left = match origin {
            SensorOrigin::TopLeft => sensor_rect,
            SensorOrigin::BottomLeft => flip_vertical(sensor_rect),
        };
        rotate_normalized(top_left, self.orientation.quarter_turns())
    }

    fn fitted(&self, display: Rect, view: Size) -> Option<Rect> {
        if view.is_empty() {
            return None;
        }
        let fit = self.fit(view);
        Some(Rect::new(
            fit.offset_x + display.x * fit.content.width,
            fit.offset_y + display.y * fit.content.height,
            display.width * fit.content.width,
            display.height * fit.content.height,
        ))
    }

    /// View-space rectangle for a sensor-normalized rectangle, or `None`
    /// when the view has not been measured.
    pub fn view_rect(&self, sensor_rect: Rect, origin: SensorOrigin, view: Size) -> Option<Rect> {
        self.fitted(self.display_normalized(sensor_rect, origin), view)
    }

    /// View-space rectangle for a rectangle already normalized to the
    /// rotated display frame, such as a classifier box on frames delivered
    /// in the preview orientation. Only the origin flip and the content
    /// mode fit apply.
    pub fn view_rect_for_display(
        &self,
        display_rect: Rect,
        origin: SensorOrigin,
        view: Size,
    ) -> Option<Rect> {
        let display = match origin {
            SensorOrigin::TopLeft => display_rect,
            SensorOrigin::BottomLeft => flip_vertical(display_rect),
        };
        self.fitted(display, view)
    }

    /// Placement of a sensor-normalized rectangle in a view of `view` size.
    pub fn placement(&self, sensor_rect: Rect, origin: SensorOrigin, view: Size) -> Option<Placement> {
        self.view_rect(sensor_rect, origin, view)
            .map(Placement::from_rect)
    }

    /// Placement of a display-normalized rectangle in a view of `view` size.
    pub fn display_placement(
        &self,
        display_rect: Rect,
        origin: SensorOrigin,
        view: Size,
    ) -> Option<Placement> {
        self.view_rect_for_display(display_rect, origin, view)
            .map(Placement::from_rect)
    }

    /// Sensor-normalized (top-left origin) rectangle for a view rectangle,
    /// without clamping.
    pub fn sensor_rect(&self, view_rect: Rect, view: Size) -> Option<Rect> {
        if view.is_empty() {
            return None;
        }
        let fit = self.fit(view);
        if fit.content.is_empty() {
            return None;
        }
        let display = Rect::new(
            (view_rect.x - fit.offset_x) / fit.content.width,
            (view_rect.y - fit.offset_y) / fit.content.height,
            view_rect.width / fit.content.width,
            view_rect.height / fit.content.height,
        );
        let inverse_turns = (4 - self.orientation.quarter_turns()) % 4;
        Some(rotate_normalized(display, inverse_turns))
    }

    /// Region of interest covering a view rectangle, clamped to the frame.
    pub fn sensor_region(&self, view_rect: Rect, view: Size) -> Option<RegionOfInterest> {
        self.sensor_rect(view_rect, view).map(RegionOfInterest::new)
    }

    /// The part of the sensor frame actually visible in the view.
    pub fn visible_region(&self, view: Size) -> Option<RegionOfInterest> {
        self.sensor_region(Rect::new(0.0, 0.0, view.width, view.height), view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn square_sensor(mode: ContentMode) -> CoordinateTransform {
        CoordinateTransform::new(
            Size::new(1000.0, 1000.0),
            mode,
            VideoOrientation::LandscapeRight,
        )
    }

    #[test]
    fn identity_orientation_maps_directly_into_matching_view() {
        let t = square_sensor(ContentMode::AspectFill);
        let rect = t
            .view_rect(
                Rect::new(0.1, 0.2, 0.3, 0.4),
                SensorOrigin::TopLeft,
                Size::new(1000.0, 1000.0),
            )
            .unwrap();
        assert!(rect.approx_eq(&Rect::new(100.0, 200.0, 300.0, 400.0), TOLERANCE));
    }

    #[test]
    fn portrait_rotates_sensor_rect_clockwise() {
        let t = CoordinateTransform::new(
            Size::new(1000.0, 1000.0),
            ContentMode::Stretch,
            VideoOrientation::Portrait,
        );
        // Top-left corner of the landscape sensor becomes the top-right
        // corner of the portrait display.
        let display = t.display_normalized(Rect::new(0.0, 0.0, 0.2, 0.1), SensorOrigin::TopLeft);
        assert!(display.approx_eq(&Rect::new(0.9, 0.0, 0.1, 0.2), TOLERANCE));
    }

    #[test]
    fn bottom_left_origin_is_flipped() {
        let t = square_sensor(ContentMode::Stretch);
        let display = t.display_normalized(Rect::new(0.1, 0.0, 0.2, 0.25), SensorOrigin::BottomLeft);
        assert!(display.approx_eq(&Rect::new(0.1, 0.75, 0.2, 0.25), TOLERANCE));
    }

    #[test]
    fn display_rect_is_flipped_but_not_rotated() {
        let t = CoordinateTransform::new(
            Size::new(200.0, 100.0),
            ContentMode::Stretch,
            VideoOrientation::Portrait,
        );
        let view = Size::new(100.0, 200.0);
        // Bottom half of a portrait classifier frame.
        let rect = t
            .view_rect_for_display(Rect::new(0.0, 0.0, 1.0, 0.5), SensorOrigin::BottomLeft, view)
            .unwrap();
        assert!(rect.approx_eq(&Rect::new(0.0, 100.0, 100.0, 100.0), TOLERANCE));

        let top_left = t
            .view_rect_for_display(Rect::new(0.0, 0.0, 0.5, 0.25), SensorOrigin::TopLeft, view)
            .unwrap();
        assert!(top_left.approx_eq(&Rect::new(0.0, 0.0, 50.0, 50.0), TOLERANCE));
        assert!(t
            .display_placement(Rect::unit(), SensorOrigin::BottomLeft, Size::default())
            .is_none());
    }

    #[test]
    fn display_rect_fit_uses_rotated_frame() {
        // 1920x1080 sensor shown in portrait is 1080x1920; fitting into a
        // 1080x1080 view letterboxes horizontally.
        let t = CoordinateTransform::new(
            Size::new(1920.0, 1080.0),
            ContentMode::AspectFit,
            VideoOrientation::Portrait,
        );
        let rect = t
            .view_rect_for_display(Rect::unit(), SensorOrigin::BottomLeft, Size::new(1080.0, 1080.0))
            .unwrap();
        let width = 1080.0 * (1080.0 / 1920.0);
        assert!(rect.approx_eq(&Rect::new((1080.0 - width) / 2.0, 0.0, width, 1080.0), TOLERANCE));
    }

    #[test]
    fn aspect_fill_crops_and_offsets_the_long_axis() {
        // 1920x1080 sensor in portrait is 1080x1920; filling a 1000x1000
        // view scales by 1000/1080 and overflows vertically.
        let t = CoordinateTransform::default();
        let view = Size::new(1000.0, 1000.0);
        let visible = t.visible_region(view).unwrap().rect();
        let content_height = 1920.0 * (1000.0 / 1080.0);
        let visible_fraction = 1000.0 / content_height;
        // Vertical display axis maps onto the sensor's x axis after rotation.
        assert!((visible.width - visible_fraction).abs() < 1e-9);
        assert!((visible.height - 1.0).abs() < 1e-9);
    }

    #[test]
    fn aspect_fit_letterboxes() {
        let t = CoordinateTransform::new(
            Size::new(2000.0, 1000.0),
            ContentMode::AspectFit,
            VideoOrientation::LandscapeRight,
        );
        let rect = t
            .view_rect(Rect::unit(), SensorOrigin::TopLeft, Size::new(1000.0, 1000.0))
            .unwrap();
        assert!(rect.approx_eq(&Rect::new(0.0, 250.0, 1000.0, 500.0), TOLERANCE));
    }

    #[test]
    fn unmeasured_view_is_unavailable() {
        let t = CoordinateTransform::default();
        assert!(t
            .placement(Rect::unit(), SensorOrigin::TopLeft, Size::default())
            .is_none());
        assert!(t.sensor_region(Rect::unit(), Size::default()).is_none());
    }

    #[test]
    fn center_cutout_of_square_view_maps_to_center_region() {
        let t = square_sensor(ContentMode::AspectFill);
        let roi = t
            .sensor_region(
                Rect::new(250.0, 250.0, 500.0, 500.0),
                Size::new(1000.0, 1000.0),
            )
            .unwrap();
        assert!(roi
            .rect()
            .approx_eq(&Rect::new(0.25, 0.25, 0.5, 0.5), TOLERANCE));
    }

    #[test]
    fn center_cutout_with_portrait_fill_is_adjusted_for_crop() {
        let t = CoordinateTransform::default();
        let roi = t
            .sensor_region(
                Rect::new(250.0, 250.0, 500.0, 500.0),
                Size::new(1000.0, 1000.0),
            )
            .unwrap()
            .rect();
        // The cutout stays centred on the sensor.
        assert!((roi.mid_x() - 0.5).abs() < 1e-9);
        assert!((roi.mid_y() - 0.5).abs() < 1e-9);
        // The cropped axis covers less of the sensor than the full one.
        assert!((roi.height - 0.5).abs() < 1e-9);
        assert!(roi.width < 0.5);
    }

    #[test]
    fn round_trip_recovers_region_for_all_modes_and_orientations() {
        let sensor_rect = Rect::new(0.4, 0.35, 0.2, 0.15);
        let view = Size::new(390.0, 844.0);
        for mode in [ContentMode::AspectFill, ContentMode::AspectFit, ContentMode::Stretch] {
            for orientation in [
                VideoOrientation::Portrait,
                VideoOrientation::PortraitUpsideDown,
                VideoOrientation::LandscapeRight,
                VideoOrientation::LandscapeLeft,
            ] {
                let t = CoordinateTransform::new(Size::new(1920.0, 1080.0), mode, orientation);
                let placement = t.placement(sensor_rect, SensorOrigin::TopLeft, view).unwrap();
                let back = t.sensor_region(placement.rect(), view).unwrap().rect();
                assert!(
                    back.approx_eq(&sensor_rect, 1e-9),
                    "{mode:?}/{orientation:?}: {back:?} != {sensor_rect:?}"
                );
            }
        }
    }

    #[test]
    fn region_is_clamped_to_frame() {
        let t = CoordinateTransform::new(
            Size::new(2000.0, 1000.0),
            ContentMode::AspectFit,
            VideoOrientation::LandscapeRight,
        );
        // Whole view includes letterbox bars above and below the frame.
        let roi = t.visible_region(Size::new(1000.0, 1000.0)).unwrap();
        assert!(roi.is_full_frame());
    }
}
