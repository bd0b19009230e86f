use serde::{Deserialize, Serialize};

/// A point in either normalized or view space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero, negative, or not finite.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Axis-aligned rectangle with its origin at the minimum corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole normalized frame, `[0,1] x [0,1]`.
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    /// Overlapping area of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// A detection's position and size in the rendering surface's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub center: Point,
    pub size: Size,
}

impl Placement {
    pub fn new(center: Point, size: Size) -> Self {
        Self { center, size }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.center(), rect.size())
    }

    /// The view-space rectangle this placement covers.
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.center.x - self.size.width / 2.0,
            self.center.y - self.size.height / 2.0,
            self.size.width,
            self.size.height,
        )
    }
}

/// Sensor-normalized rectangle restricting the scanned part of the frame.
///
/// Always lies inside the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest(Rect);

impl RegionOfInterest {
    /// Clamp `rect` into the unit square. A rectangle entirely outside the
    /// frame collapses to a zero-sized region on the nearest edge.
    pub fn new(rect: Rect) -> Self {
        let x0 = rect.x.clamp(0.0, 1.0);
        let y0 = rect.y.clamp(0.0, 1.0);
        let x1 = rect.max_x().clamp(0.0, 1.0);
        let y1 = rect.max_y().clamp(0.0, 1.0);
        Self(Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0)))
    }

    pub fn full_frame() -> Self {
        Self(Rect::unit())
    }

    pub fn rect(&self) -> Rect {
        self.0
    }

    pub fn is_full_frame(&self) -> bool {
        self.0.approx_eq(&Rect::unit(), f64::EPSILON)
    }

    /// Whether a sensor-normalized point falls inside the region.
    pub fn contains(&self, point: Point) -> bool {
        self.0.contains(point)
    }
}

impl Default for RegionOfInterest {
    fn default() -> Self {
        Self::full_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_midpoints() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.mid_x(), 25.0);
        assert_eq!(r.mid_y(), 40.0);
        assert_eq!(r.max_x(), 40.0);
        assert_eq!(r.max_y(), 60.0);
    }

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 2.0, 2.0);
        let b = Rect::new(1.0, 1.0, 2.0, 2.0);
        let i = a.intersection(&b).unwrap();
        assert!(i.approx_eq(&Rect::new(1.0, 1.0, 1.0, 1.0), 1e-12));
    }

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(2.0, 2.0, 1.0, 1.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn placement_round_trips_through_rect() {
        let r = Rect::new(100.0, 200.0, 50.0, 80.0);
        let p = Placement::from_rect(r);
        assert_eq!(p.center, Point::new(125.0, 240.0));
        assert!(p.rect().approx_eq(&r, 1e-12));
    }

    #[test]
    fn region_of_interest_defaults_to_full_frame() {
        assert!(RegionOfInterest::default().is_full_frame());
    }

    #[test]
    fn region_of_interest_clamps_into_unit_square() {
        let roi = RegionOfInterest::new(Rect::new(-0.2, 0.5, 0.6, 0.8));
        assert!(roi.rect().approx_eq(&Rect::new(0.0, 0.5, 0.4, 0.5), 1e-12));
    }

    #[test]
    fn region_outside_frame_collapses() {
        let roi = RegionOfInterest::new(Rect::new(1.5, 1.5, 0.5, 0.5));
        assert_eq!(roi.rect().width, 0.0);
        assert_eq!(roi.rect().height, 0.0);
    }

    #[test]
    fn empty_size_detection() {
        assert!(Size::new(0.0, 10.0).is_empty());
        assert!(Size::new(f64::NAN, 10.0).is_empty());
        assert!(!Size::new(390.0, 844.0).is_empty());
    }
}
