// Coordinate spaces: sensor-normalized rectangles, view placements, layout.

pub mod layout;
pub mod transform;
pub mod types;

pub use layout::ViewLayout;
pub use transform::{ContentMode, CoordinateTransform, SensorOrigin, VideoOrientation};
pub use types::{Placement, Point, Rect, RegionOfInterest, Size};
