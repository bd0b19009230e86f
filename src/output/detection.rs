use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{Point, Rect};

/// Kind tag of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    MachineReadableCode,
    Face,
    Body,
    CatBody,
    DogBody,
    HumanBody,
    SalientObject,
}

impl DetectionKind {
    /// Every kind a metadata output can report.
    pub const ALL: [DetectionKind; 7] = [
        Self::MachineReadableCode,
        Self::Face,
        Self::Body,
        Self::CatBody,
        Self::DogBody,
        Self::HumanBody,
        Self::SalientObject,
    ];

    /// Snake-case string identifier.
    pub fn as_id_str(self) -> &'static str {
        match self {
            Self::MachineReadableCode => "machine_readable_code",
            Self::Face => "face",
            Self::Body => "body",
            Self::CatBody => "cat_body",
            Self::DogBody => "dog_body",
            Self::HumanBody => "human_body",
            Self::SalientObject => "salient_object",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id_str())
    }
}

/// Barcode symbology of a machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Qr,
    MicroQr,
    Aztec,
    DataMatrix,
    Pdf417,
    Ean8,
    Ean13,
    UpcE,
    Code39,
    Code93,
    Code128,
    Itf14,
    Other(String),
}

/// A decoded barcode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineReadableCode {
    pub symbology: Symbology,
    pub bounds: Rect,
    pub corners: Vec<Point>,
    pub string_value: Option<String>,
}

/// A tracked face.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    pub face_id: i64,
    pub bounds: Rect,
    pub roll_angle: Option<f64>,
    pub yaw_angle: Option<f64>,
}

/// A tracked body of a person or animal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub body_id: i64,
    pub bounds: Rect,
}

/// A salient region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Salient {
    pub object_id: i64,
    pub bounds: Rect,
}

/// One observation reported by a metadata output.
///
/// Bounds are sensor-normalized with a top-left origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionEvent {
    MachineReadableCode(MachineReadableCode),
    Face(Face),
    Body(Body),
    CatBody(Body),
    DogBody(Body),
    HumanBody(Body),
    Salient(Salient),
}

impl DetectionEvent {
    /// Convenience constructor for a decoded code without corner points.
    pub fn code(symbology: Symbology, value: impl Into<String>, bounds: Rect) -> Self {
        Self::MachineReadableCode(MachineReadableCode {
            symbology,
            bounds,
            corners: Vec::new(),
            string_value: Some(value.into()),
        })
    }

    pub fn kind(&self) -> DetectionKind {
        match self {
            Self::MachineReadableCode(_) => DetectionKind::MachineReadableCode,
            Self::Face(_) => DetectionKind::Face,
            Self::Body(_) => DetectionKind::Body,
            Self::CatBody(_) => DetectionKind::CatBody,
            Self::DogBody(_) => DetectionKind::DogBody,
            Self::HumanBody(_) => DetectionKind::HumanBody,
            Self::Salient(_) => DetectionKind::SalientObject,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Self::MachineReadableCode(code) => code.bounds,
            Self::Face(face) => face.bounds,
            Self::Body(body) | Self::CatBody(body) | Self::DogBody(body) | Self::HumanBody(body) => {
                body.bounds
            }
            Self::Salient(salient) => salient.bounds,
        }
    }

    /// Corner points, empty for kinds that only report bounds.
    pub fn corners(&self) -> &[Point] {
        match self {
            Self::MachineReadableCode(code) => &code.corners,
            _ => &[],
        }
    }

    /// Decoded payload of a machine-readable code.
    pub fn string_value(&self) -> Option<&str> {
        match self {
            Self::MachineReadableCode(code) => code.string_value.as_deref(),
            _ => None,
        }
    }

    /// Hardware tracking identifier for faces, bodies and salient regions.
    pub fn track_id(&self) -> Option<i64> {
        match self {
            Self::MachineReadableCode(_) => None,
            Self::Face(face) => Some(face.face_id),
            Self::Body(body) | Self::CatBody(body) | Self::DogBody(body) | Self::HumanBody(body) => {
                Some(body.body_id)
            }
            Self::Salient(salient) => Some(salient.object_id),
        }
    }
}
