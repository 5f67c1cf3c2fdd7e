//! Shared types for the scrawl workspace.
//!
//! This crate provides the fixed-layout drawing records that cross the
//! host/runtime boundary, plus the request/response records the host consumes.
//! Keeping them in a leaf crate breaks dependency cycles between the bridge
//! and the embedding application.
//!
//! All components are `f64` and are *not* clamped here: color component ranges
//! are interpreter-defined and the bridge passes them through untouched.

use serde::{Deserialize, Serialize};

/// A 2D coordinate. Immutable value type.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An RGBA color. Components are in an interpreter-defined range.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// One drawable segment, produced fresh each frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub color: Color,
    pub width: f64,
}

/// Host-boundary response for `compile`.
///
/// On error, `image` is absent and `error` carries the diagnostic. The image
/// is reported as a base64 payload plus digest so the host can cache it; the
/// live handle stays on the bridge side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,
}

/// Host-boundary response for `start`: the initial background of a freshly
/// loaded environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

/// Host-boundary response for `step`: one frame's drawable output.
///
/// When `ok` is false the host must treat `lines` and `background` as
/// undefined; they are emitted empty/absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

impl StepResponse {
    /// Build an error response with empty frame data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            lines: Vec::new(),
            background: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_roundtrips_through_json() {
        let line = Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 10.0),
            color: Color::new(1.0, 0.0, 0.0, 1.0),
            width: 2.0,
        };
        let json = serde_json::to_string(&line).unwrap();
        let back: Line = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);
    }

    #[test]
    fn test_step_error_response_has_empty_frame_data() {
        let resp = StepResponse::error("evaluation error");
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("evaluation error"));
        assert!(resp.lines.is_empty());
        assert!(resp.background.is_none());
    }

    #[test]
    fn test_colors_are_not_clamped() {
        // Interpreter-defined ranges pass through untouched.
        let c = Color::new(2.5, -1.0, 0.0, 7.0);
        assert_eq!(c.r, 2.5);
        assert_eq!(c.g, -1.0);
    }
}
