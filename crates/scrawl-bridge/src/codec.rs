//! Value codec: typed marshaling across the host/runtime boundary.
//!
//! The runtime hands back untyped tuples; the host wants fixed-layout
//! records. Every decode here is a fallible conversion — wrong arity, a
//! non-numeric element, or a wrong tagged type is a reported error, never a
//! silently substituted default. No side effects, no heap access.

use scrawl_engine::Value;
use scrawl_types::{Color, Line, Point};

use crate::errors::BridgeError;

/// Encode script source for the runtime's evaluate entry point.
///
/// Total for any valid `&str`.
pub fn encode_source(source: &str) -> Value {
    Value::string(source)
}

fn element(items: &[Value], index: usize, expected: &'static str) -> Result<f64, BridgeError> {
    items[index]
        .as_number()
        .ok_or_else(|| BridgeError::decode(expected, items[index].type_name().to_string()))
}

/// Decode a `(x y)` tuple into a [`Point`].
pub fn decode_point(value: &Value) -> Result<Point, BridgeError> {
    const EXPECTED: &str = "point tuple of 2 numbers";
    let items = value
        .as_tuple()
        .ok_or_else(|| BridgeError::decode(EXPECTED, value.type_name()))?;
    if items.len() != 2 {
        return Err(BridgeError::decode(
            EXPECTED,
            format!("tuple of {} elements", items.len()),
        ));
    }
    Ok(Point::new(
        element(items, 0, EXPECTED)?,
        element(items, 1, EXPECTED)?,
    ))
}

/// Decode a `(r g b a)` tuple into a [`Color`]. Components are not clamped.
pub fn decode_color(value: &Value) -> Result<Color, BridgeError> {
    const EXPECTED: &str = "color tuple of 4 numbers";
    let items = value
        .as_tuple()
        .ok_or_else(|| BridgeError::decode(EXPECTED, value.type_name()))?;
    if items.len() != 4 {
        return Err(BridgeError::decode(
            EXPECTED,
            format!("tuple of {} elements", items.len()),
        ));
    }
    Ok(Color::new(
        element(items, 0, EXPECTED)?,
        element(items, 1, EXPECTED)?,
        element(items, 2, EXPECTED)?,
        element(items, 3, EXPECTED)?,
    ))
}

/// Decode a `(start end color width)` tuple into a [`Line`].
pub fn decode_line(value: &Value) -> Result<Line, BridgeError> {
    const EXPECTED: &str = "line tuple of (start end color width)";
    let items = value
        .as_tuple()
        .ok_or_else(|| BridgeError::decode(EXPECTED, value.type_name()))?;
    if items.len() != 4 {
        return Err(BridgeError::decode(
            EXPECTED,
            format!("tuple of {} elements", items.len()),
        ));
    }
    Ok(Line {
        start: decode_point(&items[0])?,
        end: decode_point(&items[1])?,
        color: decode_color(&items[2])?,
        width: element(items, 3, EXPECTED)?,
    })
}
