// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values carried by node properties.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with 8-bit channels
pub type Rgba = [u8; 4];

/// A property value.
///
/// Serialized untagged so that the JSON form reads like plain data:
/// colors and positions become arrays, null stays null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum PropertyValue {
    /// No value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// RGBA color
    Color(Rgba),
    /// 2D vector (positions)
    Vec2([f64; 2]),
    /// Sequence of values
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Short name of the value shape, used in logs and errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Color(_) => "color",
            Self::Vec2(_) => "vec2",
            Self::List(_) => "list",
        }
    }

    /// Get as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a float, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as a 2D vector, accepting two-element numeric lists
    pub fn as_vec2(&self) -> Option<[f64; 2]> {
        match self {
            Self::Vec2(v) => Some(*v),
            Self::List(items) if items.len() == 2 => {
                Some([items[0].as_f64()?, items[1].as_f64()?])
            }
            _ => None,
        }
    }

    /// Get as an RGBA color.
    ///
    /// Accepts `#rrggbb` strings, three or four element integer lists and
    /// colors. Alpha defaults to 255.
    pub fn as_color(&self) -> Option<Rgba> {
        match self {
            Self::Color(c) => Some(*c),
            Self::Str(s) => parse_hex_color(s),
            Self::List(items) if items.len() == 3 || items.len() == 4 => {
                let mut rgba = [255u8; 4];
                for (channel, item) in rgba.iter_mut().zip(items) {
                    *channel = u8::try_from(item.as_i64()?).ok()?;
                }
                Some(rgba)
            }
            _ => None,
        }
    }

    /// Whether this is a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Color(c) => write!(f, "{}", to_hex(*c)),
            Self::Vec2([x, y]) => write!(f, "({x}, {y})"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Rgba> for PropertyValue {
    fn from(value: Rgba) -> Self {
        Self::Color(value)
    }
}

impl From<[u8; 3]> for PropertyValue {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::List(vec![r.into(), g.into(), b.into()])
    }
}

impl From<u8> for PropertyValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<[f64; 2]> for PropertyValue {
    fn from(value: [f64; 2]) -> Self {
        Self::Vec2(value)
    }
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Str)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Parse a `#rrggbb` (or bare `rrggbb`) string into an opaque color
pub fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?, 255])
}

/// Format the RGB channels of a color as `#rrggbb`
pub fn to_hex([r, g, b, _]: Rgba) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(parse_hex_color("#ff0000"), Some([255, 0, 0, 255]));
        assert_eq!(parse_hex_color("0a141e"), Some([10, 20, 30, 255]));
        assert_eq!(parse_hex_color("#ff00"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(to_hex([10, 20, 30, 40]), "#0a141e");
    }

    #[test]
    fn test_color_coercion() {
        let rgb = PropertyValue::from([10u8, 20, 30]);
        assert_eq!(rgb.as_color(), Some([10, 20, 30, 255]));

        let rgba = PropertyValue::from(vec![1, 2, 3, 4]);
        assert_eq!(rgba.as_color(), Some([1, 2, 3, 4]));

        let out_of_range = PropertyValue::from(vec![300, 0, 0]);
        assert_eq!(out_of_range.as_color(), None);
        assert_eq!(PropertyValue::from(true).as_color(), None);
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(PropertyValue::from(3).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::from(vec![1, 2]).as_vec2(), Some([1.0, 2.0]));
        assert!(PropertyValue::from(2.5).is_numeric());
        assert!(!PropertyValue::from("2.5").is_numeric());
    }

    #[test]
    fn test_untagged_json() {
        let value = PropertyValue::Color([1, 2, 3, 255]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[1,2,3,255]");
        assert_eq!(serde_json::to_string(&PropertyValue::Null).unwrap(), "null");
        let parsed: PropertyValue = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, PropertyValue::from("abc"));
    }
}
