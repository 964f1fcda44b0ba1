//! Typed node attributes.
//!
//! Every node kind declares the attributes it accepts. Values are a closed
//! set of types; each attribute has a default so reads never come back
//! unset.

use std::fmt;

use crate::image_loader::ImageRef;
use crate::style::{Color, Dimension, Display, ListPosition};
use crate::tree::NodeId;

/// A named node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Width,
    Height,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    FontFamily,
    FontSize,
    LineHeight,
    Display,
    Color,
    BackgroundColor,
    Text,
    Src,
    ListType,
    ListPosition,
    DummyText,
}

impl Attribute {
    pub const ALL: [Attribute; 21] = [
        Attribute::Width,
        Attribute::Height,
        Attribute::MarginTop,
        Attribute::MarginRight,
        Attribute::MarginBottom,
        Attribute::MarginLeft,
        Attribute::PaddingTop,
        Attribute::PaddingRight,
        Attribute::PaddingBottom,
        Attribute::PaddingLeft,
        Attribute::FontFamily,
        Attribute::FontSize,
        Attribute::LineHeight,
        Attribute::Display,
        Attribute::Color,
        Attribute::BackgroundColor,
        Attribute::Text,
        Attribute::Src,
        Attribute::ListType,
        Attribute::ListPosition,
        Attribute::DummyText,
    ];

    /// Attributes every box-like node accepts.
    pub(crate) const BOX: [Attribute; 16] = [
        Attribute::Width,
        Attribute::Height,
        Attribute::MarginTop,
        Attribute::MarginRight,
        Attribute::MarginBottom,
        Attribute::MarginLeft,
        Attribute::PaddingTop,
        Attribute::PaddingRight,
        Attribute::PaddingBottom,
        Attribute::PaddingLeft,
        Attribute::FontFamily,
        Attribute::FontSize,
        Attribute::LineHeight,
        Attribute::Display,
        Attribute::Color,
        Attribute::BackgroundColor,
    ];

    /// The kebab-case name used in document input.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Width => "width",
            Attribute::Height => "height",
            Attribute::MarginTop => "margin-top",
            Attribute::MarginRight => "margin-right",
            Attribute::MarginBottom => "margin-bottom",
            Attribute::MarginLeft => "margin-left",
            Attribute::PaddingTop => "padding-top",
            Attribute::PaddingRight => "padding-right",
            Attribute::PaddingBottom => "padding-bottom",
            Attribute::PaddingLeft => "padding-left",
            Attribute::FontFamily => "font-family",
            Attribute::FontSize => "font-size",
            Attribute::LineHeight => "line-height",
            Attribute::Display => "display",
            Attribute::Color => "color",
            Attribute::BackgroundColor => "background-color",
            Attribute::Text => "text",
            Attribute::Src => "src",
            Attribute::ListType => "list-type",
            Attribute::ListPosition => "list-position",
            Attribute::DummyText => "dummy-text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }

    /// Inherited attributes are looked up through ancestors when unset.
    pub fn is_inherited(self) -> bool {
        matches!(
            self,
            Attribute::FontFamily | Attribute::FontSize | Attribute::LineHeight | Attribute::Color
        )
    }

    /// Whether a change invalidates already computed geometry.
    pub fn affects_geometry(self) -> bool {
        !matches!(self, Attribute::Color | Attribute::BackgroundColor)
    }

    /// The value read when the attribute is neither set nor inherited.
    pub fn default_value(self) -> AttributeValue {
        match self {
            Attribute::Width | Attribute::Height | Attribute::LineHeight => {
                AttributeValue::Length(Dimension::Auto)
            }
            Attribute::MarginTop
            | Attribute::MarginRight
            | Attribute::MarginBottom
            | Attribute::MarginLeft
            | Attribute::PaddingTop
            | Attribute::PaddingRight
            | Attribute::PaddingBottom
            | Attribute::PaddingLeft => AttributeValue::Number(0.0),
            Attribute::FontFamily => AttributeValue::Text("Helvetica".to_string()),
            Attribute::FontSize => AttributeValue::Number(12.0),
            Attribute::Display => AttributeValue::Display(Display::Block),
            Attribute::Color => AttributeValue::Color(Color::BLACK),
            Attribute::BackgroundColor => AttributeValue::Color(Color::TRANSPARENT),
            Attribute::Text | Attribute::Src => AttributeValue::Text(String::new()),
            Attribute::ListType => AttributeValue::Text("disc".to_string()),
            Attribute::ListPosition => AttributeValue::ListPosition(ListPosition::Outside),
            Attribute::DummyText => AttributeValue::Text("999".to_string()),
        }
    }

    /// Check that `value` has a type this attribute can hold.
    pub fn accepts(self, value: &AttributeValue) -> bool {
        match self {
            Attribute::Width | Attribute::Height | Attribute::LineHeight => {
                matches!(value, AttributeValue::Length(_) | AttributeValue::Number(_))
            }
            Attribute::MarginTop
            | Attribute::MarginRight
            | Attribute::MarginBottom
            | Attribute::MarginLeft
            | Attribute::PaddingTop
            | Attribute::PaddingRight
            | Attribute::PaddingBottom
            | Attribute::PaddingLeft
            | Attribute::FontSize => matches!(value, AttributeValue::Number(_)),
            Attribute::FontFamily
            | Attribute::Text
            | Attribute::ListType
            | Attribute::DummyText => matches!(value, AttributeValue::Text(_)),
            Attribute::Display => matches!(value, AttributeValue::Display(_)),
            Attribute::Color | Attribute::BackgroundColor => {
                matches!(value, AttributeValue::Color(_))
            }
            Attribute::Src => matches!(value, AttributeValue::Text(_) | AttributeValue::Image(_)),
            Attribute::ListPosition => matches!(value, AttributeValue::ListPosition(_)),
        }
    }

    /// Convert a JSON input value into this attribute's value type.
    pub fn parse_value(self, value: &serde_json::Value) -> Result<AttributeValue, String> {
        use serde_json::Value;

        match (self, value) {
            (Attribute::Width | Attribute::Height | Attribute::LineHeight, Value::Number(n)) => n
                .as_f64()
                .map(|v| AttributeValue::Length(Dimension::Pt(v)))
                .ok_or_else(|| format!("{n} is not a finite number")),
            (Attribute::Width | Attribute::Height | Attribute::LineHeight, Value::String(s)) => {
                Dimension::parse(s)
                    .map(AttributeValue::Length)
                    .ok_or_else(|| format!("`{s}` is not a length"))
            }
            (Attribute::FontFamily | Attribute::Text | Attribute::Src, Value::String(s))
            | (Attribute::ListType | Attribute::DummyText, Value::String(s)) => {
                Ok(AttributeValue::Text(s.clone()))
            }
            (Attribute::Display, Value::String(s)) => Display::parse(s)
                .map(AttributeValue::Display)
                .ok_or_else(|| format!("`{s}` is not a display mode")),
            (Attribute::ListPosition, Value::String(s)) => ListPosition::parse(s)
                .map(AttributeValue::ListPosition)
                .ok_or_else(|| format!("`{s}` is not a list position")),
            (Attribute::Color | Attribute::BackgroundColor, Value::String(s)) => Color::hex(s)
                .map(AttributeValue::Color)
                .ok_or_else(|| format!("`{s}` is not a hex color")),
            (Attribute::Color | Attribute::BackgroundColor, Value::Object(_)) => {
                serde_json::from_value::<Color>(value.clone())
                    .map(AttributeValue::Color)
                    .map_err(|e| e.to_string())
            }
            (_, Value::Number(n)) if self.accepts(&AttributeValue::Number(0.0)) => n
                .as_f64()
                .map(AttributeValue::Number)
                .ok_or_else(|| format!("{n} is not a finite number")),
            (_, Value::String(s)) if self.accepts(&AttributeValue::Number(0.0)) => s
                .trim()
                .trim_end_matches("pt")
                .parse()
                .map(AttributeValue::Number)
                .map_err(|_| format!("`{s}` is not a number")),
            (_, other) => Err(format!("unexpected JSON value {other}")),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value stored under an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Length(Dimension),
    Text(String),
    Display(Display),
    ListPosition(ListPosition),
    Color(Color),
    /// A decoded image resource.
    Image(ImageRef),
}

impl AttributeValue {
    /// Numeric view of the value; fixed lengths count, everything else is 0.
    pub fn as_number(&self) -> f64 {
        match self {
            AttributeValue::Number(v) => *v,
            AttributeValue::Length(Dimension::Pt(v)) => *v,
            _ => 0.0,
        }
    }

    pub fn as_dimension(&self) -> Dimension {
        match self {
            AttributeValue::Length(d) => *d,
            AttributeValue::Number(v) => Dimension::Pt(*v),
            _ => Dimension::Auto,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            AttributeValue::Text(s) => s,
            _ => "",
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<Dimension> for AttributeValue {
    fn from(d: Dimension) -> Self {
        AttributeValue::Length(d)
    }
}

impl From<Display> for AttributeValue {
    fn from(d: Display) -> Self {
        AttributeValue::Display(d)
    }
}

impl From<ListPosition> for AttributeValue {
    fn from(p: ListPosition) -> Self {
        AttributeValue::ListPosition(p)
    }
}

impl From<Color> for AttributeValue {
    fn from(c: Color) -> Self {
        AttributeValue::Color(c)
    }
}

/// Observer notified after an attribute write.
///
/// `old` is the previously set value, or None if the attribute was unset.
pub trait AttributeListener {
    fn attribute_changed(&mut self, node: NodeId, attribute: Attribute, old: Option<&AttributeValue>);
}

impl<F> AttributeListener for F
where
    F: FnMut(NodeId, Attribute, Option<&AttributeValue>),
{
    fn attribute_changed(&mut self, node: NodeId, attribute: Attribute, old: Option<&AttributeValue>) {
        self(node, attribute, old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_round_trip() {
        for attr in Attribute::ALL {
            assert_eq!(Attribute::from_name(attr.name()), Some(attr));
        }
        assert_eq!(Attribute::from_name("margin"), None);
    }

    #[test]
    fn defaults_are_accepted_by_their_attribute() {
        for attr in Attribute::ALL {
            assert!(attr.accepts(&attr.default_value()), "{attr}");
        }
    }

    #[test]
    fn parse_json_values() {
        assert_eq!(
            Attribute::Width.parse_value(&json!("50%")),
            Ok(AttributeValue::Length(Dimension::Percent(50.0)))
        );
        assert_eq!(
            Attribute::MarginLeft.parse_value(&json!(4)),
            Ok(AttributeValue::Number(4.0))
        );
        assert_eq!(
            Attribute::Display.parse_value(&json!("inline")),
            Ok(AttributeValue::Display(Display::Inline))
        );
        assert!(Attribute::Display.parse_value(&json!("flex")).is_err());
        assert!(Attribute::FontSize.parse_value(&json!(true)).is_err());
        assert_eq!(
            Attribute::Color.parse_value(&json!("#000")),
            Ok(AttributeValue::Color(Color::BLACK))
        );
    }

    #[test]
    fn only_visual_attributes_keep_geometry() {
        assert!(!Attribute::Color.affects_geometry());
        assert!(Attribute::MarginLeft.affects_geometry());
        assert!(Attribute::FontSize.affects_geometry());
    }
}
