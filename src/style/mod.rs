//! # Style Values
//!
//! The value types carried by node attributes: lengths that may be relative
//! to the parent box, colors, and the small enums that steer layout.

use serde::{Deserialize, Serialize};

/// A length that can be points, percentage, or auto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Fixed size in points (1/72 inch).
    Pt(f64),
    /// Percentage of the parent's corresponding dimension.
    Percent(f64),
    /// Size determined by content.
    Auto,
}

impl Dimension {
    /// Resolve this dimension given a parent size.
    /// Returns None for Auto.
    pub fn resolve(&self, parent_size: f64) -> Option<f64> {
        match self {
            Dimension::Pt(v) => Some(*v),
            Dimension::Percent(p) => Some(parent_size * p / 100.0),
            Dimension::Auto => None,
        }
    }

    /// Parse `"120"`, `"120pt"`, `"50%"` or `"auto"`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("auto") {
            return Some(Dimension::Auto);
        }
        if let Some(percent) = input.strip_suffix('%') {
            return percent.trim().parse().ok().map(Dimension::Percent);
        }
        let points = input.strip_suffix("pt").unwrap_or(input);
        points.trim().parse().ok().map(Dimension::Pt)
    }
}

/// How a node participates in its parent's flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    /// Takes the full content width of its parent and stacks vertically.
    #[default]
    Block,
    /// Sized by its content and placed next to preceding inline siblings.
    Inline,
}

impl Display {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "block" => Some(Display::Block),
            "inline" => Some(Display::Inline),
            _ => None,
        }
    }
}

/// Where list markers are placed relative to the item box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListPosition {
    /// Markers hang to the left of the item box.
    #[default]
    Outside,
    /// Space for the widest marker is reserved inside the list.
    Inside,
}

impl ListPosition {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "outside" => Some(ListPosition::Outside),
            "inside" => Some(ListPosition::Inside),
            _ => None,
        }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb` or `#rrggbb`. Returns None for anything else.
    pub fn hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let (r, g, b) = match hex.len() {
            3 => (
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            ),
            6 => (
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ),
            _ => return None,
        };
        Some(Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        })
    }

    pub fn is_visible(&self) -> bool {
        self.a > 0.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_resolves_against_parent() {
        assert_eq!(Dimension::Percent(50.0).resolve(300.0), Some(150.0));
        assert_eq!(Dimension::Pt(20.0).resolve(300.0), Some(20.0));
        assert_eq!(Dimension::Auto.resolve(300.0), None);
    }

    #[test]
    fn parse_dimensions() {
        assert_eq!(Dimension::parse("50%"), Some(Dimension::Percent(50.0)));
        assert_eq!(Dimension::parse("12pt"), Some(Dimension::Pt(12.0)));
        assert_eq!(Dimension::parse(" 7.5 "), Some(Dimension::Pt(7.5)));
        assert_eq!(Dimension::parse("auto"), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("wide"), None);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::hex("000000"), Some(Color::BLACK));
        assert_eq!(Color::hex("#12"), None);
        assert_eq!(Color::hex("#zzzzzz"), None);
    }
}
