//! # List Enumeration
//!
//! Marker generation for list items. A strategy is a small state machine:
//! it starts "not started" and every [`EnumerationStrategy::next`] moves to
//! the following index and returns that item's marker. Reserving space for
//! markers never touches that state.
//!
//! Ordered styles count (`1.`, `b.`, `iv.`); unordered styles repeat one
//! bullet. Styles are resolved by name through a [`StrategyFactory`], once
//! per list node.

use std::collections::HashMap;

use crate::font::FontMetrics;
use crate::text::char_codes;

/// Capability shared by every marker scheme.
pub trait EnumerationStrategy {
    /// Advance to the next item and return its marker.
    fn next(&mut self) -> String;

    /// Marker of the current item; empty before the first `next`.
    fn current_marker_text(&self) -> String;

    /// Go back to "not started".
    fn reset(&mut self);

    /// Jump to a logical index; the next call to `next` yields `index + 1`.
    fn set_index(&mut self, index: usize);

    /// Number rendered for the first item.
    fn set_visual_index(&mut self, visual_index: usize);

    /// Marker for the 1-based logical `index`, without changing state.
    fn marker_text(&self, index: usize) -> String;

    /// Widest marker any of the first `item_count` items can render.
    fn reserved_width(&self, metrics: &dyn FontMetrics, font: &str, size: f64, item_count: usize) -> f64 {
        (1..=item_count.max(1))
            .map(|i| metrics.measure(font, size, &char_codes(self.marker_text(i).as_bytes())))
            .fold(0.0, f64::max)
    }
}

/// Counting styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedStyle {
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl OrderedStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "decimal" => Some(OrderedStyle::Decimal),
            "lower-alpha" | "lower-latin" => Some(OrderedStyle::LowerAlpha),
            "upper-alpha" | "upper-latin" => Some(OrderedStyle::UpperAlpha),
            "lower-roman" => Some(OrderedStyle::LowerRoman),
            "upper-roman" => Some(OrderedStyle::UpperRoman),
            _ => None,
        }
    }

    /// Render a number in this style. Zero has no alphabetic or roman form
    /// and falls back to decimal.
    pub fn format(&self, n: usize) -> String {
        match self {
            OrderedStyle::Decimal => n.to_string(),
            OrderedStyle::LowerAlpha if n > 0 => to_alpha(n),
            OrderedStyle::UpperAlpha if n > 0 => to_alpha(n).to_uppercase(),
            OrderedStyle::LowerRoman if n > 0 => to_roman(n),
            OrderedStyle::UpperRoman if n > 0 => to_roman(n).to_uppercase(),
            _ => n.to_string(),
        }
    }
}

/// a, b, ..., z, aa, ab, ...
fn to_alpha(mut n: usize) -> String {
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.iter().rev().map(|&b| b as char).collect()
}

fn to_roman(mut n: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// Numbered markers rendered as `"<n>."`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedEnumeration {
    style: OrderedStyle,
    /// Logical index of the current item; 0 means not started.
    index: usize,
    visual_index: usize,
}

impl OrderedEnumeration {
    pub fn new(style: OrderedStyle) -> Self {
        Self {
            style,
            index: 0,
            visual_index: 1,
        }
    }

    pub fn style(&self) -> OrderedStyle {
        self.style
    }
}

impl EnumerationStrategy for OrderedEnumeration {
    fn next(&mut self) -> String {
        self.index += 1;
        self.marker_text(self.index)
    }

    fn current_marker_text(&self) -> String {
        if self.index == 0 {
            String::new()
        } else {
            self.marker_text(self.index)
        }
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn set_visual_index(&mut self, visual_index: usize) {
        self.visual_index = visual_index;
    }

    fn marker_text(&self, index: usize) -> String {
        let n = (self.visual_index + index).saturating_sub(1);
        format!("{}.", self.style.format(n))
    }
}

/// The same bullet for every item.
#[derive(Debug, Clone, PartialEq)]
pub struct UnorderedEnumeration {
    bullet: String,
    index: usize,
}

impl UnorderedEnumeration {
    pub fn new(bullet: impl Into<String>) -> Self {
        Self {
            bullet: bullet.into(),
            index: 0,
        }
    }
}

impl EnumerationStrategy for UnorderedEnumeration {
    fn next(&mut self) -> String {
        self.index += 1;
        self.bullet.clone()
    }

    fn current_marker_text(&self) -> String {
        if self.index == 0 {
            String::new()
        } else {
            self.bullet.clone()
        }
    }

    fn reset(&mut self) {
        self.index = 0;
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    // Bullets do not count.
    fn set_visual_index(&mut self, _visual_index: usize) {}

    fn marker_text(&self, _index: usize) -> String {
        self.bullet.clone()
    }
}

/// The strategy attached to a list node.
#[derive(Debug, Clone, PartialEq)]
pub enum Enumeration {
    Ordered(OrderedEnumeration),
    Unordered(UnorderedEnumeration),
}

impl Enumeration {
    fn inner(&self) -> &dyn EnumerationStrategy {
        match self {
            Enumeration::Ordered(e) => e,
            Enumeration::Unordered(e) => e,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn EnumerationStrategy {
        match self {
            Enumeration::Ordered(e) => e,
            Enumeration::Unordered(e) => e,
        }
    }
}

impl EnumerationStrategy for Enumeration {
    fn next(&mut self) -> String {
        self.inner_mut().next()
    }

    fn current_marker_text(&self) -> String {
        self.inner().current_marker_text()
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn set_index(&mut self, index: usize) {
        self.inner_mut().set_index(index)
    }

    fn set_visual_index(&mut self, visual_index: usize) {
        self.inner_mut().set_visual_index(visual_index)
    }

    fn marker_text(&self, index: usize) -> String {
        self.inner().marker_text(index)
    }
}

/// Resolves a `list-type` name to a fresh strategy.
pub trait StrategyFactory {
    fn create(&self, style: &str) -> Option<Enumeration>;
}

/// Default factory: the built-in ordered styles plus named bullets.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    bullets: HashMap<String, String>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            bullets: HashMap::new(),
        };
        registry.register_bullet("disc", "\u{2022}");
        registry.register_bullet("circle", "\u{25E6}");
        registry.register_bullet("square", "\u{25AA}");
        registry.register_bullet("none", "");
        registry
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a bullet style.
    pub fn register_bullet(&mut self, name: &str, bullet: &str) {
        self.bullets.insert(name.to_string(), bullet.to_string());
    }
}

impl StrategyFactory for StrategyRegistry {
    fn create(&self, style: &str) -> Option<Enumeration> {
        if let Some(ordered) = OrderedStyle::from_name(style) {
            return Some(Enumeration::Ordered(OrderedEnumeration::new(ordered)));
        }
        self.bullets
            .get(style)
            .map(|bullet| Enumeration::Unordered(UnorderedEnumeration::new(bullet.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 5pt per character.
    struct PerChar;

    impl FontMetrics for PerChar {
        fn measure(&self, _font: &str, _size: f64, codes: &[u32]) -> f64 {
            codes.len() as f64 * 5.0
        }
    }

    fn decimal() -> Enumeration {
        StrategyRegistry::new().create("decimal").unwrap()
    }

    #[test]
    fn next_advances_from_not_started() {
        let mut e = decimal();
        assert_eq!(e.current_marker_text(), "");
        assert_eq!(e.next(), "1.");
        assert_eq!(e.next(), "2.");
        assert_eq!(e.current_marker_text(), "2.");
    }

    #[test]
    fn reset_reproduces_fresh_sequence() {
        let mut used = decimal();
        for _ in 0..7 {
            used.next();
        }
        used.reset();

        let mut fresh = decimal();
        let a: Vec<_> = (0..5).map(|_| used.next()).collect();
        let b: Vec<_> = (0..5).map(|_| fresh.next()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn reserved_width_covers_widest_marker() {
        let e = decimal();
        // "12." is three characters, "9." only two.
        assert_eq!(e.reserved_width(&PerChar, "Helvetica", 10.0, 12), 15.0);
        assert_eq!(e.reserved_width(&PerChar, "Helvetica", 10.0, 9), 10.0);
    }

    #[test]
    fn reserving_does_not_advance() {
        let mut e = decimal();
        e.reserved_width(&PerChar, "Helvetica", 10.0, 30);
        assert_eq!(e.next(), "1.");
    }

    #[test]
    fn visual_index_shifts_rendered_numbers() {
        let mut e = decimal();
        e.set_visual_index(5);
        assert_eq!(e.next(), "5.");
        e.set_index(9);
        assert_eq!(e.next(), "14.");
    }

    #[test]
    fn alpha_and_roman_styles() {
        let registry = StrategyRegistry::new();
        let alpha = registry.create("upper-alpha").unwrap();
        assert_eq!(alpha.marker_text(1), "A.");
        assert_eq!(alpha.marker_text(27), "AA.");
        let roman = registry.create("lower-roman").unwrap();
        assert_eq!(roman.marker_text(4), "iv.");
        assert_eq!(roman.marker_text(1994), "mcmxciv.");
    }

    #[test]
    fn bullets_and_custom_styles() {
        let mut registry = StrategyRegistry::new();
        let mut disc = registry.create("disc").unwrap();
        assert_eq!(disc.next(), "\u{2022}");
        assert_eq!(disc.next(), "\u{2022}");

        assert!(registry.create("dash").is_none());
        registry.register_bullet("dash", "-");
        assert_eq!(registry.create("dash").unwrap().marker_text(3), "-");
    }
}
