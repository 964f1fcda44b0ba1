//! # Font Metrics
//!
//! Text measurement for the layout core. Everything that needs a width
//! goes through the [`FontMetrics`] trait, which must be deterministic:
//! the runtime resolution pass re-wraps text and expects the same widths
//! the format pass saw.
//!
//! [`FontContext`] knows the standard Helvetica, Times and Courier widths
//! and custom TrueType/OpenType fonts parsed with ttf-parser. Unknown
//! families fall back to Helvetica.

pub mod metrics;

use std::cell::RefCell;
use std::collections::HashMap;

pub use metrics::StandardFontMetrics;

use crate::error::{QuireError, Result};

/// Width measurement for runs of character codes.
pub trait FontMetrics {
    /// Advance width in points of `codes` set in `font` at `size`.
    fn measure(&self, font: &str, size: f64, codes: &[u32]) -> f64;
}

/// The standard fonts that need no font file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            StandardFont::Helvetica => metrics::HELVETICA,
            StandardFont::TimesRoman => metrics::TIMES_ROMAN,
            StandardFont::Courier => metrics::COURIER,
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<u32, u16>,
    pub default_advance: u16,
}

impl CustomFontMetrics {
    /// Advance width of a character code in points.
    pub fn code_width(&self, code: u32, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&code)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data.
    pub fn from_font_data(data: &[u8]) -> Result<Self> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| QuireError::Font(format!("failed to parse font: {}", e)))?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(code, advance);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
        })
    }
}

#[derive(Debug, Clone)]
enum FontData {
    Standard(StandardFont),
    Custom(CustomFontMetrics),
}

/// Registry of font families, used as the default [`FontMetrics`].
#[derive(Debug, Clone)]
pub struct FontContext {
    fonts: HashMap<String, FontData>,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        let standard = [
            ("Helvetica", StandardFont::Helvetica),
            ("Arial", StandardFont::Helvetica),
            ("Times", StandardFont::TimesRoman),
            ("Times-Roman", StandardFont::TimesRoman),
            ("Courier", StandardFont::Courier),
        ];
        for (family, font) in standard {
            fonts.insert(family.to_string(), FontData::Standard(font));
        }
        Self { fonts }
    }

    /// Register a custom font from raw TrueType/OpenType bytes.
    pub fn register(&mut self, family: &str, data: &[u8]) -> Result<()> {
        let metrics = CustomFontMetrics::from_font_data(data)?;
        log::debug!(
            "registered font '{}' ({} glyph widths)",
            family,
            metrics.advance_widths.len()
        );
        self.fonts.insert(family.to_string(), FontData::Custom(metrics));
        Ok(())
    }

    /// Register a custom font given as base64 or a `data:` URI.
    pub fn register_base64(&mut self, family: &str, src: &str) -> Result<()> {
        let encoded = match src.find(',') {
            Some(comma) if src.starts_with("data:") => &src[comma + 1..],
            _ => src,
        };
        let data = crate::image_loader::base64_decode(encoded)
            .map_err(|e| QuireError::Font(format!("font '{}': {}", family, e)))?;
        self.register(family, &data)
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.fonts.contains_key(family)
    }
}

impl FontMetrics for FontContext {
    fn measure(&self, font: &str, size: f64, codes: &[u32]) -> f64 {
        if size == 0.0 {
            return 0.0;
        }
        match self.fonts.get(font) {
            Some(FontData::Standard(std_font)) => std_font.metrics().measure_codes(codes, size),
            Some(FontData::Custom(m)) => codes.iter().map(|&c| m.code_width(c, size)).sum(),
            None => metrics::HELVETICA.measure_codes(codes, size),
        }
    }
}

/// Memoizes measurements of another [`FontMetrics`].
pub struct MeasureCache<'a> {
    inner: &'a dyn FontMetrics,
    cache: RefCell<HashMap<(String, u64, Vec<u32>), f64>>,
}

impl<'a> MeasureCache<'a> {
    pub fn new(inner: &'a dyn FontMetrics) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

impl FontMetrics for MeasureCache<'_> {
    fn measure(&self, font: &str, size: f64, codes: &[u32]) -> f64 {
        let key = (font.to_string(), size.to_bits(), codes.to_vec());
        if let Some(&w) = self.cache.borrow().get(&key) {
            return w;
        }
        let w = self.inner.measure(font, size, codes);
        self.cache.borrow_mut().insert(key, w);
        w
    }
}
