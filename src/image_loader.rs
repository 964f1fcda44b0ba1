//! # Image Loading and Decoding
//!
//! The layout core only needs an image's pixel size; everything else is
//! carried through to the output surface untouched. Decoders turn raw bytes
//! into a [`DecodedImage`]: pixel dimensions, bit depth, color space, and a
//! ready-to-embed pixel stream with its compression filter.
//!
//! [`RasterDecoder`] handles JPEG (passed through for DCTDecode) and PNG
//! (decoded and recompressed with FlateDecode).

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::{QuireError, Result};

/// Color space of a decoded pixel stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,
}

/// Compression applied to the pixel stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamFilter {
    /// Raw samples.
    None,
    /// zlib-compressed samples.
    FlateDecode,
    /// JPEG bytes as-is.
    DCTDecode,
}

/// A decoded image, ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub bit_depth: u8,
    pub color_space: ColorSpace,
    pub filter: StreamFilter,
    pub stream: Vec<u8>,
}

/// Shared handle to a decoded image. Equality is identity.
#[derive(Clone)]
pub struct ImageRef(Arc<DecodedImage>);

impl ImageRef {
    pub fn new(image: DecodedImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn image(&self) -> &DecodedImage {
        &self.0
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImageRef({}x{} {:?})",
            self.0.width_px, self.0.height_px, self.0.color_space
        )
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ImageRef", 4)?;
        s.serialize_field("widthPx", &self.0.width_px)?;
        s.serialize_field("heightPx", &self.0.height_px)?;
        s.serialize_field("colorSpace", &self.0.color_space)?;
        s.serialize_field("filter", &self.0.filter)?;
        s.end()
    }
}

/// Turns raw image bytes into a [`DecodedImage`].
pub trait ImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage>;

    /// Load from a source string: a `data:` URI, a file path, or raw base64.
    fn load(&self, src: &str) -> Result<DecodedImage> {
        let bytes = read_source_bytes(src)?;
        self.decode(&bytes)
    }
}

/// JPEG and PNG decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        if data.len() < 4 {
            return Err(QuireError::ImageDecode("image data too short".to_string()));
        }

        if is_jpeg(data) {
            decode_jpeg(data)
        } else if is_png(data) {
            decode_png(data)
        } else {
            Err(QuireError::ImageDecode(
                "unsupported image format (expected JPEG or PNG)".to_string(),
            ))
        }
    }
}

/// Resolve the source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| QuireError::ImageDecode("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes count as paths; base64 may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| QuireError::ImageDecode(format!("failed to read image file '{}': {}", src, e)));
    }

    base64_decode(src)
}

pub(crate) fn base64_decode(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| QuireError::ImageDecode(format!("base64 decode error: {}", e)))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<DecodedImage> {
    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| QuireError::ImageDecode(format!("JPEG format detection error: {}", e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| QuireError::ImageDecode(format!("failed to read JPEG dimensions: {}", e)))?;

    Ok(DecodedImage {
        width_px: width,
        height_px: height,
        bit_depth: 8,
        color_space: detect_jpeg_color_space(data),
        filter: StreamFilter::DCTDecode,
        stream: data.to_vec(),
    })
}

/// Scan JPEG markers for the SOF segment and map its component count.
fn detect_jpeg_color_space(data: &[u8]) -> ColorSpace {
    let mut i = 2; // skip SOI marker (FF D8)
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        // SOF markers: C0-C3, C5-C7, C9-CB, CD-CF
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return match data[i + 9] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    ColorSpace::DeviceRGB
}

/// PNG: decode to gray or RGB samples and deflate them.
fn decode_png(data: &[u8]) -> Result<DecodedImage> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| QuireError::ImageDecode(format!("PNG format detection error: {}", e)))?
        .decode()
        .map_err(|e| QuireError::ImageDecode(format!("failed to decode PNG: {}", e)))?;

    let (color_space, samples, width, height) = match img.color() {
        image::ColorType::L8 | image::ColorType::L16 | image::ColorType::La8 | image::ColorType::La16 => {
            let gray = img.to_luma8();
            let (w, h) = gray.dimensions();
            (ColorSpace::DeviceGray, gray.into_raw(), w, h)
        }
        _ => {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            (ColorSpace::DeviceRGB, rgb.into_raw(), w, h)
        }
    };

    Ok(DecodedImage {
        width_px: width,
        height_px: height,
        bit_depth: 8,
        color_space,
        filter: StreamFilter::FlateDecode,
        stream: miniz_oxide::deflate::compress_to_vec_zlib(&samples, 6),
    })
}
