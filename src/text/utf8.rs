//! Byte-level UTF-8 walking for width measurement.
//!
//! Text can reach the measurer as raw bytes, so the walker does not trust
//! its input. Each step looks at the leading byte to decide how many bytes
//! the character takes. Continuation bytes in leading position, overlong
//! leads, and truncated sequences yield an error for that byte and the
//! walk resumes one byte later.

use crate::error::QuireError;

/// Iterator over the character codes of a byte string.
pub struct Utf8Walker<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Utf8Walker<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

/// Sequence length and payload mask for a leading byte.
fn sequence_shape(lead: u8) -> Option<(usize, u8)> {
    match lead {
        0x00..=0x7F => Some((1, 0x7F)),
        0x80..=0xC1 => None,
        0xC2..=0xDF => Some((2, 0x1F)),
        0xE0..=0xEF => Some((3, 0x0F)),
        0xF0..=0xF4 => Some((4, 0x07)),
        _ => None,
    }
}

impl Iterator for Utf8Walker<'_> {
    type Item = Result<u32, QuireError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset;
        let lead = *self.bytes.get(start)?;
        let invalid = QuireError::InvalidCharacterSequence {
            offset: start,
            byte: lead,
        };

        let Some((len, mask)) = sequence_shape(lead) else {
            self.offset += 1;
            return Some(Err(invalid));
        };
        let Some(tail) = self.bytes.get(start + 1..start + len) else {
            self.offset += 1;
            return Some(Err(invalid));
        };
        if tail.iter().any(|b| b & 0xC0 != 0x80) {
            self.offset += 1;
            return Some(Err(invalid));
        }

        let code = tail
            .iter()
            .fold((lead & mask) as u32, |acc, b| (acc << 6) | (b & 0x3F) as u32);
        self.offset += len;
        Some(Ok(code))
    }
}

/// Character codes of `bytes`. Invalid sequences are dropped (zero width)
/// and logged.
pub fn char_codes(bytes: &[u8]) -> Vec<u32> {
    Utf8Walker::new(bytes)
        .filter_map(|step| match step {
            Ok(code) => Some(code),
            Err(e) => {
                log::debug!("skipping unmeasurable text: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_sequence_length() {
        let text = "a\u{e9}\u{20ac}\u{1F600}";
        let codes = char_codes(text.as_bytes());
        assert_eq!(codes, vec![0x61, 0xE9, 0x20AC, 0x1F600]);
    }

    #[test]
    fn continuation_byte_in_lead_position_is_skipped() {
        let codes = char_codes(&[b'a', 0x80, b'b']);
        assert_eq!(codes, vec![b'a' as u32, b'b' as u32]);
    }

    #[test]
    fn truncated_sequence_reports_offset() {
        let steps: Vec<_> = Utf8Walker::new(&[b'x', 0xE2, 0x82]).collect();
        assert!(matches!(steps[0], Ok(0x78)));
        assert!(matches!(
            steps[1],
            Err(QuireError::InvalidCharacterSequence { offset: 1, byte: 0xE2 })
        ));
        // The dangling continuation byte is rejected on its own.
        assert!(matches!(
            steps[2],
            Err(QuireError::InvalidCharacterSequence { offset: 2, byte: 0x82 })
        ));
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn overlong_lead_is_invalid() {
        assert!(char_codes(&[0xC0, 0xAF]).is_empty());
        assert!(char_codes(&[0xF5, 0x80, 0x80, 0x80]).is_empty());
    }
}
