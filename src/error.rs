//! Structured error types for the Quire layout pipeline.
//!
//! Geometry errors (bad attribute, unknown list style, undecodable image)
//! abort the document build and carry the offending node's identity.
//! `InvalidCharacterSequence` and `MissingPageContext` are produced by the
//! lower layers and logged by their callers; they never abort a build.

use std::fmt;

use thiserror::Error;

use crate::tree::NodeId;

/// Identity of a node, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLabel {
    pub id: NodeId,
    pub kind: &'static str,
    /// User-assigned name, if the node has one.
    pub name: Option<String>,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.id)?;
        if let Some(name) = &self.name {
            write!(f, " \"{}\"", name)?;
        }
        Ok(())
    }
}

/// The unified error type returned by all public Quire API functions.
#[derive(Debug, Error)]
pub enum QuireError {
    /// An attribute was written to a node kind that does not declare it.
    #[error("{node}: attribute `{attribute}` is not declared for this node kind")]
    UnknownAttribute { node: NodeLabel, attribute: String },

    /// An attribute value had the wrong type for its attribute.
    #[error("{node}: invalid value for `{attribute}`: {message}")]
    InvalidAttributeValue {
        node: NodeLabel,
        attribute: String,
        message: String,
    },

    /// Malformed multi-byte text. Measured as zero width, never propagated
    /// out of a build.
    #[error("invalid UTF-8 sequence at byte {offset} (leading byte {byte:#04x})")]
    InvalidCharacterSequence { offset: usize, byte: u8 },

    /// No enumeration strategy is registered for the requested list style.
    #[error("{node}: no enumeration strategy registered for list style `{style}`")]
    UnresolvedStrategy { node: NodeLabel, style: String },

    /// A runtime node sits on no tracked page. Logged and skipped.
    #[error("{node}: runtime node has no page context")]
    MissingPageContext { node: NodeLabel },

    /// Raw image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    ImageDecode(String),

    /// An image node's source could not be turned into an image.
    #[error("{node}: {source}")]
    Image {
        node: NodeLabel,
        #[source]
        source: Box<QuireError>,
    },

    /// A font could not be loaded or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// A structural rule of the node tree was violated.
    #[error("{node}: {message}")]
    InvalidTree { node: NodeLabel, message: String },

    /// JSON input failed to parse as a valid Quire document.
    #[error("failed to parse document: {source}{hint}")]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
}

pub type Result<T> = std::result::Result<T, QuireError>;

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "\n  Hint: check for trailing commas, missing quotes, or unescaped characters."
            }
            serde_json::error::Category::Data => {
                "\n  Hint: the JSON is valid but doesn't match the document schema. Check node types and field names."
            }
            serde_json::error::Category::Eof => "\n  Hint: unexpected end of input, is the JSON truncated?",
            serde_json::error::Category::Io => "",
        };
        QuireError::Parse {
            source: e,
            hint: hint.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_name_when_present() {
        let label = NodeLabel {
            id: NodeId::from_index(4),
            kind: "Text",
            name: Some("footer".to_string()),
        };
        assert_eq!(label.to_string(), "Text#4 \"footer\"");
    }

    #[test]
    fn parse_error_carries_hint() {
        let err: QuireError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let message = err.to_string();
        assert!(message.starts_with("failed to parse document"));
        assert!(message.contains("trailing commas"));
    }
}
