//! Attribute and credential values.

use serde::{Deserialize, Serialize};

/// A role attribute value: either UTF-8 text or an opaque byte sequence.
///
/// Compared by value. The textual/binary distinction is preserved because
/// credential records remember which form the original value had.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl AttributeValue {
    /// Byte view used for digests. Text is encoded as UTF-8.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeValue::Text(s) => s.as_bytes(),
            AttributeValue::Bytes(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Bytes(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, AttributeValue::Text(_))
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Bytes(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Bytes(value.to_vec())
    }
}
