//! Request and response payloads.

use serde_json::Value;

/// A payload, either raw bytes or a tagged value awaiting encoding.
///
/// Request bodies tagged [`Body::Form`] or [`Body::Json`] are turned into
/// bytes by the `encode_body` step. Response bodies start as bytes and may
/// be replaced by a decoded [`Body::Json`] value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Form fields awaiting `application/x-www-form-urlencoded` encoding.
    Form(Vec<(String, String)>),
    /// A JSON value, either awaiting encoding or already decoded.
    Json(Value),
}

impl Body {
    /// Builds a form body from key/value pairs.
    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns true if there is nothing to send or decode.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Form(_) | Self::Json(_) => false,
        }
    }

    /// Returns the raw bytes, if the body is raw.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Empty => Some(&[]),
            _ => None,
        }
    }

    /// Returns the JSON value, if the body holds one.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw bytes as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Bytes(value.into_bytes())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
