//! Upload token wire format.
//!
//! A token describes staged content well enough to restore an attacher
//! without re-reading the underlying bytes. It round-trips through untrusted
//! clients (hidden form fields, direct-upload responses), so parsing is
//! total: anything that is not a well-formed token is treated as "no
//! attachment supplied".

use serde::{Deserialize, Serialize};

/// Serialized description of staged content: required `id`, optional
/// metadata mirrored from the attacher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadToken {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl UploadToken {
    pub fn new(id: impl Into<String>) -> Self {
        UploadToken {
            id: id.into(),
            size: None,
            content_type: None,
            filename: None,
        }
    }

    /// Parse a token from client input. Returns `None` on malformed input,
    /// including blank strings and tokens with an empty `id`.
    pub fn parse(raw: &str) -> Option<Self> {
        let token: UploadToken = serde_json::from_str(raw).ok()?;
        if token.id.is_empty() {
            return None;
        }
        Some(token)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("token serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let token = UploadToken {
            id: "abc123".to_string(),
            size: Some(11),
            content_type: Some("text/plain".to_string()),
            filename: Some("hello.txt".to_string()),
        };
        let parsed = UploadToken::parse(&token.to_json()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_parse_minimal() {
        let parsed = UploadToken::parse(r#"{"id":"xyz"}"#).unwrap();
        assert_eq!(parsed.id, "xyz");
        assert!(parsed.size.is_none());
        assert!(parsed.filename.is_none());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(UploadToken::parse("").is_none());
        assert!(UploadToken::parse("not json").is_none());
        assert!(UploadToken::parse("{}").is_none());
        assert!(UploadToken::parse(r#"{"id":""}"#).is_none());
        assert!(UploadToken::parse(r#"{"size":5}"#).is_none());
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let json = UploadToken::new("abc").to_json();
        assert_eq!(json, r#"{"id":"abc"}"#);
    }
}
