//! JSON command handlers.
//!
//! Each handler takes the storefront plus an optional JSON payload and
//! returns a JSON value or a user-facing error string. Payload fields
//! accept both camelCase and snake_case names.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::uploads::ImageUpload;

pub mod auth;
pub mod design;
pub mod diagnostics;
pub mod menu;
pub mod orders;

/// Deserialize the command payload; a missing payload reads as `{}`.
pub(crate) fn parse_payload<T: DeserializeOwned>(arg0: Option<Value>) -> Result<T, String> {
    let value = arg0.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value).map_err(|e| format!("Invalid payload: {e}"))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize result: {e}"))
}

/// Image file sent inline as base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImagePayload {
    #[serde(alias = "file_name")]
    pub file_name: String,
    #[serde(alias = "content_type", alias = "mimeType")]
    pub content_type: String,
    #[serde(alias = "data_base64", alias = "data")]
    pub data_base64: String,
}

impl ImagePayload {
    pub(crate) fn into_upload(self) -> Result<ImageUpload, String> {
        let bytes = BASE64_STANDARD
            .decode(self.data_base64.trim())
            .map_err(|e| format!("Image data is not valid base64: {e}"))?;
        Ok(ImageUpload::new(self.file_name, self.content_type, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_payload_accepts_aliases() {
        let payload: ImagePayload = parse_payload(Some(json!({
            "file_name": "cake.png",
            "mimeType": "image/png",
            "data": "R0lGODlh"
        })))
        .unwrap();
        let upload = payload.into_upload().unwrap();
        assert_eq!(upload.bytes, b"GIF89a");
        assert_eq!(upload.content_type, "image/png");
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let payload = ImagePayload {
            file_name: "a.png".into(),
            content_type: "image/png".into(),
            data_base64: "!!!".into(),
        };
        assert!(payload.into_upload().is_err());
    }
}
