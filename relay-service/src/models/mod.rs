//! Request and response bodies of the relay endpoint.

use crate::error::RelayError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated `POST /generate` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Non-empty prompt text.
    pub prompt: String,
    /// Optional file forwarded to the model as inline data.
    pub file: Option<FileAttachment>,
}

/// Inline file data: a mime type and a base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub mime_type: String,
    pub data: String,
}

/// Successful relay response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
}

/// Wire form of `file`: `{"type": "image/png", "data": "<base64>"}`.
#[derive(Debug, Deserialize)]
struct RawFile {
    #[serde(rename = "type", default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

impl GenerateRequest {
    /// Parse and validate a raw request body.
    ///
    /// An empty body is treated as `{}`. A `file` without data is ignored so
    /// that clients may always send the key.
    pub fn from_json(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(body).map_err(|e| {
                RelayError::bad_request_with("Invalid JSON body", e.to_string())
            })?
        };

        let prompt = value
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|prompt| !prompt.trim().is_empty())
            .ok_or_else(|| RelayError::bad_request("Prompt is required"))?
            .to_string();

        // Only an object can carry data; any other `file` value is ignored.
        let file = match value.get("file") {
            Some(raw) if raw.is_object() => {
                let raw: RawFile = serde_json::from_value(raw.clone()).map_err(|e| {
                    RelayError::bad_request_with("Invalid file attachment", e.to_string())
                })?;
                FileAttachment::from_raw(raw)?
            }
            _ => None,
        };

        Ok(GenerateRequest { prompt, file })
    }
}

impl FileAttachment {
    fn from_raw(raw: RawFile) -> Result<Option<Self>, RelayError> {
        let Some(data) = raw.data.filter(|data| !data.is_empty()) else {
            return Ok(None);
        };

        // Browsers hand out `data:<mime>;base64,<payload>` from FileReader.
        let data_url = data
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(mime, payload)| (mime.to_string(), payload.to_string()));
        let (data_url_mime, payload) = match data_url {
            Some((mime, payload)) => (Some(mime), payload),
            None => (None, data),
        };

        let mime_type = raw
            .mime_type
            .filter(|mime| !mime.trim().is_empty())
            .or(data_url_mime.filter(|mime| !mime.is_empty()))
            .ok_or_else(|| RelayError::bad_request("File type is required"))?;

        STANDARD.decode(payload.as_bytes()).map_err(|e| {
            RelayError::bad_request_with("File data must be base64 encoded", e.to_string())
        })?;

        Ok(Some(FileAttachment {
            mime_type: mime_type.trim().to_string(),
            data: payload,
        }))
    }
}
