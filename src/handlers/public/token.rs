// handlers/public/token.rs - POST /api/generate-token

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::services::TokenIssuer;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub uname: Option<String>,
}

impl TokenRequest {
    /// Reads `uname` from a JSON or urlencoded body. An unreadable body is
    /// treated as one without `uname`.
    pub fn from_body(headers: &HeaderMap, body: &[u8]) -> Self {
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            return serde_json::from_slice(body).unwrap_or_default();
        }

        let uname = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "uname")
            .map(|(_, value)| value.into_owned());
        Self { uname }
    }
}

/// POST /api/generate-token - issue an access token for a known `uname`
///
/// Success: `{ "message": "Token generated successfully", "token": "..." }`
pub async fn generate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = TokenRequest::from_body(&headers, &body);
    let uname = request.uname.unwrap_or_default();

    let token = TokenIssuer::new(state.store.as_ref(), &state.tokens)
        .issue(&uname)
        .await?;

    Ok(Json(json!({
        "message": "Token generated successfully",
        "token": token
    })))
}
