use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, Claims, TOKEN_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub name: String,
    pub admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            name: claims.name,
            admin: claims.admin,
        }
    }
}

/// Token middleware: rejects requests without a valid `x-access-token`
/// and injects [`AuthUser`] into the request for the handlers behind it.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_headers(&headers)?;

    let claims = state.tokens.verify(token).map_err(|e| {
        if let AuthError::InvalidToken(reason) = &e {
            tracing::debug!("Rejected access token: {}", reason);
        }
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract the access token; a blank header counts as missing
fn extract_token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers.get(TOKEN_HEADER).ok_or(AuthError::NoToken)?;

    let token = header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("token header is not visible ASCII".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::NoToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_and_blank_headers_are_no_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(extract_token_from_headers(&headers), Err(AuthError::NoToken)));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("   "));
        assert!(matches!(extract_token_from_headers(&headers), Err(AuthError::NoToken)));
    }

    #[test]
    fn token_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_static(" abc.def.ghi "));
        assert_eq!(extract_token_from_headers(&headers).unwrap(), "abc.def.ghi");
    }
}
