use axum::http::HeaderMap;

#[cfg(test)]
mod tests;

/// Header devices and dashboards send the shared key in
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the API key from request headers
///
/// Looks at `x-api-key` first and falls back to `Authorization: Bearer <key>`
/// for clients that can only set the standard header.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, KeyError> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        let key = value.to_str().map_err(|_| KeyError::InvalidFormat)?.trim();
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        return Ok(key.to_string());
    }

    let auth_header = headers
        .get("authorization")
        .ok_or(KeyError::Missing)?
        .to_str()
        .map_err(|_| KeyError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Check the request against the configured key.
pub fn verify_api_key(headers: &HeaderMap, expected: &str) -> Result<(), KeyError> {
    let key = extract_api_key(headers)?;
    if !constant_time_eq(key.as_bytes(), expected.as_bytes()) {
        return Err(KeyError::Mismatch);
    }
    Ok(())
}

/// Parse "Bearer <token>"
fn parse_bearer_token(header_value: &str) -> Result<String, KeyError> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(KeyError::InvalidFormat);
    }

    if parts[0].to_lowercase() != "bearer" {
        return Err(KeyError::InvalidFormat);
    }

    let token = parts[1].trim();
    if token.is_empty() {
        return Err(KeyError::Empty);
    }

    Ok(token.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// API key extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum KeyError {
    /// Neither `x-api-key` nor `Authorization` present
    Missing,
    /// Non-ASCII header value or not "Bearer <key>"
    InvalidFormat,
    /// Key is empty string
    Empty,
    /// Key does not match the configured one
    Mismatch,
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::Missing => write!(f, "API key not provided"),
            KeyError::InvalidFormat => write!(f, "Invalid API key format"),
            KeyError::Empty => write!(f, "API key is empty"),
            KeyError::Mismatch => write!(f, "API key rejected"),
        }
    }
}

impl std::error::Error for KeyError {}
