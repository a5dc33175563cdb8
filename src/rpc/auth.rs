//! HTTP authentication helpers for RPC providers that sit behind basic auth.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use jsonrpsee::http_client::{HeaderMap, HeaderValue};

pub(crate) fn build_auth_headers(credentials: Option<(&str, &str)>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some((user, password)) = credentials else {
        return Ok(headers);
    };

    let encoded = BASE64_STANDARD.encode(format!("{user}:{password}"));
    let value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .context("failed to build Authorization header")?;
    headers.insert("Authorization", value);
    Ok(headers)
}
