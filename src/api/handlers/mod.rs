//! Route handlers and the helpers they share.
//!
//! Handlers only translate HTTP into calls on the registration workflow and the
//! flash store; no business rule lives here.

pub mod health;
pub mod login;
pub mod root;
pub mod signup;

use crate::api::views;
use crate::registration::RawPayload;
use anyhow::{Context, Result};
use axum::{
    http::{
        header::{CONTENT_TYPE, LOCATION, REFERER, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use serde_json::Value;

/// Decode a submitted body into a raw payload.
///
/// `application/json` bodies must parse; anything but an object is treated as an
/// empty object. Every other content type is read as a urlencoded form, where a
/// repeated key turns into an array.
///
/// # Errors
/// Returns an error if a JSON body is malformed.
pub fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<RawPayload> {
    if is_json(headers) {
        let value: Value = serde_json::from_slice(body).context("invalid JSON body")?;
        return Ok(match value {
            Value::Object(map) => map,
            _ => RawPayload::new(),
        });
    }

    Ok(decode_form(body))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn decode_form(body: &[u8]) -> RawPayload {
    let mut raw = RawPayload::new();

    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Value::from(value.into_owned());
        match raw.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                raw.insert(key.into_owned(), value);
            }
        }
    }

    raw
}

/// `302 Found` back to the referring page, or `/` without a usable `Referer`.
pub fn redirect_back(headers: &HeaderMap, cookie: HeaderValue) -> Response {
    let target = headers
        .get(REFERER)
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("/"));

    (StatusCode::FOUND, [(LOCATION, target), (SET_COOKIE, cookie)]).into_response()
}

/// Generic error page; details stay in the logs.
pub fn error_page() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::not_found())).into_response()
}

/// Same page as [`error_page`] for bodies that cannot be decoded.
pub fn bad_request_page() -> Response {
    (StatusCode::BAD_REQUEST, Html(views::not_found())).into_response()
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found()))
}
