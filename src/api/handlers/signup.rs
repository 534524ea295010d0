use super::{bad_request_page, decode_body, error_page, redirect_back};
use crate::{
    api::{
        session::{session_cookie, session_token, FlashStore, FLASH_ERRORS, FLASH_SUCCESS},
        views,
    },
    registration::{payload::messages, RawPayload, Registrar},
};
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    response::{Html, Response},
};
use std::sync::Arc;
use tracing::{error, instrument, warn};

pub const SIGNUP_SUCCESS: &str = "Seu usuário foi criado com sucesso.";

// axum handler for the signup form
#[instrument(skip(flash, headers))]
pub async fn index(flash: Extension<Arc<FlashStore>>, headers: HeaderMap) -> Html<String> {
    let pending = flash.take(session_token(&headers).as_deref()).await;
    Html(views::signup(&pending))
}

/// Handle a submitted signup form.
///
/// Validation failures are flashed under `erros`, success under `success`; both
/// redirect back to the referring page. An undecodable body gets the error page
/// with `400`, a store or hashing failure the same page with `500`.
#[instrument(skip(registrar, flash, headers, body))]
pub async fn register(
    registrar: Extension<Arc<Registrar>>,
    flash: Extension<Arc<FlashStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw = match decode_body(&headers, &body) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Rejected signup body: {err:#}");
            return bad_request_page();
        }
    };

    match submit(&registrar, &flash, &headers, &raw).await {
        Ok(response) => response,
        Err(err) => {
            error!("Error handling signup: {err:#}");
            error_page()
        }
    }
}

async fn submit(
    registrar: &Registrar,
    flash: &FlashStore,
    headers: &HeaderMap,
    raw: &RawPayload,
) -> Result<Response> {
    let outcome = registrar.register(raw).await?;

    let current = session_token(headers);
    let token = if outcome.is_success() {
        flash
            .push(
                current.as_deref(),
                FLASH_SUCCESS,
                [SIGNUP_SUCCESS.to_string()],
            )
            .await?
    } else {
        flash
            .push(current.as_deref(), FLASH_ERRORS, messages(&outcome.errors))
            .await?
    };

    let cookie = session_cookie(flash.config(), &token)?;
    Ok(redirect_back(headers, cookie))
}
