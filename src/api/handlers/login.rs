//! Login page. Authentication itself is not implemented; the page only shows
//! pending flash messages and links to the signup form.

use crate::api::{
    session::{session_token, FlashStore},
    views,
};
use axum::{extract::Extension, http::HeaderMap, response::Html};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(flash, headers))]
pub async fn index(flash: Extension<Arc<FlashStore>>, headers: HeaderMap) -> Html<String> {
    let pending = flash.take(session_token(&headers).as_deref()).await;
    Html(views::login(&pending))
}
