use crate::api::{
    session::{session_token, FlashStore},
    views,
};
use axum::{extract::Extension, http::HeaderMap, response::Html};
use std::sync::Arc;
use tracing::instrument;

// axum handler for the home page
#[instrument(skip(flash, headers))]
pub async fn home(flash: Extension<Arc<FlashStore>>, headers: HeaderMap) -> Html<String> {
    let pending = flash.take(session_token(&headers).as_deref()).await;
    Html(views::home(&pending))
}
