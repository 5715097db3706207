//! Re-render `ApiError` responses with the service name in the message.

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn error_envelope(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    match response.extensions().get::<ApiError>() {
        Some(err) => {
            if err.status.is_server_error() {
                tracing::error!(status = %err.status, code = err.code, message = %err.message, "request failed");
            } else {
                tracing::debug!(status = %err.status, code = err.code, message = %err.message, "request rejected");
            }
            ApiResponse::<()>::error(state.app_name(), err.status, err.code, &err.message).into_response()
        }
        None => response,
    }
}
