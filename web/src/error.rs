use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use redditkeep_core::{CoreError, ErrorExt};

pub const LOAD_FAILURE_MESSAGE: &str = "Something went wrong while loading posts.";

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match &self {
            WebError::Core(core) => {
                core.log_error();
            }
            WebError::Encode(e) => tracing::error!("Error rendering posts: {}", e),
            WebError::Query(e) => tracing::error!("Error reading query parameters: {}", e),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILURE_MESSAGE).into_response()
    }
}
