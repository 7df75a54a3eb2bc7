use axum::{middleware, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    auth::{self, session::attach_request_context},
    routes,
    state::AppState,
    storage::UPLOADS_MOUNT,
    videos,
};

pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.uploads.max_mb.saturating_mul(1024 * 1024);
    let uploads = ServeDir::new(&state.config.uploads.folder);

    Router::new()
        .merge(routes::router())
        .merge(auth::router())
        .merge(videos::router(max_upload_bytes))
        .nest_service(UPLOADS_MOUNT, uploads)
        // runs before any route guard
        .layer(middleware::from_fn_with_state(
            state.clone(),
            attach_request_context,
        ))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}
