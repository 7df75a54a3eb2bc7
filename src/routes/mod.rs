use axum::{routing::get, Router};

use crate::{
    access::{guarded, Guard},
    state::AppState,
};

pub mod admin;
pub mod home;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/admin", guarded(get(admin::admin_panel), &[Guard::Admin]))
        .route("/health", get(|| async { "ok" }))
}
