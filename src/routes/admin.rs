use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{repo_types::Role, session::RequestContext},
    error::AppResult,
    page::Page,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_subscribed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_end_date: Option<OffsetDateTime>,
    pub videos: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminPanel {
    pub users: Vec<AdminUserRow>,
}

#[instrument(skip_all)]
pub async fn admin_panel(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
) -> AppResult<Response> {
    let mut users = Vec::new();
    for u in state.users.list().await? {
        let videos = state.videos.count_by_user(u.id).await?;
        users.push(AdminUserRow {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            is_subscribed: u.is_subscribed,
            subscription_end_date: u.subscription_end_date,
            videos,
        });
    }
    Ok(Page::new("Admin Panel", &ctx).render(jar, AdminPanel { users }))
}
