use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use crate::{
    auth::session::RequestContext,
    error::AppResult,
    flash::Severity,
    page::Page,
    state::AppState,
    videos::{VideoList, VideoView},
};

pub const NOT_SUBSCRIBED_MESSAGE: &str =
    "You are not subscribed. Please register or subscribe to access all content.";

#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
) -> AppResult<Response> {
    let videos = state
        .videos
        .list_recent()
        .await?
        .into_iter()
        .map(|v| {
            let url = state.storage.public_url(&v.filename);
            VideoView::new(v, url)
        })
        .collect();

    let mut page = Page::new("Home", &ctx);
    if ctx.caller.user().is_some_and(|u| !u.is_subscribed) {
        page = page.flash(Severity::Warning, NOT_SUBSCRIBED_MESSAGE);
    }
    Ok(page.render(jar, VideoList { videos }))
}
