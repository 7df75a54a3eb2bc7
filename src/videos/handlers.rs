use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{instrument, warn};

use super::{
    dto::{UploadFormView, UploadPage},
    services::{store_upload, validate_upload, UploadForm, UploadedFile},
};
use crate::{
    access::{guarded, Guard},
    auth::session::RequestContext,
    error::AppResult,
    flash::{self, Severity},
    page::Page,
    state::AppState,
};

pub const UPLOADED_MESSAGE: &str = "Your video has been uploaded!";
pub const UPLOADS_DISABLED_MESSAGE: &str = "Video uploads are not supported on this deployment.";

pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    let upload = get(upload_page)
        .post(upload_video)
        .layer(DefaultBodyLimit::max(max_upload_bytes));
    Router::new().route(
        "/upload_video",
        guarded(upload, &[Guard::Authenticated, Guard::Subscribed]),
    )
}

#[instrument(skip_all)]
pub async fn upload_page(ctx: RequestContext, jar: CookieJar) -> Response {
    Page::new("Upload Video", &ctx).render(
        jar,
        UploadPage {
            form: UploadFormView::default(),
        },
    )
}

#[instrument(skip_all)]
pub async fn upload_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
    multipart: Multipart,
) -> AppResult<Response> {
    if !state.config.uploads.enabled {
        warn!("upload attempted while uploads are disabled");
        return Ok(flash::redirect_with(
            jar,
            Severity::Danger,
            UPLOADS_DISABLED_MESSAGE,
            "/",
        ));
    }

    let form = read_upload_form(multipart).await?;
    if let Err(errors) = validate_upload(&form) {
        return Ok(Page::new("Upload Video", &ctx)
            .status(StatusCode::UNPROCESSABLE_ENTITY)
            .render(
                jar,
                UploadPage {
                    form: UploadFormView {
                        title: form.title,
                        description: form.description,
                        errors,
                    },
                },
            ));
    }

    // The guard chain only lets bound callers through.
    let owner = ctx
        .caller
        .user()
        .map(|u| u.id)
        .context("upload reached without a caller")?;
    store_upload(&state, owner, form).await?;

    Ok(flash::redirect_with(jar, Severity::Success, UPLOADED_MESSAGE, "/"))
}

async fn read_upload_form(mut mp: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => form.title = field.text().await?,
            Some("description") => form.description = field.text().await?,
            Some("video") => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let body = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if !(file_name.is_empty() && body.is_empty()) {
                    form.video = Some(UploadedFile {
                        file_name,
                        content_type,
                        body,
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
