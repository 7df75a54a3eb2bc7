use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{forms::FormErrors, videos::repo_types::Video};

#[derive(Debug, Serialize)]
pub struct VideoView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub user_id: Uuid,
}

impl VideoView {
    pub fn new(video: Video, url: String) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            filename: video.filename,
            url,
            upload_date: video.upload_date,
            user_id: video.user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoList {
    pub videos: Vec<VideoView>,
}

#[derive(Debug, Default, Serialize)]
pub struct UploadFormView {
    pub title: String,
    pub description: String,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct UploadPage {
    pub form: UploadFormView,
}
