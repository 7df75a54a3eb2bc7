use anyhow::Context;
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{
    forms::{length_between, FormErrors},
    state::AppState,
    videos::repo_types::{NewVideo, Video},
};

pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub video: Option<UploadedFile>,
}

/// Reduces a client-supplied file name to `[A-Za-z0-9_.-]`, with no
/// directory parts and no leading dots. Accented letters fold to their ASCII
/// base (`é` → `e`). `None` when nothing usable is left.
pub fn secure_filename(name: &str) -> Option<String> {
    lazy_static! {
        static ref DISALLOWED: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
    }
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = DISALLOWED.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn validate_upload(form: &UploadForm) -> Result<(), FormErrors> {
    let mut errors = FormErrors::default();
    length_between(&mut errors, "title", form.title.trim(), 1, 100);
    if form.description.chars().count() > 5000 {
        errors.add("description", "Description is too long.");
    }
    match &form.video {
        None => errors.add("video", "This field is required."),
        Some(file) if file.body.is_empty() => errors.add("video", "The uploaded file is empty."),
        Some(file) => match secure_filename(&file.file_name).as_deref().and_then(extension) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => errors.add("video", "Videos only! (mp4, avi, mov, mkv, webm)"),
        },
    }
    errors.into_result()
}

/// Stores the file and records the video. The stored file is removed again
/// when the database insert fails. Expects a form that passed [`validate_upload`].
pub async fn store_upload(st: &AppState, owner: Uuid, form: UploadForm) -> anyhow::Result<Video> {
    let file = form.video.context("upload without a file")?;
    let safe = secure_filename(&file.file_name).context("file name sanitizes to nothing")?;
    let key = format!("{}-{}", Uuid::new_v4().simple(), safe);

    st.storage
        .put_object(&key, file.body, &file.content_type)
        .await
        .with_context(|| format!("store {key}"))?;

    let description = Some(form.description.trim().to_string()).filter(|d| !d.is_empty());
    let created = st
        .videos
        .create(NewVideo {
            title: form.title.trim().to_string(),
            description,
            filename: key.clone(),
            user_id: owner,
        })
        .await;

    match created {
        Ok(video) => {
            info!(video_id = %video.id, user_id = %owner, filename = %key, "video uploaded");
            Ok(video)
        }
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(&key).await {
                error!(error = %cleanup, key = %key, "orphaned upload left on disk");
            }
            Err(e)
        }
    }
}
