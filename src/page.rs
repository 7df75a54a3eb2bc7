//! JSON page views. Each page carries its title, the caller, and every
//! flash message due for display.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    access::BoundUser,
    auth::session::RequestContext,
    flash::{self, FlashMessage, Severity},
};

#[derive(Debug, Serialize)]
struct PageView<'a, T: Serialize> {
    title: &'static str,
    caller: Option<&'a BoundUser>,
    messages: Vec<FlashMessage>,
    #[serde(flatten)]
    body: T,
}

pub struct Page<'a> {
    title: &'static str,
    ctx: &'a RequestContext,
    status: StatusCode,
    messages: Vec<FlashMessage>,
}

impl<'a> Page<'a> {
    pub fn new(title: &'static str, ctx: &'a RequestContext) -> Self {
        Self {
            title,
            ctx,
            status: StatusCode::OK,
            messages: Vec::new(),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Message shown on this render only, after anything already pending.
    pub fn flash(mut self, severity: Severity, message: impl Into<String>) -> Self {
        self.messages.push(FlashMessage::new(severity, message));
        self
    }

    pub fn render<T: Serialize>(self, jar: CookieJar, body: T) -> Response {
        let (jar, mut messages) = flash::take(jar);
        messages.extend(self.messages);
        let view = PageView {
            title: self.title,
            caller: self.ctx.caller.user(),
            messages,
            body,
        };
        (self.status, jar, Json(view)).into_response()
    }
}
