//! One-shot messages carried across a redirect in the `flash` cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::RouteRef;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub severity: Severity,
    pub message: String,
}

impl FlashMessage {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    Base64UrlUnpadded::encode_string(&json)
}

fn decode(raw: &str) -> Vec<FlashMessage> {
    Base64UrlUnpadded::decode_vec(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_else(|| {
            debug!("discarding unreadable flash cookie");
            Vec::new()
        })
}

fn removal() -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE).path("/").build()
}

/// Pending messages without consuming them.
pub fn peek(jar: &CookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default()
}

/// Appends a message to whatever is already pending.
pub fn push(jar: CookieJar, severity: Severity, message: impl Into<String>) -> CookieJar {
    let mut pending = peek(&jar);
    pending.push(FlashMessage::new(severity, message));
    let cookie = Cookie::build((FLASH_COOKIE, encode(&pending)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Consumes pending messages and clears the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    let pending = peek(&jar);
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, pending);
    }
    (jar.remove(removal()), pending)
}

/// `303 See Other` to `target`, carrying `message` to the next page.
pub fn redirect_with(
    jar: CookieJar,
    severity: Severity,
    message: impl Into<String>,
    target: &str,
) -> Response {
    (push(jar, severity, message), Redirect::to(target)).into_response()
}

/// Response for a denied guard.
pub fn deny(jar: CookieJar, message: &str, severity: Severity, target: &RouteRef) -> Response {
    redirect_with(jar, severity, message, &target.to_uri())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_and_take_clears() {
        let jar = push(CookieJar::new(), Severity::Info, "first");
        let jar = push(jar, Severity::Danger, "second");
        assert_eq!(
            peek(&jar),
            vec![
                FlashMessage::new(Severity::Info, "first"),
                FlashMessage::new(Severity::Danger, "second"),
            ]
        );

        let (jar, taken) = take(jar);
        assert_eq!(taken.len(), 2);
        assert!(peek(&jar).is_empty());
    }

    #[test]
    fn garbage_cookie_reads_as_empty() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "%%%not-base64"));
        assert!(peek(&jar).is_empty());
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, encode_raw(b"{\"nope\":1}")));
        assert!(peek(&jar).is_empty());
    }

    fn encode_raw(bytes: &[u8]) -> String {
        Base64UrlUnpadded::encode_string(bytes)
    }

    #[test]
    fn deny_redirects_with_see_other() {
        let res = deny(
            CookieJar::new(),
            "nope",
            Severity::Warning,
            &RouteRef::Register,
        );
        assert_eq!(res.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[axum::http::header::LOCATION], "/register");
        let set_cookie = res.headers()[axum::http::header::SET_COOKIE]
            .to_str()
            .expect("ascii cookie");
        assert!(set_cookie.starts_with("flash="));
    }

    #[test]
    fn severities_serialize_lowercase() {
        let json = serde_json::to_string(&FlashMessage::new(Severity::Danger, "x")).unwrap();
        assert_eq!(json, r#"{"severity":"danger","message":"x"}"#);
    }
}
