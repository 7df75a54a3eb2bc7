use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};

use crate::{
    access::{BoundUser, CallerIdentity},
    auth::{claims::TokenKind, jwt::SessionKeys, repo::UserStore},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "session";

/// Per-request view of who is calling. Built once by [`attach_request_context`]
/// and dropped with the request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub caller: CallerIdentity,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // No context means resolution never ran; treat as anonymous.
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Maps the session cookie to a caller. Every failure ends up anonymous.
pub async fn resolve_caller(
    keys: &SessionKeys,
    users: &dyn UserStore,
    jar: &CookieJar,
) -> CallerIdentity {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) else {
        return CallerIdentity::Anonymous;
    };

    let claims = match keys.verify(&token) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "rejecting session cookie");
            return CallerIdentity::Anonymous;
        }
    };

    match users.find_by_id(claims.sub).await {
        Ok(Some(user)) => CallerIdentity::Bound(BoundUser::from(&user)),
        Ok(None) => {
            debug!(user_id = %claims.sub, "session for unknown user");
            CallerIdentity::Anonymous
        }
        Err(e) => {
            warn!(error = %e, user_id = %claims.sub, "caller lookup failed");
            CallerIdentity::Anonymous
        }
    }
}

pub async fn attach_request_context(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = resolve_caller(&state.session_keys, state.users.as_ref(), &jar).await;
    req.extensions_mut().insert(RequestContext { caller });
    next.run(req).await
}

pub fn session_cookie(
    token: String,
    kind: TokenKind,
    keys: &SessionKeys,
    secure: bool,
) -> Cookie<'static> {
    let builder = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax);
    match kind {
        TokenKind::Session => builder.build(),
        TokenKind::Remember => builder
            .max_age(time::Duration::seconds(keys.ttl(kind).as_secs() as i64))
            .build(),
    }
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
}
