use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{FormPage, FormView, LoginForm, LoginQuery, RegisterForm},
        services::{
            authenticate, is_valid_email, normalize_email, register_user, safe_next, RegisterError,
        },
        session::{clear_session, session_cookie, RequestContext},
    },
    error::AppResult,
    flash::{self, Severity},
    forms::FormErrors,
    page::Page,
    state::AppState,
};

pub const REGISTERED_MESSAGE: &str =
    "Your account has been created and you are now subscribed for 1 month! You are now able to log in.";
pub const LOGIN_FAILED_MESSAGE: &str = "Login Unsuccessful. Please check email and password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

fn home() -> Response {
    Redirect::to("/").into_response()
}

#[instrument(skip_all)]
pub async fn register_page(ctx: RequestContext, jar: CookieJar) -> Response {
    if ctx.caller.is_authenticated() {
        return home();
    }
    Page::new("Register", &ctx).render(jar, FormPage { form: FormView::default() })
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if ctx.caller.is_authenticated() {
        return Ok(home());
    }

    let username = form.username.trim().to_string();
    let email = normalize_email(&form.email);

    match register_user(state.users.as_ref(), form).await {
        Ok(_) => Ok(flash::redirect_with(jar, Severity::Success, REGISTERED_MESSAGE, "/login")),
        Err(RegisterError::Invalid(errors)) => Ok(Page::new("Register", &ctx)
            .status(StatusCode::UNPROCESSABLE_ENTITY)
            .render(
                jar,
                FormPage {
                    form: FormView {
                        username: Some(username),
                        email: Some(email),
                        errors,
                    },
                },
            )),
        Err(RegisterError::Internal(e)) => Err(e.into()),
    }
}

#[instrument(skip_all)]
pub async fn login_page(ctx: RequestContext, jar: CookieJar) -> Response {
    if ctx.caller.is_authenticated() {
        return home();
    }
    Page::new("Login", &ctx).render(jar, FormPage { form: FormView::default() })
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if ctx.caller.is_authenticated() {
        return Ok(home());
    }

    let email = normalize_email(&form.email);
    let mut errors = FormErrors::default();
    if !is_valid_email(&email) {
        errors.add("email", "Invalid email address.");
    }
    if form.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    if !errors.is_empty() {
        return Ok(Page::new("Login", &ctx)
            .status(StatusCode::UNPROCESSABLE_ENTITY)
            .render(
                jar,
                FormPage {
                    form: FormView {
                        email: Some(email),
                        errors,
                        ..Default::default()
                    },
                },
            ));
    }

    let Some(user) = authenticate(state.users.as_ref(), &email, &form.password).await? else {
        return Ok(Page::new("Login", &ctx)
            .status(StatusCode::UNAUTHORIZED)
            .flash(Severity::Danger, LOGIN_FAILED_MESSAGE)
            .render(
                jar,
                FormPage {
                    form: FormView {
                        email: Some(email),
                        ..Default::default()
                    },
                },
            ));
    };

    let kind = if form.remember() {
        TokenKind::Remember
    } else {
        TokenKind::Session
    };
    let token = state.session_keys.sign(user.id, kind)?;
    let cookie = session_cookie(
        token,
        kind,
        &state.session_keys,
        state.config.session.cookie_secure,
    );

    let target = safe_next(query.next.as_deref()).unwrap_or("/");
    info!(user_id = %user.id, remember = form.remember(), next = %target, "user logged in");
    Ok((jar.add(cookie), Redirect::to(target)).into_response())
}

#[instrument(skip_all)]
pub async fn logout(ctx: RequestContext, jar: CookieJar) -> Response {
    if let Some(user) = ctx.caller.user() {
        info!(user_id = %user.id, "user logged out");
    }
    (clear_session(jar), Redirect::to("/")).into_response()
}
