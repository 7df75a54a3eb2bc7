use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterForm,
        password::{hash_password, verify_password, MIN_PASSWORD_LEN},
        repo::{CreateUserError, UniqueField, UserStore},
        repo_types::{NewUser, User},
    },
    forms::{length_between, FormErrors},
};

/// Length of the subscription handed out at registration.
pub const MOCK_SUBSCRIPTION_DAYS: i64 = 30;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Only local absolute paths survive; anything that could leave the site
/// (`//host`, `https://…`, backslash tricks) is dropped.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_control());
    local.then_some(next)
}

#[derive(Debug)]
pub enum RegisterError {
    Invalid(FormErrors),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for RegisterError {
    fn from(e: anyhow::Error) -> Self {
        RegisterError::Internal(e)
    }
}

fn validate_registration(form: &RegisterForm) -> FormErrors {
    let mut errors = FormErrors::default();
    length_between(&mut errors, "username", form.username.trim(), 2, 20);
    if !is_valid_email(&normalize_email(&form.email)) {
        errors.add("email", "Invalid email address.");
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long."),
        );
    }
    if form.confirm_password != form.password {
        errors.add("confirm_password", "Passwords must match.");
    }
    errors
}

fn add_taken(errors: &mut FormErrors, field: UniqueField) {
    let message = match field {
        UniqueField::Username => "That username is taken. Please choose a different one.",
        UniqueField::Email => "That email is taken. Please choose a different one.",
    };
    errors.add(field.as_str(), message);
}

/// Creates the account and grants the mocked subscription.
pub async fn register_user(users: &dyn UserStore, form: RegisterForm) -> Result<User, RegisterError> {
    let mut errors = validate_registration(&form);
    let username = form.username.trim().to_string();
    let email = normalize_email(&form.email);

    if errors.field("username").is_empty() && users.find_by_username(&username).await?.is_some() {
        add_taken(&mut errors, UniqueField::Username);
    }
    if errors.field("email").is_empty() && users.find_by_email(&email).await?.is_some() {
        add_taken(&mut errors, UniqueField::Email);
    }
    if !errors.is_empty() {
        warn!(username = %username, "registration rejected");
        return Err(RegisterError::Invalid(errors));
    }

    let password_hash = hash_password(&form.password)?;
    let now = OffsetDateTime::now_utc();
    let user = users
        .create(NewUser {
            username,
            email,
            password_hash,
            is_subscribed: true,
            subscription_start_date: Some(now),
            subscription_end_date: Some(now + Duration::days(MOCK_SUBSCRIPTION_DAYS)),
        })
        .await;
    let user = match user {
        Ok(user) => user,
        // another registration claimed the name between the lookup and the insert
        Err(CreateUserError::Taken(field)) => {
            warn!(field = field.as_str(), "registration lost a uniqueness race");
            let mut errors = FormErrors::default();
            add_taken(&mut errors, field);
            return Err(RegisterError::Invalid(errors));
        }
        Err(CreateUserError::Other(e)) => return Err(e.into()),
    };

    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(user)
}

/// `Ok(None)` for an unknown email or a wrong password.
pub async fn authenticate(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let email = normalize_email(email);
    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Ok(None);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}
